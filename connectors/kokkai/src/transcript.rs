use std::collections::HashMap;

use crate::models::MeetingRecord;

/// Key used when a whole date range is analysed as one unit.
pub const WHOLE_RANGE_KEY: &str = "all";

/// Newline-joined speech text per aggregation key, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcripts {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl Transcripts {
    /// One transcript per meeting date.
    pub fn by_date(records: &[MeetingRecord]) -> Self {
        let mut transcripts = Self::default();
        for record in records {
            transcripts.append_record(record.date_key(), record);
        }
        transcripts
    }

    /// Every record folded into a single transcript under `key`.
    pub fn whole_range(records: &[MeetingRecord], key: &str) -> Self {
        let mut transcripts = Self::default();
        for record in records {
            transcripts.append_record(key, record);
        }
        transcripts
    }

    fn append_record(&mut self, key: &str, record: &MeetingRecord) {
        if record.speech_record.is_empty() {
            return;
        }
        let blob = self.blob_mut(key);
        for speech in &record.speech_record {
            blob.push_str(speech.text());
            blob.push('\n');
        }
    }

    fn blob_mut(&mut self, key: &str) -> &mut String {
        let position = match self.positions.get(key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.to_string(), String::new()));
                self.positions.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, blob)| (key.as_str(), blob.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
