use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub number_of_records: Option<u64>,
    pub number_of_return: Option<u64>,
    pub start_record: Option<u64>,
    pub next_record_position: Option<u64>,
    #[serde(default)]
    pub meeting_record: Vec<MeetingRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    #[serde(rename = "issueID")]
    pub issue_id: Option<String>,
    pub name_of_house: Option<String>,
    pub name_of_meeting: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub speech_record: Vec<SpeechRecord>,
    #[serde(rename = "meetingURL")]
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecord {
    #[serde(rename = "speechID")]
    pub speech_id: Option<String>,
    pub speech_order: Option<u32>,
    pub speaker: Option<String>,
    pub speech: Option<String>,
}

impl MeetingRecord {
    pub fn date_key(&self) -> &str {
        self.date.as_deref().unwrap_or("")
    }
}

impl SpeechRecord {
    pub fn text(&self) -> &str {
        self.speech.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("range start {from} is after range end {until}")]
    Inverted { from: NaiveDate, until: NaiveDate },
}

/// Inclusive `YYYY-MM-DD` bounds passed straight to the API's `from`/`until`.
///
/// Month ranges always end on day 31; the API ignores days that do not exist,
/// so the bound is kept as a string rather than a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    from: String,
    until: String,
}

impl DateRange {
    pub fn day(date: NaiveDate) -> Self {
        let formatted = date.format("%Y-%m-%d").to_string();
        Self {
            from: formatted.clone(),
            until: formatted,
        }
    }

    pub fn days(from: NaiveDate, until: NaiveDate) -> Result<Self, DateRangeError> {
        if from > until {
            return Err(DateRangeError::Inverted { from, until });
        }
        Ok(Self {
            from: from.format("%Y-%m-%d").to_string(),
            until: until.format("%Y-%m-%d").to_string(),
        })
    }

    pub fn month(year: i32, month: u32) -> Result<Self, DateRangeError> {
        if !(1..=12).contains(&month) {
            return Err(DateRangeError::InvalidMonth(month));
        }
        Ok(Self {
            from: format!("{}-{:02}-01", year, month),
            until: format!("{}-{:02}-31", year, month),
        })
    }

    pub fn year(year: i32) -> Self {
        Self {
            from: format!("{}-01-01", year),
            until: format!("{}-12-31", year),
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn until(&self) -> &str {
        &self.until
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from, self.until)
    }
}
