use std::collections::{HashMap, HashSet};

/// Deduplicated topics for one aggregation unit.
///
/// Iteration follows first insertion so rendered reports are stable, but two
/// sets compare equal whenever they hold the same topics.
#[derive(Debug, Clone, Default)]
pub struct TopicSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl TopicSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lists<'a, I>(lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut set = Self::new();
        for list in lists {
            set.extend(list.iter().cloned());
        }
        set
    }

    /// Returns false when the topic was already present.
    pub fn insert(&mut self, topic: String) -> bool {
        if self.members.contains(&topic) {
            return false;
        }
        self.members.insert(topic.clone());
        self.ordered.push(topic);
        true
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.members.contains(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn join(&self, separator: &str) -> String {
        self.ordered.join(separator)
    }
}

impl Extend<String> for TopicSet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        for topic in iter {
            self.insert(topic);
        }
    }
}

impl PartialEq for TopicSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for TopicSet {}

/// Occurrence counts across a whole run. Ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFrequency {
    counts: Vec<(String, u64)>,
    positions: HashMap<String, usize>,
}

impl TopicFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every entry of one chunk's raw topic list, repeats included.
    pub fn record(&mut self, topics: &[String]) {
        for topic in topics {
            self.increment(topic);
        }
    }

    pub fn increment(&mut self, topic: &str) {
        match self.positions.get(topic) {
            Some(&position) => self.counts[position].1 += 1,
            None => {
                self.positions.insert(topic.to_string(), self.counts.len());
                self.counts.push((topic.to_string(), 1));
            }
        }
    }

    pub fn count(&self, topic: &str) -> u64 {
        self.positions
            .get(topic)
            .map(|&position| self.counts[position].1)
            .unwrap_or(0)
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent topics, highest count first.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked = self.counts.clone();
        // Stable sort: equal counts stay in first-seen order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_topic_set_removes_duplicates_across_chunks() {
        let chunks = [list(&["防衛費", "少子化対策"]), list(&["少子化対策", "物価高", "防衛費"])];

        let set = TopicSet::from_lists(chunks.iter().map(Vec::as_slice));

        assert_eq!(set.len(), 3);
        assert_eq!(set.join(", "), "防衛費, 少子化対策, 物価高");
        assert!(set.contains("物価高"));
    }

    #[test]
    fn test_topic_set_invariant_to_merge_order() {
        let a = list(&["x", "y", "y"]);
        let b = list(&["z", "x"]);
        let c = list(&["w"]);

        let forward = TopicSet::from_lists([a.as_slice(), b.as_slice(), c.as_slice()]);
        let backward = TopicSet::from_lists([c.as_slice(), b.as_slice(), a.as_slice()]);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 4);
    }

    #[test]
    fn test_topic_set_insert_reports_novelty() {
        let mut set = TopicSet::new();
        assert!(set.insert("a".to_string()));
        assert!(!set.insert("a".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_frequency_counts_repeats_within_chunk() {
        let mut frequency = TopicFrequency::new();
        frequency.record(&list(&["a", "b", "a"]));
        frequency.record(&list(&["a"]));
        frequency.record(&list(&[]));

        assert_eq!(frequency.count("a"), 3);
        assert_eq!(frequency.count("b"), 1);
        assert_eq!(frequency.count("missing"), 0);
        assert_eq!(frequency.total(), 4);
        assert_eq!(frequency.distinct(), 2);
    }

    #[test]
    fn test_frequency_total_matches_occurrences() {
        let chunks = vec![
            list(&["税制", "外交"]),
            list(&["外交", "外交"]),
            list(&["税制"]),
            list(&["エネルギー", "税制", "外交"]),
        ];
        let mut frequency = TopicFrequency::new();
        for chunk in &chunks {
            frequency.record(chunk);
        }

        for topic in ["税制", "外交", "エネルギー"] {
            let expected = chunks
                .iter()
                .flat_map(|c| c.iter())
                .filter(|t| t.as_str() == topic)
                .count() as u64;
            assert_eq!(frequency.count(topic), expected, "topic {}", topic);
        }
    }

    #[test]
    fn test_top_breaks_ties_by_first_seen() {
        let mut frequency = TopicFrequency::new();
        frequency.record(&list(&["c", "a", "b", "d"]));
        frequency.record(&list(&["b", "a"]));
        frequency.record(&list(&["d"]));

        let top = frequency.top(3);

        // a, b and d all have 2; c has 1. Among the ties, a was seen before b, b before d.
        assert_eq!(
            top,
            vec![
                ("a".to_string(), 2),
                ("b".to_string(), 2),
                ("d".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_top_with_fewer_topics_than_requested() {
        let mut frequency = TopicFrequency::new();
        frequency.record(&list(&["only"]));

        assert_eq!(frequency.top(10), vec![("only".to_string(), 1)]);
        assert!(TopicFrequency::new().top(10).is_empty());
    }
}
