use std::collections::VecDeque;

/// Most recent identity labels of one track, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelHistory {
    labels: VecDeque<String>,
    capacity: usize,
}

impl LabelHistory {
    pub fn new(capacity: usize, first: String) -> Self {
        let capacity = capacity.max(1);
        let mut labels = VecDeque::with_capacity(capacity);
        labels.push_back(first);
        Self { labels, capacity }
    }

    /// Append `label`, evicting the oldest entry when full.
    pub fn push(&mut self, label: String) {
        self.labels.push_back(label);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Most frequent label. Ties go to the label that appears earliest in
    /// the current history.
    pub fn majority(&self) -> Option<&str> {
        // Tally in first-seen order; a Vec keeps that order explicit.
        let mut tally: Vec<(&str, usize)> = Vec::new();
        for label in self.iter() {
            match tally.iter_mut().find(|(l, _)| *l == label) {
                Some((_, count)) => *count += 1,
                None => tally.push((label, 1)),
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (label, count) in tally {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn history(capacity: usize, labels: &[&str]) -> LabelHistory {
        let mut h = LabelHistory::new(capacity, labels[0].to_string());
        for l in &labels[1..] {
            h.push(l.to_string());
        }
        h
    }

    #[rstest]
    #[case::alternating(&["A", "B", "A", "B", "A"], "A")]
    #[case::clear_majority(&["B", "A", "A"], "A")]
    #[case::tie_goes_to_first_seen(&["B", "A", "A", "B"], "B")]
    #[case::tie_three_way(&["C", "B", "A"], "C")]
    #[case::single(&["X"], "X")]
    fn test_majority(#[case] labels: &[&str], #[case] expected: &str) {
        assert_eq!(history(10, labels).majority(), Some(expected));
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let h = history(3, &["A", "A", "B", "B"]);
        let labels: Vec<&str> = h.iter().collect();
        assert_eq!(labels, vec!["A", "B", "B"]);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_tie_break_follows_current_window_not_all_time() {
        // "A" was seen first overall but has been evicted from the front,
        // so "B" is now the earliest label in the window.
        let h = history(4, &["A", "B", "A", "B", "A"]);
        // window: B, A, B, A
        assert_eq!(h.majority(), Some("B"));
    }

    #[test]
    fn test_zero_capacity_still_keeps_latest() {
        let h = history(0, &["A", "B"]);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec!["B"]);
    }
}
