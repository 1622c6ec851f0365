//! Wave-based crawl frontier

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized key, already recorded in the seen registry
    pub key: String,

    /// URL as discovered, used for fetching
    pub url: String,

    /// Page the URL was discovered on; `None` for seeds
    pub referrer: Option<String>,
}

impl FrontierEntry {
    pub fn seed(key: String, url: String) -> Self {
        Self {
            key,
            url,
            referrer: None,
        }
    }
}

/// Two-wave frontier
///
/// New URLs always go into `next`. [`Frontier::begin_wave`] moves `next` into
/// `current`, which the driver then drains; nothing discovered while a wave
/// is being processed joins that same wave.
#[derive(Debug, Default)]
pub struct Frontier {
    current: VecDeque<FrontierEntry>,
    next: Vec<FrontierEntry>,
    next_keys: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an entry for the next wave
    ///
    /// Returns false if an entry with the same key is already queued there.
    pub fn push_next(&mut self, entry: FrontierEntry) -> bool {
        if !self.next_keys.insert(entry.key.clone()) {
            return false;
        }
        self.next.push(entry);
        true
    }

    /// Starts a new wave from everything queued in `next`
    ///
    /// Returns the number of entries in the new wave. `next` is empty
    /// afterwards.
    pub fn begin_wave(&mut self) -> usize {
        self.current.extend(self.next.drain(..));
        self.next_keys.clear();
        self.current.len()
    }

    /// Takes the next entry of the current wave
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.current.pop_front()
    }

    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    pub fn next_len(&self) -> usize {
        self.next.len()
    }

    /// True when both waves are empty
    pub fn is_drained(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }

    /// Everything not yet processed: rest of the current wave, then `next`
    pub fn pending(&self) -> Vec<FrontierEntry> {
        self.current
            .iter()
            .chain(self.next.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> FrontierEntry {
        FrontierEntry {
            key: key.to_string(),
            url: key.to_string(),
            referrer: Some("http://site.edu".to_string()),
        }
    }

    #[test]
    fn test_wave_swap() {
        let mut frontier = Frontier::new();
        frontier.push_next(entry("a"));
        frontier.push_next(entry("b"));
        assert_eq!(frontier.current_len(), 0);

        assert_eq!(frontier.begin_wave(), 2);
        assert_eq!(frontier.next_len(), 0);

        // discoveries during the wave go to the next one
        assert_eq!(frontier.pop().map(|e| e.key), Some("a".to_string()));
        frontier.push_next(entry("c"));
        assert_eq!(frontier.pop().map(|e| e.key), Some("b".to_string()));
        assert_eq!(frontier.pop(), None);

        assert_eq!(frontier.begin_wave(), 1);
        assert_eq!(frontier.pop().map(|e| e.key), Some("c".to_string()));
        assert!(frontier.is_drained());
        assert_eq!(frontier.begin_wave(), 0);
    }

    #[test]
    fn test_repeat_key_in_next_ignored() {
        let mut frontier = Frontier::new();
        assert!(frontier.push_next(entry("a")));
        assert!(!frontier.push_next(entry("a")));
        assert_eq!(frontier.next_len(), 1);
    }

    #[test]
    fn test_pending_lists_current_then_next() {
        let mut frontier = Frontier::new();
        frontier.push_next(entry("a"));
        frontier.push_next(entry("b"));
        frontier.begin_wave();
        frontier.pop();
        frontier.push_next(entry("c"));

        let keys: Vec<_> = frontier.pending().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert!(!frontier.is_drained());
    }
}
