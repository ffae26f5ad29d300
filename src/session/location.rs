//! Reading position tracking mirrored into navigable history.

use log::debug;

/// Host navigable history, addressed by URL fragment (`"#..."`).
pub trait History {
    /// Current fragment including the leading `#`, if any.
    fn fragment(&self) -> Option<String>;
    /// Push a new entry with `fragment` without reloading.
    fn push(&mut self, fragment: &str);
}

/// History kept in memory; the last entry is the current one.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `fragment` as the current entry (e.g. the page was
    /// opened with `#epubcfi(...)`).
    pub fn with_fragment(fragment: &str) -> Self {
        Self {
            entries: vec![fragment.to_string()],
        }
    }
}

impl History for MemoryHistory {
    fn fragment(&self) -> Option<String> {
        self.entries.last().cloned()
    }

    fn push(&mut self, fragment: &str) {
        self.entries.push(fragment.to_string());
    }
}

pub struct LocationTracker {
    current: Option<String>,
    enabled: bool,
    history: Box<dyn History>,
}

impl LocationTracker {
    pub fn new(history: Box<dyn History>, enabled: bool) -> Self {
        Self {
            current: None,
            enabled,
            history,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Position named by the host's current fragment, without the `#`.
    pub fn fragment_position(&self) -> Option<String> {
        let fragment = self.history.fragment()?;
        let pos = fragment.strip_prefix('#').unwrap_or(&fragment);
        (!pos.is_empty()).then(|| pos.to_string())
    }

    /// Record `position`. Pushes a history entry only when tracking is
    /// enabled and the fragment actually changes. Returns whether an entry
    /// was pushed.
    pub fn set_location(&mut self, position: &str) -> bool {
        self.current = Some(position.to_string());
        if !self.enabled {
            return false;
        }
        let fragment = format!("#{position}");
        if self.history.fragment().as_deref() == Some(fragment.as_str()) {
            debug!("location: {fragment} unchanged, no history entry");
            return false;
        }
        debug!("location: push {fragment}");
        self.history.push(&fragment);
        true
    }

    pub fn into_history(self) -> Box<dyn History> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// History that records into a shared vec so tests can inspect it after
    /// handing ownership to the tracker.
    struct SharedHistory(Rc<RefCell<Vec<String>>>);

    impl History for SharedHistory {
        fn fragment(&self) -> Option<String> {
            self.0.borrow().last().cloned()
        }
        fn push(&mut self, fragment: &str) {
            self.0.borrow_mut().push(fragment.to_string());
        }
    }

    fn tracker(enabled: bool) -> (LocationTracker, Rc<RefCell<Vec<String>>>) {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let t = LocationTracker::new(Box::new(SharedHistory(entries.clone())), enabled);
        (t, entries)
    }

    #[test]
    fn same_position_pushes_once() {
        let (mut t, entries) = tracker(true);
        assert!(t.set_location("epubcfi(/6/4)"));
        assert!(!t.set_location("epubcfi(/6/4)"));
        assert_eq!(*entries.borrow(), vec!["#epubcfi(/6/4)".to_string()]);
    }

    #[test]
    fn distinct_positions_push_each() {
        let (mut t, entries) = tracker(true);
        t.set_location("a");
        t.set_location("b");
        t.set_location("a");
        assert_eq!(entries.borrow().len(), 3);
        assert_eq!(t.current(), Some("a"));
    }

    #[test]
    fn disabled_history_records_without_pushing() {
        let (mut t, entries) = tracker(false);
        assert!(!t.set_location("a"));
        assert_eq!(t.current(), Some("a"));
        assert!(entries.borrow().is_empty());
    }

    #[test]
    fn starts_with_no_location() {
        let (t, _) = tracker(true);
        assert_eq!(t.current(), None);
        assert_eq!(t.fragment_position(), None);
    }

    #[test]
    fn fragment_position_strips_hash() {
        let history = MemoryHistory::with_fragment("#epubcfi(/6/2)");
        let t = LocationTracker::new(Box::new(history), true);
        assert_eq!(t.fragment_position().as_deref(), Some("epubcfi(/6/2)"));

        let empty = LocationTracker::new(Box::new(MemoryHistory::with_fragment("#")), true);
        assert_eq!(empty.fragment_position(), None);
    }

    #[test]
    fn existing_fragment_suppresses_duplicate_push() {
        let mut t = LocationTracker::new(Box::new(MemoryHistory::with_fragment("#x")), true);
        assert!(!t.set_location("x"));
    }
}
