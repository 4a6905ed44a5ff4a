//! Generic stateful mode switcher, shared by the clock display, the
//! nav section and the desk's global display mode.
//!
//! Grounded on `ModeManager` (original_source/ReaCommon.py): a fixed,
//! ordered list of mode keys with one marked default, `toggle_mode`
//! cycling to the next key (wrapping), `set_mode` jumping directly.

#[derive(Debug, Clone)]
pub struct ModeManager<T> {
    modes: Vec<(&'static str, T)>,
    current: usize,
}

impl<T> ModeManager<T> {
    /// Build from an ordered list of `(key, data)` pairs. `default_key`
    /// selects the initial mode; if it isn't present, the first entry
    /// wins (matches the original's fallback when no mode is flagged
    /// `default`).
    pub fn new(modes: Vec<(&'static str, T)>, default_key: &str) -> Self {
        let current = modes
            .iter()
            .position(|(k, _)| *k == default_key)
            .unwrap_or(0);
        ModeManager { modes, current }
    }

    pub fn mode(&self) -> &'static str {
        self.modes[self.current].0
    }

    pub fn data(&self) -> &T {
        &self.modes[self.current].1
    }

    pub fn is_valid_mode(&self, key: &str) -> bool {
        self.modes.iter().any(|(k, _)| *k == key)
    }

    pub fn set_mode(&mut self, key: &str) -> bool {
        match self.modes.iter().position(|(k, _)| *k == key) {
            Some(idx) => {
                self.current = idx;
                true
            }
            None => false,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.current = (self.current + 1) % self.modes.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_named_mode() {
        let mgr = ModeManager::new(vec![("time", 1), ("frames", 2), ("beat", 3)], "beat");
        assert_eq!(mgr.mode(), "beat");
        assert_eq!(*mgr.data(), 3);
    }

    #[test]
    fn falls_back_to_first_when_default_missing() {
        let mgr = ModeManager::new(vec![("a", 1), ("b", 2)], "nonexistent");
        assert_eq!(mgr.mode(), "a");
    }

    #[test]
    fn toggle_wraps_around() {
        let mut mgr = ModeManager::new(vec![("a", 1), ("b", 2), ("c", 3)], "a");
        mgr.toggle_mode();
        assert_eq!(mgr.mode(), "b");
        mgr.toggle_mode();
        assert_eq!(mgr.mode(), "c");
        mgr.toggle_mode();
        assert_eq!(mgr.mode(), "a");
    }

    #[test]
    fn set_mode_rejects_unknown_key() {
        let mut mgr = ModeManager::new(vec![("a", 1)], "a");
        assert!(!mgr.set_mode("z"));
        assert_eq!(mgr.mode(), "a");
    }
}
