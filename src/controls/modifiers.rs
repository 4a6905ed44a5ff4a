//! The four modifier keys (Shift, Option, Control, Command). They
//! carry no LED or OSC output of their own; other control objects
//! consult their held state (e.g. vpot fine-adjust under Command).
//!
//! Grounded on `ReaModifiers` (original_source/ReaCommon.py), which
//! dispatches all four buttons through one `setattr` — reproduced here
//! as a single `set` entry point instead of four near-identical setters.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub option: bool,
    pub control: bool,
    pub command: bool,
}

impl Modifiers {
    /// Desk to computer: a modifier button changed state. `name` is
    /// the trailing mapping-tree address segment (`Shift`, `Option`,
    /// `Control`, `Command`), matched case-insensitively as the
    /// original's `setattr(self, button.lower(), ...)` does.
    pub fn d_c(&mut self, name: &str, held: bool) {
        match name.to_ascii_lowercase().as_str() {
            "shift" => self.shift = held,
            "option" => self.option = held,
            "control" => self.control = held,
            "command" => self.command = held,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_names_are_ignored() {
        let mut m = Modifiers::default();
        m.d_c("Grid", true);
        assert_eq!(m, Modifiers::default());
    }

    #[test]
    fn each_modifier_sets_independently() {
        let mut m = Modifiers::default();
        m.d_c("Command", true);
        assert!(m.command);
        assert!(!m.shift);
        m.d_c("Command", false);
        assert!(!m.command);
    }
}
