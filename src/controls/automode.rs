//! Per-track automation mode (write/touch/latch/trim/read), cycled by
//! repeated presses of a single button and mirrored to the DAW.
//!
//! Grounded on `C24automode` (original_source/control24osc.py).

use crate::modemgr::ModeManager;

const WRITE: u8 = 0x40;
const TOUCH: u8 = 0x20;
const LATCH: u8 = 0x10;
const TRIM: u8 = 0x08;
const READ: u8 = 0x04;

pub struct AutoMode {
    pub track_number: u8,
    modemgr: ModeManager<u8>,
    cmdbytes: [u8; 7],
}

impl AutoMode {
    pub fn new(track_number: u8) -> Self {
        let modes = vec![
            ("write", WRITE),
            ("touch", TOUCH),
            ("latch", LATCH),
            ("trim", TRIM),
            ("read", READ),
        ];
        AutoMode {
            track_number,
            modemgr: ModeManager::new(modes, "read"),
            cmdbytes: [0xf0, 0x13, 0x01, 0x20, track_number & 0x1f, 0x00, 0xf7],
        }
    }

    pub fn mode(&self) -> &'static str {
        self.modemgr.mode()
    }

    /// Desk to computer: a press on the track's mode-cycle button.
    /// Returns `(bytes_to_turn_off_old_led, bytes_to_turn_on_new_led,
    /// new_mode_name)` for the caller to forward to the desk and notify
    /// the DAW of both transitions, exactly as `C24automode.d_c` emits
    /// two `daw_mode` notifications per press.
    pub fn d_c(&mut self, value_is_press: bool) -> Option<(&'static str, &'static str)> {
        if !value_is_press {
            return None;
        }
        let previous = self.modemgr.mode();
        self.modemgr.toggle_mode();
        Some((previous, self.modemgr.mode()))
    }

    /// Computer to desk: set a named mode directly. Returns the LED
    /// command bytes with that mode's bit set, others cleared.
    pub fn c_d(&mut self, mode: &str) -> Option<[u8; 7]> {
        if !self.modemgr.set_mode(mode) {
            return None;
        }
        self.cmdbytes[5] = *self.modemgr.data();
        Some(self.cmdbytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_read() {
        let am = AutoMode::new(3);
        assert_eq!(am.mode(), "read");
    }

    #[test]
    fn press_cycles_and_wraps() {
        let mut am = AutoMode::new(3);
        let (off, on) = am.d_c(true).unwrap();
        assert_eq!((off, on), ("read", "write"));
        am.d_c(true);
        am.d_c(true);
        am.d_c(true);
        let (_, wrapped) = am.d_c(true).unwrap();
        assert_eq!(wrapped, "read");
    }

    #[test]
    fn release_does_not_cycle() {
        let mut am = AutoMode::new(3);
        assert!(am.d_c(false).is_none());
        assert_eq!(am.mode(), "read");
    }

    #[test]
    fn daw_set_mode_updates_led_bit() {
        let mut am = AutoMode::new(5);
        let bytes = am.c_d("latch").unwrap();
        assert_eq!(bytes[5], LATCH);
        assert_eq!(bytes[4], 5);
    }

    #[test]
    fn unknown_mode_name_is_rejected() {
        let mut am = AutoMode::new(5);
        assert!(am.c_d("bogus").is_none());
    }
}
