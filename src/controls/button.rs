//! Button LED driver. Wraps the reverse LED index built from the
//! mapping tree and tracks per-address toggle state.
//!
//! Grounded on `ReaButtonLed`/`C24buttonled` (original_source/
//! ReaCommon.py, control24osc.py).
//!
//! `toggle_state` in the original keys its state dict with the
//! literal string `'addr'` rather than the `addr` parameter, so every
//! toggle button on the desk shares one flip-flop. Treated here as a
//! bug, not a quirk to keep: state is kept per address, so Grid,
//! Shuffle, Slip, Spot and Mix each hold independent toggle state.
//! See DESIGN.md.

use std::collections::HashMap;

use crate::mapping::{LedTemplate, ParsedEvent};

pub struct ButtonLed {
    index: HashMap<String, LedTemplate>,
    toggle_states: HashMap<String, f64>,
}

impl ButtonLed {
    pub fn new(index: HashMap<String, LedTemplate>) -> Self {
        ButtonLed {
            index,
            toggle_states: HashMap::new(),
        }
    }

    fn toggle_state(&mut self, addr: &str) -> f64 {
        let state = self.toggle_states.entry(addr.to_string()).or_insert(0.0);
        *state = if *state == 0.0 { 1.0 } else { 0.0 };
        *state
    }

    /// Computer to desk: light (or clear) the LED at `addr`, optionally
    /// scoped to `track`. Returns the three command bytes to send, or
    /// `None` if `addr` has no LED in the index.
    pub fn set_btn(&mut self, addr: &str, track: Option<u8>, value: f64) -> Option<[u8; 3]> {
        let template = self.index.get(addr)?.clone();
        let value = if template.toggle {
            self.toggle_state(addr)
        } else {
            value
        };
        let mut bytes = template.cmdbytes;
        if let (Some(track_byte), Some(track_num)) = (template.track_byte, track) {
            bytes[track_byte] |= track_num;
        }
        if value == 1.0 {
            bytes[2] |= 0x40;
        }
        Some(bytes)
    }

    /// Computer to desk: OSC-driven LED set, identical contract to
    /// `set_btn` kept as a separate entry point to mirror `C24buttonled.c_d`.
    pub fn c_d(&mut self, addr: &str, track: Option<u8>, value: f64) -> Option<[u8; 3]> {
        self.set_btn(addr, track, value)
    }

    /// Desk to computer: a button press/release is forwarded to the
    /// DAW unchanged; this exists only so callers have a single type
    /// to dispatch both directions through.
    pub fn d_c(&self, event: &ParsedEvent) -> (String, Option<u8>, Option<f64>) {
        (event.address.clone(), event.track, event.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{build_led_index, build_tree};

    const GRID: &str = "/button/command/EditMode+Function+Banks/Grid";
    const MIX: &str = "/button/command/Window+ZoomPresets+Navigation/Mix";
    const SHUFFLE: &str = "/button/command/EditMode+Function+Banks/Shuffle";
    const MUTE: &str = "/button/track/@/Mute";

    #[test]
    fn non_toggle_button_lights_without_flipping_state() {
        let index = build_led_index(&build_tree());
        let mut led = ButtonLed::new(index);
        let on = led.set_btn("/button/command/utility_misc_meterselect_automationenable/F1", None, 1.0)
            .unwrap();
        assert_eq!(on[2] & 0x40, 0x40);
    }

    #[test]
    fn toggle_button_flips_independent_of_value_argument() {
        let index = build_led_index(&build_tree());
        let mut led = ButtonLed::new(index);
        let first = led.set_btn(GRID, None, 0.0).unwrap();
        let second = led.set_btn(GRID, None, 0.0).unwrap();
        assert_ne!(first[2] & 0x40, second[2] & 0x40);
    }

    #[test]
    fn separate_toggle_addresses_track_independent_state() {
        let index = build_led_index(&build_tree());
        let mut led = ButtonLed::new(index);
        led.set_btn(SHUFFLE, None, 0.0);
        let mix_first = led.set_btn(MIX, None, 0.0).unwrap();
        assert_eq!(mix_first[2] & 0x40, 0x40);
    }

    #[test]
    fn track_scoped_button_ors_in_track_number() {
        let index = build_led_index(&build_tree());
        let mut led = ButtonLed::new(index);
        let bytes = led.set_btn(MUTE, Some(5), 1.0).unwrap();
        assert_eq!(bytes[2] & 0x1f, 5);
    }

    #[test]
    fn unknown_address_returns_none() {
        let index = build_led_index(&build_tree());
        let mut led = ButtonLed::new(index);
        assert!(led.set_btn("/button/does/not/exist", None, 1.0).is_none());
    }
}
