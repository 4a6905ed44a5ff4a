//! Jog/shuttle wheel. Physically the same rotary mechanism as a vpot
//! (it lives on virtual track 28) but with its own mode-switched
//! output: scrub (absolute direction pulse) or shuttle (playrate).
//!
//! Grounded on `C24jpot`/`ReaJpot` (original_source/control24osc.py,
//! ReaCommon.py).

use crate::mapping::ParsedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogMode {
    Scrub,
    Shuttle,
}

pub struct Jog {
    pub mode: JogMode,
    pub val: u8,
    pub dir: i8,
    pub velocity: u8,
}

impl Default for Jog {
    fn default() -> Self {
        Jog {
            mode: JogMode::Scrub,
            val: 0,
            dir: 0,
            velocity: 0,
        }
    }
}

/// Output of a jog move: the OSC value to send, and to which address
/// tail (`scrub` or `playrate/rotary`) depending on the active mode.
pub struct JogOutput {
    pub mode: JogMode,
    pub value: f64,
}

impl Jog {
    /// Desk to computer: a mode-select button (`.../button/Scrub` or
    /// `.../button/Shuttle`) or a wheel rotation, sharing this handler
    /// exactly as `C24jpot.d_c` dispatches on the parsed address.
    pub fn d_c(&mut self, event: &ParsedEvent) -> Option<JogOutput> {
        if event.address.contains("/button") {
            self.update_from_button(event);
            None
        } else {
            self.update_from_move(event)
        }
    }

    fn update_from_button(&mut self, event: &ParsedEvent) {
        if event.value != Some(1.0) {
            return;
        }
        if event.address.ends_with("/Scrub") {
            self.mode = JogMode::Scrub;
        } else if event.address.ends_with("/Shuttle") {
            self.mode = JogMode::Shuttle;
        }
    }

    fn update_from_move(&mut self, event: &ParsedEvent) -> Option<JogOutput> {
        let cmdbytes = event.cmdbytes.as_ref()?;
        if cmdbytes.len() < 4 {
            return None;
        }
        self.val = cmdbytes[2];
        self.velocity = cmdbytes[3];
        self.dir = if self.val > 64 { 1 } else { -1 };
        let scrubout = if self.val > 64 { 1.0 } else { 0.0 };
        let out = 0.5 + (self.val as f64 - 64.0) * 0.05;

        let value = match self.mode {
            JogMode::Scrub => scrubout,
            JogMode::Shuttle => out,
        };
        Some(JogOutput {
            mode: self.mode,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_press_switches_mode() {
        let mut jog = Jog::default();
        let event = ParsedEvent {
            address: "/button/command/Transport/Shuttle".into(),
            value: Some(1.0),
            ..Default::default()
        };
        jog.d_c(&event);
        assert_eq!(jog.mode, JogMode::Shuttle);
    }

    #[test]
    fn forward_move_in_scrub_mode_emits_one() {
        let mut jog = Jog::default();
        let event = ParsedEvent {
            address: "/track/29/reavpot".into(),
            cmdbytes: Some(vec![0xb0, 0x5c, 96, 10]),
            ..Default::default()
        };
        let out = jog.d_c(&event).unwrap();
        assert_eq!(out.mode, JogMode::Scrub);
        assert_eq!(out.value, 1.0);
    }

    #[test]
    fn shuttle_mode_emits_scaled_value() {
        let mut jog = Jog {
            mode: JogMode::Shuttle,
            ..Default::default()
        };
        let event = ParsedEvent {
            address: "/track/29/reavpot".into(),
            cmdbytes: Some(vec![0xb0, 0x5c, 84, 10]),
            ..Default::default()
        };
        let out = jog.d_c(&event).unwrap();
        assert!((out.value - (0.5 + 20.0 * 0.05)).abs() < 1e-9);
    }
}
