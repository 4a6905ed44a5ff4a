//! Rotary encoder ("virtual pot") around each channel's pan control,
//! with its own 15-LED ring display.
//!
//! Grounded on `C24vpot`/`_ReaVpot` (original_source/control24osc.py,
//! ReaCommon.py). The jog wheel (`jog.rs`) is the same physical
//! mechanism wired to a different handler, per the original's virtual
//! track 28 override.

use crate::mapping::ParsedEvent;

/// LED ring states: each entry lights a contiguous run of segments
/// from the left, reproducing the desk's "fill" display style. Index
/// 0 is hard left, 14 is hard right, 7 is centre.
pub const SCALE_FILL: [(u8, u8, u8); 15] = [
    (0x40, 0x7f, 0x00),
    (0x00, 0x7f, 0x00),
    (0x00, 0x3f, 0x00),
    (0x00, 0x1f, 0x00),
    (0x00, 0x0f, 0x00),
    (0x00, 0x07, 0x00),
    (0x00, 0x03, 0x00),
    (0x00, 0x01, 0x00),
    (0x00, 0x01, 0x40),
    (0x00, 0x01, 0x60),
    (0x00, 0x01, 0x70),
    (0x00, 0x01, 0x78),
    (0x00, 0x01, 0x7c),
    (0x00, 0x01, 0x7e),
    (0x00, 0x01, 0x7f),
];

/// Single-LED "dot" display style. The original defines this table
/// but its `led_value` lookup is hardcoded to `scale_fill` and never
/// reads `scale_dot` either — no ring-mode switch exists to select it
/// in the source this was ported from. Kept here for the same reason
/// the original keeps it: table fidelity, not a live code path. Ring
/// mode selection is explicitly out of scope.
#[allow(dead_code)]
pub const SCALE_DOT: [(u8, u8, u8); 15] = [
    (0x40, 0x00, 0x00),
    (0x00, 0x40, 0x00),
    (0x00, 0x20, 0x00),
    (0x00, 0x10, 0x00),
    (0x00, 0x08, 0x00),
    (0x00, 0x04, 0x00),
    (0x00, 0x02, 0x00),
    (0x00, 0x01, 0x00),
    (0x00, 0x00, 0x40),
    (0x00, 0x00, 0x20),
    (0x00, 0x00, 0x10),
    (0x00, 0x00, 0x08),
    (0x00, 0x00, 0x04),
    (0x00, 0x00, 0x02),
    (0x00, 0x00, 0x01),
];

/// Coarse per-tick pan adjustment (no modifier held).
pub const COARSE: f64 = 0.03125;
/// Fine per-tick pan adjustment, used while the Command modifier is held.
pub const FINE: f64 = 0.005;

pub struct Vpot {
    pub track_number: u8,
    pub pan: f64,
    cmdbytes: [u8; 8],
}

impl Vpot {
    pub fn new(track_number: u8) -> Self {
        Vpot {
            track_number,
            pan: 0.5,
            cmdbytes: [0xf0, 0x13, 0x01, 0x00, track_number & 0x3f, 0x00, 0x00, 0xf7],
        }
    }

    /// Desk to computer: apply a rotation delta and recompute the LED
    /// ring. `fine` mirrors the Command modifier being held.
    pub fn d_c(&mut self, event: &ParsedEvent, fine: bool) -> (f64, [u8; 8]) {
        if let Some(cmdbytes) = &event.cmdbytes {
            if cmdbytes.len() >= 4 {
                let potdir = cmdbytes[2] as i16 - 64;
                let amt = if fine { FINE } else { COARSE };
                self.pan = (self.pan + potdir as f64 * amt).clamp(0.0, 1.0);
            }
        }
        self.update_led();
        (self.pan, self.cmdbytes)
    }

    /// Computer to desk: set pan directly from a DAW value (0..1).
    pub fn c_d(&mut self, pan: f64) -> [u8; 8] {
        self.pan = pan;
        self.update_led();
        self.cmdbytes
    }

    fn update_led(&mut self) {
        let pang = led_index(self.pan);
        let (a, b, c) = SCALE_FILL[pang];
        self.cmdbytes[4] = a | (self.track_number & 0x3f);
        self.cmdbytes[5] = b;
        self.cmdbytes[6] = c;
    }
}

/// Map a pan value (0..1) to an LED-ring index (0..14), centre at 7.
pub fn led_index(pan: f64) -> usize {
    if pan <= 0.0 {
        0
    } else if pan >= 1.0 {
        14
    } else {
        (((pan - 0.5) * 16.0) as i32 + 7).clamp(0, 14) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_pan_lights_middle_led() {
        assert_eq!(led_index(0.5), 7);
    }

    #[test]
    fn hard_left_and_right_clamp() {
        assert_eq!(led_index(0.0), 0);
        assert_eq!(led_index(1.0), 14);
    }

    #[test]
    fn rotation_moves_pan_by_coarse_step() {
        let mut vpot = Vpot::new(2);
        let event = ParsedEvent {
            cmdbytes: Some(vec![0xb0, 0x42, 65, 0x10]),
            ..Default::default()
        };
        let (pan, _) = vpot.d_c(&event, false);
        assert!((pan - (0.5 + COARSE)).abs() < 1e-9);
    }

    #[test]
    fn fine_modifier_uses_smaller_step() {
        let mut vpot = Vpot::new(2);
        let event = ParsedEvent {
            cmdbytes: Some(vec![0xb0, 0x42, 65, 0x10]),
            ..Default::default()
        };
        let (pan, _) = vpot.d_c(&event, true);
        assert!((pan - (0.5 + FINE)).abs() < 1e-9);
    }
}
