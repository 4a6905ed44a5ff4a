//! Motorised fader: 10-bit position split across two command bytes.
//!
//! Grounded on `C24fader` (original_source/control24osc.py). The
//! original builds a 1024-entry lookup dict from `tenbits()`; since
//! `tenbits` is a simple bit-split, we invert it directly instead of
//! materialising the table.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::mapping::ParsedEvent;

/// Full-scale fader resolution (10 bits).
pub const FADER_RANGE: u16 = 1 << 10;
/// Minimum interval between echoing a desk-originated fader move back
/// to the desk (keeps the motor from fighting a fast human move).
pub const FADER_ECHO_INTERVAL: Duration = Duration::from_millis(100);

/// Split a 10-bit value into the two command bytes the desk expects:
/// 7 high bits in one byte, the remaining 3 left-shifted into another.
pub fn tenbits(num: u16) -> (u8, u8) {
    let num = num & 0x3ff;
    ((num >> 3) as u8, ((num & 7) << 4) as u8)
}

/// Recombine the two command bytes into a 10-bit position.
pub fn from_tenbits(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 3) | ((lo as u16) >> 4)
}

pub fn calc_gain(hi: u8, lo: u8) -> f64 {
    from_tenbits(hi, lo) as f64 / FADER_RANGE as f64
}

pub fn calc_cmdbytes(gain: f64) -> (u8, u8) {
    let gain = gain.min(1.0);
    let ten = (gain * FADER_RANGE as f64) as i32 - 1;
    let ten = ten.max(0) as u16;
    tenbits(ten)
}

/// One channel strip's fader state.
pub struct Fader {
    pub track_number: u8,
    pub gain: Option<f64>,
    pub cmdbytes: [u8; 5],
    touch_status: bool,
    last_echo: Option<Instant>,
}

impl Fader {
    pub fn new(track_number: u8) -> Self {
        Fader {
            track_number,
            gain: None,
            cmdbytes: [0xb0, track_number & 0x1f, 0x00, track_number.wrapping_add(0x20), 0x00],
            touch_status: false,
            last_echo: None,
        }
    }

    /// Desk to computer: a fader-move command (`/track/...`) or a
    /// touch-sense button event (`/button/...`) sharing this handler.
    ///
    /// Returns `Some(gain)` when the DAW should be told the new
    /// position, and `Some(cmdbytes)` (second field) when the desk
    /// should be re-sent its own position (touch release, or a
    /// throttled echo of a fast move).
    pub fn d_c(&mut self, event: &ParsedEvent) -> (Option<f64>, Option<[u8; 5]>) {
        if event.address.contains("/button") {
            self.update_from_touch(event);
            return (None, None);
        }
        self.update_from_fader_move(event)
    }

    fn update_from_fader_move(&mut self, event: &ParsedEvent) -> (Option<f64>, Option<[u8; 5]>) {
        let Some(cmdbytes) = &event.cmdbytes else {
            return (None, None);
        };
        if cmdbytes.len() < 5 {
            warn!(track = self.track_number, "fader: short command bytes");
            return (None, None);
        }
        if cmdbytes[1] != self.track_number {
            warn!(
                track = self.track_number,
                got = cmdbytes[1],
                "fader: track byte mismatch"
            );
            return (None, None);
        }
        self.cmdbytes[2] = cmdbytes[2];
        self.cmdbytes[4] = cmdbytes[4];
        let gain = calc_gain(self.cmdbytes[2], self.cmdbytes[4]);
        self.gain = Some(gain);

        let now = Instant::now();
        let echo = match self.last_echo {
            Some(last) if now.duration_since(last) <= FADER_ECHO_INTERVAL => None,
            _ => Some(self.cmdbytes),
        };
        if echo.is_some() {
            self.last_echo = Some(now);
        }
        (Some(gain), echo)
    }

    fn update_from_touch(&mut self, event: &ParsedEvent) {
        let touched = event.value == Some(1.0);
        self.touch_status = touched;
    }

    /// Touch release after this event: whether the desk should be
    /// re-sent the current fader bytes (called after `d_c` for a
    /// touch event when the previous touch state was held).
    pub fn touch_released(&self) -> bool {
        !self.touch_status
    }

    /// Computer to desk: set fader position from a DAW gain factor (0..1).
    pub fn c_d(&mut self, gain: f64) -> [u8; 5] {
        self.gain = Some(gain);
        self.cmdbytes[3] = 0x20 + self.track_number;
        let (hi, lo) = calc_cmdbytes(gain);
        self.cmdbytes[2] = hi;
        self.cmdbytes[4] = lo;
        self.cmdbytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenbits_round_trips() {
        for num in [0u16, 1, 512, 1000, 1023] {
            let (hi, lo) = tenbits(num);
            assert_eq!(from_tenbits(hi, lo), num);
        }
    }

    #[test]
    fn full_scale_gain_is_one() {
        let (hi, lo) = calc_cmdbytes(1.0);
        let gain = calc_gain(hi, lo);
        assert!((gain - 1023.0 / 1024.0).abs() < 1e-9);
    }

    #[test]
    fn zero_gain_clamped_to_zero_ticks() {
        let (hi, lo) = calc_cmdbytes(0.0);
        assert_eq!((hi, lo), (0, 0));
    }

    #[test]
    fn touch_release_after_hold_reports_true() {
        let mut fader = Fader::new(3);
        let pressed = ParsedEvent {
            address: "/track/4/button/Touch".into(),
            value: Some(1.0),
            ..Default::default()
        };
        fader.d_c(&pressed);
        assert!(!fader.touch_released());
        let released = ParsedEvent {
            address: "/track/4/button/Touch".into(),
            value: Some(0.0),
            ..Default::default()
        };
        fader.d_c(&released);
        assert!(fader.touch_released());
    }
}
