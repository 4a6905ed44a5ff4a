//! Per-track scribble strip: a small character display showing either
//! the track name or its current fader/pan value, with a timed
//! auto-restore back to the name after a value is flashed briefly.
//!
//! Grounded on `_ReaScribStrip` (original_source/ReaCommon.py). The
//! original schedules restoration with `threading.Timer`; this keeps a
//! restore deadline instead and a caller-driven `tick`, since the
//! session loop already owns a single timer-driven poll (see
//! session.rs) rather than one thread per scribble strip.

use std::time::{Duration, Instant};

pub const RESTORE_AFTER: Duration = Duration::from_secs(1);

pub struct ScribStrip {
    pub track_number: u8,
    digits: usize,
    name: String,
    restore_at: Option<Instant>,
    cmdbytes: Vec<u8>,
}

impl ScribStrip {
    pub fn new(track_number: u8, digits: usize) -> Self {
        let mut cmdbytes = vec![0xf0, 0x13, 0x01, 0x40, track_number, 0x00];
        cmdbytes.resize(6 + digits, 0x20);
        cmdbytes.push(0xf7);
        ScribStrip {
            track_number,
            digits,
            name: String::new(),
            restore_at: None,
            cmdbytes,
        }
    }

    /// Computer to desk: set the persistent track name. Redraws
    /// immediately unless a temporary value display is in flight.
    pub fn set_name(&mut self, name: &str) -> Option<Vec<u8>> {
        self.name = name.to_string();
        if self.restore_at.is_none() {
            Some(self.render(&self.name.clone()))
        } else {
            None
        }
    }

    /// Computer to desk: flash a value (e.g. fader position, pan) for
    /// `RESTORE_AFTER`, then fall back to the track name. Returns the
    /// bytes to send now.
    pub fn show_value(&mut self, now: Instant, text: &str) -> Vec<u8> {
        self.restore_at = Some(now + RESTORE_AFTER);
        self.render(text)
    }

    /// Drive the restore timer. Call periodically (e.g. once per
    /// session tick); returns the name-display bytes exactly once the
    /// deadline passes.
    pub fn tick(&mut self, now: Instant) -> Option<Vec<u8>> {
        match self.restore_at {
            Some(deadline) if now >= deadline => {
                self.restore_at = None;
                Some(self.render(&self.name.clone()))
            }
            _ => None,
        }
    }

    fn render(&mut self, text: &str) -> Vec<u8> {
        let transformed = transform_text(text, self.digits);
        self.cmdbytes[6..6 + self.digits].copy_from_slice(&transformed);
        self.cmdbytes.clone()
    }
}

/// Render `text` into exactly `digits` display bytes, right-padded
/// with spaces, truncating to fit. A `.` immediately followed by a
/// digit compacts into that digit's single display slot: the digit's
/// code has 26 subtracted to select its small-subscript glyph (the
/// decimal point rendered as part of the digit), except the digit `0`
/// (code 48), which is left unchanged — matching
/// `_ReaScribStrip.transform_text`.
pub fn transform_text(text: &str, digits: usize) -> Vec<u8> {
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<u8> = Vec::with_capacity(digits);
    let mut i = 0;
    while i < chars.len() && out.len() < digits {
        let c = chars[i];
        if c == '.' && i + 1 < chars.len() {
            let code = chars[i + 1] as u8;
            out.push(if code == b'0' { code } else { code - 26 });
            i += 2;
        } else {
            out.push(c as u8);
            i += 1;
        }
    }
    while out.len() < digits {
        out.push(b' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_padded_to_digit_count() {
        let mut strip = ScribStrip::new(2, 4);
        let bytes = strip.set_name("Kick").unwrap();
        assert_eq!(&bytes[6..10], b"Kick");
    }

    #[test]
    fn short_name_is_space_padded() {
        let mut strip = ScribStrip::new(2, 4);
        let bytes = strip.set_name("Hi").unwrap();
        assert_eq!(&bytes[6..10], b"Hi  ");
    }

    #[test]
    fn dot_compacts_into_following_digit() {
        let rendered = transform_text("4.2", 4);
        assert_eq!(rendered[0], b'4');
        assert_eq!(rendered[1], b'2' - 26);
        assert_eq!(rendered[2], b' ');
    }

    #[test]
    fn dot_before_zero_is_left_unchanged() {
        let rendered = transform_text("4.0", 4);
        assert_eq!(rendered[0], b'4');
        assert_eq!(rendered[1], b'0');
    }

    #[test]
    fn value_display_suppresses_name_until_restore_deadline() {
        let mut strip = ScribStrip::new(2, 4);
        strip.set_name("Kick");
        let now = Instant::now();
        strip.show_value(now, "-6dB");
        assert!(strip.tick(now).is_none());
        let restored = strip.tick(now + RESTORE_AFTER).unwrap();
        assert_eq!(&restored[6..10], b"Kick");
    }

    #[test]
    fn name_change_during_value_display_is_deferred() {
        let mut strip = ScribStrip::new(2, 4);
        let now = Instant::now();
        strip.show_value(now, "0.0 ");
        assert!(strip.set_name("Snare").is_none());
        let restored = strip.tick(now + RESTORE_AFTER).unwrap();
        assert_eq!(&restored[6..10], b"Snar");
    }
}
