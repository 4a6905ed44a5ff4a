//! Eight-character seven-segment transport clock, cycling between
//! time/frames/samples/beat display modes on a button press.
//!
//! Grounded on `ReaClock` (original_source/ReaCommon.py). Segment
//! encoding, dot masks, and per-mode text formatters reproduced as
//! given; the restore-on-timeout behaviour the scribble strip has is
//! not part of the clock in the original and isn't added here.

use std::collections::HashMap;

use crate::modemgr::ModeManager;

fn sevenseg_table() -> HashMap<char, u8> {
    [
        ('0', 0b1111110),
        ('1', 0b0110000),
        ('2', 0b1101101),
        ('3', 0b1111001),
        ('4', 0b0110011),
        ('5', 0b1011011),
        ('6', 0b1011111),
        ('7', 0b1110000),
        ('8', 0b1111111),
        ('9', 0b1111011),
        ('-', 0b0000001),
        (' ', 0),
        ('L', 0x0e),
        ('h', 0x17),
        ('o', 0x1d),
        ('b', 0x1f),
        ('H', 0x37),
        ('J', 0x38),
        ('Y', 0x3b),
        ('d', 0x3d),
        ('U', 0x3e),
        ('R', 0x46),
        ('F', 0x47),
        ('C', 0x4e),
        ('E', 0x4f),
        ('S', 0b1011011),
        ('P', 0x67),
        ('Z', 0b1101101),
        ('A', 0x77),
    ]
    .into_iter()
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    Time,
    Frames,
    Samples,
    Beat,
}

struct ModeInfo {
    mode: ClockMode,
    dots: u8,
    led: u8,
}

/// Encode up to 8 trailing characters of `text` as seven-segment
/// bytes, right-justified (rightmost character in the lowest display
/// position), space-padded on the left.
pub fn encode_text(text: &str, table: &HashMap<char, u8>) -> [u8; 8] {
    let mut out = [0u8; 8];
    let chars: Vec<char> = text.chars().collect();
    let mut pos = chars.len() as isize - 1;
    let mut slot = 0usize;
    while slot < 8 && pos >= 0 {
        if let Some(&code) = table.get(&chars[pos as usize]) {
            out[slot] = code;
            slot += 1;
        }
        pos -= 1;
    }
    out
}

fn fmt_time(text: &str) -> String {
    let len = text.len();
    if len > 13 {
        text[len - 13..].to_string()
    } else {
        text.to_string()
    }
}

fn fmt_default(text: &str) -> String {
    format!("{text} ")
}

fn fmt_beat(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() >= 5 && chars[chars.len() - 5] == '.' {
        let split = chars.len() - 4;
        let (head, tail): (String, String) = (
            chars[..split - 1].iter().collect(),
            chars[split - 1..].iter().collect(),
        );
        format!("{head} {tail} ")
    } else {
        format!("{text} ")
    }
}

pub struct Clock {
    modemgr: ModeManager<ModeInfo>,
    table: HashMap<char, u8>,
    text: HashMap<&'static str, String>,
    pub cmdbytes: [u8; 15],
    pub ledbytes: [u8; 7],
}

const CLOCK_ADDR_TIME: &str = "time";
const CLOCK_ADDR_FRAMES: &str = "frames";
const CLOCK_ADDR_SAMPLES: &str = "samples";
const CLOCK_ADDR_BEAT: &str = "beat";

impl Default for Clock {
    fn default() -> Self {
        let modes = vec![
            (
                CLOCK_ADDR_TIME,
                ModeInfo {
                    mode: ClockMode::Time,
                    dots: 0b0010101,
                    led: 0x40,
                },
            ),
            (
                CLOCK_ADDR_FRAMES,
                ModeInfo {
                    mode: ClockMode::Frames,
                    dots: 0b0101010,
                    led: 0x20,
                },
            ),
            (
                CLOCK_ADDR_SAMPLES,
                ModeInfo {
                    mode: ClockMode::Samples,
                    dots: 0x00,
                    led: 0x10,
                },
            ),
            (
                CLOCK_ADDR_BEAT,
                ModeInfo {
                    mode: ClockMode::Beat,
                    dots: 0b0010100,
                    led: 0x08,
                },
            ),
        ];
        let modemgr = ModeManager::new(modes, CLOCK_ADDR_BEAT);
        let mut clock = Clock {
            modemgr,
            table: sevenseg_table(),
            text: HashMap::new(),
            cmdbytes: [
                0xf0, 0x13, 0x01, 0x30, 0x19, 0x00, 0x01, 0x46, 0x4f, 0x67, 0x77, 0x4f, 0x46,
                0x01, 0xf7,
            ],
            ledbytes: [0xf0, 0x13, 0x01, 0x20, 0x19, 0x00, 0xf7],
        };
        clock.apply_mode_bytes();
        clock
    }
}

impl Clock {
    fn apply_mode_bytes(&mut self) {
        let data = self.modemgr.data();
        self.cmdbytes[5] = data.dots;
        self.ledbytes[5] = data.led;
    }

    fn formatted(&self) -> String {
        let mode = self.modemgr.mode();
        let raw = self.text.get(mode).cloned().unwrap_or_default();
        match self.modemgr.data().mode {
            ClockMode::Time | ClockMode::Frames => fmt_time(&raw),
            ClockMode::Samples => fmt_default(&raw),
            ClockMode::Beat => fmt_beat(&raw),
        }
    }

    fn update_bytes(&mut self) {
        let formatted = self.formatted();
        let segs = encode_text(&formatted, &self.table);
        self.cmdbytes[6..14].copy_from_slice(&segs);
    }

    /// Desk to computer: the clock-mode cycle button was pressed.
    /// Returns the fresh display bytes to send whenever it fires.
    pub fn d_c(&mut self, value_is_press: bool) -> Option<([u8; 7], [u8; 15])> {
        if !value_is_press {
            return None;
        }
        self.modemgr.toggle_mode();
        self.apply_mode_bytes();
        self.update_bytes();
        Some((self.ledbytes, self.cmdbytes))
    }

    /// Computer to desk: new text for one of the clock's modes. Only
    /// redraws the display if `mode` is the one currently showing.
    pub fn c_d(&mut self, mode: &str, text: String) -> Option<[u8; 15]> {
        let key = match mode {
            "time" => CLOCK_ADDR_TIME,
            "frames" => CLOCK_ADDR_FRAMES,
            "samples" => CLOCK_ADDR_SAMPLES,
            "beat" => CLOCK_ADDR_BEAT,
            _ => return None,
        };
        self.text.insert(key, text);
        if key == self.modemgr.mode() {
            self.update_bytes();
            Some(self.cmdbytes)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_beat_mode() {
        let clock = Clock::default();
        assert_eq!(clock.modemgr.data().mode, ClockMode::Beat);
    }

    #[test]
    fn press_cycles_mode_and_updates_dots() {
        let mut clock = Clock::default();
        let (_, cmdbytes) = clock.d_c(true).unwrap();
        assert_eq!(clock.modemgr.mode(), CLOCK_ADDR_TIME);
        assert_eq!(cmdbytes[5], 0b0010101);
    }

    #[test]
    fn release_does_not_cycle() {
        let mut clock = Clock::default();
        assert!(clock.d_c(false).is_none());
        assert_eq!(clock.modemgr.mode(), CLOCK_ADDR_BEAT);
    }

    #[test]
    fn text_for_inactive_mode_is_stored_but_not_sent() {
        let mut clock = Clock::default();
        assert_eq!(clock.modemgr.mode(), CLOCK_ADDR_BEAT);
        assert!(clock.c_d("time", "01:02:03:04".into()).is_none());
        assert!(clock.c_d("beat", "001.01.000".into()).is_some());
    }

    #[test]
    fn encode_text_right_justifies_and_pads() {
        let table = sevenseg_table();
        let bytes = encode_text("42", &table);
        assert_eq!(bytes[0], *table.get(&'2').unwrap());
        assert_eq!(bytes[1], *table.get(&'4').unwrap());
        assert_eq!(bytes[2], 0);
    }
}
