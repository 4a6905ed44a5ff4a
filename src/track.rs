//! Per-channel-strip aggregate: one [`Track`] owns every control
//! object addressed at `/track/<n>/...`.
//!
//! Grounded on `_ReaTrack` (original_source/ReaCommon.py), which wires
//! a fader, vpot, vu meter, scribble strip and automation mode per
//! track, plus the virtual-track-28 jog wheel override.

use crate::controls::{AutoMode, Fader, ScribStrip, Vpot, Vu};
use crate::controls::jog::Jog;

/// The original wires virtual track 28 to the jog wheel instead of a
/// regular vpot ("Assuming 28 is always the virtual track for all
/// jpots" — `_ReaTrack.__init__`).
pub const JOG_VIRTUAL_TRACK: u8 = 28;

pub struct Track {
    pub track_number: u8,
    pub fader: Fader,
    pub vpot: Vpot,
    pub vu: Vu,
    pub scribble: ScribStrip,
    pub automode: AutoMode,
    pub jog: Option<Jog>,
}

impl Track {
    pub fn new(track_number: u8, scribble_digits: usize) -> Self {
        Track {
            track_number,
            fader: Fader::new(track_number),
            vpot: Vpot::new(track_number),
            vu: Vu::new(track_number),
            scribble: ScribStrip::new(track_number, scribble_digits),
            automode: AutoMode::new(track_number),
            jog: if track_number == JOG_VIRTUAL_TRACK {
                Some(Jog::default())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_virtual_track_28_gets_a_jog_wheel() {
        let regular = Track::new(3, 4);
        let virtual_track = Track::new(JOG_VIRTUAL_TRACK, 4);
        assert!(regular.jog.is_none());
        assert!(virtual_track.jog.is_some());
    }

    #[test]
    fn track_number_propagates_to_every_control() {
        let track = Track::new(6, 4);
        assert_eq!(track.fader.track_number, 6);
        assert_eq!(track.vpot.track_number, 6);
        assert_eq!(track.vu.track_number, 6);
        assert_eq!(track.scribble.track_number, 6);
        assert_eq!(track.automode.track_number, 6);
    }
}
