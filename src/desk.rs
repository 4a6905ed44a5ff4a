//! Global per-session desk aggregate: every track plus the
//! desk-wide controls (clock, nav section, modifiers, button LED
//! index) that aren't scoped to one channel strip.
//!
//! Grounded on `_ReaDesk` / `C24desk` / `ProControl` subclassing
//! (original_source/ReaCommon.py `_ReaDesk.instantiate_tracks`,
//! `control24osc.py`). The two device families differ only in track
//! count and scribble-strip width; everything else is shared.

use std::collections::HashMap;
use std::sync::Arc;

use crate::controls::{ButtonLed, Clock, Modifiers, Nav};
use crate::frame::DeviceType;
use crate::mapping::{build_led_index, MappingTree};
use crate::track::{Track, JOG_VIRTUAL_TRACK};

/// Track count and scribble-strip width per device family, resolved
/// from the beacon's device-type string at session creation
/// (SPEC_FULL.md §4.5).
pub struct DeskLayout {
    pub track_count: u8,
    pub scribble_digits: usize,
}

impl DeskLayout {
    pub fn for_device(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Control24 => DeskLayout {
                track_count: 24,
                scribble_digits: 4,
            },
            DeviceType::ProControl => DeskLayout {
                track_count: 8,
                scribble_digits: 8,
            },
        }
    }
}

pub struct Desk {
    pub tracks: HashMap<u8, Track>,
    pub clock: Clock,
    pub nav: Nav,
    pub modifiers: Modifiers,
    pub button_led: ButtonLed,
    pub mapping: Arc<MappingTree>,
}

impl Desk {
    pub fn new(device_type: DeviceType, mapping: Arc<MappingTree>) -> Self {
        let layout = DeskLayout::for_device(device_type);
        let mut tracks = HashMap::new();
        for n in 0..layout.track_count {
            tracks.insert(n, Track::new(n, layout.scribble_digits));
        }
        // The jog wheel always lives on virtual track 28, independent
        // of the device's physical track count.
        tracks
            .entry(JOG_VIRTUAL_TRACK)
            .or_insert_with(|| Track::new(JOG_VIRTUAL_TRACK, layout.scribble_digits));

        let button_led = ButtonLed::new(build_led_index(&mapping));

        Desk {
            tracks,
            clock: Clock::default(),
            nav: Nav::default(),
            modifiers: Modifiers::default(),
            button_led,
            mapping,
        }
    }

    pub fn track(&self, track_number: u8) -> Option<&Track> {
        self.tracks.get(&track_number)
    }

    pub fn track_mut(&mut self, track_number: u8) -> Option<&mut Track> {
        self.tracks.get_mut(&track_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::build_tree;

    #[test]
    fn control24_layout_has_24_tracks_and_4_digit_scribbles() {
        let layout = DeskLayout::for_device(DeviceType::Control24);
        assert_eq!(layout.track_count, 24);
        assert_eq!(layout.scribble_digits, 4);
    }

    #[test]
    fn pro_control_layout_has_8_tracks_and_8_digit_scribbles() {
        let layout = DeskLayout::for_device(DeviceType::ProControl);
        assert_eq!(layout.track_count, 8);
        assert_eq!(layout.scribble_digits, 8);
    }

    #[test]
    fn desk_always_provisions_the_virtual_jog_track() {
        let mapping = Arc::new(build_tree());
        let desk = Desk::new(DeviceType::ProControl, mapping);
        assert!(desk.track(JOG_VIRTUAL_TRACK).unwrap().jog.is_some());
        assert_eq!(desk.tracks.len(), 9);
    }
}
