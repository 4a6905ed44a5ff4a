//! Wires a [`ParsedEvent`] from the mapping tree to the right control
//! object on a [`Desk`], and turns whatever that control object
//! returns into the OSC message(s) bound for the DAW.
//!
//! Grounded on `control24osc.py`'s per-class `d_c` dispatch (the
//! original routes a parsed command to `getattr(track_or_desk,
//! handler).d_c(parsedcmd)` by string; here the same routing is a
//! `match` over [`HandlerTag`], resolved at compile time instead of by
//! name — see DESIGN.md).

use crate::desk::Desk;
use crate::mapping::{HandlerTag, ParsedEvent};
use crate::osc_worker::{OscValue, OutboundEvent};

fn track_osc_addr(track: Option<u8>, handler: &str, suffix: &str) -> String {
    match track {
        Some(t) => format!("/track/{}/{}{}", t as u16 + 1, handler, suffix),
        None => format!("/{handler}{suffix}"),
    }
}

/// Apply one parsed desk-to-computer event to `desk`, returning the
/// OSC event(s) it produces (empty if the event only updates local
/// state with nothing new for the DAW, e.g. a mode-button press that
/// just flips which cursor-key prefix is active).
pub fn desk_to_computer(desk: &mut Desk, event: &ParsedEvent) -> Vec<OutboundEvent> {
    let Some(tag) = event.handler_tag else {
        return Vec::new();
    };

    match tag {
        HandlerTag::Fader => {
            let Some(track_num) = event.track else { return Vec::new() };
            let Some(track) = desk.track_mut(track_num) else { return Vec::new() };
            let (gain, _bytes) = track.fader.d_c(event);
            gain.map(|g| vec![OutboundEvent {
                address: track_osc_addr(Some(track_num), "fader", ""),
                value: OscValue::Float(g as f32),
            }])
            .unwrap_or_default()
        }
        HandlerTag::Vpot => {
            let Some(track_num) = event.track else { return Vec::new() };
            let fine = desk.modifiers.command;
            let Some(track) = desk.track_mut(track_num) else { return Vec::new() };
            let (pan, _bytes) = track.vpot.d_c(event, fine);
            vec![OutboundEvent {
                address: track_osc_addr(Some(track_num), "vpot", ""),
                value: OscValue::Float(pan as f32),
            }]
        }
        HandlerTag::Jog => {
            let Some(track) = desk.track_mut(crate::track::JOG_VIRTUAL_TRACK) else {
                return Vec::new();
            };
            let Some(jog) = track.jog.as_mut() else { return Vec::new() };
            jog.d_c(event)
                .map(|out| {
                    let suffix = match out.mode {
                        crate::controls::jog::JogMode::Scrub => "/scrub",
                        crate::controls::jog::JogMode::Shuttle => "/shuttle",
                    };
                    vec![OutboundEvent {
                        address: format!("/jpot{suffix}"),
                        value: OscValue::Float(out.value as f32),
                    }]
                })
                .unwrap_or_default()
        }
        HandlerTag::AutoMode => {
            let Some(track_num) = event.track else { return Vec::new() };
            let is_press = event.value == Some(1.0);
            let Some(track) = desk.track_mut(track_num) else { return Vec::new() };
            track
                .automode
                .d_c(is_press)
                .map(|(off, on)| {
                    vec![
                        OutboundEvent {
                            address: track_osc_addr(Some(track_num), "automode", &format!("/{off}")),
                            value: OscValue::Bool(false),
                        },
                        OutboundEvent {
                            address: track_osc_addr(Some(track_num), "automode", &format!("/{on}")),
                            value: OscValue::Bool(true),
                        },
                    ]
                })
                .unwrap_or_default()
        }
        HandlerTag::Modifier => {
            let name = event.address.rsplit('/').next().unwrap_or("");
            let held = event.value == Some(1.0);
            desk.modifiers.d_c(name, held);
            Vec::new()
        }
        HandlerTag::Nav => {
            let name = event.address.rsplit('/').next().unwrap_or("");
            let is_press = event.value == Some(1.0);
            desk.nav.d_c(name, is_press).map(|addr| {
                vec![OutboundEvent {
                    address: addr,
                    value: OscValue::Bool(true),
                }]
            })
            .unwrap_or_default()
        }
        HandlerTag::Clock => {
            let is_press = event.value == Some(1.0);
            desk.clock
                .d_c(is_press)
                .map(|_| vec![OutboundEvent {
                    address: "/clock/mode".to_string(),
                    value: OscValue::Int(0),
                }])
                .unwrap_or_default()
        }
        HandlerTag::Button => {
            let (addr, track, value) = desk.button_led.d_c(event);
            value
                .map(|v| vec![OutboundEvent {
                    address: track_osc_addr(track, "button", &addr),
                    value: OscValue::Bool(v == 1.0),
                }])
                .unwrap_or_default()
        }
        HandlerTag::Vu | HandlerTag::Scribble => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DeviceType;
    use crate::mapping::build_tree;
    use std::sync::Arc;

    fn desk() -> Desk {
        Desk::new(DeviceType::Control24, Arc::new(build_tree()))
    }

    #[test]
    fn fader_move_emits_track_scoped_osc_event() {
        let mut d = desk();
        let tree = build_tree();
        let event = tree.parse(&[0xb0, 0x03, 0x00, 0x00, 0x64]).unwrap();
        let out = desk_to_computer(&mut d, &event);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, "/track/4/fader");
    }

    #[test]
    fn modifier_press_emits_nothing() {
        let mut d = desk();
        let event = ParsedEvent {
            address: "/button/command/utility_misc_meterselect_automationenable/Command".into(),
            handler_tag: Some(HandlerTag::Modifier),
            value: Some(1.0),
            ..Default::default()
        };
        let out = desk_to_computer(&mut d, &event);
        assert!(out.is_empty());
        assert!(d.modifiers.command);
    }
}
