//! Per-session OSC translator: one UDP listener for DAW→device
//! messages, one UDP sender for device→DAW messages.
//!
//! Grounded on `control24osc.py`'s dispatch loop for the address
//! convention, and on the teacher's `transport_mqtt.rs` /
//! `mqtt_publisher.rs` split of one task per I/O direction (SPEC_FULL.md
//! §4.7), adapted from an MQTT event loop to `rosc` + `tokio::net::UdpSocket`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rosc::{OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::stats::Stats;

/// A DAW-bound outbound OSC event a control object produced.
pub struct OutboundEvent {
    pub address: String,
    pub value: OscValue,
}

/// The handful of primitive value shapes control objects emit.
pub enum OscValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl OutboundEvent {
    fn into_message(self) -> OscMessage {
        let arg = match self.value {
            OscValue::Float(f) => OscType::Float(f),
            OscValue::Int(i) => OscType::Int(i),
            OscValue::Bool(b) => OscType::Bool(b),
        };
        OscMessage {
            addr: self.address,
            args: vec![arg],
        }
    }
}

/// A DAW→device message, already address-routed into a track/handler
/// pair (see [`route_inbound`]).
#[derive(Debug, Clone)]
pub struct InboundTarget {
    pub track: Option<u32>,
    pub handler: String,
    pub remainder: String,
    pub value: f64,
    /// The first OSC string argument, when the message carried one
    /// (scribble and clock text updates ride on this instead of `value`).
    pub text: Option<String>,
}

/// Split an inbound OSC address per SPEC_FULL.md §4.7: if the path
/// contains a `track` token, the next component is a 1-based track
/// index and the component after that is the handler tag (or the
/// literal `reabuttonled` when the path names a button). Otherwise,
/// the first path token names a desk-level attribute directly
/// (e.g. `/clock/time` → handler `clock`, remainder `time`).
pub fn route_inbound(address: &str, value: f64, text: Option<String>) -> Option<InboundTarget> {
    let parts: Vec<&str> = address.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return None;
    }

    if let Some(track_pos) = parts.iter().position(|p| *p == "track") {
        let index: u32 = parts.get(track_pos + 1)?.parse().ok()?;
        let handler = if parts.iter().any(|p| *p == "button") {
            "reabuttonled".to_string()
        } else {
            parts.get(track_pos + 2)?.to_string()
        };
        let remainder = parts[(track_pos + 3).min(parts.len())..].join("/");
        Some(InboundTarget {
            track: Some(index),
            handler,
            remainder,
            value,
            text,
        })
    } else {
        let handler = parts.first()?.to_string();
        let remainder = parts[1.min(parts.len())..].join("/");
        Some(InboundTarget {
            track: None,
            handler,
            remainder,
            value,
            text,
        })
    }
}

const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Drive inbound DAW→device traffic: receive OSC packets, route them,
/// and forward the resolved target onto `to_device`. Reconnects the
/// listening socket on error with a 1s cadence, per SPEC_FULL.md §4.7.
pub async fn run_inbound(
    listen_addr: SocketAddr,
    to_device: mpsc::Sender<InboundTarget>,
    stats: Arc<Stats>,
) {
    loop {
        let socket = match UdpSocket::bind(listen_addr).await {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, %listen_addr, "osc listen bind failed, retrying");
                tokio::time::sleep(RECONNECT_INTERVAL).await;
                continue;
            }
        };
        info!(%listen_addr, "osc worker listening");

        let mut buf = [0u8; 1536];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, _peer)) => match rosc::decoder::decode_udp(&buf[..len]) {
                    Ok((_, OscPacket::Message(msg))) => {
                        stats.record_osc_received();
                        let value = extract_value(&msg);
                        let text = extract_text(&msg);
                        if let Some(target) = route_inbound(&msg.addr, value, text) {
                            if to_device.send(target).await.is_err() {
                                debug!("device channel closed, osc worker exiting");
                                return;
                            }
                        }
                    }
                    Ok((_, OscPacket::Bundle(_))) => {
                        debug!("osc bundles not routed, dropped");
                    }
                    Err(err) => {
                        warn!(error = ?err, "osc decode failed");
                        stats.record_osc_error();
                    }
                },
                Err(err) => {
                    warn!(error = %err, "osc recv failed, reconnecting");
                    stats.record_osc_error();
                    break;
                }
            }
        }
        tokio::time::sleep(RECONNECT_INTERVAL).await;
    }
}

fn extract_value(msg: &OscMessage) -> f64 {
    match msg.args.first() {
        Some(OscType::Float(f)) => *f as f64,
        Some(OscType::Int(i)) => *i as f64,
        Some(OscType::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Pull the first OSC string argument out of a message, if it carried
/// one (scribble/clock text updates send a string, not a number).
fn extract_text(msg: &OscMessage) -> Option<String> {
    msg.args.first().and_then(|arg| match arg {
        OscType::String(s) => Some(s.clone()),
        _ => None,
    })
}

/// Drive outbound device→DAW traffic: serialize each [`OutboundEvent`]
/// and send it to the DAW endpoint. Reconnects on send error with the
/// same 1s cadence as the inbound side.
pub async fn run_outbound(
    daw_addr: SocketAddr,
    mut from_device: mpsc::Receiver<OutboundEvent>,
    stats: Arc<Stats>,
) {
    let mut socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "osc outbound socket bind failed");
            return;
        }
    };

    while let Some(event) = from_device.recv().await {
        let packet = OscPacket::Message(event.into_message());
        let encoded = match rosc::encoder::encode(&packet) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = ?err, "osc encode failed");
                stats.record_osc_error();
                continue;
            }
        };

        loop {
            match socket.send_to(&encoded, daw_addr).await {
                Ok(_) => {
                    stats.record_osc_sent();
                    break;
                }
                Err(err) => {
                    warn!(error = %err, %daw_addr, "osc send failed, reconnecting");
                    stats.record_osc_error();
                    tokio::time::sleep(RECONNECT_INTERVAL).await;
                    socket = match UdpSocket::bind("0.0.0.0:0").await {
                        Ok(s) => s,
                        Err(_) => continue,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_track_scoped_fader_address() {
        let target = route_inbound("/track/6/fader", 0.75, None).unwrap();
        assert_eq!(target.track, Some(6));
        assert_eq!(target.handler, "fader");
        assert_eq!(target.value, 0.75);
    }

    #[test]
    fn routes_track_scoped_button_to_reabuttonled() {
        let target = route_inbound("/track/3/button/Mute", 1.0, None).unwrap();
        assert_eq!(target.handler, "reabuttonled");
        assert_eq!(target.remainder, "Mute");
    }

    #[test]
    fn routes_desk_level_attribute() {
        let target = route_inbound("/clock/time", 0.0, None).unwrap();
        assert_eq!(target.track, None);
        assert_eq!(target.handler, "clock");
        assert_eq!(target.remainder, "time");
    }

    #[test]
    fn routes_track_scoped_scribble_with_text() {
        let target = route_inbound(
            "/track/3/procscribstrip/volume",
            0.0,
            Some("-6.2dB".to_string()),
        )
        .unwrap();
        assert_eq!(target.track, Some(3));
        assert_eq!(target.handler, "procscribstrip");
        assert_eq!(target.remainder, "volume");
        assert_eq!(target.text.as_deref(), Some("-6.2dB"));
    }

    #[test]
    fn malformed_address_without_index_is_rejected() {
        assert!(route_inbound("/track/notanumber/fader", 1.0, None).is_none());
    }
}
