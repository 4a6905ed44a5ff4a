//! Per-device session: counters, retry/backoff, keep-alive, ACK and
//! the init handshake, wiring one console's inbound/outbound frames
//! through to its own [`crate::desk::Desk`] and OSC worker.
//!
//! Grounded on `ReaDevice`/`ReaComm` (original_source/ReaCommon.py,
//! ReaControl.py) for the counter/gate/backoff state machine and
//! timing constants, concretized into explicit tasks + channels per
//! SPEC_FULL.md §4.5/§5 instead of the original's thread-per-device
//! model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::command::split_commands;
use crate::desk::Desk;
use crate::frame::{DeviceType, Frame, FrameBuilder};
use crate::mac::MacAddr;
use crate::mapping::MappingTree;
use crate::stats::Stats;

/// Anything that can push a raw ethernet frame onto the wire. Lets
/// `Session` stay agnostic of the concrete `pnet_datalink` sender type
/// used by `network.rs`, and gives tests a trivial fake.
pub trait FrameInjector: Send + Sync {
    fn send_frame(&self, frame: &[u8]) -> std::io::Result<usize>;
}

/// Timing knobs a session needs; mirrors the subset of [`crate::config::Config`]
/// relevant to the session loop, passed in by value so sessions don't
/// hold a borrow of the shared config.
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    pub keep_alive_loop: Duration,
    pub keep_alive_timeout: Duration,
    pub backoff: Duration,
    pub ack_delay: Duration,
}

/// One console's session state. Owned exclusively by its `run` task;
/// the network handler only ever hands it frames over a channel.
pub struct Session {
    pub session_id: u32,
    pub peer_mac: MacAddr,
    pub device_type: DeviceType,
    pub is_supported: bool,
    pub desk: Desk,

    send_counter: u32,
    cmd_counter: u32,
    send_gate: bool,
    backoff_deadline: Option<Instant>,
    last_sent_at: Instant,
    closing: Arc<AtomicBool>,

    timing: SessionTiming,
    frame_builder: FrameBuilder,
    injector: Arc<dyn FrameInjector>,
    stats: Arc<Stats>,
}

/// A frame the network handler has routed to this session (already
/// known to be addressed here; header not yet interpreted).
pub struct InboundFrame {
    pub num_commands: u8,
    pub retry: u16,
    pub peer_send_counter: u32,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Session {
    pub fn new(
        session_id: u32,
        peer_mac: MacAddr,
        device_type: DeviceType,
        mapping: Arc<MappingTree>,
        timing: SessionTiming,
        frame_builder: FrameBuilder,
        injector: Arc<dyn FrameInjector>,
        stats: Arc<Stats>,
    ) -> Self {
        let is_supported = matches!(device_type, DeviceType::Control24 | DeviceType::ProControl);
        Session {
            session_id,
            peer_mac,
            device_type,
            is_supported,
            desk: Desk::new(device_type, mapping),
            send_counter: 1,
            cmd_counter: 0,
            send_gate: true,
            backoff_deadline: None,
            last_sent_at: Instant::now(),
            closing: Arc::new(AtomicBool::new(false)),
            timing,
            frame_builder,
            injector,
            stats,
        }
    }

    pub fn closing_flag(&self) -> Arc<AtomicBool> {
        self.closing.clone()
    }

    /// Send the ONLINE frame plus the clock-clear sysex, per the
    /// init sequence (SPEC_FULL.md §4.5).
    pub fn initialize(&mut self) -> std::io::Result<()> {
        info!(session = self.session_id, peer = %self.peer_mac, device = ?self.device_type, "session init");
        // ONLINE carries zero commands, so it is stamped with the
        // counter's starting value rather than advancing it.
        let online = self.frame_builder.build_online(self.peer_mac, self.send_counter);
        self.injector.send_frame(&online)?;

        const CLOCK_CLEAR: [u8; 14] = [
            0xf0, 0x13, 0x01, 0x30, 0x19, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf7,
        ];
        self.send_commands(&CLOCK_CLEAR, 1)?;
        self.stats.record_session_opened();
        Ok(())
    }

    /// Send path: wait for the send-gate (the caller drives the poll
    /// loop via [`Session::send_gate_ready`]), then build and transmit
    /// a data frame carrying `ncmds` packed commands.
    pub fn send_commands(&mut self, payload: &[u8], ncmds: u8) -> std::io::Result<()> {
        self.send_counter = self.send_counter.wrapping_add(ncmds as u32);
        let frame = self.frame_builder.build_data(
            self.peer_mac,
            self.send_counter,
            self.cmd_counter,
            ncmds,
            payload,
        );
        self.injector.send_frame(&frame)?;
        self.last_sent_at = Instant::now();
        self.stats.record_frame_sent();
        Ok(())
    }

    /// `true` once the send-gate is open and any backoff has expired.
    pub fn send_gate_ready(&mut self) -> bool {
        if let Some(deadline) = self.backoff_deadline {
            if Instant::now() >= deadline {
                self.backoff_deadline = None;
                self.send_gate = true;
            }
        }
        self.send_gate
    }

    /// Receive path (SPEC_FULL.md §4.5). Returns the command payloads
    /// to hand to the OSC worker, and whether an ACK should now be sent
    /// (after `ack_delay`).
    pub fn handle_inbound(&mut self, frame: InboundFrame) -> (Vec<Vec<u8>>, bool) {
        const CMD_ACK: u8 = 0xa0;

        if frame.command == CMD_ACK {
            if self.backoff_deadline.is_none() {
                self.send_gate = true;
            }
            return (Vec::new(), false);
        }

        if frame.num_commands > 0 {
            self.send_gate = false;
            if frame.retry != 0 {
                warn!(session = self.session_id, "retry requested, backing off");
                self.backoff_deadline = Some(Instant::now() + self.timing.backoff);
                self.stats.record_retry();
            }
            self.cmd_counter = frame.peer_send_counter;
            let commands: Vec<Vec<u8>> = split_commands(&frame.payload)
                .into_iter()
                .map(|c| c.to_vec())
                .collect();
            self.stats.record_frame_recv(frame.payload.len());
            (commands, true)
        } else {
            debug!(session = self.session_id, "unknown zero-command frame dropped");
            (Vec::new(), false)
        }
    }

    /// Build the ACK frame to send after `ack_delay` has elapsed,
    /// echoing the peer's accepted send_counter as our cmd_counter.
    /// `send_counter` carries the cumulative count of commands sent,
    /// not frames — an ACK carries zero commands, so it does not
    /// advance it (`_prepare_ackt` in the original only bumps
    /// `sendcounter` for non-ACK frames).
    pub fn build_ack(&mut self) -> Vec<u8> {
        self.frame_builder
            .build_ack(self.peer_mac, self.send_counter, self.cmd_counter)
    }

    /// Build and actually transmit the ACK frame.
    pub fn send_ack(&mut self) -> std::io::Result<()> {
        let ack = self.build_ack();
        self.injector.send_frame(&ack)?;
        self.last_sent_at = Instant::now();
        self.stats.record_frame_sent();
        Ok(())
    }

    /// Keep-alive: called once per `keep_alive_loop` tick. Sends a
    /// single empty-command frame if idle for `keep_alive_timeout`.
    pub fn maybe_keep_alive(&mut self) -> std::io::Result<bool> {
        if self.last_sent_at.elapsed() >= self.timing.keep_alive_timeout {
            self.send_commands(&[], 1)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Poll every track's scribble strip restore timer. Driven from
    /// the same keep-alive tick that already owns this session's event
    /// loop, so a value flashed via `procscribstrip` falls back to the
    /// stored name without a dedicated per-strip timer task.
    pub fn drive_scribble_restores(&mut self) -> std::io::Result<()> {
        let now = Instant::now();
        let mut pending = Vec::new();
        for track in self.desk.tracks.values_mut() {
            if let Some(bytes) = track.scribble.tick(now) {
                pending.push(bytes);
            }
        }
        for bytes in pending {
            self.send_commands(&bytes, 1)?;
        }
        Ok(())
    }
}

/// Spawn the keep-alive ticker for a session, driven purely by the
/// shared closing flag and a tokio interval — the session's mutable
/// state lives behind a tokio Mutex since both this task and the main
/// receive loop touch `last_sent_at`/counters.
pub fn spawn_keep_alive(
    session: Arc<Mutex<Session>>,
    timing: SessionTiming,
    closing: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(timing.keep_alive_loop);
        loop {
            ticker.tick().await;
            if closing.load(Ordering::Relaxed) {
                break;
            }
            let mut guard = session.lock().await;
            if let Err(err) = guard.maybe_keep_alive() {
                warn!(error = %err, "keep-alive send failed");
            }
            if let Err(err) = guard.drive_scribble_restores() {
                warn!(error = %err, "scribble restore send failed");
            }
        }
    })
}

/// Channel pair a session exchanges with its OSC worker: command
/// payloads flowing to the desk-side mapping/dispatch, and raw
/// computer-to-desk command bytes flowing back out to the NIC.
pub struct SessionChannels {
    pub inbound_tx: mpsc::Sender<InboundFrame>,
    pub to_osc_tx: mpsc::Sender<Vec<u8>>,
    pub from_osc_rx: mpsc::Receiver<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::build_tree;
    use std::sync::Mutex as StdMutex;

    struct FakeInjector {
        sent: StdMutex<Vec<Vec<u8>>>,
    }

    impl FrameInjector for FakeInjector {
        fn send_frame(&self, frame: &[u8]) -> std::io::Result<usize> {
            self.sent.lock().unwrap().push(frame.to_vec());
            Ok(frame.len())
        }
    }

    fn test_timing() -> SessionTiming {
        SessionTiming {
            keep_alive_loop: Duration::from_millis(10),
            keep_alive_timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(10),
            ack_delay: Duration::from_micros(1),
        }
    }

    fn new_session(injector: Arc<FakeInjector>) -> Session {
        let mapping = Arc::new(build_tree());
        let stats = Stats::new();
        let builder = FrameBuilder::new(MacAddr::new([1, 2, 3, 4, 5, 6]));
        Session::new(
            1,
            MacAddr::new([0x00, 0xa0, 0x7e, 1, 2, 3]),
            DeviceType::Control24,
            mapping,
            test_timing(),
            builder,
            injector,
            stats,
        )
    }

    #[test]
    fn ack_reopens_gate_when_not_backing_off() {
        let injector = Arc::new(FakeInjector { sent: StdMutex::new(Vec::new()) });
        let mut session = new_session(injector);
        session.send_gate = false;
        let (commands, ack_due) = session.handle_inbound(InboundFrame {
            num_commands: 0,
            retry: 0,
            peer_send_counter: 0,
            command: 0xa0,
            payload: Vec::new(),
        });
        assert!(commands.is_empty());
        assert!(!ack_due);
        assert!(session.send_gate);
    }

    #[test]
    fn data_frame_closes_gate_and_splits_commands() {
        let injector = Arc::new(FakeInjector { sent: StdMutex::new(Vec::new()) });
        let mut session = new_session(injector);
        let (commands, ack_due) = session.handle_inbound(InboundFrame {
            num_commands: 2,
            retry: 0,
            peer_send_counter: 9,
            command: 0,
            payload: vec![0x90, 0x03, 0x40, 0xb0, 0x05, 0x00, 0x10],
        });
        assert!(!session.send_gate);
        assert!(ack_due);
        assert_eq!(commands.len(), 2);
        assert_eq!(session.cmd_counter, 9);
    }

    #[test]
    fn retry_arms_backoff_deadline() {
        let injector = Arc::new(FakeInjector { sent: StdMutex::new(Vec::new()) });
        let mut session = new_session(injector);
        session.handle_inbound(InboundFrame {
            num_commands: 1,
            retry: 1,
            peer_send_counter: 1,
            command: 0,
            payload: vec![0x90, 0x01, 0x40],
        });
        assert!(!session.send_gate_ready());
    }

    #[test]
    fn initialize_sends_online_then_clock_clear() {
        let injector = Arc::new(FakeInjector { sent: StdMutex::new(Vec::new()) });
        let mut session = new_session(injector.clone());
        session.initialize().unwrap();
        let sent = injector.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        let first = Frame::decode(&sent[0]).unwrap();
        assert!(first.is_online());
    }

    #[test]
    fn keep_alive_fires_only_after_idle_timeout() {
        let injector = Arc::new(FakeInjector { sent: StdMutex::new(Vec::new()) });
        let mut session = new_session(injector.clone());
        assert!(!session.maybe_keep_alive().unwrap());
        std::thread::sleep(Duration::from_millis(60));
        assert!(session.maybe_keep_alive().unwrap());
    }
}
