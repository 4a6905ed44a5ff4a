mod command;
mod config;
mod controls;
mod desk;
mod dispatch;
mod error;
mod frame;
mod mac;
mod mapping;
mod modemgr;
mod network;
mod osc_worker;
mod session;
mod stats;
mod track;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use config::Config;
use frame::{DeviceType, Frame, FrameBuilder};
use mac::MacAddr;
use mapping::build_tree;
use network::{find_interface, open_channel, DatalinkInjector, NetworkHandle, RouteOutcome, RoutedFrame, SessionRouter};
use osc_worker::{run_inbound, run_outbound, OutboundEvent};
use session::{InboundFrame, Session, SessionTiming};
use stats::Stats;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter())),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();

    info!(
        interface = config.interface,
        listen = config.listen_addr(0),
        daw = config.daw_addr(0),
        "reabridge24 starting"
    );

    let interface = find_interface(&config.interface)?;
    let host_mac = match &config.host_mac {
        Some(raw) => parse_mac(raw)?,
        None => interface
            .mac
            .map(|m| MacAddr::new(m.octets()))
            .ok_or_else(|| anyhow::anyhow!("interface {} has no MAC address", config.interface))?,
    };
    let (tx, rx) = open_channel(&interface)?;
    let injector: Arc<dyn session::FrameInjector> = Arc::new(DatalinkInjector::new(tx));

    let mapping = Arc::new(build_tree());
    let stats = Stats::new();
    let handle = NetworkHandle::new();

    tokio::spawn(stats::stats_reporter(stats.clone(), config.stats_interval_secs));

    let (capture_tx, mut capture_rx) = mpsc::channel::<RoutedFrame>(1024);
    std::thread::spawn(move || {
        network::run_capture_loop(rx, host_mac, capture_tx);
    });

    let mut router = SessionRouter::new();
    let mut next_session_id: u32 = 1;
    let mut session_closers: Vec<Arc<std::sync::atomic::AtomicBool>> = Vec::new();

    let mut signals = signal_stream()?;

    loop {
        tokio::select! {
            maybe_frame = capture_rx.recv() => {
                let Some(routed) = maybe_frame else {
                    warn!("capture channel closed, shutting down");
                    break;
                };
                match router.route(routed).await {
                    RouteOutcome::Routed => {}
                    RouteOutcome::Dropped => {}
                    RouteOutcome::NewSession(frame) => {
                        match spawn_session(
                            next_session_id,
                            &frame,
                            host_mac,
                            mapping.clone(),
                            &config,
                            injector.clone(),
                            stats.clone(),
                            &mut router,
                        ) {
                            Ok(closer) => {
                                session_closers.push(closer);
                                next_session_id += 1;
                            }
                            Err(err) => error!(error = %err, "failed to start session"),
                        }
                    }
                }
            }
            _ = signals.recv() => {
                info!("shutdown signal received");
                handle.request_shutdown();
                for closer in &session_closers {
                    closer.store(true, Ordering::Relaxed);
                }
                break;
            }
        }
    }

    info!("reabridge24 exiting");
    Ok(())
}

fn parse_mac(raw: &str) -> anyhow::Result<MacAddr> {
    let mut bytes = [0u8; 6];
    for (i, part) in raw.split(':').enumerate() {
        if i >= 6 {
            anyhow::bail!("MAC address has too many octets: {raw}");
        }
        bytes[i] = u8::from_str_radix(part, 16)?;
    }
    Ok(MacAddr::new(bytes))
}

fn device_type_from_beacon(frame: &RoutedFrame) -> anyhow::Result<DeviceType> {
    let decoded = Frame::decode(&frame.raw)?;
    let beacon = decoded.beacon()?;
    beacon
        .device_type
        .ok_or_else(|| anyhow::anyhow!("unrecognised device type: {}", beacon.device_type_raw))
}

#[allow(clippy::too_many_arguments)]
fn spawn_session(
    session_id: u32,
    beacon_frame: &RoutedFrame,
    host_mac: MacAddr,
    mapping: Arc<mapping::MappingTree>,
    config: &Config,
    injector: Arc<dyn session::FrameInjector>,
    stats: Arc<Stats>,
    router: &mut SessionRouter,
) -> anyhow::Result<Arc<std::sync::atomic::AtomicBool>> {
    let device_type = device_type_from_beacon(beacon_frame)?;
    let peer_mac = beacon_frame.src;

    let timing = SessionTiming {
        keep_alive_loop: config.keep_alive_loop(),
        keep_alive_timeout: config.keep_alive_timeout(),
        backoff: config.backoff(),
        ack_delay: config.ack_delay(),
    };
    let frame_builder = FrameBuilder::new(host_mac);

    let session = Session::new(
        session_id,
        peer_mac,
        device_type,
        mapping,
        timing,
        frame_builder,
        injector,
        stats.clone(),
    );
    let closing = session.closing_flag();
    let session = Arc::new(Mutex::new(session));

    {
        let mut guard = session
            .try_lock()
            .expect("session mutex uncontended immediately after creation");
        guard.initialize()?;
    }

    let (frame_tx, mut frame_rx) = mpsc::channel::<RoutedFrame>(256);
    router.register(peer_mac, frame_tx);

    session::spawn_keep_alive(session.clone(), timing, closing.clone());

    let offset = (session_id - 1) as u16;
    let listen_addr = config.listen_addr(offset).parse()?;
    let daw_addr = config.daw_addr(offset).parse()?;

    let (to_daw_tx, to_daw_rx) = mpsc::channel::<OutboundEvent>(512);
    let (from_daw_tx, mut from_daw_rx) = mpsc::channel(512);

    tokio::spawn(run_inbound(listen_addr, from_daw_tx, stats.clone()));
    tokio::spawn(run_outbound(daw_addr, to_daw_rx, stats.clone()));

    let session_for_frames = session.clone();
    let to_daw_tx_frames = to_daw_tx.clone();
    let closing_frames = closing.clone();
    tokio::spawn(async move {
        while let Some(routed) = frame_rx.recv().await {
            if closing_frames.load(Ordering::Relaxed) {
                break;
            }
            let Ok(decoded) = Frame::decode(&routed.raw) else { continue };
            let inbound = InboundFrame {
                num_commands: decoded.header.num_commands,
                retry: decoded.header.retry,
                peer_send_counter: decoded.header.send_counter,
                command: decoded.header.command,
                payload: decoded.payload.to_vec(),
            };

            let (commands, ack_due) = {
                let mut guard = session_for_frames.lock().await;
                guard.handle_inbound(inbound)
            };

            for cmd in commands {
                let parsed = {
                    let guard = session_for_frames.lock().await;
                    guard.desk.mapping.parse(&cmd)
                };
                let Ok(event) = parsed else { continue };
                let outbound = {
                    let mut guard = session_for_frames.lock().await;
                    dispatch::desk_to_computer(&mut guard.desk, &event)
                };
                for ev in outbound {
                    let _ = to_daw_tx_frames.send(ev).await;
                }
            }

            if ack_due {
                tokio::time::sleep(timing.ack_delay).await;
                let mut guard = session_for_frames.lock().await;
                if let Err(err) = guard.send_ack() {
                    warn!(error = %err, "ack send failed");
                }
            }
        }
    });

    let session_for_daw = session.clone();
    tokio::spawn(async move {
        while let Some(target) = from_daw_rx.recv().await {
            let mut guard = session_for_daw.lock().await;
            apply_daw_target(&mut guard, target);
        }
    });

    Ok(closing)
}

/// Apply a routed DAW→device OSC target, per the §4.7 inbound table:
/// per-track `fader`/`vpot`/`vu`/`automode`/`procscribstrip`/`reabuttonled`,
/// and the desk-level `clock` branch. `reanav` and `jpot` have no
/// computer-to-desk entry point in the original — the nav and jog
/// wheel only ever originate events, they never accept one — so those
/// two desk-level addresses are intentionally not wired here.
fn apply_daw_target(session: &mut Session, target: osc_worker::InboundTarget) {
    let cmdbytes: Option<Vec<u8>> = match (target.track, target.handler.as_str()) {
        // The track-scoped button index is keyed with a literal `@`
        // placeholder for the track number (see build_led_index), so
        // this is resolved against desk.button_led, not a Track field.
        (Some(track_num), "reabuttonled") => {
            let addr = format!("/button/track/@/{}", target.remainder);
            session
                .desk
                .button_led
                .c_d(&addr, Some(track_num as u8), target.value)
                .map(|b| b.to_vec())
        }
        (Some(track_num), handler) => {
            let Some(track) = session.desk.track_mut(track_num as u8) else {
                return;
            };
            match handler {
                "fader" => Some(track.fader.c_d(target.value).to_vec()),
                "vpot" => Some(track.vpot.c_d(target.value).to_vec()),
                "vu" => {
                    let speaker = if target.remainder == "R" { 1 } else { 0 };
                    track.vu.c_d(speaker, target.value).map(|b| b.to_vec())
                }
                "automode" => track.automode.c_d(&target.remainder).map(|b| b.to_vec()),
                "procscribstrip" => match target.remainder.as_str() {
                    "name" => target
                        .text
                        .as_deref()
                        .and_then(|text| track.scribble.set_name(text)),
                    _ => target
                        .text
                        .as_deref()
                        .map(|text| track.scribble.show_value(std::time::Instant::now(), text)),
                },
                _ => None,
            }
        }
        // Desk-level: `clock` is the only desk-wide control with a
        // computer-to-desk entry point. `reanav`/`jpot` only ever
        // originate events (see nav.rs/jog.rs), so they're not wired.
        (None, "clock") => {
            let text = target.text.clone().unwrap_or_default();
            session
                .desk
                .clock
                .c_d(&target.remainder, text)
                .map(|b| b.to_vec())
        }
        (None, "button") => {
            let addr = format!("/button/{}", target.remainder);
            session
                .desk
                .button_led
                .c_d(&addr, None, target.value)
                .map(|b| b.to_vec())
        }
        _ => None,
    };
    if let Some(bytes) = cmdbytes {
        if let Err(err) = session.send_commands(&bytes, 1) {
            warn!(error = %err, "computer-to-desk send failed");
        }
    }
}

fn signal_stream() -> anyhow::Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(4);
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        for kind in [SignalKind::interrupt(), SignalKind::terminate(), SignalKind::hangup()] {
            let tx = tx.clone();
            let mut sig = signal(kind)?;
            tokio::spawn(async move {
                if sig.recv().await.is_some() {
                    let _ = tx.send(()).await;
                }
            });
        }
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = tx.send(()).await;
        });
    }
    Ok(rx)
}
