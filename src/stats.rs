use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::time::{ Duration, Instant };

use tracing::info;

/// Lock-free performance counters, shared across every session and the
/// network handler.
#[derive(Debug)]
pub struct Stats {
    pub frames_received: AtomicU64,
    pub frames_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub commands_parsed: AtomicU64,
    pub commands_dropped: AtomicU64,
    pub osc_messages_sent: AtomicU64,
    pub osc_messages_received: AtomicU64,
    pub osc_send_errors: AtomicU64,
    pub retries: AtomicU64,
    pub sessions_opened: AtomicU64,
    pub sessions_closed: AtomicU64,
}

impl Stats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            commands_parsed: AtomicU64::new(0),
            commands_dropped: AtomicU64::new(0),
            osc_messages_sent: AtomicU64::new(0),
            osc_messages_received: AtomicU64::new(0),
            osc_send_errors: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
        })
    }

    #[inline(always)]
    pub fn record_frame_recv(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_command_parsed(&self) {
        self.commands_parsed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_command_dropped(&self) {
        self.commands_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_osc_sent(&self) {
        self.osc_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_osc_received(&self) {
        self.osc_messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_osc_error(&self) {
        self.osc_send_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot and reset counters, return rates over the elapsed window.
    pub fn snapshot_and_reset(&self, elapsed: Duration) -> StatsSnapshot {
        let secs = elapsed.as_secs_f64().max(0.001);

        let frames_in = self.frames_received.swap(0, Ordering::Relaxed);
        let frames_out = self.frames_sent.swap(0, Ordering::Relaxed);
        let bytes_in = self.bytes_received.swap(0, Ordering::Relaxed);
        let parsed = self.commands_parsed.swap(0, Ordering::Relaxed);
        let dropped = self.commands_dropped.swap(0, Ordering::Relaxed);
        let osc_out = self.osc_messages_sent.swap(0, Ordering::Relaxed);
        let osc_in = self.osc_messages_received.swap(0, Ordering::Relaxed);
        let osc_err = self.osc_send_errors.swap(0, Ordering::Relaxed);
        let retries = self.retries.swap(0, Ordering::Relaxed);

        StatsSnapshot {
            frames_in_per_sec: (frames_in as f64) / secs,
            frames_out_per_sec: (frames_out as f64) / secs,
            mbps_in: ((bytes_in as f64) * 8.0) / (secs * 1_000_000.0),
            commands_parsed: parsed,
            commands_dropped: dropped,
            osc_out,
            osc_in,
            osc_errors: osc_err,
            retries,
            sessions_open: self.sessions_opened.load(Ordering::Relaxed)
                - self.sessions_closed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct StatsSnapshot {
    pub frames_in_per_sec: f64,
    pub frames_out_per_sec: f64,
    pub mbps_in: f64,
    pub commands_parsed: u64,
    pub commands_dropped: u64,
    pub osc_out: u64,
    pub osc_in: u64,
    pub osc_errors: u64,
    pub retries: u64,
    pub sessions_open: u64,
}

/// Background stats reporter task.
pub async fn stats_reporter(stats: Arc<Stats>, interval_secs: u64) {
    if interval_secs == 0 {
        std::future::pending::<()>().await;
        return;
    }

    let interval = Duration::from_secs(interval_secs);
    let mut last = Instant::now();

    loop {
        tokio::time::sleep(interval).await;
        let now = Instant::now();
        let elapsed = now - last;
        last = now;

        let snap = stats.snapshot_and_reset(elapsed);
        info!(
            frames_in_per_sec = %format!("{:.0}", snap.frames_in_per_sec),
            frames_out_per_sec = %format!("{:.0}", snap.frames_out_per_sec),
            mbps_in = %format!("{:.2}", snap.mbps_in),
            commands_parsed = snap.commands_parsed,
            commands_dropped = snap.commands_dropped,
            osc_out = snap.osc_out,
            osc_in = snap.osc_in,
            osc_errors = snap.osc_errors,
            retries = snap.retries,
            sessions_open = snap.sessions_open,
            "stats"
        );
    }
}
