use std::time::Duration;

use clap::Parser;

/// Ethernet control-surface to OSC bridge for Control|24 / Pro Control
/// consoles.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Network interface to capture/inject EtherType 0x885F frames on
    #[arg(long)]
    pub interface: String,

    /// Override the host MAC stamped on outbound frames (auto-detected
    /// from `--interface` otherwise)
    #[arg(long)]
    pub host_mac: Option<String>,

    /// OSC listen base address (session n binds listen-port + n - 1)
    #[arg(long, default_value = "0.0.0.0")]
    pub listen_host: String,

    /// OSC listen base port
    #[arg(long, default_value_t = 9000)]
    pub listen_port: u16,

    /// DAW OSC endpoint base address
    #[arg(long, default_value = "127.0.0.1")]
    pub daw_host: String,

    /// DAW OSC endpoint base port
    #[arg(long, default_value_t = 9100)]
    pub daw_port: u16,

    /// Stats logging interval in seconds (0 = disabled)
    #[arg(long, default_value_t = 5)]
    pub stats_interval_secs: u64,

    /// Shorthand for RUST_LOG=debug when the env var is unset
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Directory the caller-supplied log subscriber writes to; unused
    /// by the core, forwarded for CLI-surface compatibility
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Keep-alive send interval
    #[arg(long, default_value_t = 1)]
    pub keep_alive_loop_secs: u64,

    /// Idle threshold after which a keep-alive ONLINE frame is resent
    #[arg(long, default_value_t = 10)]
    pub keep_alive_secs: u64,

    /// Retry backoff after a send-gate miss
    #[arg(long, default_value_t = 300)]
    pub backoff_millis: u64,

    /// Delay before acknowledging a received data frame
    #[arg(long, default_value_t = 800)]
    pub ack_delay_micros: u64,
}

impl Config {
    pub fn listen_addr(&self, session_offset: u16) -> String {
        format!("{}:{}", self.listen_host, self.listen_port + session_offset)
    }

    pub fn daw_addr(&self, session_offset: u16) -> String {
        format!("{}:{}", self.daw_host, self.daw_port + session_offset)
    }

    pub fn keep_alive_loop(&self) -> Duration {
        Duration::from_secs(self.keep_alive_loop_secs)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_millis)
    }

    pub fn ack_delay(&self) -> Duration {
        Duration::from_micros(self.ack_delay_micros)
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
