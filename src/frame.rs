//! EtherType-0x885F frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬────────────┬──────────┬──────────────┬─────────────┐
//! │ dst mac(6) │ src mac(6) │ type(2)  │ device hdr(14) │ payload(N) │
//! └────────────┴────────────┴──────────┴──────────────┴─────────────┘
//! ```
//! Device header (big-endian, 16 bytes):
//! ```text
//! total_bytes(2) reserved(2) send_counter(4) cmd_counter(4) retry(2) command(1) num_commands(1)
//! ```
//! `total_bytes` always equals `payload_len + 16` — the header counts
//! its own 16 bytes plus the trailing payload. Ethernet header (14) +
//! device header (16) = 30, which is exactly the minimum frame length
//! accepted by the decoder (a zero-payload frame, e.g. an ACK).
//!
//! A frame is a beacon iff the destination MAC is all-ones. Beacon
//! payloads carry no device header semantics beyond the fixed version
//! and device-type strings at offsets 15 and 24.

use crate::error::FrameError;
use crate::mac::MacAddr;

/// EtherType used by the console protocol.
pub const ETHER_TYPE: u16 = 0x885f;

/// Ethernet header length (2×6 MAC + 2 type).
pub const ETH_HEADER_LEN: usize = 14;
/// Device header length (follows the ethernet header).
pub const DEVICE_HEADER_LEN: usize = 16;
/// Minimum total frame length accepted by the decoder.
pub const MIN_FRAME_LEN: usize = 30;

/// `command` byte value: acknowledgement frame.
pub const CMD_ACK: u8 = 0xa0;
/// `command` byte value: device coming online.
pub const CMD_ONLINE: u8 = 0xe2;
/// `command` byte value: ordinary data frame.
pub const CMD_DATA: u8 = 0x00;

/// Beacon payload length: 15 reserved + 9 version + 9 device-type.
pub const BEACON_PAYLOAD_LEN: usize = 33;

/// A decoded device header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHeader {
    pub total_bytes: u16,
    pub send_counter: u32,
    pub cmd_counter: u32,
    pub retry: u16,
    pub command: u8,
    pub num_commands: u8,
}

impl DeviceHeader {
    fn decode(buf: &[u8]) -> Self {
        DeviceHeader {
            total_bytes: u16::from_be_bytes([buf[0], buf[1]]),
            // buf[2..4] reserved
            send_counter: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            cmd_counter: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            retry: u16::from_be_bytes([buf[12], buf[13]]),
            command: buf[14],
            num_commands: buf[15],
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.total_bytes.to_be_bytes());
        out.extend_from_slice(&[0u8, 0u8]); // reserved
        out.extend_from_slice(&self.send_counter.to_be_bytes());
        out.extend_from_slice(&self.cmd_counter.to_be_bytes());
        out.extend_from_slice(&self.retry.to_be_bytes());
        out.push(self.command);
        out.push(self.num_commands);
    }
}

/// Beacon device-type string, as carried at payload offset 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Control24,
    ProControl,
}

impl DeviceType {
    fn from_str_field(s: &str) -> Option<Self> {
        match s.trim_end_matches('\0') {
            "CNTRL|24" => Some(DeviceType::Control24),
            "MAINUNIT" => Some(DeviceType::ProControl),
            _ => None,
        }
    }
}

/// A parsed beacon payload (only meaningful when the frame's destination
/// MAC is broadcast).
#[derive(Debug, Clone)]
pub struct Beacon {
    pub version: String,
    pub device_type_raw: String,
    pub device_type: Option<DeviceType>,
}

impl Beacon {
    fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < BEACON_PAYLOAD_LEN {
            return Err(FrameError::BeaconTooShort(payload.len()));
        }
        let version = String::from_utf8_lossy(&payload[15..24])
            .trim_end_matches('\0')
            .to_string();
        let device_type_raw = String::from_utf8_lossy(&payload[24..33])
            .trim_end_matches('\0')
            .to_string();
        let device_type = DeviceType::from_str_field(&device_type_raw);
        Ok(Beacon {
            version,
            device_type_raw,
            device_type,
        })
    }
}

/// A decoded frame. `payload` is a zero-copy view into the original
/// buffer handed to [`Frame::decode`].
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub header: DeviceHeader,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Decode a raw ethernet frame. Rejects buffers shorter than
    /// [`MIN_FRAME_LEN`] or whose EtherType does not match
    /// [`ETHER_TYPE`].
    pub fn decode(buf: &'a [u8]) -> Result<Self, FrameError> {
        if buf.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort(buf.len()));
        }

        let dst = MacAddr::from_slice(&buf[0..6]).expect("checked length");
        let src = MacAddr::from_slice(&buf[6..12]).expect("checked length");
        // buf[12..14] is the ethertype; callers are expected to have
        // filtered on it already (network handler applies the BPF-style
        // filter), but we do not re-validate it here to keep decode a
        // pure, allocation-free parse of anything already captured.

        let dh_buf = &buf[ETH_HEADER_LEN..ETH_HEADER_LEN + DEVICE_HEADER_LEN];
        let header = DeviceHeader::decode(dh_buf);

        let payload = &buf[ETH_HEADER_LEN + DEVICE_HEADER_LEN..];

        Ok(Frame {
            dst,
            src,
            header,
            payload,
        })
    }

    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }

    pub fn is_retry(&self) -> bool {
        self.header.retry != 0
    }

    pub fn is_ack(&self) -> bool {
        self.header.command == CMD_ACK
    }

    pub fn is_online(&self) -> bool {
        self.header.command == CMD_ONLINE
    }

    /// Parse this frame's payload as a beacon. Only meaningful when
    /// [`Frame::is_broadcast`] is `true`; callers are expected to check
    /// that first, matching the spec's "beacon payload is parsed as the
    /// fixed-offset 9+9 fields only when the destination is broadcast".
    pub fn beacon(&self) -> Result<Beacon, FrameError> {
        Beacon::parse(self.payload)
    }
}

/// Builds outbound frames. Holds the host's own MAC (used as source on
/// every outgoing frame).
pub struct FrameBuilder {
    pub host_mac: MacAddr,
}

impl FrameBuilder {
    pub fn new(host_mac: MacAddr) -> Self {
        FrameBuilder { host_mac }
    }

    /// Encode a complete outbound frame. `total_bytes` is computed as
    /// `payload.len() + 16` per invariant (1).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        dst: MacAddr,
        send_counter: u32,
        cmd_counter: u32,
        retry: u16,
        command: u8,
        num_commands: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let total_bytes = (payload.len() as u16).wrapping_add(16);
        let header = DeviceHeader {
            total_bytes,
            send_counter,
            cmd_counter,
            retry,
            command,
            num_commands,
        };

        let mut out = Vec::with_capacity(ETH_HEADER_LEN + DEVICE_HEADER_LEN + payload.len());
        out.extend_from_slice(dst.as_bytes());
        out.extend_from_slice(self.host_mac.as_bytes());
        out.extend_from_slice(&ETHER_TYPE.to_be_bytes());
        header.encode_into(&mut out);
        out.extend_from_slice(payload);
        out
    }

    /// Build an ACK frame: `command = 0xA0`, `num_commands = 0`,
    /// `cmd_counter` echoing the peer's last accepted `send_counter`.
    pub fn build_ack(&self, dst: MacAddr, send_counter: u32, peer_send_counter: u32) -> Vec<u8> {
        self.build(dst, send_counter, peer_send_counter, 0, CMD_ACK, 0, &[])
    }

    /// Build an ONLINE frame (no payload).
    pub fn build_online(&self, dst: MacAddr, send_counter: u32) -> Vec<u8> {
        self.build(dst, send_counter, 0, 0, CMD_ONLINE, 0, &[])
    }

    /// Build a data frame carrying `num_commands` concatenated commands.
    pub fn build_data(
        &self,
        dst: MacAddr,
        send_counter: u32,
        cmd_counter: u32,
        num_commands: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        self.build(dst, send_counter, cmd_counter, 0, CMD_DATA, num_commands, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dst() -> MacAddr {
        MacAddr::new([0x00, 0xa0, 0x7e, 0x01, 0x02, 0x03])
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = [0u8; 20];
        assert!(matches!(Frame::decode(&buf), Err(FrameError::TooShort(20))));
    }

    #[test]
    fn round_trips_ack_frame() {
        let host = MacAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let builder = FrameBuilder::new(host);
        let raw = builder.build_ack(sample_dst(), 5, 42);
        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(frame.src, host);
        assert_eq!(frame.dst, sample_dst());
        assert!(frame.is_ack());
        assert_eq!(frame.header.num_commands, 0);
        assert_eq!(frame.header.cmd_counter, 42);
        assert_eq!(frame.header.total_bytes, 16);
    }

    #[test]
    fn beacon_parses_version_and_device_type() {
        let host = MacAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let builder = FrameBuilder::new(host);
        let mut payload = vec![0u8; BEACON_PAYLOAD_LEN];
        payload[15..19].copy_from_slice(b"1.37");
        payload[24..32].copy_from_slice(b"CNTRL|24");
        let raw = builder.build(
            MacAddr::new([0xff; 6]),
            1,
            0,
            0,
            CMD_DATA,
            1,
            &payload,
        );
        let frame = Frame::decode(&raw).unwrap();
        assert!(frame.is_broadcast());
        let beacon = frame.beacon().unwrap();
        assert_eq!(beacon.version, "1.37");
        assert_eq!(beacon.device_type, Some(DeviceType::Control24));
    }

    #[test]
    fn total_bytes_invariant_holds() {
        let host = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let builder = FrameBuilder::new(host);
        let payload = [0x90u8, 0x03, 0x40];
        let raw = builder.build_data(sample_dst(), 3, 0, 1, &payload);
        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(
            frame.header.total_bytes as usize,
            frame.payload.len() + 16
        );
    }

    #[test]
    fn retry_detection() {
        let host = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let builder = FrameBuilder::new(host);
        let raw = builder.build(sample_dst(), 1, 0, 7, CMD_DATA, 1, &[0x90]);
        let frame = Frame::decode(&raw).unwrap();
        assert!(frame.is_retry());
    }
}
