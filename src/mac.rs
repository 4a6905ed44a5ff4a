use std::fmt;

/// Console vendor OUI (Digidesign/Avid Control|24 / Pro Control).
pub const CONSOLE_VENDOR_PREFIX: [u8; 3] = [0x00, 0xa0, 0x7e];

/// Broadcast MAC used for device discovery beacons.
pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

/// A six-octet hardware address, logically split into a 3-byte vendor
/// prefix and a 3-byte device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }

    /// Parse a MAC out of a byte slice at least 6 bytes long.
    pub fn from_slice(buf: &[u8]) -> Option<Self> {
        if buf.len() < 6 {
            return None;
        }
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&buf[..6]);
        Some(MacAddr(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn vendor_prefix(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn device_id(&self) -> [u8; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == BROADCAST.0
    }

    /// `true` when the vendor prefix matches the console OUI (00:A0:7E).
    pub fn is_console_vendor(&self) -> bool {
        self.vendor_prefix() == CONSOLE_VENDOR_PREFIX
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_slice() {
        let buf = [0x00, 0xa0, 0x7e, 0x01, 0x02, 0x03, 0xff];
        let mac = MacAddr::from_slice(&buf).unwrap();
        assert_eq!(mac.vendor_prefix(), CONSOLE_VENDOR_PREFIX);
        assert_eq!(mac.device_id(), [0x01, 0x02, 0x03]);
        assert!(mac.is_console_vendor());
    }

    #[test]
    fn rejects_short_slice() {
        assert!(MacAddr::from_slice(&[0, 1, 2]).is_none());
    }

    #[test]
    fn broadcast_detection() {
        assert!(BROADCAST.is_broadcast());
        let mac = MacAddr::new([0x00, 0xa0, 0x7e, 1, 2, 3]);
        assert!(!mac.is_broadcast());
    }

    #[test]
    fn display_format() {
        let mac = MacAddr::new([0x00, 0xa0, 0x7e, 0x01, 0x02, 0x03]);
        assert_eq!(mac.to_string(), "00:A0:7E:01:02:03");
    }
}
