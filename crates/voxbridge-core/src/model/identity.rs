// ── Core identity types ──
//
// MacAddress seeds every externally visible device handle; StableId is
// that handle. Both are plain values so they can be persisted as strings
// and compared after a reboot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ── MacAddress ──────────────────────────────────────────────────────

/// Radio MAC address. Displays as lowercase colon-separated hex
/// (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

/// Returned when a string is not a 48-bit MAC address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address '{0}'")]
pub struct InvalidMac(pub String);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Twelve lowercase hex digits, no separators.
    pub fn compact(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = InvalidMac;

    /// Accepts colon-separated, dash-separated, or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.is_ascii() {
            return Err(InvalidMac(s.to_owned()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| InvalidMac(s.to_owned()))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = InvalidMac;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

// ── StableId ────────────────────────────────────────────────────────

// Fixed leading fields; the last two groups carry slot and MAC.
const ID_TIME_LOW: u32 = 0x2f40_2f80;
const ID_TIME_MID: u16 = 0xda50;
const ID_TIME_HI: u16 = 0x11e1;

/// Externally visible device handle handed to the discovery responder.
///
/// Generated ids are UUID-shaped, `2f402f80-da50-11e1-SSSS-MMMMMMMMMMMM`,
/// where `SSSS` is the allocation slot and `MMMM…` the node MAC, so a handle
/// seen on the network can be traced back to the node and the registration
/// that produced it. Ids loaded from storage are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Derive the handle for allocation `slot` on the node with `mac`.
    pub fn generate(mac: MacAddress, slot: u16) -> Self {
        let [s0, s1] = slot.to_be_bytes();
        let [m0, m1, m2, m3, m4, m5] = mac.octets();
        let uuid = Uuid::from_fields(
            ID_TIME_LOW,
            ID_TIME_MID,
            ID_TIME_HI,
            &[s0, s1, m0, m1, m2, m3, m4, m5],
        );
        Self(uuid.hyphenated().to_string())
    }

    /// The allocation slot, if this id was produced by [`generate`](Self::generate).
    pub fn slot(&self) -> Option<u16> {
        let uuid = Uuid::parse_str(&self.0).ok()?;
        let (time_low, time_mid, time_hi, tail) = uuid.as_fields();
        if (time_low, time_mid, time_hi) != (ID_TIME_LOW, ID_TIME_MID, ID_TIME_HI) {
            return None;
        }
        Some(u16::from_be_bytes([tail[0], tail[1]]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StableId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StableId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MAC: MacAddress = MacAddress::new([0x24, 0x6f, 0x28, 0xab, 0xcd, 0xef]);

    #[test]
    fn mac_address_parses_common_formats() {
        let colon: MacAddress = "24:6F:28:AB:CD:EF".parse().unwrap();
        let dash: MacAddress = "24-6f-28-ab-cd-ef".parse().unwrap();
        let bare: MacAddress = "246f28abcdef".parse().unwrap();
        assert_eq!(colon, MAC);
        assert_eq!(dash, MAC);
        assert_eq!(bare, MAC);
    }

    #[test]
    fn mac_address_rejects_garbage() {
        assert!("24:6f:28".parse::<MacAddress>().is_err());
        assert!("zz:6f:28:ab:cd:ef".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn mac_address_display_and_compact() {
        assert_eq!(MAC.to_string(), "24:6f:28:ab:cd:ef");
        assert_eq!(MAC.compact(), "246f28abcdef");
    }

    #[test]
    fn stable_id_embeds_slot_and_mac() {
        let id = StableId::generate(MAC, 0x002a);
        assert_eq!(id.as_str(), "2f402f80-da50-11e1-002a-246f28abcdef");
        assert_eq!(id.slot(), Some(42));
    }

    #[test]
    fn stable_id_is_deterministic() {
        assert_eq!(StableId::generate(MAC, 3), StableId::generate(MAC, 3));
        assert_ne!(StableId::generate(MAC, 3), StableId::generate(MAC, 4));
    }

    #[test]
    fn foreign_id_has_no_slot() {
        assert_eq!(StableId::from("light-kitchen").slot(), None);
        assert_eq!(
            StableId::from("550e8400-e29b-41d4-a716-446655440000").slot(),
            None
        );
    }
}
