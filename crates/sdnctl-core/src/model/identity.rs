// ── Core identity types ──
//
// Dpid and MacAddress key every switch, link endpoint and host.
// Both accept the loose spellings controllers and switches report
// and normalize them so equal identities compare equal.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Dpid ────────────────────────────────────────────────────────────

/// OpenFlow datapath ID. Stable for the lifetime of a switch.
///
/// Serializes as a plain integer. Deserializes from an integer, a decimal
/// string, a `0x`-prefixed hex string, or the 16-digit zero-padded hex form
/// that topology discovery reports (`"0000000000000001"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Dpid(pub u64);

impl Dpid {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Zero-padded 16-digit hex form.
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid datapath ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid datapath id: {0:?}")]
pub struct ParseDpidError(String);

impl FromStr for Dpid {
    type Err = ParseDpidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else if trimmed.len() == 16 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            u64::from_str_radix(trimmed, 16)
        } else {
            trimmed.parse::<u64>()
        };
        parsed.map(Self).map_err(|_| ParseDpidError(s.to_owned()))
    }
}

impl From<u64> for Dpid {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl<'de> Deserialize<'de> for Dpid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(Self(v)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lowered = raw.as_ref().trim().to_lowercase().replace('-', ":");
        if lowered.len() == 12 && !lowered.contains(':') {
            let octets: Vec<&str> = (0..6).filter_map(|i| lowered.get(i * 2..i * 2 + 2)).collect();
            return Self(octets.join(":"));
        }
        Self(lowered)
    }

    /// Strict parse: exactly six hex octets.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let mac = Self::new(raw);
        let octets: Vec<&str> = mac.0.split(':').collect();
        let well_formed = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
        well_formed.then_some(mac)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
