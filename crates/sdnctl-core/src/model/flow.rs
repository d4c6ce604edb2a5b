// ── Flow table domain types ──

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Match fields the engine recognizes, by their OpenFlow 1.3 (and 1.0
/// alias) names. Anything else in a client-supplied match is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MatchField {
    InPort,
    InPhyPort,
    Metadata,
    EthDst,
    EthSrc,
    DlDst,
    DlSrc,
    EthType,
    DlType,
    VlanVid,
    DlVlan,
    VlanPcp,
    IpDscp,
    IpEcn,
    IpProto,
    NwProto,
    #[strum(serialize = "ipv4_src")]
    Ipv4Src,
    #[strum(serialize = "ipv4_dst")]
    Ipv4Dst,
    NwSrc,
    NwDst,
    TcpSrc,
    TcpDst,
    UdpSrc,
    UdpDst,
    SctpSrc,
    SctpDst,
    #[strum(serialize = "icmpv4_type")]
    Icmpv4Type,
    #[strum(serialize = "icmpv4_code")]
    Icmpv4Code,
    ArpOp,
    ArpSpa,
    ArpTpa,
    ArpSha,
    ArpTha,
    #[strum(serialize = "ipv6_src")]
    Ipv6Src,
    #[strum(serialize = "ipv6_dst")]
    Ipv6Dst,
    #[strum(serialize = "ipv6_flabel")]
    Ipv6Flabel,
    MplsLabel,
}

/// Value shape a match field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Switch port number (non-zero 32-bit).
    Port,
    /// Unsigned integer with an inclusive upper bound; `maskable` fields
    /// also accept `value/mask`.
    Uint { max: u64, maskable: bool },
    Mac,
    Ipv4,
    Ipv6,
}

impl MatchField {
    /// The OpenFlow 1.3 name for an OpenFlow 1.0 alias. A match stores
    /// only canonical names, so both spellings address one strict key.
    pub fn canonical(self) -> Self {
        match self {
            Self::DlDst => Self::EthDst,
            Self::DlSrc => Self::EthSrc,
            Self::DlType => Self::EthType,
            Self::DlVlan => Self::VlanVid,
            Self::NwProto => Self::IpProto,
            Self::NwSrc => Self::Ipv4Src,
            Self::NwDst => Self::Ipv4Dst,
            other => other,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::InPort | Self::InPhyPort => FieldKind::Port,
            Self::Metadata => FieldKind::Uint {
                max: u64::MAX,
                maskable: true,
            },
            Self::EthDst | Self::EthSrc | Self::DlDst | Self::DlSrc | Self::ArpSha | Self::ArpTha => {
                FieldKind::Mac
            }
            Self::EthType
            | Self::DlType
            | Self::TcpSrc
            | Self::TcpDst
            | Self::UdpSrc
            | Self::UdpDst
            | Self::SctpSrc
            | Self::SctpDst
            | Self::ArpOp => FieldKind::Uint {
                max: u64::from(u16::MAX),
                maskable: false,
            },
            Self::VlanVid | Self::DlVlan => FieldKind::Uint {
                max: 0x1fff,
                maskable: true,
            },
            Self::VlanPcp => FieldKind::Uint {
                max: 7,
                maskable: false,
            },
            Self::IpDscp => FieldKind::Uint {
                max: 63,
                maskable: false,
            },
            Self::IpEcn => FieldKind::Uint {
                max: 3,
                maskable: false,
            },
            Self::IpProto | Self::NwProto | Self::Icmpv4Type | Self::Icmpv4Code => {
                FieldKind::Uint {
                    max: u64::from(u8::MAX),
                    maskable: false,
                }
            }
            Self::Ipv4Src | Self::Ipv4Dst | Self::NwSrc | Self::NwDst | Self::ArpSpa | Self::ArpTpa => {
                FieldKind::Ipv4
            }
            Self::Ipv6Src | Self::Ipv6Dst => FieldKind::Ipv6,
            Self::Ipv6Flabel => FieldKind::Uint {
                max: 0x000f_ffff,
                maskable: true,
            },
            Self::MplsLabel => FieldKind::Uint {
                max: 0x000f_ffff,
                maskable: false,
            },
        }
    }
}

/// A single match value: an integer, or text (addresses, `value/mask`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchValue {
    Int(u64),
    Text(String),
}

impl fmt::Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for MatchValue {
    fn from(v: u64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for MatchValue {
    fn from(v: u32) -> Self {
        Self::Int(u64::from(v))
    }
}

impl From<&str> for MatchValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// Match conditions of a flow entry. Absent fields are wildcards.
///
/// Backed by a `BTreeMap` so two matches with the same fields compare,
/// hash and serialize identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowMatch(BTreeMap<String, MatchValue>);

impl FlowMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<MatchValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<MatchValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&MatchValue> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MatchValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, MatchValue)> for FlowMatch {
    fn from_iter<I: IntoIterator<Item = (String, MatchValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FlowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "*");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Flow instruction, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Output { port: u32 },
    Meter { meter_id: u32 },
    Drop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output { port } => write!(f, "OUTPUT:{port}"),
            Self::Meter { meter_id } => write!(f, "METER:{meter_id}"),
            Self::Drop => write!(f, "DROP"),
        }
    }
}

/// Identity of a flow entry within one switch: OpenFlow strict-match key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    #[serde(default)]
    pub table_id: u8,
    #[serde(default = "default_priority")]
    pub priority: u16,
    #[serde(rename = "match", default)]
    pub match_fields: FlowMatch,
}

impl FlowKey {
    pub fn new(table_id: u8, priority: u16, match_fields: FlowMatch) -> Self {
        Self {
            table_id,
            priority,
            match_fields,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table={},priority={},match={}",
            self.table_id, self.priority, self.match_fields
        )
    }
}

/// Priority used when a request omits one.
pub const DEFAULT_PRIORITY: u16 = 1;

pub(crate) fn default_priority() -> u16 {
    DEFAULT_PRIORITY
}

/// Switch-reported runtime counters. Never accepted as client input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStats {
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub length: u32,
}

/// A flow entry as cached by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEntry {
    #[serde(default)]
    pub table_id: u8,
    #[serde(default = "default_priority")]
    pub priority: u16,
    #[serde(rename = "match", default)]
    pub match_fields: FlowMatch,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub cookie: u64,
    #[serde(default)]
    pub idle_timeout: u16,
    #[serde(default)]
    pub hard_timeout: u16,
    #[serde(default)]
    pub flags: u16,
    #[serde(flatten)]
    pub stats: Option<FlowStats>,
}

impl FlowEntry {
    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.table_id, self.priority, self.match_fields.clone())
    }

    pub fn has_key(&self, key: &FlowKey) -> bool {
        self.table_id == key.table_id
            && self.priority == key.priority
            && self.match_fields == key.match_fields
    }
}
