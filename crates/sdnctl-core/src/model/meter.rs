// ── Meter domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rate unit of a meter. Exactly one per meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MeterFlag {
    #[default]
    Kbps,
    Pktps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BandType {
    Drop,
    DscpRemark,
}

/// One rate-limit band of a meter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeterBand {
    #[serde(rename = "type")]
    pub band_type: BandType,
    pub rate: u32,
    #[serde(default)]
    pub burst_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prec_level: Option<u8>,
}

impl MeterBand {
    pub fn drop(rate: u32) -> Self {
        Self {
            band_type: BandType::Drop,
            rate,
            burst_size: 0,
            prec_level: None,
        }
    }
}

impl fmt::Display for MeterBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.band_type, self.rate)?;
        if self.burst_size > 0 {
            write!(f, "/{}", self.burst_size)?;
        }
        if let Some(prec) = self.prec_level {
            write!(f, "+{prec}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandStats {
    pub packet_band_count: u64,
    pub byte_band_count: u64,
}

/// Switch-reported meter counters. Never accepted as client input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterStats {
    pub len: u32,
    pub flow_count: u32,
    pub packet_in_count: u64,
    pub byte_in_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub band_stats: Vec<BandStats>,
}

/// A meter as cached by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    pub meter_id: u32,
    #[serde(default)]
    pub flags: MeterFlag,
    #[serde(default)]
    pub bands: Vec<MeterBand>,
    #[serde(flatten)]
    pub stats: Option<MeterStats>,
}

/// Largest meter id a client may configure (OFPM_MAX).
pub const MAX_METER_ID: u32 = 0xffff_0000;
