// ── Typed request structs for Command payloads ──
//
// Client-facing shapes of flows and meters. Defaults are explicit serde
// defaults; runtime statistics are not part of these types, so a
// request carrying counters fails to deserialize.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::model::flow::default_priority;
use crate::model::{Action, FlowEntry, FlowKey, FlowMatch, Meter, MeterBand, MeterFlag};

use super::validate;

// ── Flow ───────────────────────────────────────────────────────────

/// Flow entry to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowSpec {
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
}

impl FlowSpec {
    /// Request with every optional field at its default.
    pub fn new(match_fields: FlowMatch, actions: Vec<Action>) -> Self {
        Self {
            table_id: 0,
            priority: default_priority(),
            match_fields,
            actions,
            cookie: 0,
            idle_timeout: 0,
            hard_timeout: 0,
            flags: 0,
        }
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_table(mut self, table_id: u8) -> Self {
        self.table_id = table_id;
        self
    }

    /// Validate and normalize into the cached entry form.
    pub fn into_entry(self) -> Result<FlowEntry, CoreError> {
        let key = validate::flow_key(FlowKey::new(self.table_id, self.priority, self.match_fields))?;
        validate::actions(&self.actions)?;
        Ok(FlowEntry {
            table_id: key.table_id,
            priority: key.priority,
            match_fields: key.match_fields,
            actions: self.actions,
            cookie: self.cookie,
            idle_timeout: self.idle_timeout,
            hard_timeout: self.hard_timeout,
            flags: self.flags,
            stats: None,
        })
    }
}

// ── Meter ──────────────────────────────────────────────────────────

/// Meter to install or reconfigure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterSpec {
    pub meter_id: u32,
    #[serde(default, deserialize_with = "one_flag")]
    pub flags: MeterFlag,
    #[serde(default)]
    pub bands: Vec<MeterBand>,
}

impl MeterSpec {
    pub fn new(meter_id: u32, flags: MeterFlag, bands: Vec<MeterBand>) -> Self {
        Self {
            meter_id,
            flags,
            bands,
        }
    }

    pub fn into_meter(self) -> Result<Meter, CoreError> {
        validate::meter_id(self.meter_id)?;
        validate::bands(&self.bands)?;
        Ok(Meter {
            meter_id: self.meter_id,
            flags: self.flags,
            bands: self.bands,
            stats: None,
        })
    }
}

/// Accept `"KBPS"` or `["KBPS"]`; anything but exactly one flag fails.
fn one_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MeterFlag, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(MeterFlag),
        Many(Vec<MeterFlag>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::One(flag) => Ok(flag),
        Raw::Many(flags) => match flags.as_slice() {
            [flag] => Ok(*flag),
            _ => Err(D::Error::custom(
                "meter flags must be exactly one of KBPS or PKTPS",
            )),
        },
    }
}
