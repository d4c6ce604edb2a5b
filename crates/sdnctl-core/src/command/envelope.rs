// ── Structured command envelope ──
//
// Parses the JSON that upstream producers (chat translation, scripts)
// emit:
//
//   {"command": "flow" | "meter",
//    "method":  "add" | "modify" | "delete",
//    "data":    {"dpid": 1, ...entry or meter fields}}

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Command, FlowSpec, MeterSpec};
use crate::error::CoreError;
use crate::model::{Dpid, FlowKey};

/// Switch-reported counters; never valid in a command.
const STAT_FIELDS: &[&str] = &[
    "duration_sec",
    "duration_nsec",
    "packet_count",
    "byte_count",
    "length",
    "len",
    "flow_count",
    "packet_in_count",
    "byte_in_count",
    "band_stats",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Target {
    Flow,
    Meter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Method {
    Add,
    Modify,
    Delete,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    command: Target,
    method: Method,
    data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MeterRef {
    meter_id: u32,
}

impl Command {
    /// Parse one command envelope from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse one command envelope from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Envelope {
            command,
            method,
            mut data,
        } = serde_json::from_value(value)?;

        if let Some(field) = STAT_FIELDS.iter().find(|f| data.contains_key(**f)) {
            return Err(CoreError::invalid(format!(
                "`{field}` is a read-only statistic"
            )));
        }
        let dpid: Dpid = match data.remove("dpid") {
            Some(raw) => serde_json::from_value(raw)?,
            None => return Err(CoreError::invalid("command data is missing `dpid`")),
        };
        let data = Value::Object(data);

        let parsed = match (command, method) {
            (Target::Flow, Method::Add) => Self::AddFlow {
                dpid,
                flow: serde_json::from_value(data)?,
            },
            (Target::Flow, Method::Modify) => {
                let spec: FlowSpec = serde_json::from_value(data)?;
                Self::ModifyFlow {
                    dpid,
                    key: FlowKey::new(spec.table_id, spec.priority, spec.match_fields),
                    actions: spec.actions,
                }
            }
            // Deletes only need the key; extra fields such as actions
            // are ignored.
            (Target::Flow, Method::Delete) => Self::DeleteFlow {
                dpid,
                key: serde_json::from_value(data)?,
            },
            (Target::Meter, Method::Add) => Self::AddMeter {
                dpid,
                meter: serde_json::from_value::<MeterSpec>(data)?,
            },
            (Target::Meter, Method::Modify) => Self::ModifyMeter {
                dpid,
                meter: serde_json::from_value::<MeterSpec>(data)?,
            },
            (Target::Meter, Method::Delete) => {
                let MeterRef { meter_id } = serde_json::from_value(data)?;
                Self::DeleteMeter { dpid, meter_id }
            }
        };
        Ok(parsed)
    }

    /// Parse a single envelope or a JSON array of envelopes.
    pub fn batch_from_json(text: &str) -> Result<Vec<Self>, CoreError> {
        match serde_json::from_str(text)? {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            single => Ok(vec![Self::from_value(single)?]),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{Action, FlowMatch, MeterBand, MeterFlag};

    #[test]
    fn flow_add_envelope() {
        let cmd = Command::from_value(json!({
            "command": "flow",
            "method": "add",
            "data": {
                "dpid": 1,
                "priority": 10,
                "match": {"in_port": 1, "dl_type": "0x0800"},
                "actions": [{"type": "OUTPUT", "port": 2}]
            }
        }))
        .unwrap();
        let Command::AddFlow { dpid, flow } = cmd else {
            panic!("expected AddFlow, got {cmd:?}");
        };
        assert_eq!(dpid, Dpid(1));
        assert_eq!(flow.priority, 10);
        assert_eq!(flow.table_id, 0);
        assert_eq!(flow.actions, vec![Action::Output { port: 2 }]);
    }

    #[test]
    fn flow_delete_ignores_actions() {
        let cmd = Command::from_json(
            r#"{"command":"flow","method":"delete",
                "data":{"dpid":2,"priority":10,"match":{"in_port":1},
                        "actions":[{"type":"OUTPUT","port":2}]}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::DeleteFlow {
                dpid: Dpid(2),
                key: FlowKey::new(0, 10, FlowMatch::new().with("in_port", 1u32)),
            }
        );
    }

    #[test]
    fn meter_envelopes() {
        let add = Command::from_value(json!({
            "command": "meter", "method": "add",
            "data": {"dpid": 1, "meter_id": 5, "flags": "KBPS",
                     "bands": [{"type": "DROP", "rate": 1000, "burst_size": 0}]}
        }))
        .unwrap();
        assert_eq!(
            add,
            Command::AddMeter {
                dpid: Dpid(1),
                meter: MeterSpec::new(5, MeterFlag::Kbps, vec![MeterBand::drop(1000)]),
            }
        );

        let delete = Command::from_value(json!({
            "command": "meter", "method": "delete",
            "data": {"dpid": 1, "meter_id": 5, "flags": "KBPS", "bands": []}
        }))
        .unwrap();
        assert_eq!(delete, Command::DeleteMeter { dpid: Dpid(1), meter_id: 5 });
    }

    #[test]
    fn statistics_are_rejected() {
        let err = Command::from_value(json!({
            "command": "flow", "method": "add",
            "data": {"dpid": 1, "match": {}, "actions": [], "packet_count": 3}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::invalid("`packet_count` is a read-only statistic")
        );
    }

    #[test]
    fn malformed_envelopes_are_invalid_entries() {
        for bad in [
            json!({"command": "group", "method": "add", "data": {"dpid": 1}}),
            json!({"command": "flow", "method": "upsert", "data": {"dpid": 1}}),
            json!({"command": "flow", "method": "add", "data": {"actions": []}}),
            json!({"command": "meter", "method": "delete", "data": {"dpid": 1}}),
        ] {
            let err = Command::from_value(bad).unwrap_err();
            assert!(matches!(err, CoreError::InvalidEntry { .. }), "{err:?}");
        }
    }

    #[test]
    fn batch_accepts_object_or_array() {
        let one = r#"{"command":"meter","method":"delete","data":{"dpid":1,"meter_id":1}}"#;
        assert_eq!(Command::batch_from_json(one).unwrap().len(), 1);
        let many = format!("[{one},{one}]");
        assert_eq!(Command::batch_from_json(&many).unwrap().len(), 2);
    }
}
