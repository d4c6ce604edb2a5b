// ── Request validation and normalization ──
//
// Runs before any adapter call. Match values are rewritten into one
// canonical spelling per field kind so that two requests naming the
// same OpenFlow key always compare equal.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::CoreError;
use crate::model::{
    Action, BandType, FieldKind, FlowEntry, FlowKey, FlowMatch, MAX_METER_ID, MacAddress, MatchField,
    MatchValue, MeterBand,
};

/// `OFPTT_ALL`; not a real table.
const TABLE_ALL: u8 = 0xff;

/// `OFPP_MAX`; larger numbers are reserved ports.
const MAX_PORT: u64 = 0xffff_ff00;

// ── Flows ──────────────────────────────────────────────────────────

pub(crate) fn flow_key(key: FlowKey) -> Result<FlowKey, CoreError> {
    if key.table_id == TABLE_ALL {
        return Err(CoreError::invalid("table_id 255 addresses all tables"));
    }
    Ok(FlowKey {
        match_fields: flow_match(&key.match_fields)?,
        ..key
    })
}

pub(crate) fn flow_match(raw: &FlowMatch) -> Result<FlowMatch, CoreError> {
    let mut fields: BTreeMap<String, (&str, MatchValue)> = BTreeMap::new();
    for (name, value) in raw.iter() {
        let field = MatchField::from_str(name)
            .map_err(|_| CoreError::invalid(format!("unknown match field `{name}`")))?;
        let normalized = match_value(field, value)
            .map_err(|reason| CoreError::invalid(format!("{name}={value}: {reason}")))?;
        let canonical = field.canonical().as_ref().to_owned();
        if let Some((first, _)) = fields.get(&canonical) {
            return Err(CoreError::invalid(format!(
                "`{first}` and `{name}` name the same match field"
            )));
        }
        fields.insert(canonical, (name.as_str(), normalized));
    }
    Ok(fields
        .into_iter()
        .map(|(name, (_, value))| (name, value))
        .collect())
}

/// Canonical form of a key that may carry fields the engine does not
/// model; such keys are compared as written.
pub(crate) fn reported_key(key: FlowKey) -> FlowKey {
    match flow_match(&key.match_fields) {
        Ok(match_fields) => FlowKey { match_fields, ..key },
        Err(_) => key,
    }
}

/// Canonical form of a switch-reported entry, so reconciled flows key
/// the same way as client requests. Fields the engine does not model
/// are kept as reported.
pub(crate) fn reported_flow(entry: FlowEntry) -> FlowEntry {
    match flow_match(&entry.match_fields) {
        Ok(match_fields) => FlowEntry {
            match_fields,
            ..entry
        },
        Err(_) => entry,
    }
}

fn match_value(field: MatchField, value: &MatchValue) -> Result<MatchValue, String> {
    match field.kind() {
        FieldKind::Port => {
            let port = integer(value)?;
            if port == 0 || port > MAX_PORT {
                return Err(format!("port must be in 1..={MAX_PORT}"));
            }
            Ok(MatchValue::Int(port))
        }
        FieldKind::Uint { max, maskable } => uint(value, max, maskable),
        FieldKind::Mac => {
            let text = text(value)?;
            let (addr, mask) = split_mask(text);
            let addr = mac(addr)?;
            match mask {
                Some(mask) => Ok(MatchValue::Text(format!("{addr}/{}", mac(mask)?))),
                None => Ok(MatchValue::Text(addr.to_string())),
            }
        }
        FieldKind::Ipv4 => ipv4(text(value)?),
        FieldKind::Ipv6 => ipv6(text(value)?),
    }
}

/// OpenFlow instruction rules: outputs target a real port, at most one
/// meter applies, and DROP stands alone.
pub(crate) fn actions(actions: &[Action]) -> Result<(), CoreError> {
    let mut meters = 0;
    for action in actions {
        match action {
            Action::Output { port } => {
                if *port == 0 {
                    return Err(CoreError::invalid("OUTPUT port must be non-zero"));
                }
            }
            Action::Meter { meter_id: id } => {
                meter_id(*id)?;
                meters += 1;
            }
            Action::Drop => {
                if actions.len() > 1 {
                    return Err(CoreError::invalid("DROP cannot be combined with other actions"));
                }
            }
        }
    }
    if meters > 1 {
        return Err(CoreError::invalid("at most one METER action per flow entry"));
    }
    Ok(())
}

// ── Meters ─────────────────────────────────────────────────────────

pub(crate) fn meter_id(id: u32) -> Result<u32, CoreError> {
    if id == 0 || id > MAX_METER_ID {
        return Err(CoreError::invalid(format!(
            "meter_id {id} out of range 1..={MAX_METER_ID}"
        )));
    }
    Ok(id)
}

pub(crate) fn bands(bands: &[MeterBand]) -> Result<(), CoreError> {
    if bands.is_empty() {
        return Err(CoreError::invalid("meter needs at least one band"));
    }
    for (idx, band) in bands.iter().enumerate() {
        if band.rate == 0 {
            return Err(CoreError::invalid(format!("band {idx}: rate must be positive")));
        }
        match (band.band_type, band.prec_level) {
            (BandType::DscpRemark, None) => {
                return Err(CoreError::invalid(format!(
                    "band {idx}: DSCP_REMARK requires prec_level"
                )));
            }
            (BandType::Drop, Some(_)) => {
                return Err(CoreError::invalid(format!(
                    "band {idx}: prec_level only applies to DSCP_REMARK"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Value helpers ──────────────────────────────────────────────────

fn text(value: &MatchValue) -> Result<&str, String> {
    match value {
        MatchValue::Text(s) => Ok(s.trim()),
        MatchValue::Int(_) => Err("expected an address string".into()),
    }
}

fn split_mask(text: &str) -> (&str, Option<&str>) {
    match text.split_once('/') {
        Some((value, mask)) => (value.trim(), Some(mask.trim())),
        None => (text, None),
    }
}

fn parse_u64(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("`{text}` is not an unsigned integer"))
}

fn integer(value: &MatchValue) -> Result<u64, String> {
    match value {
        MatchValue::Int(v) => Ok(*v),
        MatchValue::Text(s) => parse_u64(s.trim()),
    }
}

fn uint(value: &MatchValue, max: u64, maskable: bool) -> Result<MatchValue, String> {
    let in_range = |v: u64| {
        if v > max {
            Err(format!("value exceeds {max}"))
        } else {
            Ok(v)
        }
    };
    match value {
        MatchValue::Int(v) => in_range(*v).map(MatchValue::Int),
        MatchValue::Text(s) => match split_mask(s.trim()) {
            (v, None) => in_range(parse_u64(v)?).map(MatchValue::Int),
            (v, Some(mask)) => {
                if !maskable {
                    return Err("field does not support masks".into());
                }
                let v = in_range(parse_u64(v)?)?;
                let mask = in_range(parse_u64(mask)?)?;
                if mask == max {
                    Ok(MatchValue::Int(v))
                } else {
                    Ok(MatchValue::Text(format!("{v:#x}/{mask:#x}")))
                }
            }
        },
    }
}

fn mac(text: &str) -> Result<MacAddress, String> {
    MacAddress::parse(text).ok_or_else(|| format!("`{text}` is not a MAC address"))
}

fn ipv4(text: &str) -> Result<MatchValue, String> {
    let (addr, mask) = split_mask(text);
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| format!("`{addr}` is not an IPv4 address"))?;
    let Some(mask) = mask else {
        return Ok(MatchValue::Text(addr.to_string()));
    };
    if let Ok(len) = mask.parse::<u8>() {
        return match len {
            32 => Ok(MatchValue::Text(addr.to_string())),
            0..32 => Ok(MatchValue::Text(format!("{addr}/{len}"))),
            _ => Err(format!("prefix length {len} exceeds 32")),
        };
    }
    let mask: Ipv4Addr = mask
        .parse()
        .map_err(|_| format!("`{mask}` is not an IPv4 mask"))?;
    let bits = u32::from(mask);
    // Contiguous masks collapse to prefix form.
    if bits.leading_ones() + bits.trailing_zeros() == 32 {
        let len = bits.leading_ones();
        if len == 32 {
            return Ok(MatchValue::Text(addr.to_string()));
        }
        return Ok(MatchValue::Text(format!("{addr}/{len}")));
    }
    Ok(MatchValue::Text(format!("{addr}/{mask}")))
}

fn ipv6(text: &str) -> Result<MatchValue, String> {
    let (addr, mask) = split_mask(text);
    let addr: Ipv6Addr = addr
        .parse()
        .map_err(|_| format!("`{addr}` is not an IPv6 address"))?;
    let Some(mask) = mask else {
        return Ok(MatchValue::Text(addr.to_string()));
    };
    if let Ok(len) = mask.parse::<u8>() {
        return match len {
            128 => Ok(MatchValue::Text(addr.to_string())),
            0..128 => Ok(MatchValue::Text(format!("{addr}/{len}"))),
            _ => Err(format!("prefix length {len} exceeds 128")),
        };
    }
    let mask: Ipv6Addr = mask
        .parse()
        .map_err(|_| format!("`{mask}` is not an IPv6 mask"))?;
    Ok(MatchValue::Text(format!("{addr}/{mask}")))
}
