// ── Per-switch meter table cache ──

use std::collections::BTreeMap;

use crate::model::{Meter, MeterBand, MeterFlag};

/// Meters of one switch, keyed and listed by meter_id.
#[derive(Debug, Clone, Default)]
pub(crate) struct MeterTable {
    meters: BTreeMap<u32, Meter>,
}

impl MeterTable {
    pub(crate) fn contains(&self, meter_id: u32) -> bool {
        self.meters.contains_key(&meter_id)
    }

    pub(crate) fn insert(&mut self, meter: Meter) {
        self.meters.insert(meter.meter_id, meter);
    }

    /// Swap configuration, keeping whatever counters were last reported.
    pub(crate) fn replace_config(&mut self, meter_id: u32, flags: MeterFlag, bands: Vec<MeterBand>) -> bool {
        match self.meters.get_mut(&meter_id) {
            Some(meter) => {
                meter.flags = flags;
                meter.bands = bands;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, meter_id: u32) -> Option<Meter> {
        self.meters.remove(&meter_id)
    }

    /// Full replace from a switch report. Returns whether anything changed.
    pub(crate) fn replace_all(&mut self, reported: Vec<Meter>) -> bool {
        let next: BTreeMap<u32, Meter> = reported.into_iter().map(|m| (m.meter_id, m)).collect();
        let changed = next != self.meters;
        self.meters = next;
        changed
    }

    pub(crate) fn list(&self) -> Vec<Meter> {
        self.meters.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter(id: u32, rate: u32) -> Meter {
        Meter {
            meter_id: id,
            flags: MeterFlag::Kbps,
            bands: vec![MeterBand::drop(rate)],
            stats: None,
        }
    }

    #[test]
    fn listed_by_meter_id() {
        let mut table = MeterTable::default();
        table.insert(meter(7, 1));
        table.insert(meter(2, 1));
        let ids: Vec<u32> = table.list().iter().map(|m| m.meter_id).collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn replace_all_reports_changes() {
        let mut table = MeterTable::default();
        assert!(table.replace_all(vec![meter(1, 100)]));
        assert!(!table.replace_all(vec![meter(1, 100)]));
        assert!(table.replace_all(Vec::new()));
        assert!(!table.contains(1));
    }

    #[test]
    fn replace_config_requires_existing_meter() {
        let mut table = MeterTable::default();
        assert!(!table.replace_config(1, MeterFlag::Pktps, vec![MeterBand::drop(5)]));
        table.insert(meter(1, 100));
        assert!(table.replace_config(1, MeterFlag::Pktps, vec![MeterBand::drop(5)]));
        assert_eq!(table.list()[0].flags, MeterFlag::Pktps);
    }
}
