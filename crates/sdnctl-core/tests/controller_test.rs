// Integration tests for `Controller` against the in-memory emulated fabric.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use sdnctl_core::{
    AckMode, Action, Command, CommandResult, Controller, ControllerConfig, CoreError, Dpid,
    EmulatedFabric, EntryKind, Fault, FlowEntry, FlowKey, FlowMatch, FlowSpec, Link, MeterBand,
    MeterFlag, MeterSpec, PortRef, ProtocolAdapter, SwitchDescription, SwitchState,
    TopologySnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> ControllerConfig {
    ControllerConfig {
        refresh_interval: Duration::ZERO,
        query_timeout: Duration::from_millis(500),
        command_timeout: Duration::from_millis(200),
        disconnect_timeout: Duration::from_secs(60),
        resync_after_mutation: false,
    }
}

fn desc(dpid: u64) -> SwitchDescription {
    SwitchDescription {
        mfr_desc: "Nicira, Inc.".into(),
        hw_desc: "Open vSwitch".into(),
        sw_desc: "3.1.0".into(),
        serial_num: format!("SN-{dpid}"),
        dp_desc: format!("s{dpid}"),
    }
}

async fn setup_with(config: ControllerConfig, dpids: &[u64]) -> (Arc<EmulatedFabric>, Controller) {
    let fabric = Arc::new(EmulatedFabric::new());
    for &dpid in dpids {
        fabric.add_switch(Dpid(dpid), desc(dpid));
    }
    let adapter: Arc<dyn ProtocolAdapter> = fabric.clone();
    let controller = Controller::new(config, adapter);
    controller.start().await.unwrap();
    (fabric, controller)
}

async fn setup(dpids: &[u64]) -> (Arc<EmulatedFabric>, Controller) {
    setup_with(config(), dpids).await
}

fn forward(in_port: u32, out_port: u32) -> FlowSpec {
    FlowSpec::new(
        FlowMatch::new().with("in_port", in_port),
        vec![Action::Output { port: out_port }],
    )
}

fn key_of(spec: &FlowSpec) -> FlowKey {
    FlowKey::new(spec.table_id, spec.priority, spec.match_fields.clone())
}

fn entry(in_port: u32, out_port: u32) -> FlowEntry {
    forward(in_port, out_port).into_entry().unwrap()
}

async fn wait_for_state(controller: &Controller, dpid: Dpid, state: SwitchState) {
    let mut switches = controller.subscribe_switches();
    tokio::time::timeout(Duration::from_secs(5), switches.wait_for(dpid, state))
        .await
        .unwrap()
        .unwrap();
}

// ── Startup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn start_discovers_and_syncs_switches() {
    let (_fabric, controller) = setup(&[1, 2]).await;

    let switches = controller.switches();
    assert_eq!(switches.len(), 2);
    for sw in &switches {
        assert_eq!(sw.state, SwitchState::Synced);
        assert_eq!(sw.description, Some(desc(sw.dpid.get())));
    }
    assert!(controller.last_full_refresh().is_some());
    controller.shutdown().await;
}

#[tokio::test]
async fn second_start_is_refused() {
    let (_fabric, controller) = setup(&[1]).await;
    assert!(matches!(controller.start().await, Err(CoreError::Internal(_))));
}

// ── Flows ───────────────────────────────────────────────────────────

#[tokio::test]
async fn flows_are_listed_by_table_then_priority() {
    let (_fabric, controller) = setup(&[1]).await;
    let dpid = Dpid(1);

    controller.add_flow(dpid, forward(1, 2).with_priority(10)).await.unwrap();
    controller.add_flow(dpid, forward(2, 1).with_priority(200)).await.unwrap();
    controller
        .add_flow(dpid, forward(3, 1).with_priority(500).with_table(1))
        .await
        .unwrap();

    let order: Vec<(u8, u16)> = controller
        .list_flows(dpid)
        .unwrap()
        .iter()
        .map(|f| (f.table_id, f.priority))
        .collect();
    assert_eq!(order, vec![(0, 200), (0, 10), (1, 500)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_all_land() {
    let (fabric, controller) = setup(&[1]).await;

    let handles: Vec<_> = (1..=100u32)
        .map(|port| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add_flow(Dpid(1), forward(port, 1)).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), CommandResult::Applied);
    }

    assert_eq!(controller.list_flows(Dpid(1)).unwrap().len(), 100);
    assert_eq!(fabric.flows(Dpid(1)).len(), 100);

    controller.trigger_update().await.unwrap();
    assert_eq!(controller.list_flows(Dpid(1)).unwrap().len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_key_race_leaves_one_consistent_entry() {
    let (fabric, controller) = setup(&[1]).await;

    let handles: Vec<_> = (2..=21u32)
        .map(|out| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add_flow(Dpid(1), forward(1, out)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let cached = controller.list_flows(Dpid(1)).unwrap();
    let on_switch = fabric.flows(Dpid(1));
    assert_eq!(cached.len(), 1);
    assert_eq!(on_switch.len(), 1);
    assert_eq!(cached[0].actions, on_switch[0].actions);
}

#[tokio::test]
async fn modify_replaces_actions_only() {
    let (fabric, controller) = setup(&[1]).await;
    let spec = forward(1, 2).with_priority(7);
    let key = key_of(&spec);
    controller.add_flow(Dpid(1), spec).await.unwrap();

    let result = controller
        .modify_flow(Dpid(1), key.clone(), vec![Action::Output { port: 9 }])
        .await
        .unwrap();
    assert_eq!(result, CommandResult::Applied);

    let cached = controller.list_flows(Dpid(1)).unwrap();
    assert_eq!(cached[0].priority, 7);
    assert_eq!(cached[0].actions, vec![Action::Output { port: 9 }]);
    assert_eq!(fabric.flows(Dpid(1))[0].actions, vec![Action::Output { port: 9 }]);
}

#[tokio::test]
async fn modify_of_unknown_flow_is_not_found() {
    let (_fabric, controller) = setup(&[1]).await;
    let err = controller
        .modify_flow(Dpid(1), key_of(&forward(1, 2)), vec![Action::Drop])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { kind: EntryKind::Flow, .. }));
}

#[tokio::test]
async fn delete_removes_from_cache_and_switch() {
    let (fabric, controller) = setup(&[1]).await;
    let spec = forward(1, 2);
    let key = key_of(&spec);
    controller.add_flow(Dpid(1), spec).await.unwrap();

    controller.delete_flow(Dpid(1), key.clone()).await.unwrap();
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());
    assert!(fabric.flows(Dpid(1)).is_empty());

    let err = controller.delete_flow(Dpid(1), key).await.unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { kind: EntryKind::Flow, .. }));
}

#[tokio::test]
async fn invalid_flow_never_reaches_the_switch() {
    let (fabric, controller) = setup(&[1]).await;
    let bad = FlowSpec::new(
        FlowMatch::new().with("in_port", 1u32).with("warp_factor", 9u32),
        vec![Action::Drop],
    );
    let err = controller.add_flow(Dpid(1), bad).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidEntry { .. }));

    let drop_plus_output = FlowSpec::new(
        FlowMatch::new(),
        vec![Action::Drop, Action::Output { port: 1 }],
    );
    let err = controller.add_flow(Dpid(1), drop_plus_output).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidEntry { .. }));
    assert!(fabric.flows(Dpid(1)).is_empty());
}

#[tokio::test]
async fn unknown_switch_is_reported() {
    let (_fabric, controller) = setup(&[1]).await;
    let err = controller.add_flow(Dpid(42), forward(1, 2)).await.unwrap_err();
    assert_eq!(err, CoreError::SwitchNotFound { dpid: Dpid(42) });
    assert!(matches!(
        controller.list_flows(Dpid(42)),
        Err(CoreError::SwitchNotFound { .. })
    ));
}

#[tokio::test]
async fn rejected_flow_mod_leaves_cache_untouched() {
    let (_fabric, controller) = setup(&[1]).await;
    let metered = FlowSpec::new(
        FlowMatch::new().with("in_port", 1u32),
        vec![Action::Meter { meter_id: 3 }, Action::Output { port: 2 }],
    );
    let err = controller.add_flow(Dpid(1), metered).await.unwrap_err();
    assert!(matches!(err, CoreError::AdapterRejected { .. }));
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());
}

// ── Meters ──────────────────────────────────────────────────────────

#[tokio::test]
async fn meter_lifecycle_with_dependent_flow() {
    let (fabric, controller) = setup(&[1]).await;
    let dpid = Dpid(1);

    controller
        .add_meter(dpid, MeterSpec::new(1, MeterFlag::Kbps, vec![MeterBand::drop(1000)]))
        .await
        .unwrap();
    controller
        .add_flow(
            dpid,
            FlowSpec::new(
                FlowMatch::new().with("in_port", 1u32),
                vec![Action::Meter { meter_id: 1 }, Action::Output { port: 2 }],
            ),
        )
        .await
        .unwrap();
    controller.add_flow(dpid, forward(2, 1)).await.unwrap();

    controller
        .modify_meter(dpid, MeterSpec::new(1, MeterFlag::Kbps, vec![MeterBand::drop(500)]))
        .await
        .unwrap();
    let meters = controller.list_meters(dpid).unwrap();
    assert_eq!(meters.len(), 1);
    assert_eq!(meters[0].bands, vec![MeterBand::drop(500)]);

    controller.delete_meter(dpid, 1).await.unwrap();
    assert!(controller.list_meters(dpid).unwrap().is_empty());
    // The metered flow goes with the meter; the plain one stays.
    assert_eq!(controller.list_flows(dpid).unwrap().len(), 1);
    assert_eq!(fabric.flows(dpid).len(), 1);
}

#[tokio::test]
async fn meter_from_envelope_is_listed_after_reconciliation() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.set_ack_mode(AckMode::Defer);

    let add = Command::from_json(
        r#"{"command": "meter", "method": "add", "data": {
            "dpid": 1, "meter_id": 5, "flags": "KBPS",
            "bands": [{"type": "DROP", "rate": 1000, "burst_size": 0}]
        }}"#,
    )
    .unwrap();
    assert_eq!(controller.execute(add).await.unwrap(), CommandResult::Pending);

    controller.trigger_update().await.unwrap();
    let meters = controller.list_meters(Dpid(1)).unwrap();
    assert_eq!(meters.len(), 1);
    assert_eq!(meters[0].meter_id, 5);
    assert_eq!(meters[0].flags, MeterFlag::Kbps);
    assert_eq!(meters[0].bands, vec![MeterBand::drop(1000)]);
}

#[tokio::test]
async fn duplicate_meter_is_rejected_by_switch() {
    let (_fabric, controller) = setup(&[1]).await;
    let meter = MeterSpec::new(4, MeterFlag::Pktps, vec![MeterBand::drop(10)]);
    controller.add_meter(Dpid(1), meter.clone()).await.unwrap();

    let err = controller.add_meter(Dpid(1), meter).await.unwrap_err();
    assert!(matches!(err, CoreError::AdapterRejected { .. }));
}

#[tokio::test]
async fn unknown_meter_modify_and_delete_are_not_found() {
    let (_fabric, controller) = setup(&[1]).await;
    let err = controller
        .modify_meter(Dpid(1), MeterSpec::new(8, MeterFlag::Kbps, vec![MeterBand::drop(1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { kind: EntryKind::Meter, .. }));

    let err = controller.delete_meter(Dpid(1), 8).await.unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { kind: EntryKind::Meter, .. }));
}

#[tokio::test]
async fn meter_without_bands_is_invalid() {
    let (_fabric, controller) = setup(&[1]).await;
    let err = controller
        .add_meter(Dpid(1), MeterSpec::new(2, MeterFlag::Kbps, Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidEntry { .. }));
}

// ── Acknowledgement modes ───────────────────────────────────────────

#[tokio::test]
async fn deferred_ack_is_pending_until_reconciled() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.set_ack_mode(AckMode::Defer);

    let result = controller.add_flow(Dpid(1), forward(1, 2)).await.unwrap();
    assert_eq!(result, CommandResult::Pending);
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());

    controller.trigger_update().await.unwrap();
    assert_eq!(controller.list_flows(Dpid(1)).unwrap().len(), 1);
}

#[tokio::test]
async fn resync_after_mutation_picks_up_pending_changes() {
    let config = ControllerConfig {
        resync_after_mutation: true,
        ..config()
    };
    let (fabric, controller) = setup_with(config, &[1]).await;
    fabric.set_ack_mode(AckMode::Defer);

    let result = controller.add_flow(Dpid(1), forward(1, 2)).await.unwrap();
    assert_eq!(result, CommandResult::Pending);
    assert_eq!(controller.list_flows(Dpid(1)).unwrap().len(), 1);
}

// ── Reads and snapshots ─────────────────────────────────────────────

#[tokio::test]
async fn consecutive_snapshots_serialize_identically() {
    let (fabric, controller) = setup(&[1, 2]).await;
    controller.add_flow(Dpid(1), forward(1, 2)).await.unwrap();
    fabric.set_topology(TopologySnapshot {
        links: vec![Link::new(PortRef::new(Dpid(1), 2), PortRef::new(Dpid(2), 1))],
        hosts: Vec::new(),
    });

    controller.trigger_update().await.unwrap();
    let first = serde_json::to_string(&controller.network_snapshot()).unwrap();
    controller.trigger_update().await.unwrap();
    let second = serde_json::to_string(&controller.network_snapshot()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn snapshot_is_served_while_switch_hangs() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.set_fault(Dpid(1), Some(Fault::Hang));

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.add_flow(Dpid(1), forward(1, 2)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    let snapshot = controller.network_snapshot();
    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(snapshot.switches.len(), 1);

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::AdapterTimeout { dpid: Some(Dpid(1)), .. }));
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());
}

// ── Reconciliation ──────────────────────────────────────────────────

#[tokio::test]
async fn reconciliation_adopts_switch_side_changes() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.install_flow(Dpid(1), &entry(5, 6)).await.unwrap();
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());

    let report = controller.trigger_update().await.unwrap();
    assert_eq!(report.synced, vec![Dpid(1)]);
    let flows = controller.list_flows(Dpid(1)).unwrap();
    assert_eq!(flows.len(), 1);
    assert!(flows[0].stats.is_some());
}

#[tokio::test]
async fn partial_failure_keeps_what_succeeded() {
    let (fabric, controller) = setup(&[1, 2]).await;
    let before = controller.last_full_refresh();
    fabric.install_flow(Dpid(1), &entry(1, 2)).await.unwrap();
    fabric.install_flow(Dpid(2), &entry(1, 2)).await.unwrap();
    fabric.set_fault(Dpid(2), Some(Fault::FailQueries));

    let err = controller.trigger_update().await.unwrap_err();
    assert_eq!(
        err,
        CoreError::ReconciliationPartialFailure {
            failed: vec![Dpid(2)],
            topology_failed: false,
        }
    );
    assert_eq!(controller.list_flows(Dpid(1)).unwrap().len(), 1);
    assert!(controller.list_flows(Dpid(2)).unwrap().is_empty());
    assert_eq!(controller.last_full_refresh(), before);
}

#[tokio::test]
async fn topology_failure_is_reported_but_not_fatal() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.set_topology_failure(true);

    let err = controller.trigger_update().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::ReconciliationPartialFailure { topology_failed: true, .. }
    ));
    assert_eq!(controller.switch(Dpid(1)).unwrap().state, SwitchState::Synced);
}

#[tokio::test]
async fn topology_callbacks_fire_once_per_change() {
    let (fabric, controller) = setup(&[1, 2]).await;
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        controller.on_topology_change(Arc::new(move |_topology: &TopologySnapshot| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));
    }
    fabric.set_topology(TopologySnapshot {
        links: vec![
            Link::new(PortRef::new(Dpid(1), 2), PortRef::new(Dpid(2), 1)),
            Link::new(PortRef::new(Dpid(2), 1), PortRef::new(Dpid(1), 2)),
        ],
        hosts: Vec::new(),
    });

    controller.trigger_update().await.unwrap();
    controller.trigger_update().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.topology().links.len(), 2);
}

#[tokio::test]
async fn topology_subscribers_wake_only_on_real_changes() {
    let (fabric, controller) = setup(&[1, 2]).await;
    let mut topology = controller.subscribe_topology();
    assert!(topology.latest().links.is_empty());

    fabric.set_topology(TopologySnapshot {
        links: vec![Link::new(PortRef::new(Dpid(1), 2), PortRef::new(Dpid(2), 1))],
        hosts: Vec::new(),
    });
    controller.trigger_update().await.unwrap();
    let changed = tokio::time::timeout(Duration::from_secs(1), topology.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(changed.links.len(), 1);

    controller.trigger_update().await.unwrap();
    let idle = tokio::time::timeout(Duration::from_millis(50), topology.changed()).await;
    assert!(idle.is_err(), "identical refresh woke the subscriber");
}

#[tokio::test]
async fn switch_records_adopt_canonical_match_names() {
    let (fabric, controller) = setup(&[1]).await;
    let mut reported = entry(1, 2);
    reported.match_fields = FlowMatch::new().with("dl_type", 2048u32).with("in_port", 1u32);
    fabric.install_flow(Dpid(1), &reported).await.unwrap();
    controller.trigger_update().await.unwrap();

    let key = FlowKey::new(
        reported.table_id,
        reported.priority,
        FlowMatch::new().with("eth_type", "0x0800").with("in_port", 1u32),
    );
    controller.delete_flow(Dpid(1), key).await.unwrap();
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());

    controller.trigger_update().await.unwrap();
    assert!(fabric.flows(Dpid(1)).is_empty());
}

// ── Switch lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn disconnected_switch_keeps_cache_but_refuses_mutations() {
    let (fabric, controller) = setup(&[1]).await;
    controller.add_flow(Dpid(1), forward(1, 2)).await.unwrap();

    fabric.disconnect_switch(Dpid(1));
    wait_for_state(&controller, Dpid(1), SwitchState::Disconnected).await;

    let err = controller.add_flow(Dpid(1), forward(2, 1)).await.unwrap_err();
    assert_eq!(err, CoreError::SwitchDisconnected { dpid: Dpid(1) });

    let snapshot = controller.network_snapshot();
    assert_eq!(snapshot.switches[0].state, SwitchState::Disconnected);
    assert_eq!(snapshot.switches[0].flow_tables.len(), 1);
    assert!(controller.switch_record(Dpid(1)).unwrap().disconnected_at.is_some());
}

#[tokio::test]
async fn reconnect_resyncs_the_switch() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.disconnect_switch(Dpid(1));
    wait_for_state(&controller, Dpid(1), SwitchState::Disconnected).await;

    fabric.connect_switch(Dpid(1));
    wait_for_state(&controller, Dpid(1), SwitchState::Synced).await;
    controller.add_flow(Dpid(1), forward(1, 2)).await.unwrap();
}

#[tokio::test]
async fn new_switch_is_picked_up_from_events() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.add_switch(Dpid(7), desc(7));
    wait_for_state(&controller, Dpid(7), SwitchState::Synced).await;
    assert_eq!(controller.switches().len(), 2);
}

#[tokio::test]
async fn shutdown_waits_for_connect_syncs() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.set_latency(Duration::from_millis(200));
    fabric.add_switch(Dpid(7), desc(7));
    wait_for_state(&controller, Dpid(7), SwitchState::Syncing).await;

    controller.shutdown().await;
    drop(controller);
    // Every background task has been joined, so nothing else holds the
    // adapter.
    assert_eq!(Arc::strong_count(&fabric), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_mid_sync_discards_results() {
    let (fabric, controller) = setup(&[1]).await;
    fabric.install_flow(Dpid(1), &entry(1, 2)).await.unwrap();
    fabric.set_latency(Duration::from_millis(150));

    let cycle = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.trigger_update().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    fabric.disconnect_switch(Dpid(1));

    let err = cycle.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        CoreError::ReconciliationPartialFailure {
            failed: vec![Dpid(1)],
            topology_failed: false,
        }
    );
    assert!(controller.list_flows(Dpid(1)).unwrap().is_empty());
    assert_eq!(controller.switch(Dpid(1)).unwrap().state, SwitchState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnected_switch_is_purged_after_grace_period() {
    let (fabric, controller) = setup(&[1, 2]).await;
    fabric.disconnect_switch(Dpid(2));
    wait_for_state(&controller, Dpid(2), SwitchState::Disconnected).await;

    let report = controller.trigger_update().await.unwrap();
    assert!(report.purged.is_empty());
    assert!(controller.switch(Dpid(2)).is_ok());

    tokio::time::advance(Duration::from_secs(61)).await;
    let report = controller.trigger_update().await.unwrap();
    assert_eq!(report.purged, vec![Dpid(2)]);
    assert_eq!(
        controller.switch(Dpid(2)).unwrap_err(),
        CoreError::SwitchNotFound { dpid: Dpid(2) }
    );
    assert_eq!(controller.network_snapshot().switches.len(), 1);
}

// ── Command envelope ────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_envelope_round_trips_through_execute() {
    let (fabric, controller) = setup(&[1]).await;

    let add = Command::from_json(
        r#"{"command": "flow", "method": "add", "data": {
            "dpid": 1, "priority": 5, "match": {"in_port": 1},
            "actions": [{"type": "OUTPUT", "port": 2}]
        }}"#,
    )
    .unwrap();
    assert_eq!(controller.execute(add).await.unwrap(), CommandResult::Applied);

    let delete = Command::from_json(
        r#"{"command": "flow", "method": "delete", "data": {
            "dpid": 1, "table_id": 0, "priority": 5, "match": {"in_port": 1}
        }}"#,
    )
    .unwrap();
    assert_eq!(controller.execute(delete).await.unwrap(), CommandResult::Applied);
    assert!(fabric.flows(Dpid(1)).is_empty());
}

#[tokio::test]
async fn periodic_refresh_runs_in_background() {
    let config = ControllerConfig {
        refresh_interval: Duration::from_millis(50),
        ..config()
    };
    let (fabric, controller) = setup_with(config, &[1]).await;
    fabric.install_flow(Dpid(1), &entry(3, 4)).await.unwrap();

    let mut refreshes = controller.subscribe_refreshes();
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.list_flows(Dpid(1)).unwrap().is_empty() {
            refreshes.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
    controller.shutdown().await;
}
