use std::sync::Arc;

use culler_common::config::Config;
use culler_common::error::CullError;
use culler_common::policy::grouping::{Grouping, Scope};
use culler_common::policy::outcome::{Stage, Status};
use culler_core::pipeline::{self, Pipeline};
use culler_core::store::SnapshotStore;
use culler_integration_tests::{FixedProbe, FlakyProbe, RecordingStore, host, hosts, snapshot_store};

fn branch(name: &str) -> Grouping {
    Grouping::named(name)
}

fn pipeline(store: &Arc<RecordingStore>, reachable: &[&str], dry_run: bool) -> Pipeline {
    let cfg = Config {
        dry_run,
        ..Default::default()
    };
    Pipeline::new(store.clone(), Arc::new(FixedProbe::new(reachable)), cfg)
}

#[tokio::test]
async fn stale_gateway_is_removed_from_its_branch() {
    let snapshot = r#"{
        "device_groups": {
            "branch-1": {
                "addresses": [{ "name": "old-branch-gw", "value": "10.10.10.10/32" }],
                "address_groups": [{ "name": "gateways", "static_members": ["old-branch-gw", "dns"] }],
                "security": { "pre": [{ "name": "allow-gw", "source_addresses": ["old-branch-gw"], "destination_addresses": ["any"] }] },
                "nat": { "pre": [{ "name": "snat-gw", "source_addresses": ["old-branch-gw"] }] }
            }
        }
    }"#;
    let store = Arc::new(RecordingStore::new(SnapshotStore::new(
        serde_json::from_str(snapshot).unwrap(),
    )));
    let pipeline = pipeline(&store, &["8.8.8.8"], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["8.8.8.8", "10.10.10.10"]), &groupings, &Scope::One(branch("branch-1")))
        .await
        .unwrap();

    assert_eq!(report.partition.stale(), &hosts(&["10.10.10.10"]));
    let names: Vec<&str> = report.matched.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["old-branch-gw"]);

    let stages: Vec<Stage> = report.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(stages, Stage::ORDER.to_vec());
    assert!(report.outcomes.iter().all(|o| o.status == Status::Done { edits: 1 }));
    assert_eq!(report.summary().done, 4);

    let after = store.inner().snapshot().unwrap();
    let set = after.policy_set(&branch("branch-1")).unwrap();
    assert!(set.addresses.is_empty());
    assert_eq!(set.address_groups[0].static_members, vec!["dns"]);
    assert!(set.security.pre[0].source_addresses.is_empty());
    assert_eq!(set.nat.pre[0].nat_type.as_deref(), Some("ipv4"));
}

#[tokio::test]
async fn all_scope_keeps_objects_that_shared_groups_still_use() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &["8.8.8.8"], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["8.8.8.8", "10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    let names: Vec<&str> = report.matched.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["old-branch-gw", "old-shared"]);
    assert_eq!(report.matched[0].grouping, branch("branch-1"));

    // address groups in two groupings, the other three stages in three
    assert_eq!(report.outcomes.len(), 2 * 2 + 3 * 2 * 3);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].grouping.is_shared());
    assert_eq!(failures[0].object, "old-shared");
    assert_eq!(failures[0].stage, Stage::ObjectDeletion);
    match &failures[0].status {
        Status::Failed { reason } => assert!(reason.contains("address group 'infra'"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(
        !report
            .outcomes
            .iter()
            .any(|o| o.stage == Stage::AddressGroupRef && o.grouping.is_shared())
    );

    let after = store.inner().snapshot().unwrap();
    assert_eq!(after.shared.address_groups[0].static_members, vec!["old-shared", "dns"]);
    let shared_names: Vec<&str> = after.shared.addresses.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(shared_names, vec!["dns", "old-shared"]);
    assert!(after.shared.security.post[0].source_addresses.is_empty());
    for member in after.shared.address_groups.iter().flat_map(|g| &g.static_members) {
        assert!(after.shared.addresses.iter().any(|a| &a.name == member), "dangling member {member}");
    }
    assert!(after.device_groups["branch-2"].addresses.is_empty());
    let branch_1: Vec<&str> = after.device_groups["branch-1"]
        .addresses
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(branch_1, vec!["printer"]);
}

#[tokio::test]
async fn stages_never_overlap_across_groupings() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &[], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    let stage_ops: [&[&str]; 4] = [
        &["fetch_address_groups", "edit_address_group"],
        &["fetch_security_rules", "edit_security_rule"],
        &["fetch_nat_rules", "edit_nat_rule"],
        &["list_address_object_names", "delete_address_object"],
    ];
    let spans: Vec<(usize, usize)> = stage_ops
        .iter()
        .map(|ops| {
            let found: Vec<(usize, usize)> = ops.iter().filter_map(|op| store.span_of(op)).collect();
            let first = found.iter().map(|s| s.0).min().unwrap();
            let last = found.iter().map(|s| s.1).max().unwrap();
            (first, last)
        })
        .collect();

    for pair in spans.windows(2) {
        assert!(pair[0].1 < pair[1].0, "stage spans overlap: {spans:?}");
    }

    let (_, last_index_fetch) = store.span_of("fetch_address_objects").unwrap();
    assert!(last_index_fetch < spans[0].0);
}

#[tokio::test]
async fn rejected_edit_keeps_the_object_it_still_references() {
    let store = Arc::new(RecordingStore::new(snapshot_store()).rejecting("allow-gw"));
    let pipeline = pipeline(&store, &[], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::One(branch("branch-1")))
        .await
        .unwrap();

    let failures: Vec<(&str, Stage)> = report
        .failures()
        .map(|o| (o.object.as_str(), o.stage))
        .collect();
    assert_eq!(
        failures,
        vec![("old-branch-gw", Stage::SecurityRule), ("old-branch-gw", Stage::ObjectDeletion)]
    );
    for failure in report.failures() {
        match &failure.status {
            Status::Failed { reason } => assert!(reason.contains("allow-gw"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    let after = store.inner().snapshot().unwrap();
    let branch_1 = &after.device_groups["branch-1"];
    assert_eq!(branch_1.security.pre[0].source_addresses, vec!["old-branch-gw", "printer"]);
    assert!(branch_1.security.post[0].destination_addresses.is_empty());
    assert_eq!(branch_1.address_groups[0].static_members, vec!["printer"]);
    assert!(branch_1.nat.pre[0].source_addresses.is_empty());
    assert!(branch_1.addresses.iter().any(|a| a.name == "old-branch-gw"));
}

#[tokio::test]
async fn one_rejected_edit_leaves_other_objects_and_groupings_unaffected() {
    let snapshot = r#"{
        "device_groups": {
            "branch-1": {
                "addresses": [
                    { "name": "old-gw", "value": "10.10.10.10" },
                    { "name": "old-db", "value": "10.20.20.20/32" }
                ],
                "address_groups": [{ "name": "servers", "static_members": ["old-gw", "old-db"] }],
                "security": { "pre": [
                    { "name": "allow-gw", "source_addresses": ["old-gw"], "destination_addresses": ["any"] },
                    { "name": "allow-db", "source_addresses": ["any"], "destination_addresses": ["old-db"] }
                ] },
                "nat": { "pre": [{ "name": "snat-db", "source_addresses": ["old-db"] }] }
            },
            "branch-2": {
                "addresses": [{ "name": "old-db", "value": "10.20.20.20" }],
                "address_groups": [{ "name": "databases", "static_members": ["old-db"] }],
                "security": { "post": [{ "name": "allow-db-2", "source_addresses": ["old-db"] }] },
                "nat": { "post": [{ "name": "dnat-db", "destination_addresses": ["old-db"] }] }
            }
        }
    }"#;
    let store = Arc::new(
        RecordingStore::new(SnapshotStore::new(serde_json::from_str(snapshot).unwrap())).rejecting("allow-gw"),
    );
    let pipeline = pipeline(&store, &[], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["10.10.10.10", "10.20.20.20"]), &groupings, &Scope::All)
        .await
        .unwrap();

    let names: Vec<&str> = report.matched.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["old-db", "old-gw"]);

    for grouping in [branch("branch-1"), branch("branch-2")] {
        for stage in Stage::ORDER {
            let outcome = report
                .outcomes
                .iter()
                .find(|o| o.grouping == grouping && o.object == "old-db" && o.stage == stage)
                .unwrap();
            assert!(
                matches!(outcome.status, Status::Done { edits } if edits >= 1),
                "{grouping} {stage}: {:?}",
                outcome.status
            );
        }
    }

    let failures: Vec<(&Grouping, &str, Stage)> = report
        .failures()
        .map(|o| (&o.grouping, o.object.as_str(), o.stage))
        .collect();
    let branch_1 = branch("branch-1");
    assert_eq!(
        failures,
        vec![
            (&branch_1, "old-gw", Stage::SecurityRule),
            (&branch_1, "old-gw", Stage::ObjectDeletion),
        ]
    );

    let after = store.inner().snapshot().unwrap();
    let kept: Vec<&str> = after.device_groups["branch-1"]
        .addresses
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(kept, vec!["old-gw"]);
    assert!(after.device_groups["branch-2"].addresses.is_empty());
}

#[tokio::test]
async fn unreadable_rulebase_skips_the_rest_of_that_grouping() {
    let store = Arc::new(RecordingStore::new(snapshot_store()).failing("fetch_security_rules", branch("branch-2")));
    let pipeline = pipeline(&store, &[], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    let branch_2: Vec<(Stage, bool, bool)> = report
        .outcomes
        .iter()
        .filter(|o| o.grouping == branch("branch-2") && o.object == "old-branch-gw")
        .map(|o| (o.stage, o.is_failure(), matches!(o.status, Status::Skipped { .. })))
        .collect();
    assert_eq!(
        branch_2,
        vec![
            (Stage::AddressGroupRef, false, false),
            (Stage::SecurityRule, true, false),
            (Stage::NatRule, false, true),
            (Stage::ObjectDeletion, false, true),
        ]
    );

    let after = store.inner().snapshot().unwrap();
    assert_eq!(after.device_groups["branch-2"].addresses.len(), 1);
    assert!(after.device_groups["branch-1"].addresses.iter().all(|a| a.name != "old-branch-gw"));
    assert!(
        store
            .calls()
            .iter()
            .all(|c| !(c.op == "delete_address_object" && c.grouping == Some(branch("branch-2"))))
    );
}

#[tokio::test]
async fn unreadable_grouping_only_empties_its_index() {
    let store = Arc::new(RecordingStore::new(snapshot_store()).failing("fetch_address_objects", branch("branch-1")));
    let pipeline = pipeline(&store, &[], true);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    assert_eq!(report.index_failures.len(), 1);
    assert!(matches!(
        &report.index_failures[0],
        CullError::GroupingFetch { grouping, .. } if *grouping == branch("branch-1")
    ));
    let found: Vec<(&str, &Grouping)> = report.matched.iter().map(|m| (m.name(), &m.grouping)).collect();
    assert_eq!(
        found,
        vec![("old-branch-gw", &branch("branch-2")), ("old-shared", &Grouping::Shared)]
    );
}

#[tokio::test]
async fn dry_run_leaves_the_store_untouched() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &[], true);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    assert_eq!(report.matched.len(), 2);
    assert!(report.outcomes.is_empty());
    assert!(store.inner().journal().is_empty());
    assert!(store.calls().iter().all(|c| !c.op.starts_with("edit") && !c.op.starts_with("delete")));
}

#[tokio::test]
async fn failing_probe_counts_hosts_as_stale() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let cfg = Config {
        dry_run: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(store.clone(), Arc::new(FlakyProbe), cfg);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["8.8.8.8"]), &groupings, &Scope::All)
        .await
        .unwrap();

    assert!(report.partition.stale().contains(&host("8.8.8.8")));
    let names: Vec<&str> = report.matched.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["dns"]);
}

#[tokio::test]
async fn everything_reachable_means_no_lookups() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &["8.8.8.8", "10.10.10.10"], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let report = pipeline
        .run(&hosts(&["8.8.8.8", "10.10.10.10"]), &groupings, &Scope::All)
        .await
        .unwrap();

    assert!(report.matched.is_empty());
    assert!(report.outcomes.is_empty());
    assert!(store.span_of("fetch_address_objects").is_none());
}

#[tokio::test]
async fn unknown_scope_is_rejected_before_probing() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &[], false);
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();

    let err = pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::One(branch("branch-9")))
        .await
        .unwrap_err();

    assert!(matches!(err, CullError::UnknownGrouping(ref name) if name == "branch-9"));
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn empty_host_list_is_rejected() {
    let store = Arc::new(RecordingStore::new(snapshot_store()));
    let pipeline = pipeline(&store, &[], false);

    let err = pipeline.run(&hosts(&[]), &[Grouping::Shared], &Scope::All).await.unwrap_err();
    assert!(matches!(err, CullError::NoHosts));
}
