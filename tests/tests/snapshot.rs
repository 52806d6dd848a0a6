use std::sync::Arc;

use culler_common::config::Config;
use culler_common::policy::grouping::{Grouping, Scope};
use culler_core::pipeline::{self, Pipeline};
use culler_core::store::{Change, SnapshotStore};
use culler_integration_tests::{FixedProbe, SNAPSHOT, hosts};
use tempfile::TempDir;

#[tokio::test]
async fn cleaned_snapshot_survives_a_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("policy.json");
    let output = dir.path().join("policy.cleaned.json");
    std::fs::write(&input, SNAPSHOT).unwrap();

    let store = Arc::new(SnapshotStore::load(&input).unwrap());
    let pipeline = Pipeline::new(store.clone(), Arc::new(FixedProbe::new(&[])), Config::default());
    let groupings = pipeline::load_groupings(store.as_ref()).await.unwrap();
    pipeline
        .run(&hosts(&["10.10.10.10"]), &groupings, &Scope::One(Grouping::named("branch-1")))
        .await
        .unwrap();
    store.save(&output).unwrap();

    let journal = store.journal();
    assert!(journal.contains(&Change::AddressObjectDeleted {
        grouping: Grouping::named("branch-1"),
        name: "old-branch-gw".to_string(),
    }));

    let reloaded = SnapshotStore::load(&output).unwrap().snapshot().unwrap();
    let branch_1 = &reloaded.device_groups["branch-1"];
    assert_eq!(branch_1.address_groups[0].static_members, vec!["printer"]);
    assert_eq!(branch_1.security.pre[0].source_addresses, vec!["printer"]);
    assert_eq!(reloaded.device_groups["branch-2"].addresses.len(), 1);

    let untouched = SnapshotStore::load(&input).unwrap().snapshot().unwrap();
    assert_eq!(untouched.device_groups["branch-1"].addresses.len(), 2);
}

#[test]
fn missing_snapshot_reports_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = SnapshotStore::load(&path).err().unwrap();
    assert!(format!("{err:#}").contains("absent.json"));
}
