//! # Reference Index
//!
//! Finds the address objects that stand for stale hosts, in two phases:
//!
//! 1. **Build**: fetch every grouping's address objects concurrently into a
//!    map keyed by grouping. A grouping that cannot be fetched contributes an
//!    empty index and a recorded [`CullError::GroupingFetch`].
//! 2. **Match**: run [`find_host`] for every stale host and grouping pair
//!    concurrently, funnelling hits into one consumer.
//!
//! The build phase is fully joined before matching starts. The result is
//! deduplicated by object name.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use culler_common::error::{self, CullError};
use culler_common::network::host::Host;
use culler_common::policy::grouping::Grouping;
use culler_common::policy::objects::{AddressObject, MatchedObject};
use culler_common::store::PolicyStore;
use tracing::{debug, warn};

use crate::concurrency::FanOut;

/// Address objects per grouping.
pub type ObjectIndex = HashMap<Grouping, Arc<Vec<AddressObject>>>;

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    /// Matched objects, unique by name, sorted by name.
    pub matched: Vec<MatchedObject>,
    /// Groupings whose objects could not be fetched.
    pub failures: Vec<CullError>,
}

/// Fetches one grouping's address objects.
pub async fn build_object_index(
    store: &dyn PolicyStore,
    grouping: &Grouping,
) -> Result<Vec<AddressObject>, CullError> {
    store
        .fetch_address_objects(grouping)
        .await
        .map_err(|e| CullError::GroupingFetch {
            grouping: grouping.clone(),
            reason: error::reason(&e),
        })
}

/// Every object in `objects` whose value is `host`, with or without a prefix length.
pub fn find_host(host: &Host, grouping: &Grouping, objects: &[AddressObject]) -> Vec<MatchedObject> {
    objects
        .iter()
        .filter(|object| object.refers_to(host))
        .map(|object| MatchedObject {
            object: object.clone(),
            host: *host,
            grouping: grouping.clone(),
        })
        .collect()
}

pub async fn resolve(
    store: Arc<dyn PolicyStore>,
    stale: &BTreeSet<Host>,
    groupings: &[Grouping],
    max_tasks: Option<usize>,
) -> ReferenceIndex {
    let (index, failures) = build_phase(store, groupings, max_tasks).await;
    let matched = match_phase(stale, &index, max_tasks).await;
    ReferenceIndex { matched, failures }
}

async fn build_phase(
    store: Arc<dyn PolicyStore>,
    groupings: &[Grouping],
    max_tasks: Option<usize>,
) -> (ObjectIndex, Vec<CullError>) {
    let mut fan = FanOut::spawn(groupings.iter().cloned(), max_tasks, |grouping| {
        let store = store.clone();
        async move {
            let objects = build_object_index(store.as_ref(), &grouping).await;
            Some((grouping, objects))
        }
    });

    let mut index: ObjectIndex = HashMap::with_capacity(groupings.len());
    let mut failures: Vec<CullError> = Vec::new();
    while let Some((grouping, objects)) = fan.recv().await {
        match objects {
            Ok(objects) => {
                debug!(%grouping, count = objects.len(), "indexed address objects");
                index.insert(grouping, Arc::new(objects));
            }
            Err(e) => {
                warn!("{e}");
                failures.push(e);
                index.insert(grouping, Arc::new(Vec::new()));
            }
        }
    }
    fan.finish().await;

    for grouping in groupings {
        if !index.contains_key(grouping) {
            let e = CullError::GroupingFetch {
                grouping: grouping.clone(),
                reason: "index task did not complete".into(),
            };
            warn!("{e}");
            failures.push(e);
            index.insert(grouping.clone(), Arc::new(Vec::new()));
        }
    }

    (index, failures)
}

async fn match_phase(
    stale: &BTreeSet<Host>,
    index: &ObjectIndex,
    max_tasks: Option<usize>,
) -> Vec<MatchedObject> {
    let pairs = stale.iter().flat_map(|host| {
        index
            .iter()
            .map(move |(grouping, objects)| (*host, grouping.clone(), objects.clone()))
    });

    let mut fan = FanOut::spawn(pairs, max_tasks, |(host, grouping, objects)| async move {
        let found = find_host(&host, &grouping, &objects);
        (!found.is_empty()).then_some(found)
    });

    let mut matched: Vec<MatchedObject> = Vec::new();
    while let Some(found) = fan.recv().await {
        matched.extend(found);
    }
    fan.finish().await;

    dedup_by_name(matched)
}

/// Keeps one entry per object name, preferring the lowest grouping then host.
fn dedup_by_name(mut matched: Vec<MatchedObject>) -> Vec<MatchedObject> {
    matched.sort_by(|a, b| {
        (a.name(), &a.grouping, &a.host).cmp(&(b.name(), &b.grouping, &b.host))
    });
    let mut seen: HashSet<String> = HashSet::with_capacity(matched.len());
    matched.retain(|m| seen.insert(m.name().to_string()));
    matched
}
