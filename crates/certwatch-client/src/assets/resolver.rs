use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::descriptor::{ResourceDescriptor, ResourceId};
use super::registry::{ObjectUrl, ObjectUrlRegistry};
use super::AssetFetcher;
use crate::error::FetchError;

type SharedFetch = Shared<BoxFuture<'static, Result<Bytes, FetchError>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Ready(ObjectUrl),
    /// The download failed; show a placeholder. Not retried unless asked.
    Unavailable,
    /// The descriptor has no storage path, nothing was requested.
    NoSource,
    /// Still downloading. Never part of a published map.
    Pending,
}

/// Outcome of one `resolve` call, keyed by resource id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMap {
    entries: HashMap<ResourceId, AssetStatus>,
}

impl AssetMap {
    pub fn get(&self, id: ResourceId) -> Option<&AssetStatus> {
        self.entries.get(&id)
    }

    pub fn url(&self, id: ResourceId) -> Option<&ObjectUrl> {
        match self.entries.get(&id) {
            Some(AssetStatus::Ready(url)) => Some(url),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &AssetStatus)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Owns one object URL; revokes it exactly once when dropped.
struct AssetHandle {
    url: ObjectUrl,
    registry: Arc<ObjectUrlRegistry>,
}

impl Drop for AssetHandle {
    fn drop(&mut self) {
        if !self.registry.revoke(&self.url) {
            warn!("Object URL {} was already revoked", self.url);
        }
    }
}

enum Slot {
    Pending { ticket: u64, fetch: SharedFetch },
    Ready(AssetHandle),
    Unavailable,
}

#[derive(Default)]
struct ResolverState {
    slots: HashMap<ResourceId, Slot>,
    next_ticket: u64,
    latest_call: u64,
    published: Arc<AssetMap>,
}

/// Per-view cache of downloaded assets.
///
/// Each id is downloaded at most once while it stays in the descriptor set.
/// Ids that leave the set, and everything on `reset` or drop, are released.
/// Downloads that finish after their id was released are thrown away.
pub struct AssetResolver {
    fetcher: Arc<dyn AssetFetcher>,
    registry: Arc<ObjectUrlRegistry>,
    state: Mutex<ResolverState>,
}

impl AssetResolver {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self::with_registry(fetcher, Arc::new(ObjectUrlRegistry::new()))
    }

    pub fn with_registry(fetcher: Arc<dyn AssetFetcher>, registry: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            fetcher,
            registry,
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Download whatever is missing for `descriptors` and publish the resulting map.
    ///
    /// All downloads of the call run concurrently; the map is built and
    /// published only after every one of them has settled. A call overtaken by
    /// a later one (or by `reset`) returns its map without publishing it.
    pub async fn resolve(&self, descriptors: &[ResourceDescriptor]) -> Arc<AssetMap> {
        let (call, waits) = self.begin(descriptors);

        let outcomes = join_all(waits.into_iter().map(|(id, ticket, fetch)| async move {
            (id, ticket, fetch.await)
        }))
        .await;

        let mut state = self.state.lock();
        for (id, ticket, outcome) in outcomes {
            self.settle(&mut state, id, ticket, outcome);
        }

        let map = Arc::new(build_map(&state.slots, descriptors));
        if call == state.latest_call {
            state.published = map.clone();
        } else {
            debug!("Resolve call {} superseded, not publishing", call);
        }
        map
    }

    /// Last published map.
    pub fn snapshot(&self) -> Arc<AssetMap> {
        self.state.lock().published.clone()
    }

    /// Current state of one id, including `Pending` while its download is in flight.
    pub fn status(&self, id: ResourceId) -> Option<AssetStatus> {
        self.state.lock().slots.get(&id).map(|slot| match slot {
            Slot::Pending { .. } => AssetStatus::Pending,
            Slot::Ready(handle) => AssetStatus::Ready(handle.url.clone()),
            Slot::Unavailable => AssetStatus::Unavailable,
        })
    }

    /// Bytes behind a handle, or `None` if it has been released.
    pub fn open(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.registry.get(url)
    }

    /// Forget failed downloads so the next `resolve` requests them again.
    pub fn retry_failed(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.slots.len();
        state.slots.retain(|_, slot| !matches!(slot, Slot::Unavailable));
        before - state.slots.len()
    }

    /// Release every handle and discard in-flight downloads.
    pub fn reset(&self) {
        let released = {
            let mut state = self.state.lock();
            state.latest_call += 1;
            state.published = Arc::new(AssetMap::default());
            std::mem::take(&mut state.slots)
        };
        debug!("Resolver reset, dropping {} entries", released.len());
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }

    fn begin(&self, descriptors: &[ResourceDescriptor]) -> (u64, Vec<(ResourceId, u64, SharedFetch)>) {
        let mut state = self.state.lock();
        state.latest_call += 1;
        let call = state.latest_call;

        let wanted: HashSet<ResourceId> = descriptors
            .iter()
            .filter(|d| d.is_fetchable())
            .map(|d| d.id)
            .collect();
        let before = state.slots.len();
        state.slots.retain(|id, _| wanted.contains(id));
        let dropped = before - state.slots.len();
        if dropped > 0 {
            debug!("Released {} assets no longer displayed", dropped);
        }

        let mut waits = Vec::new();
        let mut seen = HashSet::new();
        for descriptor in descriptors {
            let Some(locator) = descriptor.locator() else {
                continue;
            };
            if !seen.insert(descriptor.id) {
                continue;
            }

            match state.slots.get(&descriptor.id) {
                Some(Slot::Ready(_)) | Some(Slot::Unavailable) => {
                    debug!("Asset {} already resolved", descriptor.id);
                }
                Some(Slot::Pending { ticket, fetch }) => {
                    waits.push((descriptor.id, *ticket, fetch.clone()));
                }
                None => {
                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    let fetch = self.start_fetch(locator);
                    state.slots.insert(
                        descriptor.id,
                        Slot::Pending {
                            ticket,
                            fetch: fetch.clone(),
                        },
                    );
                    waits.push((descriptor.id, ticket, fetch));
                }
            }
        }

        (call, waits)
    }

    fn start_fetch(&self, locator: String) -> SharedFetch {
        let fetcher = self.fetcher.clone();
        async move {
            debug!("Fetching asset {}", locator);
            let result = fetcher.fetch_asset(&locator).await;
            if let Err(e) = &result {
                warn!("Failed to fetch asset {}: {}", locator, e);
            }
            result
        }
        .boxed()
        .shared()
    }

    fn settle(
        &self,
        state: &mut ResolverState,
        id: ResourceId,
        ticket: u64,
        outcome: Result<Bytes, FetchError>,
    ) {
        match state.slots.get(&id) {
            Some(Slot::Pending { ticket: current, .. }) if *current == ticket => {}
            Some(Slot::Pending { .. }) | None => {
                debug!("Discarding stale result for asset {}", id);
                return;
            }
            // Already settled by another call sharing this download.
            Some(_) => return,
        }

        let slot = match outcome {
            Ok(data) => Slot::Ready(AssetHandle {
                url: self.registry.create(data),
                registry: self.registry.clone(),
            }),
            Err(_) => Slot::Unavailable,
        };
        state.slots.insert(id, slot);
    }
}

fn build_map(slots: &HashMap<ResourceId, Slot>, descriptors: &[ResourceDescriptor]) -> AssetMap {
    let mut entries = HashMap::new();
    for descriptor in descriptors {
        if !descriptor.is_fetchable() {
            entries.insert(descriptor.id, AssetStatus::NoSource);
            continue;
        }
        match slots.get(&descriptor.id) {
            Some(Slot::Ready(handle)) => {
                entries.insert(descriptor.id, AssetStatus::Ready(handle.url.clone()));
            }
            Some(Slot::Unavailable) => {
                entries.insert(descriptor.id, AssetStatus::Unavailable);
            }
            Some(Slot::Pending { .. }) | None => {}
        }
    }
    AssetMap { entries }
}
