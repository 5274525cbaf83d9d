use crate::backend::ContainerBackend;
use crate::model::ContainerSize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Container size statistics keyed by container id.
///
/// Computing sizes makes the daemon walk every layer, so the map is filled by
/// detached tasks and only read from the render path. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct SizeCache {
    entries: Arc<Mutex<HashMap<String, ContainerSize>>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &str) -> Option<ContainerSize> {
        self.lock().get(id).copied()
    }

    pub fn update_one(&self, id: impl Into<String>, size: ContainerSize) {
        self.lock().insert(id.into(), size);
    }

    /// Lists every container with sizes once and records them all under a
    /// single lock acquisition.
    pub fn populate_all<B: ContainerBackend>(&self, backend: &B) -> JoinHandle<()> {
        let cache = self.clone();
        let backend = backend.clone();
        tokio::spawn(async move {
            match backend.list_containers(true).await {
                Ok(containers) => {
                    let mut entries = cache.lock();
                    let mut recorded = 0usize;
                    for container in containers {
                        if let Some(size) = container.size() {
                            entries.insert(container.id, size);
                            recorded += 1;
                        }
                    }
                    debug!("size cache populated with {recorded} containers");
                }
                Err(error) => warn!("size cache population failed: {error:#}"),
            }
        })
    }

    /// Inspects one container with sizes and overwrites its entry.
    pub fn probe<B: ContainerBackend>(&self, backend: &B, id: String) -> JoinHandle<()> {
        let cache = self.clone();
        let backend = backend.clone();
        tokio::spawn(async move {
            match backend.inspect_container_size(&id).await {
                Ok(size) => cache.update_one(id, size),
                Err(error) => debug!("size probe failed for {id}: {error:#}"),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ContainerSize>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::SizeCache;
    use crate::backend::fake::FakeBackend;
    use crate::model::{ContainerItem, ContainerSize};
    use std::thread;

    #[test]
    fn lookup_of_unknown_id_is_none() {
        let cache = SizeCache::new();
        assert_eq!(cache.lookup("missing"), None);
    }

    #[test]
    fn update_one_overwrites_entry() {
        let cache = SizeCache::new();
        cache.update_one(
            "c1",
            ContainerSize {
                size_rw: 1,
                root_fs: 2,
            },
        );
        cache.update_one(
            "c1",
            ContainerSize {
                size_rw: 3,
                root_fs: 4,
            },
        );
        assert_eq!(
            cache.lookup("c1"),
            Some(ContainerSize {
                size_rw: 3,
                root_fs: 4
            })
        );
    }

    #[test]
    fn independent_instances_do_not_share_entries() {
        let first = SizeCache::new();
        let second = SizeCache::new();
        first.update_one("c1", ContainerSize::default());
        assert!(second.lookup("c1").is_none());
        assert!(first.clone().lookup("c1").is_some());
    }

    #[test]
    fn concurrent_readers_never_observe_mixed_fields() {
        let cache = SizeCache::new();
        cache.update_one(
            "c1",
            ContainerSize {
                size_rw: 0,
                root_fs: 0,
            },
        );

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for value in 1..5_000i64 {
                    cache.update_one(
                        "c1",
                        ContainerSize {
                            size_rw: value,
                            root_fs: value,
                        },
                    );
                }
            })
        };

        let reader = {
            let cache = cache.clone();
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let size = cache.lookup("c1").unwrap_or_default();
                    assert_eq!(size.size_rw, size.root_fs);
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[tokio::test]
    async fn populate_all_records_listed_sizes() {
        let backend = FakeBackend::new();
        backend.set_containers(vec![
            ContainerItem {
                id: "c1".to_string(),
                size_rw: Some(10),
                size_root_fs: Some(100),
                ..ContainerItem::default()
            },
            ContainerItem {
                id: "c2".to_string(),
                ..ContainerItem::default()
            },
        ]);

        let cache = SizeCache::new();
        cache.populate_all(&backend).await.unwrap();

        assert_eq!(
            cache.lookup("c1"),
            Some(ContainerSize {
                size_rw: 10,
                root_fs: 100
            })
        );
        assert!(cache.lookup("c2").is_none());
    }

    #[tokio::test]
    async fn probe_updates_single_entry() {
        let backend = FakeBackend::new();
        backend.set_containers(vec![ContainerItem {
            id: "c1".to_string(),
            size_rw: Some(7),
            size_root_fs: Some(70),
            ..ContainerItem::default()
        }]);

        let cache = SizeCache::new();
        cache.probe(&backend, "c1".to_string()).await.unwrap();
        assert_eq!(
            cache.lookup("c1"),
            Some(ContainerSize {
                size_rw: 7,
                root_fs: 70
            })
        );
    }
}
