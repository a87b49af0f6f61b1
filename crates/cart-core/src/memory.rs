use crate::error::PersistenceResult;
use crate::persistence::PersistenceAdapter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory adapter for tests and ephemeral sessions.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    values: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryAdapter {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert(key.into(), value.into());
        Self {
            values: Arc::new(RwLock::new(map)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    async fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PersistenceResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    fn adapter_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let adapter = MemoryAdapter::new();
        assert_eq!(adapter.get("k").await.unwrap(), None);

        adapter.set("k", "[]").await.unwrap();
        assert_eq!(adapter.get("k").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(adapter.write_count(), 1);

        adapter.remove("k").await.unwrap();
        adapter.remove("k").await.unwrap();
        assert!(!adapter.contains("k").await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let adapter = MemoryAdapter::with_value("k", "v");
        let other = adapter.clone();

        other.remove("k").await.unwrap();
        assert!(!adapter.contains("k").await);
    }
}
