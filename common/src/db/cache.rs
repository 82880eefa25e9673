use crate::db::extractor::SchemaSource;
use crate::error::Result;
use crate::schema::DatabaseSchema;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone)]
pub struct CachedSchema {
    pub schema: Arc<DatabaseSchema>,
    pub extracted_at: Instant,
}

impl CachedSchema {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.extracted_at.elapsed() < ttl
    }
}

type Slot = Arc<Mutex<Option<CachedSchema>>>;

/// ttl cache of extracted schemas keyed by database name
///
/// Each key owns its own async mutex, so concurrent misses for one database
/// run a single extraction while other keys proceed independently.
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SchemaCache {
    pub fn new(source: Arc<dyn SchemaSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// drop a never-filled slot so failed names do not accumulate
    async fn forget_slot(&self, key: &str, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    #[tracing::instrument(skip(self, db_name), fields(cache.key = db_name.unwrap_or(DEFAULT_KEY)))]
    pub async fn get(&self, db_name: Option<&str>) -> Result<Arc<DatabaseSchema>> {
        let key = db_name.unwrap_or(DEFAULT_KEY);
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(self.ttl) {
                tracing::debug!(
                    age_secs = cached.extracted_at.elapsed().as_secs_f64(),
                    "using cached schema"
                );
                return Ok(Arc::clone(&cached.schema));
            }
        }

        tracing::info!("refreshing schema cache for {}", key);
        let schema = match self.source.extract_schema(db_name).await {
            Ok(schema) => Arc::new(schema),
            Err(e) => {
                if entry.is_none() {
                    self.forget_slot(key, &slot).await;
                }
                return Err(e);
            }
        };
        *entry = Some(CachedSchema {
            schema: Arc::clone(&schema),
            extracted_at: Instant::now(),
        });

        Ok(schema)
    }

    /// context string for prompts, served from the same cache entry
    pub async fn get_context(&self, db_name: Option<&str>) -> Result<String> {
        Ok(self.get(db_name).await?.to_context_string())
    }

    /// drop one entry, or every entry when no name is given
    pub async fn invalidate(&self, db_name: Option<&str>) {
        let mut slots = self.slots.lock().await;
        match db_name {
            Some(name) => {
                tracing::info!("invalidating schema cache for {}", name);
                slots.remove(name);
            }
            None => {
                tracing::info!("invalidating all schema caches");
                slots.clear();
            }
        }
    }

    /// keys currently holding a schema
    pub async fn cached_keys(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = {
            let guard = self.slots.lock().await;
            guard
                .iter()
                .map(|(k, v)| (k.clone(), Arc::clone(v)))
                .collect()
        };

        let mut keys = Vec::new();
        for (key, slot) in slots {
            if slot.lock().await.is_some() {
                keys.push(key);
            }
        }
        keys.sort();
        keys
    }
}
