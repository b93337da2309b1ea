use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::types::AgentError;

/// `CacheOptions` governs how a resolution consults the cache
///
/// - `no_cache`: bypass the cache, the resolved document is not stored
/// - `ttl_seconds`: maximum age of a cached document, absent means no expiry
/// - `force_refresh`: bypass the cached value but store the resolved document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    #[serde(default)]
    pub no_cache: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,

    #[serde(default)]
    pub force_refresh: bool,
}

impl CacheOptions {
    pub fn no_cache() -> Self {
        Self {
            no_cache: true,
            ..Default::default()
        }
    }

    pub fn force_refresh() -> Self {
        Self {
            force_refresh: true,
            ..Default::default()
        }
    }

    pub fn with_ttl(seconds: u64) -> Self {
        Self {
            ttl_seconds: Some(seconds),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ResourceKind {
    Schema,
    CredentialDefinition,
    RevocationRegistryDefinition,
    DidDocument,
}

/// `LedgerBuilder` resolves ledger documents by their fully qualified identifier
///
/// An unknown identifier must be reported as [`AgentError::ResolutionFailed`]
#[async_trait]
pub trait LedgerBuilder: Send + Sync {
    async fn resolve(
        &self,
        kind: ResourceKind,
        id: &str,
        options: &CacheOptions,
    ) -> Result<Value, AgentError>;

    async fn close(&self) -> Result<(), AgentError>;
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// `CachingResolver` decorates any [`LedgerBuilder`] with an in-memory resolution cache
/// honouring the given [`CacheOptions`]
pub struct CachingResolver<TLedger>
where
    TLedger: LedgerBuilder,
{
    inner: TLedger,
    entries: Mutex<HashMap<(ResourceKind, String), CacheEntry>>,
}

impl<TLedger> CachingResolver<TLedger>
where
    TLedger: LedgerBuilder,
{
    pub fn new(inner: TLedger) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &(ResourceKind, String), ttl: Option<u64>) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match (entries.get(key), ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= Duration::from_secs(ttl),
            (Some(_), None) => false,
        };

        if expired {
            trace!("[cache] evicting expired {}: {}", key.0, key.1);
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    fn store(&self, key: (ResourceKind, String), value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

#[async_trait]
impl<TLedger> LedgerBuilder for CachingResolver<TLedger>
where
    TLedger: LedgerBuilder,
{
    async fn resolve(
        &self,
        kind: ResourceKind,
        id: &str,
        options: &CacheOptions,
    ) -> Result<Value, AgentError> {
        let key = (kind, id.to_string());

        if !options.no_cache && !options.force_refresh {
            if let Some(value) = self.lookup(&key, options.ttl_seconds) {
                trace!("[cache] hit {}: {}", kind, id);
                return Ok(value);
            }
        }

        debug!("[cache] resolving {}: {}", kind, id);
        let value = self.inner.resolve(kind, id, options).await?;

        if !options.no_cache {
            self.store(key, value.clone());
        }

        Ok(value)
    }

    async fn close(&self) -> Result<(), AgentError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }

        self.inner.close().await
    }
}
