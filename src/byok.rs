//! Per-credential (BYOK) mapping-service cache.
//!
//! One service instance per API key isolates prompts, cost counters, and
//! rate state between users. Entries expire after a TTL and a background
//! sweeper removes them on a fixed cadence; the cache also enforces a
//! maximum entry count, rejecting new keys at the bound.
//!
//! Lock discipline: reads go through the `RwLock` read side; creation
//! re-checks under the write lock so concurrent calls for one key invoke
//! the factory exactly once. Keys never reach the logs; a short SHA-256
//! digest stands in.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use crossbeam_channel::{Sender, bounded, select, tick};
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::ai::ColumnMappingService;

pub type ServiceFactory =
    dyn Fn(&str) -> Result<Arc<dyn ColumnMappingService>> + Send + Sync + 'static;

#[derive(Debug, Clone, Copy)]
pub struct ByokCacheConfig {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
    pub max_entries: usize,
}

impl Default for ByokCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
            max_entries: 100,
        }
    }
}

struct CacheEntry {
    service: Arc<dyn ColumnMappingService>,
    created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

pub struct ByokServiceCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    factory: Box<ServiceFactory>,
    config: ByokCacheConfig,
    shutdown: Sender<()>,
    sweeper: Option<JoinHandle<()>>,
}

impl ByokServiceCache {
    pub fn new(config: ByokCacheConfig, factory: Box<ServiceFactory>) -> Self {
        let entries: Arc<RwLock<HashMap<String, CacheEntry>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let sweeper_entries = Arc::clone(&entries);
        let ttl = config.ttl;
        let ticker = tick(config.cleanup_interval);
        let sweeper = std::thread::spawn(move || {
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let mut guard = sweeper_entries.write().expect("cache lock");
                        let before = guard.len();
                        guard.retain(|_, entry| entry.is_fresh(ttl));
                        let removed = before - guard.len();
                        if removed > 0 {
                            debug!("BYOK sweep removed {removed} expired entry(ies)");
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });

        Self {
            entries,
            factory,
            config,
            shutdown,
            sweeper: Some(sweeper),
        }
    }

    /// Returns the cached service for `api_key`, creating it through the
    /// factory when absent or expired. Exactly one factory call happens per
    /// key even under concurrent access.
    pub fn get_or_create(&self, api_key: &str) -> Result<Arc<dyn ColumnMappingService>> {
        {
            let guard = self.entries.read().expect("cache lock");
            if let Some(entry) = guard.get(api_key)
                && entry.is_fresh(self.config.ttl)
            {
                debug!("BYOK cache hit for key {}", key_digest(api_key));
                return Ok(Arc::clone(&entry.service));
            }
        }

        let mut guard = self.entries.write().expect("cache lock");
        // Re-check: another caller may have created the entry while we
        // waited on the write lock.
        if let Some(entry) = guard.get(api_key) {
            if entry.is_fresh(self.config.ttl) {
                return Ok(Arc::clone(&entry.service));
            }
            guard.remove(api_key);
        }

        if guard.len() >= self.config.max_entries {
            guard.retain(|_, entry| entry.is_fresh(self.config.ttl));
        }
        if guard.len() >= self.config.max_entries {
            bail!(
                "BYOK service cache is full ({} entries)",
                self.config.max_entries
            );
        }

        info!("creating mapping service for key {}", key_digest(api_key));
        let service = (self.factory)(api_key)?;
        guard.insert(
            api_key.to_string(),
            CacheEntry {
                service: Arc::clone(&service),
                created_at: Instant::now(),
            },
        );
        Ok(service)
    }

    pub fn size(&self) -> usize {
        self.entries.read().expect("cache lock").len()
    }

    /// Stops the sweeper and drops all entries. Also runs on drop.
    pub fn close(mut self) {
        self.shutdown_sweeper();
        self.entries.write().expect("cache lock").clear();
    }

    fn shutdown_sweeper(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.sweeper.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ByokServiceCache {
    fn drop(&mut self) {
        self.shutdown_sweeper();
    }
}

fn key_digest(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    let mut rendered = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        rendered.push_str(&format!("{byte:02x}"));
    }
    rendered
}
