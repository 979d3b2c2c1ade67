//! Region geocoding
//!
//! The engine only consumes the `region -> coordinates | not found` contract.
//! Network geocoders live outside this crate; [`CatalogGeocoder`] is the
//! offline stand-in and [`CachedGeocoder`] memoizes any implementation.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sommelier_core::{Catalog, Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// Resolves a free-text region name to coordinates
pub trait Geocoder: Send + Sync {
    /// `None` when the region is unknown
    fn geocode(&self, region: &str) -> Option<Coordinates>;
}

/// Geocoder that never resolves anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn geocode(&self, _region: &str) -> Option<Coordinates> {
        None
    }
}

fn region_key(region: &str) -> String {
    region.trim().to_lowercase()
}

/// Resolves regions to the mean coordinates of catalog wines from that region
#[derive(Debug, Clone, Default)]
pub struct CatalogGeocoder {
    regions: AHashMap<String, Coordinates>,
}

impl CatalogGeocoder {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut sums: AHashMap<String, (f64, f64, usize)> = AHashMap::new();
        for wine in catalog.iter() {
            let (Some(region), Some(lat), Some(lon)) = (&wine.region, wine.latitude, wine.longitude) else {
                continue;
            };
            if !lat.is_finite() || !lon.is_finite() || region.trim().is_empty() {
                continue;
            }
            let entry = sums.entry(region_key(region)).or_insert((0.0, 0.0, 0));
            entry.0 += lat;
            entry.1 += lon;
            entry.2 += 1;
        }

        let regions: AHashMap<String, Coordinates> = sums
            .into_iter()
            .map(|(key, (lat, lon, n))| (key, Coordinates::new(lat / n as f64, lon / n as f64)))
            .collect();

        tracing::debug!(regions = regions.len(), "catalog geocoder ready");
        Self { regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Geocoder for CatalogGeocoder {
    fn geocode(&self, region: &str) -> Option<Coordinates> {
        self.regions.get(&region_key(region)).copied()
    }
}

/// Default number of regions a [`CachedGeocoder`] remembers
pub const DEFAULT_GEOCODE_CACHE_CAPACITY: usize = 10_000;

/// Memoizing wrapper; not-found answers are cached too.
///
/// The cache holds at most `capacity` regions. When it is full, cached
/// misses are evicted first; if it is still full, new answers are returned
/// without being cached.
pub struct CachedGeocoder<G> {
    inner: G,
    capacity: usize,
    cache: RwLock<AHashMap<String, Option<Coordinates>>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            capacity: DEFAULT_GEOCODE_CACHE_CAPACITY,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn remember(
        &self,
        cache: &mut AHashMap<String, Option<Coordinates>>,
        key: String,
        value: Option<Coordinates>,
    ) {
        if cache.len() >= self.capacity && !cache.contains_key(&key) {
            cache.retain(|_, v| v.is_some());
            if cache.len() >= self.capacity {
                tracing::debug!(capacity = self.capacity, "geocode cache full, not caching");
                return;
            }
        }
        cache.insert(key, value);
    }

    /// Wrap `inner`, seeding the cache from a JSON file written by [`save_cache`]
    ///
    /// [`save_cache`]: CachedGeocoder::save_cache
    pub fn with_cache_file(inner: G, path: &Path) -> Result<Self> {
        let geocoder = Self::new(inner);
        if !path.exists() {
            return Ok(geocoder);
        }

        let data = std::fs::read(path)?;
        let entries: BTreeMap<String, Option<Coordinates>> =
            serde_json::from_slice(&data).map_err(|e| Error::Serialization(e.to_string()))?;
        {
            let mut cache = geocoder.cache.write();
            for (region, coordinates) in entries {
                geocoder.remember(&mut cache, region_key(&region), coordinates);
            }
        }

        tracing::debug!(entries = geocoder.cache_len(), "loaded geocode cache");
        Ok(geocoder)
    }

    /// Write the cache as JSON, sorted by region
    pub fn save_cache(&self, path: &Path) -> Result<()> {
        let entries: BTreeMap<String, Option<Coordinates>> = self
            .cache
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let json = serde_json::to_vec_pretty(&entries).map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn geocode(&self, region: &str) -> Option<Coordinates> {
        let key = region_key(region);
        if let Some(hit) = self.cache.read().get(&key) {
            return *hit;
        }

        let resolved = self.inner.geocode(region);
        self.remember(&mut self.cache.write(), key, resolved);
        resolved
    }
}

/// Geocode on a helper thread, giving up after `timeout`.
///
/// A slow lookup keeps running in the background, but its answer is dropped.
pub fn resolve_with_timeout(
    geocoder: &Arc<dyn Geocoder>,
    region: &str,
    timeout: Duration,
) -> Option<Coordinates> {
    let (tx, rx) = mpsc::channel();
    let geocoder = Arc::clone(geocoder);
    let query = region.to_string();

    let spawned = thread::Builder::new()
        .name("geocode".to_string())
        .spawn(move || {
            let _ = tx.send(geocoder.geocode(&query));
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to spawn geocode thread");
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(coordinates) => coordinates,
        Err(_) => {
            tracing::warn!(region, timeout_ms = timeout.as_millis() as u64, "geocode timed out");
            None
        }
    }
}
