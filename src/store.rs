//! Resource store with byte-bounded LRU eviction
//!
//! Each context indexes the rasters its callers currently hold, so a repeat
//! render of the same page at the same zoom skips the engine while an earlier
//! pixmap is still alive. The store keeps only weak references: it never
//! keeps pixel memory alive by itself, and an entry leaves the store when the
//! last pixmap holding it is dropped. The store only changes how much work is
//! done, never what a caller receives.

use std::sync::Weak;

use lru::LruCache;
use serde::Serialize;

use crate::config::StoreLimit;
use crate::pixmap::PixelData;

/// Key for one cached raster
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub(crate) struct RasterKey {
    pub document: u64,
    pub page: i32,
    /// Zoom factor as raw bits, so distinct values never collide
    pub zoom: u32,
    pub alpha: bool,
}

impl RasterKey {
    pub(crate) fn new(document: u64, page: i32, zoom: f32, alpha: bool) -> Self {
        Self {
            document,
            page,
            zoom: zoom.to_bits(),
            alpha,
        }
    }
}

/// Store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Bytes of live rasters currently indexed
    pub bytes: usize,
    pub entries: usize,
}

struct StoredRaster {
    width: u32,
    height: u32,
    components: u8,
    samples: Weak<[u8]>,
    len: usize,
}

impl StoredRaster {
    fn new(data: &PixelData) -> Self {
        Self {
            width: data.width(),
            height: data.height(),
            components: data.components(),
            samples: data.downgrade(),
            len: data.byte_len(),
        }
    }

    fn upgrade(&self) -> Option<PixelData> {
        self.samples
            .upgrade()
            .map(|samples| PixelData::from_shared(self.width, self.height, self.components, samples))
    }

    fn holds(&self, data: &PixelData) -> bool {
        Weak::ptr_eq(&self.samples, &data.downgrade())
    }
}

pub(crate) struct ResourceStore {
    limit: StoreLimit,
    rasters: LruCache<RasterKey, StoredRaster>,
    bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ResourceStore {
    pub(crate) fn new(limit: StoreLimit) -> Self {
        Self {
            limit,
            rasters: LruCache::unbounded(),
            bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub(crate) fn get(&mut self, key: &RasterKey) -> Option<PixelData> {
        let found = self.rasters.get(key).and_then(StoredRaster::upgrade);
        match found {
            Some(data) => {
                self.hits += 1;
                Some(data)
            }
            None => {
                if let Some(dead) = self.rasters.pop(key) {
                    self.bytes -= dead.len;
                }
                self.misses += 1;
                None
            }
        }
    }

    /// Index `data`, evicting least recently used entries to stay under the
    /// limit. Items larger than the limit are not indexed.
    pub(crate) fn put(&mut self, key: RasterKey, data: &PixelData) {
        let size = data.byte_len();
        let max = self.limit.max_bytes();

        if max.is_some_and(|max| size > max) {
            return;
        }

        if let Some(old) = self.rasters.pop(&key) {
            self.bytes -= old.len;
        }

        if let Some(max) = max {
            while self.bytes + size > max {
                match self.rasters.pop_lru() {
                    Some((_, evicted)) => {
                        self.bytes -= evicted.len;
                        self.evictions += 1;
                    }
                    None => break,
                }
            }
        }

        self.bytes += size;
        self.rasters.put(key, StoredRaster::new(data));
    }

    /// Called as a pixmap drops; removes the entry once `data` is the last
    /// holder of the indexed samples. Returns whether an entry was removed.
    pub(crate) fn release(&mut self, key: &RasterKey, data: &PixelData) -> bool {
        let last = data.is_sole_holder()
            && self.rasters.peek(key).is_some_and(|entry| entry.holds(data));
        if !last {
            return false;
        }

        if let Some(entry) = self.rasters.pop(key) {
            self.bytes -= entry.len;
        }
        true
    }

    /// Drop every raster rendered from `document`; returns how many were dropped.
    pub(crate) fn forget_document(&mut self, document: u64) -> usize {
        let stale: Vec<RasterKey> = self
            .rasters
            .iter()
            .filter(|(key, _)| key.document == document)
            .map(|(key, _)| *key)
            .collect();

        for key in &stale {
            if let Some(entry) = self.rasters.pop(key) {
                self.bytes -= entry.len;
            }
        }
        stale.len()
    }

    pub(crate) fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            bytes: self.bytes,
            entries: self.rasters.len(),
        }
    }
}
