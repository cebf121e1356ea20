//! Shared graphic resources.
//!
//! Elements never own their bitmaps; they hold a `ResourceId` and resolve
//! it through the cache at draw time. A load failure is tolerated, not
//! fatal: the element simply draws nothing that frame and the cache retries
//! on the next lookup, so a graphic that appears late (or a transiently
//! unreadable file) heals on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type ResourceId = u32;

/// Decoded RGBA8 image, row-major, 4 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, String> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(format!(
                "Pixmap {width}x{height} expects {expected} bytes, got {}",
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Solid-color pixmap, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Backend that turns a resource id into pixels. The demo binary decodes
/// PNG files; tests use closures over canned pixmaps.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, id: ResourceId) -> Result<Pixmap, String>;
}

impl<F> ResourceLoader for F
where
    F: Fn(ResourceId) -> Result<Pixmap, String> + Send + Sync,
{
    fn load(&self, id: ResourceId) -> Result<Pixmap, String> {
        self(id)
    }
}

enum Entry {
    Loaded(Arc<Pixmap>),
    Failed,
}

/// Id-to-pixmap cache with lazy retry of failed loads.
pub struct ResourceCache {
    loader: Box<dyn ResourceLoader>,
    entries: Mutex<HashMap<ResourceId, Entry>>,
    pre_scale: Mutex<f32>,
}

impl ResourceCache {
    pub fn new(loader: Box<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
            pre_scale: Mutex::new(1.0),
        }
    }

    /// Resolution-normalization factor applied to every image draw. Art is
    /// authored for one logical resolution; set this to
    /// `actual_height / authored_height` when the surface size is known.
    pub fn set_pre_scale(&self, scale: f32) {
        if scale > 0.0 {
            *self.pre_scale.lock().unwrap() = scale;
        }
    }

    pub fn pre_scale(&self) -> f32 {
        *self.pre_scale.lock().unwrap()
    }

    /// Resolves an id. A previously failed load is retried; only the
    /// transition into the failed state is logged, so a persistently
    /// missing graphic does not spam every frame's lookups.
    pub fn get(&self, id: ResourceId) -> Option<Arc<Pixmap>> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(Entry::Loaded(pixmap)) = entries.get(&id) {
            return Some(pixmap.clone());
        }
        let was_failed = matches!(entries.get(&id), Some(Entry::Failed));
        match self.loader.load(id) {
            Ok(pixmap) => {
                let pixmap = Arc::new(pixmap);
                entries.insert(id, Entry::Loaded(pixmap.clone()));
                Some(pixmap)
            }
            Err(err) => {
                if !was_failed {
                    log::warn!("resource {id} failed to load (will retry): {err}");
                }
                entries.insert(id, Entry::Failed);
                None
            }
        }
    }

    /// Drops a cached entry so the next lookup reloads it.
    pub fn invalidate(&self, id: ResourceId) {
        self.entries.lock().unwrap().remove(&id);
    }

    /// Physical pixel dimensions of a resource, loading it if needed.
    pub fn size(&self, id: ResourceId) -> Option<(u32, u32)> {
        self.get(id).map(|p| (p.width, p.height))
    }

    /// Dimensions the resource occupies on screen after pre-scaling.
    pub fn logical_size(&self, id: ResourceId) -> Option<(f32, f32)> {
        let scale = self.pre_scale();
        self.size(id)
            .map(|(w, h)| (w as f32 * scale, h as f32 * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn loaded_pixmaps_are_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let cache = ResourceCache::new(Box::new(move |_id: ResourceId| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Pixmap::solid(2, 2, [255, 0, 0, 255]))
        }));
        assert!(cache.get(7).is_some());
        assert!(cache.get(7).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_loads_retry_until_they_heal() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let cache = ResourceCache::new(Box::new(move |_id: ResourceId| {
            // Fail the first two attempts, then succeed.
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("not ready".to_string())
            } else {
                Ok(Pixmap::solid(1, 1, [0, 0, 0, 255]))
            }
        }));
        assert!(cache.get(3).is_none());
        assert!(cache.get(3).is_none());
        assert!(cache.get(3).is_some());
        // Healed entry stays cached.
        assert!(cache.get(3).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn invalidate_forces_reload() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let cache = ResourceCache::new(Box::new(move |_id: ResourceId| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Pixmap::solid(1, 1, [255, 255, 255, 255]))
        }));
        cache.get(1);
        cache.invalidate(1);
        cache.get(1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn pixmap_checks_byte_length() {
        assert!(Pixmap::new(2, 2, vec![0; 16]).is_ok());
        let err = Pixmap::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(err.contains("expects 16 bytes"));
    }

    #[test]
    fn size_reports_dimensions() {
        let cache = ResourceCache::new(Box::new(|_id: ResourceId| {
            Ok(Pixmap::solid(8, 4, [0, 0, 0, 0]))
        }));
        assert_eq!(cache.size(1), Some((8, 4)));
        assert_eq!(cache.logical_size(1), Some((8.0, 4.0)));
    }

    #[test]
    fn pre_scale_adjusts_logical_size() {
        let cache = ResourceCache::new(Box::new(|_id: ResourceId| {
            Ok(Pixmap::solid(8, 4, [0, 0, 0, 0]))
        }));
        cache.set_pre_scale(1.5);
        assert_eq!(cache.pre_scale(), 1.5);
        assert_eq!(cache.logical_size(1), Some((12.0, 6.0)));
        // Nonsense factors are ignored.
        cache.set_pre_scale(0.0);
        assert_eq!(cache.pre_scale(), 1.5);
    }
}
