//! The two element registries.
//!
//! Every element of the live scene is registered twice: in the `Roster`,
//! which the logic thread walks once per tick in registration order, and in
//! the `Stage`, which the render thread consults in depth order. The stage
//! sorts lazily -- depth changes only flip a dirty flag, and one stable
//! full sort runs at the next frame's draw point.
//!
//! Lock discipline: neither registry ever takes an element lock while
//! holding its own. The stage sorts on a depth key cached beside each
//! handle and refreshed outside the registry lock, so element code running
//! under its own lock (a behavior, mid-tick) can always call back into
//! either registry.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dae_core::containers::LazySorted;
use dae_core::input::GestureState;

use crate::element::{update_element, Element, ElementHandle};

/// Update registry. Iteration follows registration order; a fault in one
/// element's update is logged and skipped without disturbing the rest of
/// the tick.
#[derive(Default)]
pub struct Roster {
    inner: Mutex<Vec<ElementHandle>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: ElementHandle) {
        self.inner.lock().unwrap().push(handle);
    }

    /// Removes by identity. Unknown handles are ignored.
    pub fn unregister(&self, handle: &ElementHandle) {
        self.inner
            .lock()
            .unwrap()
            .retain(|h| !Arc::ptr_eq(h, handle));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ElementHandle> {
        self.inner.lock().unwrap().clone()
    }

    /// Runs one logic tick over every active element. The handle list is
    /// snapshotted up front so element code may register or unregister
    /// mid-tick without deadlocking against the registry lock.
    pub fn tick(&self, input: &GestureState) {
        let handles = self.snapshot();
        for handle in &handles {
            let mut element = handle.lock().unwrap();
            if !element.active {
                continue;
            }
            if let Err(err) = update_element(&mut element, input) {
                log::warn!("element update failed, skipping this tick: {err}");
            }
        }
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

/// A staged handle plus its depth at the last key refresh. The comparator
/// reads only the cached key, never the element itself.
struct StageEntry {
    handle: ElementHandle,
    depth: f32,
}

fn depth_descending(a: &StageEntry, b: &StageEntry) -> Ordering {
    b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal)
}

/// Draw registry, ordered back-to-front by depth (higher z first). Ties
/// keep registration order because the underlying sort is stable.
pub struct Stage {
    inner: Mutex<LazySorted<StageEntry>>,
}

impl Stage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LazySorted::new(depth_descending)),
        }
    }

    pub fn register(&self, handle: ElementHandle) {
        // Read z before the registry lock; never nest the two.
        let depth = handle.lock().unwrap().pos.z;
        self.inner.lock().unwrap().push(StageEntry { handle, depth });
    }

    pub fn unregister(&self, handle: &ElementHandle) {
        self.inner
            .lock()
            .unwrap()
            .remove_where(|entry| Arc::ptr_eq(&entry.handle, handle));
    }

    /// Flags the draw order stale. Cheap; the cost is deferred to the next
    /// `draw_order_snapshot`.
    pub fn mark_depth_dirty(&self) {
        self.inner.lock().unwrap().mark_dirty();
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().is_dirty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Refreshes the cached depth keys, re-sorts if anything moved (or the
    /// order was flagged stale), and hands back the handles in draw order.
    ///
    /// The key refresh locks each element one at a time with the registry
    /// lock released, then writes the keys back under the registry lock
    /// alone. A registration racing in between keeps its register-time key
    /// until the next frame.
    pub fn draw_order_snapshot(&self) -> Vec<ElementHandle> {
        let handles: Vec<ElementHandle> = {
            let inner = self.inner.lock().unwrap();
            inner.iter().map(|entry| entry.handle.clone()).collect()
        };
        let depths: HashMap<*const Mutex<Element>, f32> = handles
            .iter()
            .map(|handle| (Arc::as_ptr(handle), handle.lock().unwrap().pos.z))
            .collect();

        let mut inner = self.inner.lock().unwrap();
        let mut moved = false;
        for entry in inner.iter_mut() {
            if let Some(&z) = depths.get(&Arc::as_ptr(&entry.handle)) {
                if entry.depth != z {
                    entry.depth = z;
                    moved = true;
                }
            }
        }
        if moved {
            inner.mark_dirty();
        }
        inner.sort_if_dirty();
        inner.iter().map(|entry| entry.handle.clone()).collect()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes an element's depth and invalidates the stage order. The element
/// lock is released before the stage lock is taken.
pub fn set_depth(handle: &ElementHandle, stage: &Stage, z: f32) {
    handle.lock().unwrap().pos.z = z;
    stage.mark_depth_dirty();
}
