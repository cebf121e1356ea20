//! Dynamic containers tuned for the frame loop's access patterns.
//!
//! `LazySorted` backs the depth-sorted draw registry: many mutations per
//! tick, one sort point per frame. It keeps an explicit dirty flag and does
//! a single full resort when the order is next trusted, instead of paying
//! for incremental reinsertion on every depth change.
//!
//! `Deq` is a power-of-two circular double-ended queue. Index math is
//! `data[mask & (head + i)]`, a cheap alternative to a mod or a pair of
//! compares on every access.
//!
//! Misuse (out-of-range index, pop from empty) is a programming error and
//! panics with a message naming the offending operation.

use std::cmp::Ordering;

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send>;

/// Growable sequence that stays unsorted until the order is needed.
///
/// Any append or externally signaled mutation marks the structure dirty;
/// `sort_if_dirty` performs one stable sort and clears the flag. Because
/// the sort is stable and always runs over the full sequence, elements that
/// compare equal keep their insertion order deterministically.
pub struct LazySorted<T> {
    items: Vec<T>,
    dirty: bool,
    cmp: Comparator<T>,
}

impl<T> LazySorted<T> {
    pub fn new(cmp: impl Fn(&T, &T) -> Ordering + Send + 'static) -> Self {
        Self {
            items: Vec::new(),
            dirty: false,
            cmp: Box::new(cmp),
        }
    }

    pub fn with_capacity(
        capacity: usize,
        cmp: impl Fn(&T, &T) -> Ordering + Send + 'static,
    ) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            dirty: false,
            cmp: Box::new(cmp),
        }
    }

    /// Appends an element and marks the order dirty.
    pub fn push(&mut self, value: T) {
        self.items.push(value);
        self.dirty = true;
    }

    /// Signals that some element's sort key changed out from under us.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sorts and clears the dirty flag; no-op when the order is clean.
    pub fn sort_if_dirty(&mut self) {
        if self.dirty {
            let cmp = &self.cmp;
            self.items.sort_by(|a, b| cmp(a, b));
            self.dirty = false;
        }
    }

    /// Removes every element matching the predicate, compacting in place.
    /// Returns the number removed. Removal does not disturb relative order,
    /// so the dirty flag is left alone.
    pub fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !pred(item));
        before - self.items.len()
    }

    pub fn get(&self, index: usize) -> &T {
        match self.items.get(index) {
            Some(item) => item,
            None => panic!(
                "LazySorted::get: index {} out of bounds (len {})",
                index,
                self.items.len()
            ),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// In-place mutation. Callers that change sort keys through this must
    /// `mark_dirty` afterwards.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.dirty = false;
    }
}

const DEQ_DEFAULT_CAPACITY: usize = 32;

/// Array-based double-ended circular queue with power-of-two capacity.
pub struct Deq<T> {
    data: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
    mask: usize,
}

impl<T> Deq<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEQ_DEFAULT_CAPACITY)
    }

    /// Capacity is rounded up to the next power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);
        Self {
            data,
            head: 0,
            tail: 0,
            len: 0,
            mask: capacity - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, value: T) {
        self.grow_if_full();
        self.data[self.tail] = Some(value);
        self.tail = (self.tail + 1) & self.mask;
        self.len += 1;
    }

    pub fn push_front(&mut self, value: T) {
        self.grow_if_full();
        self.head = self.head.wrapping_sub(1) & self.mask;
        self.data[self.head] = Some(value);
        self.len += 1;
    }

    pub fn pop_back(&mut self) -> T {
        if self.len == 0 {
            panic!("Deq::pop_back: popping from empty queue");
        }
        self.tail = self.tail.wrapping_sub(1) & self.mask;
        self.len -= 1;
        self.data[self.tail]
            .take()
            .expect("Deq slot accounting broken")
    }

    pub fn pop_front(&mut self) -> T {
        if self.len == 0 {
            panic!("Deq::pop_front: popping from empty queue");
        }
        let value = self.data[self.head]
            .take()
            .expect("Deq slot accounting broken");
        self.head = (self.head + 1) & self.mask;
        self.len -= 1;
        value
    }

    pub fn front(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.data[self.head].as_ref()
    }

    pub fn back(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.data[self.tail.wrapping_sub(1) & self.mask].as_ref()
    }

    pub fn get(&self, index: usize) -> &T {
        if index >= self.len {
            panic!(
                "Deq::get: index {} out of bounds (len {})",
                index, self.len
            );
        }
        self.data[(self.head + index) & self.mask]
            .as_ref()
            .expect("Deq slot accounting broken")
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |i| self.get(i))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.data {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Doubles the buffer, unwrapping the ring into a fresh contiguous
    /// block. Two copy cases: the live span has wrapped past the end of the
    /// buffer, or it is already contiguous.
    fn grow_if_full(&mut self) {
        if self.len < self.data.len() {
            return;
        }
        let old_cap = self.data.len();
        let new_cap = old_cap << 1;
        let mut new_data: Vec<Option<T>> = Vec::with_capacity(new_cap);
        new_data.resize_with(new_cap, || None);

        for (i, slot) in new_data.iter_mut().take(self.len).enumerate() {
            *slot = self.data[(self.head + i) & self.mask].take();
        }

        self.data = new_data;
        self.head = 0;
        self.tail = self.len;
        self.mask = new_cap - 1;
    }
}

impl<T> Default for Deq<T> {
    fn default() -> Self {
        Self::new()
    }
}
