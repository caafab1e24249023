//! Append-only attribute pools. The insertion order is the handle.

use std::ops::Index;

/// Stable index of an attribute inside its pool (0-based).
pub type Handle = u32;

#[derive(Clone, Debug, PartialEq)]
pub struct AttributePool<T> {
    values: Vec<T>,
}

pub type VertexPool = AttributePool<[f32; 3]>;
pub type NormalPool = AttributePool<[f32; 3]>;
pub type TexCoordPool = AttributePool<[f32; 2]>;

impl<T> Default for AttributePool<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: Copy> AttributePool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` and return its handle.
    pub fn push(&mut self, value: T) -> Handle {
        let handle = self.values.len() as Handle;
        self.values.push(value);
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<T> {
        self.values.get(handle as usize).copied()
    }

    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        (handle as usize) < self.values.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.values.iter().copied()
    }

    /// Drop every value. Handles handed out before are invalid afterwards.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<T> Index<Handle> for AttributePool<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        &self.values[handle as usize]
    }
}
