//! Bounded FIFO of pre-generated items with lazy refill.
//!
//! The buffer keeps up to `capacity` items produced by a generator so that the
//! consumer side (`dequeue`) never waits on generation. It is single-owner and
//! unsynchronised: callers sharing one must hold a single lock around the
//! combined refill + dequeue sequence.

use std::collections::VecDeque;

use crate::error::QuizError;

pub struct BoundedRefillBuffer<T, G>
where
  G: FnMut() -> T,
{
  items: VecDeque<T>,
  capacity: usize,
  generator: G,
}

impl<T, G> BoundedRefillBuffer<T, G>
where
  G: FnMut() -> T,
{
  /// Create an empty buffer. Nothing is generated until `ensure_filled`.
  pub fn new(capacity: usize, generator: G) -> Result<Self, QuizError> {
    if capacity == 0 {
      return Err(QuizError::InvalidConfiguration(
        "buffer capacity must be a positive integer".into(),
      ));
    }
    Ok(Self { items: VecDeque::with_capacity(capacity), capacity, generator })
  }

  /// Top the buffer up to capacity, appending at the tail.
  pub fn ensure_filled(&mut self) {
    while self.items.len() < self.capacity {
      let item = (self.generator)();
      self.items.push_back(item);
    }
  }

  /// Remove and return the oldest item. An empty buffer is refilled first;
  /// should that still leave nothing, a fresh item is returned directly.
  pub fn dequeue(&mut self) -> T {
    if self.is_empty() {
      self.ensure_filled();
    }
    match self.items.pop_front() {
      Some(item) => item,
      None => (self.generator)(),
    }
  }

  pub fn size(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Drop every pending item. The old sequence is discarded, not drained.
  pub fn reset(&mut self) {
    self.items = VecDeque::with_capacity(self.capacity);
  }

  #[cfg(test)]
  pub fn peek(&self) -> Option<&T> {
    self.items.front()
  }

  /// Pending items, oldest first.
  pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
    self.items.iter()
  }
}

impl<T, G> std::fmt::Debug for BoundedRefillBuffer<T, G>
where
  T: std::fmt::Debug,
  G: FnMut() -> T,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoundedRefillBuffer")
      .field("capacity", &self.capacity)
      .field("items", &self.items)
      .finish()
  }
}
