//! Core, non-public data structures for the resolution engine.

use crate::descriptor::DescriptorId;
use crate::error::{Error, ResolveChain, Result};
use std::cell::RefCell;
use std::collections::HashSet;

thread_local! {
  // The (scope, descriptor) pairs currently being resolved on this thread.
  // Seeing a pair twice means the resolution re-entered itself.
  static RESOLVING: RefCell<HashSet<(u64, DescriptorId)>> = RefCell::new(HashSet::new());
}

/// An RAII guard that detects re-entrant resolution of a descriptor.
///
/// Entering a pair that is already on this thread's stack fails with
/// [`Error::CircularDependency`]; dropping the guard removes the pair.
pub(crate) struct ResolutionGuard {
  slot: (u64, DescriptorId),
}

impl ResolutionGuard {
  /// The error starts with an empty chain; the engine adds the keys as it
  /// unwinds, the re-entered key included.
  pub(crate) fn enter(scope_id: u64, descriptor: DescriptorId) -> Result<Self> {
    let slot = (scope_id, descriptor);
    let inserted = RESOLVING.with(|stack| stack.borrow_mut().insert(slot));
    if !inserted {
      return Err(Error::CircularDependency {
        chain: ResolveChain::default(),
      });
    }
    Ok(Self { slot })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING.with(|stack| {
      stack.borrow_mut().remove(&self.slot);
    });
  }
}
