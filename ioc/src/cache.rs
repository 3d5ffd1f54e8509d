//! Storage for values created by scoped and singleton descriptors.

use crate::descriptor::DescriptorId;
use crate::error::Result;
use crate::service::Service;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A map of per-descriptor cells.
///
/// Each cell doubles as the creation lock for its descriptor: the map shard
/// is only locked long enough to fetch or insert the cell, and the factory
/// runs under the cell's own initialization lock.
#[derive(Default)]
pub(crate) struct LifetimeCache {
  cells: DashMap<DescriptorId, Arc<OnceCell<Service>>>,
}

impl LifetimeCache {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn get(&self, id: DescriptorId) -> Option<Service> {
    self.cells.get(&id).and_then(|cell| cell.get().cloned())
  }

  /// Returns the cached value for `id`, creating it with `create` if needed.
  ///
  /// `create` runs at most once per successful initialization. If it fails,
  /// the cell stays empty and a later call tries again.
  pub(crate) fn get_or_create<F>(&self, id: DescriptorId, create: F) -> Result<Service>
  where
    F: FnOnce() -> Result<Service>,
  {
    if let Some(value) = self.get(id) {
      tracing::trace!(descriptor = ?id, "lifetime cache hit");
      return Ok(value);
    }

    // The shard guard must be gone before `create` runs: factories resolve
    // other services and may land on the same shard.
    let cell = self
      .cells
      .entry(id)
      .or_insert_with(|| Arc::new(OnceCell::new()))
      .clone();

    cell
      .get_or_try_init(|| {
        tracing::trace!(descriptor = ?id, "lifetime cache miss, creating value");
        create()
      })
      .cloned()
  }

  pub(crate) fn len(&self) -> usize {
    self
      .cells
      .iter()
      .filter(|entry| entry.value().get().is_some())
      .count()
  }
}
