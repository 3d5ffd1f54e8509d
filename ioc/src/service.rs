//! The type-erased value handed out by the provider.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A resolved service.
///
/// `Service` is a cheap, clonable handle to a shared value. Two services are
/// the same instance when [`Service::ptr_eq`] says so; cloning a `Service`
/// never copies the underlying value.
#[derive(Clone)]
pub struct Service {
  inner: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl Service {
  /// Wraps a concrete value.
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }

  /// Wraps an already shared value without re-allocating it.
  pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    Self {
      inner: value,
      type_name: type_name::<T>(),
    }
  }

  /// Wraps a trait object so it can be read back with [`Service::as_interface`].
  pub fn interface<I: ?Sized + Any + Send + Sync>(value: Arc<I>) -> Self {
    Self {
      inner: Arc::new(value),
      type_name: type_name::<I>(),
    }
  }

  /// Returns the value as `Arc<T>` if it was stored as a `T`.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.inner.clone().downcast::<T>().ok()
  }

  /// Returns a reference to the value if it was stored as a `T`.
  pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
    self.inner.downcast_ref::<T>()
  }

  /// Returns the trait object stored with [`Service::interface`].
  pub fn as_interface<I: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<I>> {
    self.inner.downcast_ref::<Arc<I>>().cloned()
  }

  /// Returns the members of a group result.
  pub fn members(&self) -> Option<&[Service]> {
    self.downcast_ref::<Vec<Service>>().map(Vec::as_slice)
  }

  pub fn is<T: Any + Send + Sync>(&self) -> bool {
    self.inner.is::<T>()
  }

  /// Whether both handles point at the same instance.
  pub fn ptr_eq(&self, other: &Service) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  /// The name of the type the service was created from.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl fmt::Debug for Service {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Service")
      .field("type", &self.type_name)
      .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
      .finish()
  }
}
