//! Descriptors: the rules that tell the provider how to produce a value.

use crate::error::Result;
use crate::key::Key;
use crate::scope::Scope;
use crate::service::Service;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_DESCRIPTOR: AtomicU64 = AtomicU64::new(1);

/// Controls how often a factory descriptor creates a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Lifetime {
  /// A new value on every resolution.
  Transient,
  /// One value per scope.
  Scoped,
  /// One value for the whole scope tree, owned by the root.
  Singleton,
}

type FactoryFn = dyn Fn(&Scope) -> Result<Service> + Send + Sync;

/// A construction function. Every factory receives the scope it is resolved
/// against; see [`Lifetime`] for which scope that is.
#[derive(Clone)]
pub struct Factory {
  func: Arc<FactoryFn>,
}

impl Factory {
  pub fn new<F>(func: F) -> Self
  where
    F: Fn(&Scope) -> Result<Service> + Send + Sync + 'static,
  {
    Self {
      func: Arc::new(func),
    }
  }

  /// Adapts a factory that does not need the provider.
  pub fn nullary<F>(func: F) -> Self
  where
    F: Fn() -> Result<Service> + Send + Sync + 'static,
  {
    Self::new(move |_: &Scope| func())
  }

  /// Adapts a factory that produces a concrete `T`.
  pub fn of<T, F>(func: F) -> Self
  where
    T: std::any::Any + Send + Sync,
    F: Fn(&Scope) -> Result<T> + Send + Sync + 'static,
  {
    Self::new(move |scope: &Scope| func(scope).map(Service::new))
  }

  /// Adapts a factory that produces an already shared `Arc<T>`, such as a
  /// resource returned by [`Scope::enter`]. The value resolves as `T`.
  pub fn shared<T, F>(func: F) -> Self
  where
    T: std::any::Any + Send + Sync,
    F: Fn(&Scope) -> Result<Arc<T>> + Send + Sync + 'static,
  {
    Self::new(move |scope: &Scope| func(scope).map(Service::from_arc))
  }

  pub(crate) fn call(&self, scope: &Scope) -> Result<Service> {
    (self.func)(scope)
  }
}

impl fmt::Debug for Factory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Factory(..)")
  }
}

/// The ordered member keys of a group.
///
/// This is a shared handle: a group descriptor holds a clone of it, so keys
/// pushed after registration are seen by later resolutions.
#[derive(Clone, Default)]
pub struct GroupMembers {
  keys: Arc<RwLock<Vec<Key>>>,
}

impl GroupMembers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, key: impl Into<Key>) {
    self.keys.write().push(key.into());
  }

  pub fn extend<I, K>(&self, keys: I)
  where
    I: IntoIterator<Item = K>,
    K: Into<Key>,
  {
    self.keys.write().extend(keys.into_iter().map(Into::into));
  }

  /// A snapshot of the current members.
  pub fn keys(&self) -> Vec<Key> {
    self.keys.read().clone()
  }

  pub fn contains(&self, key: &Key) -> bool {
    self.keys.read().contains(key)
  }

  pub fn len(&self) -> usize {
    self.keys.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.read().is_empty()
  }
}

impl<K: Into<Key>> FromIterator<K> for GroupMembers {
  fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
    let members = GroupMembers::new();
    members.extend(iter);
    members
  }
}

impl fmt::Debug for GroupMembers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.keys.read().iter()).finish()
  }
}

/// Identity of a descriptor. Cached values are stored under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

/// The variants a descriptor can take.
pub enum DescriptorKind {
  Factory { lifetime: Lifetime, factory: Factory },
  Value(Service),
  Bound(Key),
  Grouped(GroupMembers),
  /// The requesting scope.
  ProviderSelf,
  /// The root of the requesting scope.
  ProviderRoot,
  /// The parent of the requesting scope, as `Option<Scope>`.
  ProviderParent,
}

/// A rule describing how to produce a value for a key.
///
/// Cloning a descriptor keeps its identity, so a clone shares the cached
/// values of the original.
#[derive(Clone)]
pub struct Descriptor {
  id: DescriptorId,
  kind: Arc<DescriptorKind>,
}

impl Descriptor {
  fn with_kind(kind: DescriptorKind) -> Self {
    Self {
      id: DescriptorId(NEXT_DESCRIPTOR.fetch_add(1, Ordering::Relaxed)),
      kind: Arc::new(kind),
    }
  }

  pub fn factory(lifetime: Lifetime, factory: Factory) -> Self {
    Self::with_kind(DescriptorKind::Factory { lifetime, factory })
  }

  pub fn value(value: Service) -> Self {
    Self::with_kind(DescriptorKind::Value(value))
  }

  pub fn bound(target: impl Into<Key>) -> Self {
    Self::with_kind(DescriptorKind::Bound(target.into()))
  }

  pub fn grouped(members: &GroupMembers) -> Self {
    Self::with_kind(DescriptorKind::Grouped(members.clone()))
  }

  pub fn provider_self() -> Self {
    Self::with_kind(DescriptorKind::ProviderSelf)
  }

  pub fn provider_root() -> Self {
    Self::with_kind(DescriptorKind::ProviderRoot)
  }

  pub fn provider_parent() -> Self {
    Self::with_kind(DescriptorKind::ProviderParent)
  }

  pub fn id(&self) -> DescriptorId {
    self.id
  }

  pub fn kind(&self) -> &DescriptorKind {
    &self.kind
  }

  /// The lifetime declared by a factory descriptor. Other kinds carry none.
  pub fn lifetime(&self) -> Option<Lifetime> {
    match &*self.kind {
      DescriptorKind::Factory { lifetime, .. } => Some(*lifetime),
      _ => None,
    }
  }
}

impl fmt::Debug for Descriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("Descriptor");
    s.field("id", &self.id.0);
    match &*self.kind {
      DescriptorKind::Factory { lifetime, .. } => s.field("factory", lifetime),
      DescriptorKind::Value(value) => s.field("value", value),
      DescriptorKind::Bound(target) => s.field("bound", target),
      DescriptorKind::Grouped(members) => s.field("grouped", members),
      DescriptorKind::ProviderSelf => s.field("provider", &"self"),
      DescriptorKind::ProviderRoot => s.field("provider", &"root"),
      DescriptorKind::ProviderParent => s.field("provider", &"parent"),
    };
    s.finish()
  }
}
