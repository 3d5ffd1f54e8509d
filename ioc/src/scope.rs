//! Scopes: the overlay registry, the lifetime-aware resolution engine and the
//! disposal stack of each node in the provider tree.

use crate::builder::ContainerBuilder;
use crate::cache::LifetimeCache;
use crate::core::ResolutionGuard;
use crate::descriptor::{Descriptor, DescriptorKind, Factory, GroupMembers, Lifetime};
use crate::disposal::{DisposalStack, Dispose, ReleaseHandle};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::resolver::{Resolver, ResolverChain};
use crate::service::Service;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// State owned by the root and shared with every descendant.
struct RootShared {
  singletons: LifetimeCache,
  resolvers: RwLock<ResolverChain>,
}

struct ScopeInner {
  id: u64,
  depth: usize,
  parent: Option<Scope>,
  // `None` on the root itself.
  root: Option<Scope>,
  shared: Arc<RootShared>,
  overlay: DashMap<Key, Vec<Descriptor>>,
  scoped: LifetimeCache,
  disposal: DisposalStack,
}

impl Drop for ScopeInner {
  fn drop(&mut self) {
    if self.disposal.len() > 0 {
      let released = self.disposal.drain_unreleased();
      tracing::debug!(
        scope = self.id,
        released,
        "scope dropped without close, released pending disposal entries"
      );
    }
  }
}

/// A node in the provider tree, and the provider handed to every factory.
///
/// `Scope` is a cheap handle; clones refer to the same scope. The root scope
/// owns the singleton cache and the resolver chain. Every scope owns its own
/// registrations, its scoped cache and its disposal stack.
///
/// A child holds a strong handle to its parent, so a scope stays alive while
/// any of its descendants do. Dropping the last handle of a scope that was
/// never closed releases its pending disposal entries, and for a parent this
/// only happens once all of its children have been dropped as well. Call
/// [`Scope::close`] to release a scope's resources at a known point.
///
/// Values cached in a scope should not keep a strong handle to that scope
/// (use [`Scope::downgrade`]), otherwise the scope can never be dropped.
#[derive(Clone)]
pub struct Scope {
  inner: Arc<ScopeInner>,
}

/// A non-owning handle to a [`Scope`].
#[derive(Clone)]
pub struct WeakScope {
  inner: Weak<ScopeInner>,
}

impl WeakScope {
  pub fn upgrade(&self) -> Option<Scope> {
    self.inner.upgrade().map(|inner| Scope { inner })
  }
}

impl fmt::Debug for WeakScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("WeakScope(..)")
  }
}

/// Number of values currently held by the lifetime caches a scope can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
  pub scoped: usize,
  pub singletons: usize,
}

impl Scope {
  /// Creates a root scope with the default configuration.
  ///
  /// Use [`ContainerBuilder`] to configure resolvers and built-in keys.
  pub fn root() -> Scope {
    ContainerBuilder::new().build()
  }

  pub(crate) fn new_root(resolvers: ResolverChain) -> Scope {
    let scope = Scope {
      inner: Arc::new(ScopeInner {
        id: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
        depth: 0,
        parent: None,
        root: None,
        shared: Arc::new(RootShared {
          singletons: LifetimeCache::new(),
          resolvers: RwLock::new(resolvers),
        }),
        overlay: DashMap::new(),
        scoped: LifetimeCache::new(),
        disposal: DisposalStack::default(),
      }),
    };
    tracing::debug!(scope = scope.id(), "created root scope");
    scope
  }

  /// Creates a child scope.
  ///
  /// The child sees every registration of its ancestors, shares the root's
  /// singletons and starts with an empty scoped cache.
  pub fn scope(&self) -> Scope {
    let child = Scope {
      inner: Arc::new(ScopeInner {
        id: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
        depth: self.inner.depth + 1,
        parent: Some(self.clone()),
        root: Some(self.root_scope()),
        shared: self.inner.shared.clone(),
        overlay: DashMap::new(),
        scoped: LifetimeCache::new(),
        disposal: DisposalStack::default(),
      }),
    };
    tracing::debug!(
      scope = child.id(),
      parent = self.id(),
      depth = child.depth(),
      "created child scope"
    );
    child
  }

  /// Runs `f` in a fresh child scope and closes it afterwards.
  ///
  /// The child is closed even when `f` fails; the error of `f` takes
  /// precedence over an error from closing.
  pub fn with_scope<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Scope) -> Result<T>,
  {
    let child = self.scope();
    let result = f(&child);
    let closed = child.close();
    let value = result?;
    closed?;
    Ok(value)
  }

  // --- Identity & Hierarchy ---

  pub fn id(&self) -> u64 {
    self.inner.id
  }

  /// Distance from the root. The root has depth 0.
  pub fn depth(&self) -> usize {
    self.inner.depth
  }

  pub fn is_root(&self) -> bool {
    self.inner.parent.is_none()
  }

  pub fn parent(&self) -> Option<Scope> {
    self.inner.parent.clone()
  }

  /// The root of the tree this scope belongs to.
  pub fn root_scope(&self) -> Scope {
    match &self.inner.root {
      Some(root) => root.clone(),
      None => self.clone(),
    }
  }

  pub fn downgrade(&self) -> WeakScope {
    WeakScope {
      inner: Arc::downgrade(&self.inner),
    }
  }

  /// Whether both handles refer to the same scope.
  pub fn ptr_eq(&self, other: &Scope) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  // --- Registration ---

  /// Registers a descriptor for `key` in this scope.
  ///
  /// A later registration of the same key in the same scope replaces this
  /// one for lookups; registering in a child scope only shadows it.
  pub fn register_descriptor(&self, key: impl Into<Key>, descriptor: Descriptor) -> Result<()> {
    let key = key.into();
    validate(&key, &descriptor)?;
    self.insert_descriptor(key, descriptor);
    Ok(())
  }

  pub(crate) fn insert_descriptor(&self, key: Key, descriptor: Descriptor) {
    tracing::debug!(scope = self.id(), key = %key, descriptor = ?descriptor, "registered");
    self.inner.overlay.entry(key).or_default().push(descriptor);
  }

  pub fn register(&self, key: impl Into<Key>, factory: Factory, lifetime: Lifetime) {
    self.insert_descriptor(key.into(), Descriptor::factory(lifetime, factory));
  }

  pub fn register_value(&self, key: impl Into<Key>, value: Service) {
    self.insert_descriptor(key.into(), Descriptor::value(value));
  }

  /// Makes `alias` resolve whatever `target` resolves to, in the requesting
  /// scope.
  pub fn register_bind(&self, alias: impl Into<Key>, target: impl Into<Key>) -> Result<()> {
    self.register_descriptor(alias, Descriptor::bound(target))
  }

  /// Registers `key` as a group of `members`. Keys pushed to `members` later
  /// are part of every later resolution.
  pub fn register_group(&self, key: impl Into<Key>, members: &GroupMembers) -> Result<()> {
    self.register_descriptor(key, Descriptor::grouped(members))
  }

  pub fn register_singleton<T, F>(&self, key: impl Into<Key>, factory: F)
  where
    T: Any + Send + Sync,
    F: Fn(&Scope) -> Result<T> + Send + Sync + 'static,
  {
    self.register(key, Factory::of(factory), Lifetime::Singleton);
  }

  pub fn register_scoped<T, F>(&self, key: impl Into<Key>, factory: F)
  where
    T: Any + Send + Sync,
    F: Fn(&Scope) -> Result<T> + Send + Sync + 'static,
  {
    self.register(key, Factory::of(factory), Lifetime::Scoped);
  }

  pub fn register_transient<T, F>(&self, key: impl Into<Key>, factory: F)
  where
    T: Any + Send + Sync,
    F: Fn(&Scope) -> Result<T> + Send + Sync + 'static,
  {
    self.register(key, Factory::of(factory), Lifetime::Transient);
  }

  pub fn register_instance<T: Any + Send + Sync>(&self, key: impl Into<Key>, value: T) {
    self.register_value(key, Service::new(value));
  }

  /// Appends a resolver to the chain shared by the whole scope tree.
  pub fn append_resolver<R: Resolver + 'static>(&self, resolver: R) {
    self.inner.shared.resolvers.write().push(resolver);
  }

  // --- Lookup ---

  /// Finds the descriptor that `key` resolves to from this scope, walking
  /// from this scope towards the root.
  pub fn find_descriptor(&self, key: &Key) -> Option<Descriptor> {
    let mut current = Some(self);
    while let Some(scope) = current {
      let found = scope
        .inner
        .overlay
        .get(key)
        .and_then(|descriptors| descriptors.last().cloned());
      if found.is_some() {
        return found;
      }
      current = scope.inner.parent.as_ref();
    }
    None
  }

  /// Whether `key` is registered in this scope or one of its ancestors.
  /// Resolvers are not consulted.
  pub fn is_registered(&self, key: &Key) -> bool {
    self.find_descriptor(key).is_some()
  }

  fn resolve_missing(&self, key: &Key) -> Option<Descriptor> {
    // Cloned so that no lock is held while resolvers run; they may resolve
    // or append resolvers themselves.
    let resolvers = self.inner.shared.resolvers.read().clone();
    if resolvers.is_empty() {
      return None;
    }
    tracing::trace!(scope = self.id(), key = %key, "consulting resolver chain");
    let found = resolvers.resolve_missing(key, self);
    if let Some(descriptor) = &found {
      tracing::debug!(
        scope = self.id(),
        key = %key,
        descriptor = ?descriptor,
        "resolver supplied descriptor"
      );
    }
    found
  }

  // --- Resolution ---

  /// Resolves `key` from this scope.
  ///
  /// Fails with [`Error::NotFound`] if neither the scope chain nor the
  /// resolver chain knows the key, or if a dependency is missing. Errors
  /// raised by factories are returned unchanged.
  pub fn resolve(&self, key: impl Into<Key>) -> Result<Service> {
    self.resolve_key(&key.into())
  }

  fn resolve_key(&self, key: &Key) -> Result<Service> {
    let descriptor = match self.find_descriptor(key) {
      Some(descriptor) => descriptor,
      None => match self.resolve_missing(key) {
        Some(descriptor) => descriptor,
        None => {
          tracing::trace!(scope = self.id(), key = %key, "service not found");
          return Err(Error::not_found(key.clone()));
        }
      },
    };
    self
      .resolve_descriptor(&descriptor)
      .map_err(|err| err.within(key))
  }

  fn resolve_descriptor(&self, descriptor: &Descriptor) -> Result<Service> {
    let id = descriptor.id();
    match descriptor.kind() {
      DescriptorKind::Value(value) => Ok(value.clone()),
      DescriptorKind::ProviderSelf => Ok(Service::new(self.clone())),
      DescriptorKind::ProviderRoot => Ok(Service::new(self.root_scope())),
      DescriptorKind::ProviderParent => Ok(Service::new(self.parent())),
      DescriptorKind::Bound(target) => {
        let _guard = ResolutionGuard::enter(self.id(), id)?;
        self.resolve_key(target)
      }
      DescriptorKind::Grouped(members) => {
        let _guard = ResolutionGuard::enter(self.id(), id)?;
        let values = members
          .keys()
          .iter()
          .map(|member| self.resolve_key(member))
          .collect::<Result<Vec<_>>>()?;
        Ok(Service::new(values))
      }
      DescriptorKind::Factory { lifetime, factory } => match lifetime {
        Lifetime::Transient => {
          let _guard = ResolutionGuard::enter(self.id(), id)?;
          factory.call(self)
        }
        Lifetime::Scoped => {
          let cache = &self.inner.scoped;
          if let Some(value) = cache.get(id) {
            return Ok(value);
          }
          // Checked before touching the cell: re-entering a cell that is
          // being initialized on this thread would block forever.
          let _guard = ResolutionGuard::enter(self.id(), id)?;
          cache.get_or_create(id, || factory.call(self))
        }
        Lifetime::Singleton => {
          let cache = &self.inner.shared.singletons;
          if let Some(value) = cache.get(id) {
            return Ok(value);
          }
          // Singletons are built from the root's point of view so that they
          // never capture state of the scope that happened to ask first.
          let root = self.root_scope();
          let _guard = ResolutionGuard::enter(root.id(), id)?;
          cache.get_or_create(id, || factory.call(&root))
        }
      },
    }
  }

  /// Resolves `key` and downcasts the value to `T`.
  pub fn resolve_as<T: Any + Send + Sync>(&self, key: impl Into<Key>) -> Result<Arc<T>> {
    let key = key.into();
    let service = self.resolve_key(&key)?;
    service.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
      key,
      expected: type_name::<T>(),
    })
  }

  /// Resolves `key` and reads it back as the trait object `I`.
  pub fn resolve_interface<I>(&self, key: impl Into<Key>) -> Result<Arc<I>>
  where
    I: ?Sized + Any + Send + Sync,
  {
    let key = key.into();
    let service = self.resolve_key(&key)?;
    service.as_interface::<I>().ok_or_else(|| Error::TypeMismatch {
      key,
      expected: type_name::<I>(),
    })
  }

  /// Like [`Scope::resolve`], but returns `Ok(None)` when `key` itself is
  /// unknown.
  ///
  /// A known key whose construction needs a missing dependency is still an
  /// error: "never registered" and "registered but broken" are different
  /// failures.
  pub fn get(&self, key: impl Into<Key>) -> Result<Option<Service>> {
    match self.resolve(key) {
      Ok(value) => Ok(Some(value)),
      Err(Error::NotFound { chain }) if chain.len() == 1 => Ok(None),
      Err(err) => Err(err),
    }
  }

  /// Like [`Scope::get`], substituting `default` for an unknown key.
  pub fn get_or(&self, key: impl Into<Key>, default: Service) -> Result<Service> {
    Ok(self.get(key)?.unwrap_or(default))
  }

  /// Resolves every registration of `key` visible from this scope: this
  /// scope's first, most recent first, then each ancestor's in turn.
  ///
  /// Returns an empty list for an unknown key. Resolvers are not consulted.
  pub fn get_many(&self, key: impl Into<Key>) -> Result<Vec<Service>> {
    let key = key.into();
    let mut descriptors = Vec::new();
    let mut current = Some(self);
    while let Some(scope) = current {
      if let Some(registered) = scope.inner.overlay.get(&key) {
        descriptors.extend(registered.iter().rev().cloned());
      }
      current = scope.inner.parent.as_ref();
    }
    descriptors
      .iter()
      .map(|descriptor| {
        self
          .resolve_descriptor(descriptor)
          .map_err(|err| err.within(&key))
      })
      .collect()
  }

  // --- Disposal ---

  /// Hands `resource` to this scope: it is disposed when the scope closes.
  /// The same `Arc` is returned.
  pub fn enter<R: Dispose + 'static>(&self, resource: Arc<R>) -> Arc<R> {
    self.enter_with_handle(resource).0
  }

  /// Like [`Scope::enter`], also returning a handle that can release the
  /// resource early.
  pub fn enter_with_handle<R: Dispose + 'static>(
    &self,
    resource: Arc<R>,
  ) -> (Arc<R>, ReleaseHandle) {
    let held = resource.clone();
    let handle = self
      .inner
      .disposal
      .push(type_name::<R>(), move || held.dispose());
    (resource, handle)
  }

  /// Pushes an arbitrary release action onto this scope's disposal stack.
  pub fn defer<F>(&self, label: impl Into<String>, action: F) -> ReleaseHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.inner.disposal.push(label, action)
  }

  /// Releases everything entered into this scope, most recent first.
  ///
  /// Every entry is released at most once. An entry that was already
  /// released through its handle makes this return
  /// [`Error::DoubleRelease`] after the rest of the stack has been drained.
  /// Registrations and cached values are left in place.
  pub fn close(&self) -> Result<()> {
    tracing::debug!(
      scope = self.id(),
      pending = self.inner.disposal.len(),
      "closing scope"
    );
    self.inner.disposal.drain()
  }

  /// Number of disposal entries waiting for this scope to close.
  pub fn pending_disposals(&self) -> usize {
    self.inner.disposal.len()
  }

  pub fn cache_stats(&self) -> CacheStats {
    CacheStats {
      scoped: self.inner.scoped.len(),
      singletons: self.inner.shared.singletons.len(),
    }
  }
}

fn validate(key: &Key, descriptor: &Descriptor) -> Result<()> {
  match descriptor.kind() {
    DescriptorKind::Bound(target) if target == key => Err(Error::Construction {
      key: key.clone(),
      reason: "a key cannot be bound to itself".to_string(),
    }),
    DescriptorKind::Grouped(members) if members.contains(key) => Err(Error::Construction {
      key: key.clone(),
      reason: "a group cannot list its own key as a member".to_string(),
    }),
    _ => Ok(()),
  }
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("id", &self.inner.id)
      .field("depth", &self.inner.depth)
      .field("registered", &self.inner.overlay.len())
      .finish()
  }
}
