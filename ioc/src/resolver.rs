//! Fallback resolvers for keys that have no registered descriptor.
//!
//! Resolvers are only consulted after the whole scope chain missed, so an
//! explicit registration always wins over anything a resolver synthesizes.

use crate::descriptor::{Descriptor, Factory, Lifetime};
use crate::key::Key;
use crate::scope::Scope;
use crate::service::Service;
use parking_lot::ReentrantMutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Synthesizes a descriptor for a key nobody registered.
pub trait Resolver: Send + Sync {
  /// Returns a descriptor for `key`, or `None` if the key is not handled by
  /// this resolver.
  fn resolve_missing(&self, key: &Key, scope: &Scope) -> Option<Descriptor>;

  /// Lets [`ResolverChain::append`] splice nested chains into a flat list.
  fn as_chain(&self) -> Option<&ResolverChain> {
    None
  }
}

/// An ordered list of resolvers. The first one that answers wins.
#[derive(Clone, Default)]
pub struct ResolverChain {
  resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverChain {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a resolver. Appending another chain appends its members
  /// instead, so chains never nest.
  pub fn append<R: Resolver + 'static>(mut self, resolver: R) -> Self {
    self.push(resolver);
    self
  }

  pub(crate) fn push<R: Resolver + 'static>(&mut self, resolver: R) {
    match resolver.as_chain() {
      Some(chain) => self.resolvers.extend(chain.resolvers.iter().cloned()),
      None => self.resolvers.push(Arc::new(resolver)),
    }
  }

  pub fn len(&self) -> usize {
    self.resolvers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resolvers.is_empty()
  }
}

impl Resolver for ResolverChain {
  fn resolve_missing(&self, key: &Key, scope: &Scope) -> Option<Descriptor> {
    self
      .resolvers
      .iter()
      .find_map(|resolver| resolver.resolve_missing(key, scope))
  }

  fn as_chain(&self) -> Option<&ResolverChain> {
    Some(self)
  }
}

impl fmt::Debug for ResolverChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolverChain")
      .field("len", &self.resolvers.len())
      .finish()
  }
}

/// A resolver backed by a closure.
pub struct FnResolver<F> {
  func: F,
}

impl<F> FnResolver<F>
where
  F: Fn(&Key, &Scope) -> Option<Descriptor> + Send + Sync,
{
  pub fn new(func: F) -> Self {
    Self { func }
  }
}

impl<F> Resolver for FnResolver<F>
where
  F: Fn(&Key, &Scope) -> Option<Descriptor> + Send + Sync,
{
  fn resolve_missing(&self, key: &Key, scope: &Scope) -> Option<Descriptor> {
    (self.func)(key, scope)
  }
}

/// Remembers the descriptors another resolver synthesized.
///
/// Hits are read from a lock-free map. Only the miss path takes a lock, so
/// the wrapped resolver runs at most once per key that it answers. Because
/// the same descriptor comes back every time, scoped and singleton values
/// created from it are cached like those of a registered descriptor.
///
/// Keys the wrapped resolver declines are not remembered.
pub struct CachedResolver<R> {
  inner: R,
  hits: papaya::HashMap<Key, Descriptor>,
  // Reentrant: the wrapped resolver may resolve other missing keys.
  miss_lock: ReentrantMutex<()>,
}

impl<R: Resolver> CachedResolver<R> {
  pub fn new(inner: R) -> Self {
    Self {
      inner,
      hits: papaya::HashMap::new(),
      miss_lock: ReentrantMutex::new(()),
    }
  }

  /// Number of keys answered so far.
  pub fn len(&self) -> usize {
    self.hits.pin().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<R: Resolver> Resolver for CachedResolver<R> {
  fn resolve_missing(&self, key: &Key, scope: &Scope) -> Option<Descriptor> {
    if let Some(descriptor) = self.hits.pin().get(key) {
      return Some(descriptor.clone());
    }

    let _miss = self.miss_lock.lock();
    if let Some(descriptor) = self.hits.pin().get(key) {
      return Some(descriptor.clone());
    }
    let descriptor = self.inner.resolve_missing(key, scope)?;
    self.hits.pin().insert(key.clone(), descriptor.clone());
    Some(descriptor)
  }
}

/// Builds transient `T::default()` values on demand for `Key::of::<T>()`.
///
/// Only the types opted in with [`TypeDefaultResolver::with`] are handled.
#[derive(Default)]
pub struct TypeDefaultResolver {
  factories: HashMap<TypeId, Factory>,
}

impl TypeDefaultResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with<T: Default + Any + Send + Sync>(mut self) -> Self {
    self
      .factories
      .insert(TypeId::of::<T>(), Factory::nullary(|| Ok(Service::new(T::default()))));
    self
  }
}

impl Resolver for TypeDefaultResolver {
  fn resolve_missing(&self, key: &Key, _scope: &Scope) -> Option<Descriptor> {
    if key.name().is_some() {
      return None;
    }
    let factory = self.factories.get(&key.type_id()?)?;
    Some(Descriptor::factory(Lifetime::Transient, factory.clone()))
  }
}

/// Resolves plain named keys from the process environment.
///
/// With a prefix, only keys that start with it are handled and the prefix is
/// stripped before the lookup: `env:HOME` reads `HOME`. The value is a
/// `String` service.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
  prefix: Option<String>,
}

impl EnvResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_prefix(prefix: impl Into<String>) -> Self {
    Self {
      prefix: Some(prefix.into()),
    }
  }
}

impl Resolver for EnvResolver {
  fn resolve_missing(&self, key: &Key, _scope: &Scope) -> Option<Descriptor> {
    if key.type_id().is_some() {
      return None;
    }
    let name = key.name()?;
    let var = match &self.prefix {
      Some(prefix) => name.strip_prefix(prefix.as_str())?,
      None => name,
    };
    let value = std::env::var(var).ok()?;
    Some(Descriptor::value(Service::new(value)))
  }
}
