//! Configuration of a root scope.

use crate::descriptor::Descriptor;
use crate::key::Key;
use crate::resolver::{Resolver, ResolverChain};
use crate::scope::Scope;
use std::fmt;

const DEFAULT_SELF_ALIAS: &str = "ioc";

/// A builder for root [`Scope`]s.
///
/// By default the root registers [`Key::provider()`] so that factories can
/// ask for "the scope resolving me" by key, and binds the alias `"ioc"` to
/// it. [`Key::provider_root()`] and [`Key::provider_parent()`] are registered
/// alongside. No resolvers are installed.
pub struct ContainerBuilder {
  resolvers: ResolverChain,
  provider_key: bool,
  self_alias: Option<String>,
}

impl Default for ContainerBuilder {
  fn default() -> Self {
    Self {
      resolvers: ResolverChain::new(),
      provider_key: true,
      self_alias: Some(DEFAULT_SELF_ALIAS.to_string()),
    }
  }
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("resolvers", &self.resolvers.len())
      .field("provider_key", &self.provider_key)
      .field("self_alias", &self.self_alias)
      .finish()
  }
}

impl ContainerBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a fallback resolver. Resolvers run in the order they were added.
  pub fn resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
    self.resolvers.push(resolver);
    self
  }

  /// Appends every resolver of `chain`.
  pub fn resolvers(mut self, chain: ResolverChain) -> Self {
    self.resolvers.push(chain);
    self
  }

  /// Whether the root registers the built-in provider keys. Defaults to
  /// `true`.
  ///
  /// Turning it off also drops the self alias.
  pub fn register_provider_key(mut self, enabled: bool) -> Self {
    self.provider_key = enabled;
    self
  }

  /// Sets the string key bound to [`Key::provider()`]. Defaults to `"ioc"`.
  pub fn self_alias(mut self, alias: impl Into<String>) -> Self {
    self.self_alias = Some(alias.into());
    self
  }

  pub fn no_self_alias(mut self) -> Self {
    self.self_alias = None;
    self
  }

  pub fn build(self) -> Scope {
    let root = Scope::new_root(self.resolvers);
    if self.provider_key {
      root.insert_descriptor(Key::provider(), Descriptor::provider_self());
      root.insert_descriptor(Key::provider_root(), Descriptor::provider_root());
      root.insert_descriptor(Key::provider_parent(), Descriptor::provider_parent());
      if let Some(alias) = self.self_alias {
        root.insert_descriptor(Key::named(alias), Descriptor::bound(Key::provider()));
      }
    }
    root
  }
}
