//! Error types for the service provider.

use crate::key::Key;
use std::fmt;
use thiserror::Error;

/// A boxed error raised by user code inside a factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The ordered list of keys traversed from the top-level request down to the
/// key that failed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolveChain(Vec<Key>);

impl ResolveChain {
  pub(crate) fn new(key: Key) -> Self {
    Self(vec![key])
  }

  pub(crate) fn prepend(&mut self, key: Key) {
    self.0.insert(0, key);
  }

  /// The keys in request order.
  pub fn keys(&self) -> &[Key] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// The key that ultimately could not be resolved.
  pub fn last(&self) -> Option<&Key> {
    self.0.last()
  }
}

impl fmt::Display for ResolveChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, key) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(" -> ")?;
      }
      write!(f, "{}", key)?;
    }
    Ok(())
  }
}

impl fmt::Debug for ResolveChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ResolveChain({})", self)
  }
}

/// The main error type for `fibre_provider`.
#[derive(Debug, Error)]
pub enum Error {
  /// No descriptor was registered for a key anywhere in the scope chain and
  /// no resolver could synthesize one.
  #[error("service not found: {chain}")]
  NotFound { chain: ResolveChain },

  /// A registration was rejected before it reached the overlay.
  #[error("invalid registration for '{key}': {reason}")]
  Construction { key: Key, reason: String },

  /// An error raised by a user factory. It is passed through untouched.
  #[error("{0}")]
  Application(#[source] BoxError),

  /// A disposal entry was released more than once.
  #[error("disposal entry '{label}' was already released")]
  DoubleRelease { label: String },

  /// A descriptor was requested again, on the same thread and scope, while it
  /// was still being resolved.
  #[error("circular dependency detected: {chain}")]
  CircularDependency { chain: ResolveChain },

  /// The resolved service is not of the requested type.
  #[error("service '{key}' is not of type {expected}")]
  TypeMismatch { key: Key, expected: &'static str },

  #[error("the global service provider has not been initialized")]
  GlobalNotInitialized,

  #[error("the global service provider is already initialized")]
  GlobalAlreadyInitialized,
}

impl Error {
  /// Wraps an arbitrary error raised from inside a factory.
  pub fn application<E>(err: E) -> Self
  where
    E: Into<BoxError>,
  {
    Error::Application(err.into())
  }

  pub(crate) fn not_found(key: Key) -> Self {
    Error::NotFound {
      chain: ResolveChain::new(key),
    }
  }

  /// The resolve chain, for errors that carry one.
  pub fn resolve_chain(&self) -> Option<&ResolveChain> {
    match self {
      Error::NotFound { chain } | Error::CircularDependency { chain } => Some(chain),
      _ => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }

  /// Records that the failure happened while resolving `key`. Only chain
  /// carrying errors are annotated; everything else passes through as-is.
  pub(crate) fn within(mut self, key: &Key) -> Self {
    match &mut self {
      Error::NotFound { chain } | Error::CircularDependency { chain } => {
        chain.prepend(key.clone());
      }
      _ => {}
    }
    self
  }
}

/// A specialized `Result` type for `fibre_provider` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
