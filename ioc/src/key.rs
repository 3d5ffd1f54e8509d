//! Lookup keys.

use once_cell::sync::Lazy;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

static PROVIDER_KEY: Lazy<Key> = Lazy::new(|| Key::unique("provider"));
static PROVIDER_ROOT_KEY: Lazy<Key> = Lazy::new(|| Key::unique("provider_root"));
static PROVIDER_PARENT_KEY: Lazy<Key> = Lazy::new(|| Key::unique("provider_parent"));

/// An opaque identifier used to look up a descriptor.
///
/// Two keys match when they have the same identity: the same type, the same
/// name, the same type and name, or clones of the same unique symbol.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(Repr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
  Type {
    type_id: TypeId,
    type_name: &'static str,
  },
  Name(Arc<str>),
  Typed {
    type_id: TypeId,
    type_name: &'static str,
    name: Arc<str>,
  },
  Symbol {
    id: u64,
    label: Arc<str>,
  },
}

impl Key {
  /// A key identified by the type `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Key(Repr::Type {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
    })
  }

  /// A key identified by a plain string name.
  pub fn named(name: impl AsRef<str>) -> Self {
    Key(Repr::Name(Arc::from(name.as_ref())))
  }

  /// A key identified by the type `T` together with a name.
  pub fn typed<T: ?Sized + Any>(name: impl AsRef<str>) -> Self {
    Key(Repr::Typed {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
      name: Arc::from(name.as_ref()),
    })
  }

  /// A fresh symbol that is only ever equal to its own clones.
  ///
  /// The label is used for display only.
  pub fn unique(label: impl AsRef<str>) -> Self {
    Key(Repr::Symbol {
      id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
      label: Arc::from(label.as_ref()),
    })
  }

  /// The well-known key that resolves to the requesting scope itself.
  pub fn provider() -> Self {
    PROVIDER_KEY.clone()
  }

  /// The well-known key that resolves to the root of the requesting scope.
  pub fn provider_root() -> Self {
    PROVIDER_ROOT_KEY.clone()
  }

  /// The well-known key that resolves to the parent of the requesting scope,
  /// as an `Option<Scope>` that is `None` at the root.
  pub fn provider_parent() -> Self {
    PROVIDER_PARENT_KEY.clone()
  }

  /// The name of a `named` or `typed` key.
  pub fn name(&self) -> Option<&str> {
    match &self.0 {
      Repr::Name(name) | Repr::Typed { name, .. } => Some(name.as_ref()),
      _ => None,
    }
  }

  /// The type of a `of` or `typed` key.
  pub fn type_id(&self) -> Option<TypeId> {
    match &self.0 {
      Repr::Type { type_id, .. } | Repr::Typed { type_id, .. } => Some(*type_id),
      _ => None,
    }
  }

  pub fn is_unique(&self) -> bool {
    matches!(self.0, Repr::Symbol { .. })
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.0 {
      Repr::Type { type_name, .. } => f.write_str(type_name),
      Repr::Name(name) => f.write_str(name),
      Repr::Typed {
        type_name, name, ..
      } => write!(f, "{}({:?})", type_name, name),
      Repr::Symbol { id, label } => write!(f, "{}#{}", label, id),
    }
  }
}

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({})", self)
  }
}

impl From<&str> for Key {
  fn from(name: &str) -> Self {
    Key::named(name)
  }
}

impl From<String> for Key {
  fn from(name: String) -> Self {
    Key(Repr::Name(Arc::from(name)))
  }
}

impl From<&String> for Key {
  fn from(name: &String) -> Self {
    Key::named(name)
  }
}

impl From<&Key> for Key {
  fn from(key: &Key) -> Self {
    key.clone()
  }
}
