//! The process-wide service provider.
//!
//! Prefer passing a [`Scope`] explicitly. This slot exists for code that
//! cannot be reached that way; it must be filled with [`init`] and emptied
//! with [`teardown`].

use crate::error::{Error, Result};
use crate::scope::Scope;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

// Empty until `init` is called.
static GLOBAL_PROVIDER: Lazy<RwLock<Option<Scope>>> = Lazy::new(|| RwLock::new(None));

/// Installs `root` as the process-wide provider.
///
/// # Examples
///
/// ```
/// use fibre_provider::{global, Scope};
///
/// global::init(Scope::root()).unwrap();
/// global::global().unwrap().register_instance("greeting", String::from("Hello from global!"));
///
/// let greeting = global::global().unwrap().resolve_as::<String>("greeting").unwrap();
/// assert_eq!(*greeting, "Hello from global!");
///
/// global::teardown().unwrap();
/// ```
pub fn init(root: Scope) -> Result<()> {
  let mut slot = GLOBAL_PROVIDER.write();
  if slot.is_some() {
    return Err(Error::GlobalAlreadyInitialized);
  }
  tracing::debug!(scope = root.id(), "installed global provider");
  *slot = Some(root);
  Ok(())
}

/// Returns the process-wide provider.
pub fn global() -> Result<Scope> {
  try_global().ok_or(Error::GlobalNotInitialized)
}

pub fn try_global() -> Option<Scope> {
  GLOBAL_PROVIDER.read().clone()
}

/// Removes the process-wide provider and closes it.
pub fn teardown() -> Result<()> {
  let root = GLOBAL_PROVIDER
    .write()
    .take()
    .ok_or(Error::GlobalNotInitialized)?;
  tracing::debug!(scope = root.id(), "tearing down global provider");
  root.close()
}
