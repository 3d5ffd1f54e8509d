//! Scope-owned resources and their release protocol.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A resource that must be released when the scope owning it is closed.
///
/// Implement this for service types that hold something a scope should clean
/// up (connections, file handles, transactions) and hand them to
/// [`Scope::enter`](crate::Scope::enter) from inside a factory.
pub trait Dispose: Send + Sync {
  fn dispose(&self);
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

struct DisposalEntry {
  label: String,
  action: Mutex<Option<ReleaseFn>>,
}

impl DisposalEntry {
  fn release(&self) -> Result<()> {
    // Take the action out first so the lock is not held while it runs.
    let action = self.action.lock().take();
    match action {
      Some(action) => {
        tracing::trace!(label = %self.label, "releasing disposal entry");
        action();
        Ok(())
      }
      None => Err(Error::DoubleRelease {
        label: self.label.clone(),
      }),
    }
  }

  fn is_released(&self) -> bool {
    self.action.lock().is_none()
  }
}

/// A handle to one entry of a scope's disposal stack.
///
/// Releasing through the handle runs the release action right away. Whoever
/// comes second, the handle or the scope being closed, gets
/// [`Error::DoubleRelease`].
#[derive(Clone)]
pub struct ReleaseHandle {
  entry: Arc<DisposalEntry>,
}

impl ReleaseHandle {
  pub fn release(&self) -> Result<()> {
    self.entry.release()
  }

  pub fn is_released(&self) -> bool {
    self.entry.is_released()
  }

  pub fn label(&self) -> &str {
    &self.entry.label
  }
}

impl fmt::Debug for ReleaseHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReleaseHandle")
      .field("label", &self.entry.label)
      .field("released", &self.is_released())
      .finish()
  }
}

/// A LIFO list of release actions.
#[derive(Default)]
pub(crate) struct DisposalStack {
  entries: Mutex<Vec<Arc<DisposalEntry>>>,
}

impl DisposalStack {
  pub(crate) fn push<F>(&self, label: impl Into<String>, action: F) -> ReleaseHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let entry = Arc::new(DisposalEntry {
      label: label.into(),
      action: Mutex::new(Some(Box::new(action))),
    });
    self.entries.lock().push(entry.clone());
    ReleaseHandle { entry }
  }

  /// Releases every entry, last pushed first.
  ///
  /// Draining does not stop at an entry that was already released; it keeps
  /// going and reports the first such entry once the stack is empty.
  pub(crate) fn drain(&self) -> Result<()> {
    let entries = std::mem::take(&mut *self.entries.lock());
    let mut first_error = None;
    for entry in entries.iter().rev() {
      if let Err(err) = entry.release() {
        tracing::warn!(label = %entry.label, "disposal entry released twice");
        first_error.get_or_insert(err);
      }
    }
    match first_error {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  /// Releases the entries nobody released yet, last pushed first.
  pub(crate) fn drain_unreleased(&self) -> usize {
    let entries = std::mem::take(&mut *self.entries.lock());
    let mut released = 0;
    for entry in entries.iter().rev() {
      if entry.release().is_ok() {
        released += 1;
      }
    }
    released
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.lock().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> ReleaseFn) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let make = move |name: &'static str| -> ReleaseFn {
      let sink = sink.clone();
      Box::new(move || sink.lock().push(name))
    };
    (log, make)
  }

  #[test]
  fn test_drain_is_lifo() {
    let (log, make) = recorder();
    let stack = DisposalStack::default();
    stack.push("r1", make("r1"));
    stack.push("r2", make("r2"));
    stack.push("r3", make("r3"));

    stack.drain().unwrap();

    assert_eq!(*log.lock(), vec!["r3", "r2", "r1"]);
    assert_eq!(stack.len(), 0);
  }

  #[test]
  fn test_drain_reports_entries_released_early() {
    let (log, make) = recorder();
    let stack = DisposalStack::default();
    stack.push("r1", make("r1"));
    let r2 = stack.push("r2", make("r2"));
    stack.push("r3", make("r3"));

    r2.release().unwrap();
    let err = stack.drain().unwrap_err();

    assert!(matches!(err, Error::DoubleRelease { ref label } if label == "r2"));
    assert_eq!(*log.lock(), vec!["r2", "r3", "r1"]);
  }

  #[test]
  fn test_drain_unreleased_skips_released_entries() {
    let (log, make) = recorder();
    let stack = DisposalStack::default();
    let r1 = stack.push("r1", make("r1"));
    stack.push("r2", make("r2"));

    r1.release().unwrap();

    assert_eq!(stack.drain_unreleased(), 1);
    assert_eq!(*log.lock(), vec!["r1", "r2"]);
  }
}
