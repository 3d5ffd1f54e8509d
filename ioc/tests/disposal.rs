use fibre_provider::{Dispose, Error, Factory, Lifetime, Scope, Service};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

// --- Test Fixtures ---

type Log = Arc<Mutex<Vec<String>>>;

struct Resource {
  name: String,
  log: Log,
}

impl Resource {
  fn new(name: &str, log: &Log) -> Arc<Self> {
    Arc::new(Self {
      name: name.to_string(),
      log: log.clone(),
    })
  }
}

impl Dispose for Resource {
  fn dispose(&self) {
    self.log.lock().push(self.name.clone());
  }
}

fn log() -> Log {
  Arc::new(Mutex::new(Vec::new()))
}

// --- Disposal Tests ---

#[test]
fn test_close_releases_in_reverse_order() {
  let log = log();
  let scope = Scope::root().scope();

  scope.enter(Resource::new("r1", &log));
  scope.enter(Resource::new("r2", &log));
  scope.enter(Resource::new("r3", &log));
  assert_eq!(scope.pending_disposals(), 3);

  scope.close().unwrap();

  assert_eq!(*log.lock(), vec!["r3", "r2", "r1"]);
  assert_eq!(scope.pending_disposals(), 0);
}

#[test]
fn test_enter_returns_the_same_resource() {
  let log = log();
  let scope = Scope::root();
  let resource = Resource::new("r", &log);

  let entered = scope.enter(resource.clone());

  assert!(Arc::ptr_eq(&resource, &entered));
}

#[test]
fn test_second_release_is_reported() {
  let log = log();
  let scope = Scope::root().scope();
  let (_, r1) = scope.enter_with_handle(Resource::new("r1", &log));
  let (_, r2) = scope.enter_with_handle(Resource::new("r2", &log));
  let (_, r3) = scope.enter_with_handle(Resource::new("r3", &log));

  scope.close().unwrap();

  for handle in [&r1, &r2, &r3] {
    assert!(handle.is_released());
    assert!(matches!(handle.release(), Err(Error::DoubleRelease { .. })));
  }
  assert_eq!(*log.lock(), vec!["r3", "r2", "r1"]);
}

#[test]
fn test_close_reports_entries_released_early_and_keeps_draining() {
  let log = log();
  let scope = Scope::root().scope();
  scope.enter(Resource::new("r1", &log));
  let (_, r2) = scope.enter_with_handle(Resource::new("r2", &log));
  scope.enter(Resource::new("r3", &log));

  r2.release().unwrap();
  let err = scope.close().unwrap_err();

  assert!(matches!(err, Error::DoubleRelease { ref label } if label.ends_with("Resource")));
  assert_eq!(*log.lock(), vec!["r2", "r3", "r1"]);
}

#[test]
fn test_factories_enter_resources_into_the_scope_they_receive() {
  let log = log();
  let root = Scope::root();
  let scoped_log = log.clone();
  root.register(
    "connection",
    Factory::new(move |scope| {
      let resource = scope.enter(Resource::new("connection", &scoped_log));
      Ok(Service::from_arc(resource))
    }),
    Lifetime::Scoped,
  );
  let singleton_log = log.clone();
  root.register(
    "pool",
    Factory::new(move |scope| {
      let resource = scope.enter(Resource::new("pool", &singleton_log));
      Ok(Service::from_arc(resource))
    }),
    Lifetime::Singleton,
  );

  let request = root.scope();
  request.resolve("connection").unwrap();
  request.resolve("connection").unwrap();
  request.resolve("pool").unwrap();

  // The scoped resource belongs to the request, the singleton to the root.
  assert_eq!(request.pending_disposals(), 1);
  assert_eq!(root.pending_disposals(), 1);

  request.close().unwrap();
  assert_eq!(*log.lock(), vec!["connection"]);

  root.close().unwrap();
  assert_eq!(*log.lock(), vec!["connection", "pool"]);
}

#[test]
fn test_shared_factory_resolves_entered_resource_as_its_own_type() {
  let log = log();
  let root = Scope::root();
  let factory_log = log.clone();
  root.register(
    "session",
    Factory::shared(move |scope| Ok(scope.enter(Resource::new("session", &factory_log)))),
    Lifetime::Scoped,
  );
  let request = root.scope();

  let first = request.resolve_as::<Resource>("session").unwrap();
  let second = request.resolve_as::<Resource>("session").unwrap();

  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(first.name, "session");
  assert_eq!(request.pending_disposals(), 1);

  request.close().unwrap();
  assert_eq!(*log.lock(), vec!["session"]);
}

#[test]
fn test_with_scope_closes_the_child() {
  let log = log();
  let root = Scope::root();

  let value = root
    .with_scope(|scope| {
      scope.enter(Resource::new("temp", &log));
      scope.defer("callback", {
        let log = log.clone();
        move || log.lock().push("callback".to_string())
      });
      Ok(7)
    })
    .unwrap();

  assert_eq!(value, 7);
  assert_eq!(*log.lock(), vec!["callback", "temp"]);
}

#[test]
fn test_dropping_an_unclosed_scope_releases_pending_entries() {
  let log = log();
  let scope = Scope::root().scope();
  scope.enter(Resource::new("r1", &log));
  let (_, r2) = scope.enter_with_handle(Resource::new("r2", &log));
  r2.release().unwrap();

  drop(scope);

  assert_eq!(*log.lock(), vec!["r2", "r1"]);
}

#[test]
fn test_children_keep_an_unclosed_parent_alive() {
  let log = log();
  let parent = Scope::root().scope();
  parent.enter(Resource::new("parent", &log));
  let child = parent.scope();

  drop(parent);
  assert!(log.lock().is_empty());

  drop(child);
  assert_eq!(*log.lock(), vec!["parent"]);
}
