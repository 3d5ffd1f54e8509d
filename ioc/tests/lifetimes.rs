use fibre_provider::{CacheStats, Error, Factory, Lifetime, Scope, Service};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

// --- Test Fixtures ---

struct Instance;

/// A root with a descendant tree: root -> (scoped_1 -> scoped_1_1), scoped_2.
fn tree(lifetime: Lifetime) -> (Scope, Scope, Scope, Scope) {
  let root = Scope::root();
  root.register("svc", Factory::of(|_| Ok(Instance)), lifetime);
  let scoped_1 = root.scope();
  let scoped_2 = root.scope();
  let scoped_1_1 = scoped_1.scope();
  (root, scoped_1, scoped_2, scoped_1_1)
}

fn same(a: &Scope, b: &Scope) -> bool {
  a.resolve("svc").unwrap().ptr_eq(&b.resolve("svc").unwrap())
}

// --- Lifetime Tests ---

#[test]
fn test_singleton_is_shared_by_the_whole_tree() {
  let (root, s1, s2, s1_1) = tree(Lifetime::Singleton);
  let all = [&root, &s1, &s2, &s1_1];

  for a in all {
    for b in all {
      assert!(same(a, b));
    }
  }
}

#[test]
fn test_scoped_is_shared_only_within_a_scope() {
  let (root, s1, s2, s1_1) = tree(Lifetime::Scoped);
  let all = [&root, &s1, &s2, &s1_1];

  for (i, a) in all.iter().enumerate() {
    for (j, b) in all.iter().enumerate() {
      assert_eq!(same(a, b), i == j, "scopes {} and {}", i, j);
    }
  }
}

#[test]
fn test_transient_is_never_shared() {
  let (root, s1, s2, s1_1) = tree(Lifetime::Transient);
  let all = [&root, &s1, &s2, &s1_1];

  for a in all {
    for b in all {
      assert!(!same(a, b));
    }
  }
  assert_eq!(root.cache_stats(), CacheStats { scoped: 0, singletons: 0 });
  assert_eq!(s1_1.cache_stats(), CacheStats { scoped: 0, singletons: 0 });
}

#[test]
fn test_caches_are_owned_by_the_right_scope() {
  let root = Scope::root();
  root.register_singleton("single", |_| Ok(1u8));
  root.register_scoped("scoped", |_| Ok(2u8));
  let child = root.scope();

  child.resolve("single").unwrap();
  child.resolve("scoped").unwrap();

  assert_eq!(child.cache_stats(), CacheStats { scoped: 1, singletons: 1 });
  // The singleton lives with the root; the scoped value only in the child.
  assert_eq!(root.cache_stats(), CacheStats { scoped: 0, singletons: 1 });
}

#[test]
fn test_singleton_factory_receives_the_root_scope() {
  let root = Scope::root();
  root.register_singleton("seen_by_singleton", |scope| Ok(scope.id()));
  root.register_scoped("seen_by_scoped", |scope| Ok(scope.id()));
  root.register_transient("seen_by_transient", |scope| Ok(scope.id()));

  let child = root.scope().scope();

  assert_eq!(*child.resolve_as::<u64>("seen_by_singleton").unwrap(), root.id());
  assert_eq!(*child.resolve_as::<u64>("seen_by_scoped").unwrap(), child.id());
  assert_eq!(*child.resolve_as::<u64>("seen_by_transient").unwrap(), child.id());
}

#[test]
fn test_singleton_does_not_capture_scoped_state() {
  // The child shadows "tenant", but the singleton is built from the root's
  // point of view and sees the root registration.
  let root = Scope::root();
  root.register_instance("tenant", "default".to_string());
  root.register_singleton("report", |scope| {
    Ok(format!("report for {}", scope.resolve_as::<String>("tenant")?))
  });

  let child = root.scope();
  child.register_instance("tenant", "acme".to_string());

  assert_eq!(*child.resolve_as::<String>("tenant").unwrap(), "acme");
  assert_eq!(
    *child.resolve_as::<String>("report").unwrap(),
    "report for default"
  );
}

#[test]
fn test_scoped_factory_runs_once_per_scope_under_concurrency() {
  let calls = Arc::new(AtomicUsize::new(0));
  let root = Scope::root();
  let counter = calls.clone();
  root.register_scoped("conn", move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    thread::sleep(std::time::Duration::from_millis(20));
    Ok(Instance)
  });

  let request = root.scope();
  let values: Vec<Service> = thread::scope(|s| {
    let handles: Vec<_> = (0..16)
      .map(|_| s.spawn(|| request.resolve("conn").unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert!(values.windows(2).all(|w| w[0].ptr_eq(&w[1])));
}

#[test]
fn test_failed_factory_is_not_cached() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let root = Scope::root();
  let counter = attempts.clone();
  root.register_singleton("flaky", move |_| {
    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
      return Err(Error::application("first attempt fails"));
    }
    Ok(Instance)
  });

  let err = root.resolve("flaky").unwrap_err();
  assert!(matches!(err, Error::Application(_)));
  assert_eq!(err.to_string(), "first attempt fails");

  let first = root.resolve("flaky").unwrap();
  let second = root.resolve("flaky").unwrap();
  assert!(first.ptr_eq(&second));
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_nullary_factory_ignores_the_provider() {
  let root = Scope::root();
  root.register(
    "answer",
    Factory::nullary(|| Ok(Service::new(42u32))),
    Lifetime::Scoped,
  );

  assert_eq!(*root.scope().resolve_as::<u32>("answer").unwrap(), 42);
}
