use fibre_provider::Scope;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn tracker(kind: &str) -> RequestTracker {
  println!("Creating {kind} RequestTracker...");
  RequestTracker {
    id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
  }
}

fn main() -> fibre_provider::Result<()> {
  let root = Scope::root();

  // Called once for the whole tree.
  root.register_singleton("singleton_tracker", |_| Ok(tracker("SINGLETON")));
  // Called once per scope.
  root.register_scoped("scoped_tracker", |_| Ok(tracker("SCOPED")));
  // Called on every resolution.
  root.register_transient("transient_tracker", |_| Ok(tracker("TRANSIENT")));

  let first = root.scope();
  let second = root.scope();

  println!("--- Singletons ---");
  let s1 = first.resolve_as::<RequestTracker>("singleton_tracker")?;
  let s2 = second.resolve_as::<RequestTracker>("singleton_tracker")?;
  println!("Singleton IDs: {}, {}", s1.id, s2.id);
  assert!(Arc::ptr_eq(&s1, &s2));

  println!("--- Scoped ---");
  let a1 = first.resolve_as::<RequestTracker>("scoped_tracker")?;
  let a2 = first.resolve_as::<RequestTracker>("scoped_tracker")?;
  let b = second.resolve_as::<RequestTracker>("scoped_tracker")?;
  println!("Scoped IDs: {}, {} (first scope), {} (second scope)", a1.id, a2.id, b.id);
  assert!(Arc::ptr_eq(&a1, &a2));
  assert!(!Arc::ptr_eq(&a1, &b));

  println!("--- Transients ---");
  let t1 = first.resolve_as::<RequestTracker>("transient_tracker")?;
  let t2 = first.resolve_as::<RequestTracker>("transient_tracker")?;
  println!("Transient IDs: {}, {}", t1.id, t2.id);
  assert!(!Arc::ptr_eq(&t1, &t2));

  Ok(())
}
