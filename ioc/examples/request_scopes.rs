use fibre_provider::{Dispose, Factory, Lifetime, Scope};
use std::sync::Arc;

struct Connection {
  request: u32,
}

impl Dispose for Connection {
  fn dispose(&self) {
    println!("Closing connection of request {}", self.request);
  }
}

struct Transaction {
  request: u32,
}

impl Dispose for Transaction {
  fn dispose(&self) {
    println!("Committing transaction of request {}", self.request);
  }
}

fn main() -> fibre_provider::Result<()> {
  let root = Scope::root();
  root.register_instance("pool_size", 4usize);

  // Resources are entered into the scope that builds them and resolve as
  // their own type.
  root.register(
    "connection",
    Factory::shared(|scope| {
      let request = scope.resolve_as::<u32>("request_id")?;
      Ok(scope.enter(Arc::new(Connection { request: *request })))
    }),
    Lifetime::Scoped,
  );
  root.register(
    "transaction",
    Factory::shared(|scope| {
      let connection = scope.resolve_as::<Connection>("connection")?;
      Ok(scope.enter(Arc::new(Transaction {
        request: connection.request,
      })))
    }),
    Lifetime::Scoped,
  );

  for request in 1..=2u32 {
    root.with_scope(|scope| {
      scope.register_instance("request_id", request);
      let tx = scope.resolve_as::<Transaction>("transaction")?;
      let pool_size = scope.resolve_as::<usize>("pool_size")?;
      println!("Handling request {} (pool size {})", tx.request, pool_size);
      Ok(())
    })?;
  }

  Ok(())
}
