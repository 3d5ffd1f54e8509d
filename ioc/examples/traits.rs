use fibre_provider::{Factory, Key, Lifetime, Scope, Service};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation
struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log("Starting report generation.");
    self.logger.log("Finished report generation.");
  }
}

fn main() -> fibre_provider::Result<()> {
  let root = Scope::root();

  // The value is stored as `Arc<dyn Logger>` and read back as such.
  root.register(
    Key::of::<dyn Logger>(),
    Factory::nullary(|| Ok(Service::interface::<dyn Logger>(Arc::new(ConsoleLogger)))),
    Lifetime::Singleton,
  );

  // ReportService does not create its logger, it asks the provider for one.
  root.register_singleton(Key::of::<ReportService>(), |scope| {
    Ok(ReportService {
      logger: scope.resolve_interface::<dyn Logger>(Key::of::<dyn Logger>())?,
    })
  });

  println!("Resolving the high-level service...");
  let report_service = root.resolve_as::<ReportService>(Key::of::<ReportService>())?;
  report_service.generate_report();

  Ok(())
}
