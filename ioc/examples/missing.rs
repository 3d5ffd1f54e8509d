use fibre_provider::{Scope, Service};

fn main() {
  let root = Scope::root();
  root.register_transient("report", |scope| {
    let template = scope.resolve_as::<String>("template")?;
    Ok(format!("report using {template}"))
  });

  // A key nobody registered: `get` falls back to the default.
  let theme = root
    .get_or("theme", Service::new(String::from("light")))
    .unwrap();
  println!("Theme: {}", theme.downcast_ref::<String>().unwrap());

  // A registered key with a missing dependency is an error, and the error
  // names the whole path.
  match root.get("report") {
    Ok(_) => unreachable!(),
    Err(err) => println!("Failed as expected: {err}"),
  }
}
