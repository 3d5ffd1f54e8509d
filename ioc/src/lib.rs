//! # Fibre Provider
//!
//! A scoped, thread-safe Inversion of Control (IoC) service provider for Rust.
//!
//! Services are registered under a [`Key`] together with a [`Descriptor`]
//! that says how to produce them, and resolved from a [`Scope`]. Scopes form a
//! tree: a child sees everything its ancestors registered, can shadow those
//! registrations with its own, and keeps its own per-scope values and
//! resources.
//!
//! ## Core Concepts
//!
//! - **Scope**: a node of the provider tree. The root is the container; call
//!   [`Scope::scope`] for a child, [`Scope::close`] to release what a scope
//!   owns.
//! - **Lifetimes**: [`Lifetime::Transient`] builds a value per resolution,
//!   [`Lifetime::Scoped`] one per scope, and [`Lifetime::Singleton`] one for
//!   the whole tree. Singleton factories always receive the root scope.
//! - **Descriptors**: besides factories, a key can hold a fixed value, be
//!   bound to another key, name a group of keys, or stand for the requesting
//!   scope, its root or its parent.
//! - **Resolvers**: a [`ResolverChain`] supplies descriptors for keys that
//!   nobody registered.
//! - **Disposal**: factories hand resources implementing [`Dispose`] to
//!   [`Scope::enter`]; they are released in reverse order when the scope
//!   closes.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_provider::{Key, Scope};
//! use std::sync::Arc;
//!
//! struct Config {
//!   database_url: String,
//! }
//!
//! struct Database {
//!   url: String,
//! }
//!
//! let root = Scope::root();
//! root.register_instance(
//!   Key::of::<Config>(),
//!   Config { database_url: "postgres://localhost/app".to_string() },
//! );
//!
//! // The factory receives the scope and resolves its own dependencies.
//! root.register_scoped(Key::of::<Database>(), |scope| {
//!   let config = scope.resolve_as::<Config>(Key::of::<Config>())?;
//!   Ok(Database { url: config.database_url.clone() })
//! });
//!
//! let request = root.scope();
//! let a = request.resolve_as::<Database>(Key::of::<Database>()).unwrap();
//! let b = request.resolve_as::<Database>(Key::of::<Database>()).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.url, "postgres://localhost/app");
//!
//! request.close().unwrap();
//! ```

mod builder;
mod cache;
mod core;
mod descriptor;
mod disposal;
mod error;
pub mod global;
mod key;
mod resolver;
mod scope;
mod service;

pub use builder::ContainerBuilder;
pub use descriptor::{Descriptor, DescriptorId, DescriptorKind, Factory, GroupMembers, Lifetime};
pub use disposal::{Dispose, ReleaseHandle};
pub use error::{BoxError, Error, ResolveChain, Result};
pub use key::Key;
pub use resolver::{
  CachedResolver, EnvResolver, FnResolver, Resolver, ResolverChain, TypeDefaultResolver,
};
pub use scope::{CacheStats, Scope, WeakScope};
pub use service::Service;
