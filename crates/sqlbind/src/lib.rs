//! sqlbind - typed parameter and result bindings for hand-written SQL
//!
//! sqlbind resolves raw SQL statements against an immutable schema snapshot
//! and produces, per statement, a descriptor: a run-stable name, an ordered
//! tuple of parameter types, and a named result record - each with explicit
//! nullability. An external emitter turns descriptors into host-language
//! declarations; sqlbind itself never generates text.
//!
//! # Example
//!
//! ```rust
//! use sqlbind::catalog::SchemaSnapshot;
//! use sqlbind::Engine;
//!
//! let snapshot = SchemaSnapshot::from_ddl(
//!     "CREATE TABLE items (id INTEGER NOT NULL, name TEXT NOT NULL);",
//! )
//! .unwrap();
//! let engine = Engine::new(snapshot);
//!
//! let summary = engine.run(&[(
//!     "queries.sql".to_string(),
//!     "SELECT id, name FROM items;".to_string(),
//! )]);
//! assert!(!summary.failed);
//! assert_eq!(summary.documents[0].queries[0].name, "Sql1");
//! ```

pub use sqlbind_binder as binder;
pub use sqlbind_catalog as catalog;
pub use sqlbind_common as common;
pub use sqlbind_extract as extract;
pub use sqlbind_synth as synth;

mod engine;

pub use engine::{DocumentBindings, Engine, RunSummary};
pub use sqlbind_common::{Diagnostic, Error, Result, Severity};
pub use sqlbind_synth::QueryDescriptor;
