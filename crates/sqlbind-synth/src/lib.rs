//! sqlbind Synth - descriptor naming, assembly and caching
//!
//! The last pipeline stage: gives every statement its run-stable name,
//! assembles the final descriptor from the inferred bindings, and caches
//! bindings per (statement text, schema version) so identical statements
//! are inferred once per run.

mod cache;
mod descriptor;

pub use cache::{BindingCache, CacheKey};
pub use descriptor::{degraded_descriptor, descriptor_name, synthesize, QueryDescriptor};
