//! Render Graph System
//!
//! A per-frame graph of passes over virtual resources. Passes are declared in
//! program order and execute in that order; their read/write declarations
//! drive resource lifetimes, pooled aliasing of transient backings and
//! automatic binding. Results flow between features through the typed
//! [`ResourceMap`].

pub mod executor;
pub mod graph;
pub mod pass;
pub mod pass_data;
pub mod persistent_cache;
pub mod pool;
pub mod release_queue;
pub mod resource;
pub mod resource_map;

pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use pass_data::*;
pub use persistent_cache::*;
pub use pool::*;
pub use release_queue::*;
pub use resource::*;
pub use resource_map::*;
