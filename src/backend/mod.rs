//! Backend boundary
//!
//! Physical resource ids, the allocator that owns them, and the command
//! buffer that passes record into. A real device backend replays the recorded
//! commands; this crate never touches a GPU itself.

pub mod allocator;
pub mod command;
pub mod types;

pub use allocator::*;
pub use command::*;
pub use types::*;
