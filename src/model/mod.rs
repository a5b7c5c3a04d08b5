//! # Property Graph Model
//!
//! Driver-independent DTOs. Every driver converts its native rows, nodes
//! and relationships into these before the adapter reshapes them.
//!
//! This module is pure data — no I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId};
pub use value::Value;
pub use property_map::{PropertyMap, props};
