//! media-bot domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `block_list`: Cooldown tracking for recently posted content
//! - `usecases`: Selection, rendering, posting cycle and scheduling

pub mod block_list;
pub mod model;
pub mod ports;
pub mod usecases;

pub use block_list::{BlockList, DEFAULT_COOLDOWN};
pub use model::*;
pub use ports::*;
