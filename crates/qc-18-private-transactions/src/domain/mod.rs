//! # Domain Layer (Inner Hexagon)
//!
//! Pure logic for private transaction execution.
//! NO I/O, NO async.
//!
//! Dependencies point inward only: ports and adapters use these types,
//! never the reverse.

pub mod entities;
pub mod invariants;
pub mod services;
pub mod state_shared;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use state_shared::*;
pub use value_objects::*;
