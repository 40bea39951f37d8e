//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for private transaction execution.
//!
//! - **Driving Ports (Inbound)**: `PrivateMessageApi`, `StateExtensionHook`
//! - **Driven Ports (Outbound)**: `PayloadExchangeClient`,
//!   `PrivateTransactionManager`, `StateDb`, `MessageExecutor`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
