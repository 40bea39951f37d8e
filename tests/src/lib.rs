//! # Quantum-Chain Private Transaction Test Suite
//!
//! Cross-module scenarios driving the state transition, the caching manager
//! and the extension handler together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs          # Node fixture, message builders
//!     ├── private_flows.rs    # Counter / forwarder contracts under privacy flags
//!     ├── extension_flows.rs  # State sharing between nodes
//!     └── exchange_flows.rs   # Full runtime against a fake HTTP exchange
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::extension_flows
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
