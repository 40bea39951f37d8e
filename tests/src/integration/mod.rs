//! Integration scenarios.

pub mod support;

mod exchange_flows;
mod extension_flows;
mod private_flows;
