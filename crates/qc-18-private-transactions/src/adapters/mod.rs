//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports.
//!
//! | Adapter | Port | Use |
//! |---------|------|-----|
//! | `HttpExchangeClient` | `PayloadExchangeClient` | Production wire client |
//! | `InMemoryExchange` | `PayloadExchangeClient` | Tests, local networks |
//! | `CachingExchangeManager` | `PrivateTransactionManager` | Production manager |
//! | `NotInUseManager` | `PrivateTransactionManager` | Nodes without an exchange |
//! | `MockPrivateTransactionManager` | `PrivateTransactionManager` | Scripted tests |
//! | `InMemoryStateDb` | `StateDb` | Journaled in-memory state |
//! | `ScriptedVm` | `MessageExecutor` | Deterministic test engine |

pub mod caching_manager;
pub mod http_client;
pub mod in_memory_exchange;
pub mod mock_manager;
pub mod not_in_use;
pub mod scripted_vm;
pub mod state_db;

pub use caching_manager::{cleanup_task, CacheEntry, CachingExchangeManager, PayloadCache};
pub use http_client::HttpExchangeClient;
pub use in_memory_exchange::{ExchangeCalls, InMemoryExchange};
pub use mock_manager::{MockAnswer, MockPrivateTransactionManager};
pub use not_in_use::NotInUseManager;
pub use scripted_vm::ScriptedVm;
pub use state_db::InMemoryStateDb;
