//! # Runtime Wiring
//!
//! Builds exactly one `PrivateTransactionManager` at startup and hands the
//! same instance to the state transition and the extension handler.

use crate::adapters::caching_manager::{cleanup_task, CachingExchangeManager};
use crate::adapters::http_client::HttpExchangeClient;
use crate::adapters::not_in_use::NotInUseManager;
use crate::config::PrivateTxConfig;
use crate::errors::StartupError;
use crate::extension::StateExtensionHandler;
use crate::ports::outbound::{MessageExecutor, PrivateTransactionManager};
use crate::transition::PrivateStateTransition;
use crate::SUBSYSTEM;
use quantum_telemetry::{log_event, register_metrics};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Private transaction components sharing one manager.
pub struct PrivateTxRuntime<E> {
    manager: Arc<dyn PrivateTransactionManager>,
    transition: PrivateStateTransition<E>,
    extension: StateExtensionHandler,
    sweeper: Option<JoinHandle<()>>,
}

impl<E: MessageExecutor> PrivateTxRuntime<E> {
    /// Builds the runtime from configuration.
    ///
    /// With the exchange enabled this is a caching manager over the HTTP
    /// client, and the cache sweeper is spawned on the current tokio runtime
    /// if there is one. Otherwise this node participates in no private
    /// transaction: payloads resolve as not found and private messages
    /// apply as no-ops.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &PrivateTxConfig, executor: E) -> Result<Self, StartupError> {
        config.validate()?;

        if !config.exchange.enabled {
            log_event!(info, SUBSYSTEM, "Payload exchange disabled, private payloads will not resolve");
            return Ok(Self::with_manager(Arc::new(NotInUseManager), executor));
        }

        let client = HttpExchangeClient::new(&config.exchange)?;
        let caching = CachingExchangeManager::new(client, config.cache.ttl);

        let sweeper = match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(cleanup_task(
                Arc::clone(caching.cache()),
                config.cache.sweep_interval,
            ))),
            Err(_) => {
                warn!("No async runtime, payload cache sweeper not started");
                None
            }
        };

        log_event!(
            info,
            SUBSYSTEM,
            "Payload exchange enabled",
            url = %config.exchange.url,
            ttl = ?config.cache.ttl
        );

        let mut runtime = Self::with_manager(Arc::new(caching), executor);
        runtime.sweeper = sweeper;
        Ok(runtime)
    }

    /// Wires the components around an existing manager and registers the
    /// subsystem's metrics with the global registry.
    pub fn with_manager(manager: Arc<dyn PrivateTransactionManager>, executor: E) -> Self {
        if let Err(e) = register_metrics() {
            warn!(error = %e, "Private transaction metrics not registered");
        }
        Self {
            transition: PrivateStateTransition::new(Arc::clone(&manager), executor),
            extension: StateExtensionHandler::new(Arc::clone(&manager)),
            manager,
            sweeper: None,
        }
    }

    /// The shared manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<dyn PrivateTransactionManager> {
        &self.manager
    }

    /// Message application.
    #[must_use]
    pub fn transition(&self) -> &PrivateStateTransition<E> {
        &self.transition
    }

    /// Post-execution extension hook.
    #[must_use]
    pub fn extension(&self) -> &StateExtensionHandler {
        &self.extension
    }

    /// Returns true if the cache sweeper task is running.
    #[must_use]
    pub fn sweeper_running(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl<E> Drop for PrivateTxRuntime<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}
