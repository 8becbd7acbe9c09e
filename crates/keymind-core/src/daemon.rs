use crate::{
    classifier::RelevanceClassifier,
    config::EnforcementConfig,
    enforcement::{DisplaySink, EnforcementLoop, LoopHandle, LoopParts},
    executor::KeystrokeExecutor,
    input::{create_injector, Platform},
    monitor::create_observer,
};
use anyhow::Result;
use keymind_ai::AiRelevanceService;
use keymind_storage::SettingsProvider;
use std::{sync::Arc, time::Duration};

/// Enforcement loop wired to the platform observer, the AI service and
/// keyboard-shortcut actions
pub struct Daemon {
    enforcement: EnforcementLoop,
    handle: LoopHandle,
    poll_interval: Duration,
}

impl Daemon {
    /// Build a stopped loop for the current platform
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the AI service cannot be built.
    pub fn new(
        config: &EnforcementConfig,
        settings: Arc<dyn SettingsProvider>,
        display: Box<dyn DisplaySink>,
    ) -> Result<Self> {
        let judge = AiRelevanceService::new(config.ai.clone())?;
        log::debug!("Relevance model: {}", judge.model_name());

        let parts = LoopParts {
            observer: create_observer(),
            classifier: RelevanceClassifier::new(Arc::new(judge), config.ai.timeout, config.cache_size),
            executor: Arc::new(KeystrokeExecutor::new(create_injector(), Platform::current())),
            settings,
            display,
        };
        let (enforcement, handle) = EnforcementLoop::new(parts, config.debounce);

        Ok(Self {
            enforcement,
            handle,
            poll_interval: config.poll_interval,
        })
    }

    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Run until Ctrl-C or an IPC shutdown request
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory for the IPC socket cannot be
    /// determined.
    pub async fn run_with_signals(self) -> Result<()> {
        #[cfg(unix)]
        {
            let sock_path = crate::config::socket_path()?;
            let ipc_handler = Arc::new(crate::ipc::DaemonIpcHandler::new(self.handle.clone()));
            tokio::spawn(async move {
                if let Err(e) = crate::ipc::listen(ipc_handler, &sock_path).await {
                    log::error!("IPC listener failed: {e}");
                }
            });
        }

        let handle = self.handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Received Ctrl-C, shutting down...");
                let _ = handle.shutdown();
            }
        });

        log::info!("Daemon started with signal handling");
        self.enforcement.run(self.poll_interval).await;

        #[cfg(unix)]
        {
            let sock_path = crate::config::socket_path()?;
            if sock_path.exists() {
                std::fs::remove_file(&sock_path)?;
            }
        }

        log::info!("Daemon shut down gracefully.");
        Ok(())
    }
}
