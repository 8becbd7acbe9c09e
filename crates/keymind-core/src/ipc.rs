use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};

use crate::enforcement::{LoopHandle, LoopStatus};

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    StartTask { description: String },
    StopTask,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status(LoopStatus),
    Ack,
    Shutdown,
    Error(String),
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the daemon's answer
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is unreachable or the exchange fails to
    /// encode or decode.
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Answers IPC requests by forwarding them to the enforcement loop
pub struct DaemonIpcHandler {
    handle: LoopHandle,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(handle: LoopHandle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn respond(&self, request: IpcRequest) -> IpcResponse {
        let sent = match request {
            IpcRequest::Status => return IpcResponse::Status(self.handle.status()),
            IpcRequest::StartTask { description } => {
                if description.trim().is_empty() {
                    return IpcResponse::Error(String::from("Task description is empty"));
                }
                self.handle.start(description)
            }
            IpcRequest::StopTask => self.handle.stop(),
            IpcRequest::Shutdown => {
                return match self.handle.shutdown() {
                    Ok(()) => IpcResponse::Shutdown,
                    Err(e) => IpcResponse::Error(e.to_string()),
                };
            }
        };

        match sent {
            Ok(()) => IpcResponse::Ack,
            Err(e) => IpcResponse::Error(e.to_string()),
        }
    }

    async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request);
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

/// Accept IPC connections on `sock_path` until the task is dropped
///
/// # Errors
///
/// Returns an error if a stale socket cannot be removed or the socket cannot
/// be bound.
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    if let Some(parent) = sock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(sock_path)?;
    log::debug!("IPC listening on {}", sock_path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    match stream.read_to_end(&mut buf).await {
                        Ok(0) => {} // Connection closed
                        Ok(_) => match bincode::deserialize::<IpcRequest>(&buf) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RelevanceClassifier;
    use crate::enforcement::{EnforcementLoop, LogDisplay, LoopParts};
    use crate::executor::{ActionExecutor, EnforcementAction};
    use crate::monitor::NullObserver;
    use async_trait::async_trait;
    use keymind_ai::{AiError, RelevanceJudge};
    use keymind_storage::MemorySettingsStore;
    use std::time::Duration;

    struct SilentJudge;

    #[async_trait]
    impl RelevanceJudge for SilentJudge {
        async fn judge(&self, _api_key: &str, _task: &str, _activity: &str) -> Result<String, AiError> {
            Ok(String::from("1"))
        }
    }

    struct NoopExecutor;

    #[async_trait]
    impl ActionExecutor for NoopExecutor {
        async fn execute(&self, _action: &EnforcementAction) {}
    }

    fn enforcement() -> (EnforcementLoop, LoopHandle) {
        let parts = LoopParts {
            observer: Box::new(NullObserver),
            classifier: RelevanceClassifier::new(Arc::new(SilentJudge), Duration::from_secs(1), 8),
            executor: Arc::new(NoopExecutor),
            settings: Arc::new(MemorySettingsStore::default()),
            display: Box::new(LogDisplay),
        };
        EnforcementLoop::new(parts, Duration::from_secs(5))
    }

    #[test]
    fn test_start_task_reaches_loop() {
        let (mut enforcement, handle) = enforcement();
        let handler = DaemonIpcHandler::new(handle.clone());

        let response = handler.respond(IpcRequest::StartTask {
            description: String::from("write report"),
        });
        assert_eq!(response, IpcResponse::Ack);

        assert!(enforcement.apply_pending_controls());
        assert!(enforcement.is_running());
        assert_eq!(handle.status().task.as_deref(), Some("write report"));
    }

    #[test]
    fn test_blank_task_is_rejected() {
        let (_enforcement, handle) = enforcement();
        let handler = DaemonIpcHandler::new(handle);

        let response = handler.respond(IpcRequest::StartTask {
            description: String::from("   "),
        });
        assert!(matches!(response, IpcResponse::Error(_)));
    }

    #[test]
    fn test_requests_after_shutdown_report_error() {
        let (enforcement, handle) = enforcement();
        drop(enforcement);
        let handler = DaemonIpcHandler::new(handle);

        assert!(matches!(handler.respond(IpcRequest::StopTask), IpcResponse::Error(_)));
        assert!(matches!(handler.respond(IpcRequest::Status), IpcResponse::Status(_)));
    }

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("keymind.sock");
        let (_enforcement, handle) = enforcement();
        let handler = Arc::new(DaemonIpcHandler::new(handle));

        let listen_path = sock_path.clone();
        let server = tokio::spawn(async move { listen(handler, &listen_path).await });
        while !sock_path.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let client = IpcClient::new(&sock_path);
        let response = client.send_command(IpcRequest::Status).await.unwrap();
        assert_eq!(response, IpcResponse::Status(LoopStatus::default()));

        let response = client.send_command(IpcRequest::Shutdown).await.unwrap();
        assert_eq!(response, IpcResponse::Shutdown);

        server.abort();
    }
}
