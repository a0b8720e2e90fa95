//! Background git worker.
//!
//! Git operations, clone in particular, are long running. The presentation
//! side sends a [`VcsRequest`] to a worker task and awaits an
//! [`IpcResponse`], which carries either a `result` or an `error`, never
//! both. Requests are handled one at a time, so mutating operations against
//! the same repository never overlap.
use std::{path::PathBuf, sync::Arc};

use log::{debug, error, info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    classify_all, ErrorSink, GdError, Result, VcsAuthentication, VcsAuthor, VcsFileStatus,
    VcsGateway, AUTHENTICATION_FAIL, CONNECTION_ERROR, WORKSPACE_ALREADY_EXISTS,
};

/// A git operation to run on the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum VcsRequest {
    IsRepositoryExists {
        path: PathBuf,
    },
    CreateRepository {
        path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    Clone {
        remote_url: String,
        path: PathBuf,
        authentication: Option<VcsAuthentication>,
    },
    #[serde(rename_all = "camelCase")]
    Commit {
        workspace_dir: PathBuf,
        message: String,
        file_changes: Vec<PathBuf>,
        author: VcsAuthor,
    },
    GetFileStatuses {
        path: PathBuf,
    },
}

impl VcsRequest {
    fn name(&self) -> &'static str {
        match self {
            VcsRequest::IsRepositoryExists { .. } => "isRepositoryExists",
            VcsRequest::CreateRepository { .. } => "createRepository",
            VcsRequest::Clone { .. } => "clone",
            VcsRequest::Commit { .. } => "commit",
            VcsRequest::GetFileStatuses { .. } => "getFileStatuses",
        }
    }
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl From<&GdError> for IpcError {
    fn from(err: &GdError) -> Self {
        Self {
            code: err.code().map(str::to_string),
            message: err.to_string(),
        }
    }
}

impl From<IpcError> for GdError {
    fn from(err: IpcError) -> Self {
        let message = err.message;
        match err.code.as_deref() {
            Some(AUTHENTICATION_FAIL) => GdError::VcsAuthenticationFail { message },
            Some(CONNECTION_ERROR) => GdError::VcsConnection { message },
            Some(WORKSPACE_ALREADY_EXISTS) => GdError::WorkspaceAlreadyExists {
                path: PathBuf::new(),
            },
            _ => GdError::VcsFailure { message },
        }
    }
}

/// Response shape shared by every request: `{"result": ...}` or
/// `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcResponse<T> {
    Success { result: T },
    Failure { error: IpcError },
}

impl<T> IpcResponse<T> {
    pub fn into_result(self) -> std::result::Result<T, IpcError> {
        match self {
            IpcResponse::Success { result } => Ok(result),
            IpcResponse::Failure { error } => Err(error),
        }
    }
}

enum WorkerCommand {
    Request {
        request: VcsRequest,
        reply: oneshot::Sender<IpcResponse<Value>>,
    },
    Stop,
}

/// Runs git requests on a background task.
pub struct VcsWorker {
    /// Channel to send commands to the worker task
    command_tx: Option<mpsc::Sender<WorkerCommand>>,

    /// Handle to the worker task
    worker_task: Option<JoinHandle<()>>,

    /// Where failed requests are reported
    sink: Arc<dyn ErrorSink>,
}

impl VcsWorker {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            command_tx: None,
            worker_task: None,
            sink,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker_task.is_some()
    }

    /// Starts the worker task. Starting twice is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Git worker already running");
            return;
        }

        let (command_tx, mut command_rx) = mpsc::channel(16);
        self.command_tx = Some(command_tx);
        let sink = Arc::clone(&self.sink);

        let task = tokio::spawn(async move {
            let vcs = VcsGateway::new();

            while let Some(command) = command_rx.recv().await {
                match command {
                    WorkerCommand::Request { request, reply } => {
                        let name = request.name();
                        debug!("Git worker handling {}", name);

                        let response = match handle_request(&vcs, request).await {
                            Ok(result) => IpcResponse::Success { result },
                            Err(e) => {
                                sink.report(name, &e);
                                IpcResponse::Failure {
                                    error: IpcError::from(&e),
                                }
                            }
                        };

                        if reply.send(response).is_err() {
                            debug!("Caller stopped waiting for {}", name);
                        }
                    }
                    WorkerCommand::Stop => {
                        info!("Git worker stopping...");
                        break;
                    }
                }
            }
        });

        self.worker_task = Some(task);
        info!("Git worker started");
    }

    /// Stops the worker after the request in flight, if any, completes.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.worker_task.take() {
            if let Some(tx) = self.command_tx.take() {
                if let Err(e) = tx.send(WorkerCommand::Stop).await {
                    error!("Failed to send stop command to git worker: {}", e);
                }
            }

            task.await.map_err(|e| GdError::WorkerUnavailable {
                message: format!("Failed to stop git worker: {}", e),
            })?;
            info!("Git worker stopped");
        } else {
            debug!("Git worker is not running");
        }
        Ok(())
    }

    /// Sends a request and waits for its raw response.
    pub async fn request(&self, request: VcsRequest) -> Result<IpcResponse<Value>> {
        let tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| GdError::WorkerUnavailable {
                message: "Git worker is not running".to_string(),
            })?;

        let (reply, response) = oneshot::channel();
        tx.send(WorkerCommand::Request { request, reply })
            .await
            .map_err(|e| GdError::WorkerUnavailable {
                message: format!("Failed to send git request: {}", e),
            })?;

        response.await.map_err(|e| GdError::WorkerUnavailable {
            message: format!("Git worker dropped the request: {}", e),
        })
    }

    /// Sends a request and decodes a typed result.
    pub async fn call<T: DeserializeOwned>(&self, request: VcsRequest) -> Result<T> {
        let value = self.request(request).await?.into_result()?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn is_repository_exists(&self, path: PathBuf) -> Result<bool> {
        self.call(VcsRequest::IsRepositoryExists { path }).await
    }

    pub async fn get_file_statuses(&self, path: PathBuf) -> Result<Vec<VcsFileStatus>> {
        self.call(VcsRequest::GetFileStatuses { path }).await
    }
}

async fn handle_request(vcs: &VcsGateway, request: VcsRequest) -> Result<Value> {
    let value = match request {
        VcsRequest::IsRepositoryExists { path } => {
            Value::Bool(vcs.repository_exists(&path).await)
        }
        VcsRequest::CreateRepository { path } => {
            vcs.create_repository(&path).await?;
            Value::Null
        }
        VcsRequest::Clone {
            remote_url,
            path,
            authentication,
        } => {
            vcs.clone_repository(&remote_url, &path, authentication)
                .await?;
            Value::Null
        }
        VcsRequest::Commit {
            workspace_dir,
            message,
            file_changes,
            author,
        } => Value::String(
            vcs.commit(&workspace_dir, &message, &file_changes, &author)
                .await?,
        ),
        VcsRequest::GetFileStatuses { path } => {
            let handle = vcs.open_repository(&path).await?;
            let entries = vcs.get_file_statuses(&handle).await?;
            serde_json::to_value(classify_all(&entries))?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<String>>,
    }

    impl ErrorSink for RecordingSink {
        fn report(&self, context: &str, _error: &GdError) {
            self.seen.lock().unwrap().push(context.to_string());
        }
    }

    #[test]
    fn response_has_exactly_one_field() {
        let ok: IpcResponse<bool> = IpcResponse::Success { result: true };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"result":true}"#);

        let err: IpcResponse<bool> = IpcResponse::Failure {
            error: IpcError {
                code: Some(CONNECTION_ERROR.to_string()),
                message: "down".to_string(),
            },
        };
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], CONNECTION_ERROR);

        let back: IpcResponse<bool> = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn ipc_error_keeps_classification() {
        let err = GdError::VcsAuthenticationFail {
            message: "nope".to_string(),
        };
        let relayed: GdError = IpcError::from(&err).into();
        assert_eq!(relayed.code(), Some(AUTHENTICATION_FAIL));
    }

    #[test]
    fn requests_serialize_with_action_tag() {
        let request = VcsRequest::Clone {
            remote_url: "https://example/repo.git".to_string(),
            path: PathBuf::from("/w"),
            authentication: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["action"], "clone");
        assert_eq!(json["remoteUrl"], "https://example/repo.git");
    }

    #[tokio::test]
    async fn requests_before_start_fail() {
        let worker = VcsWorker::new(Arc::new(RecordingSink::default()));
        assert!(matches!(
            worker.is_repository_exists(PathBuf::from("/nowhere")).await,
            Err(GdError::WorkerUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn round_trip_through_worker() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut worker = VcsWorker::new(sink.clone());
        worker.start();

        let path = tmp.path().to_path_buf();
        assert!(!worker.is_repository_exists(path.clone()).await.unwrap());

        let created: Value = worker
            .call(VcsRequest::CreateRepository { path: path.clone() })
            .await
            .unwrap();
        assert_eq!(created, Value::Null);
        assert!(worker.is_repository_exists(path.clone()).await.unwrap());

        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();
        let statuses = worker.get_file_statuses(path.clone()).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].is_new);

        worker.stop().await.unwrap();
        assert!(!worker.is_running());
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_reach_the_sink() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut worker = VcsWorker::new(sink.clone());
        worker.start();

        let response = worker
            .request(VcsRequest::GetFileStatuses {
                path: tmp.path().to_path_buf(),
            })
            .await
            .unwrap();
        assert!(response.into_result().is_err());
        assert_eq!(*sink.seen.lock().unwrap(), vec!["getFileStatuses"]);

        worker.stop().await.unwrap();
    }
}
