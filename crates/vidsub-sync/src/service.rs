/*
[INPUT]:  Reconciler commands addressed to the remote task service
[OUTPUT]: Adapter results (tasks, listings, diagnostics)
[POS]:    Port layer - seam between reconciler and HTTP adapter
[UPDATE]: When the reconciler needs a new remote operation
*/

use async_trait::async_trait;
use serde_json::Value;
use vidsub_adapter::{Result, Task, TaskId, TaskServiceClient, UploadFile};

/// Diagnostic probes exposed by the service; none of them touch the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    ExtractAudio(TaskId),
    Transcribe(TaskId),
    FullPipeline(TaskId),
    Validate(TaskId),
    ServiceStatus,
    FfmpegStatus,
}

/// Remote task service as seen by the reconciler
#[async_trait]
pub trait TaskService: Send + Sync + 'static {
    async fn upload(&self, file: UploadFile) -> Result<Task>;

    async fn start_processing(&self, task_id: &TaskId) -> Result<()>;

    async fn fetch_task(&self, task_id: &TaskId) -> Result<Task>;

    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn submit_subtitle(&self, task_id: &TaskId, content: &Value) -> Result<()>;

    async fn diagnose(&self, probe: &Diagnostic) -> Result<Value>;
}

#[async_trait]
impl TaskService for TaskServiceClient {
    async fn upload(&self, file: UploadFile) -> Result<Task> {
        self.upload_video(file).await
    }

    async fn start_processing(&self, task_id: &TaskId) -> Result<()> {
        TaskServiceClient::start_processing(self, task_id).await
    }

    async fn fetch_task(&self, task_id: &TaskId) -> Result<Task> {
        self.get_task(task_id).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        TaskServiceClient::list_tasks(self).await
    }

    async fn submit_subtitle(&self, task_id: &TaskId, content: &Value) -> Result<()> {
        self.update_subtitle(task_id, content).await
    }

    async fn diagnose(&self, probe: &Diagnostic) -> Result<Value> {
        match probe {
            Diagnostic::ExtractAudio(task_id) => self.test_extract_audio(task_id).await,
            Diagnostic::Transcribe(task_id) => self.test_transcribe(task_id).await,
            Diagnostic::FullPipeline(task_id) => self.test_full_pipeline(task_id).await,
            Diagnostic::Validate(task_id) => self.validate_video(task_id).await,
            Diagnostic::ServiceStatus => self.service_status().await,
            Diagnostic::FfmpegStatus => self.ffmpeg_status().await,
        }
    }
}
