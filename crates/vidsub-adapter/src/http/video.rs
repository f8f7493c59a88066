/*
[INPUT]:  Task ids, upload payloads and subtitle edit bodies
[OUTPUT]: Tasks, task listings and diagnostic reports
[POS]:    HTTP layer - video task endpoints
[UPDATE]: When adding new endpoints or changing request format
*/

use crate::http::{AdapterError, Result, TaskServiceClient};
use crate::types::{Task, TaskId, UploadFile};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

impl TaskServiceClient {
    /// Upload a video file and create a task
    ///
    /// POST /video/upload (multipart field `file`)
    pub async fn upload_video(&self, file: UploadFile) -> Result<Task> {
        debug!(file_name = %file.file_name, bytes = file.bytes.len(), "uploading video");
        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(mime) = file.mime.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|err| AdapterError::Config(format!("invalid mime type {mime}: {err}")))?;
        }
        let form = Form::new().part("file", part);

        let builder = self.request(Method::POST, "video/upload")?.multipart(form);
        self.send_data(builder).await
    }

    /// Ask the service to start processing a task
    ///
    /// POST /video/process/{taskId}
    pub async fn start_processing(&self, task_id: &TaskId) -> Result<()> {
        let builder = self.task_request(Method::POST, "video/process", task_id)?;
        self.send_unit(builder).await
    }

    /// Query one task
    ///
    /// GET /video/task/{taskId}
    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task> {
        let builder = self.task_request(Method::GET, "video/task", task_id)?;
        self.send_data(builder).await
    }

    /// Query every task known to the service, in service order
    ///
    /// GET /video/tasks
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, "video/tasks")?;
        self.send_data(builder).await
    }

    /// Replace the subtitle content of a task
    ///
    /// POST /video/subtitle/{taskId} (JSON body)
    pub async fn update_subtitle(&self, task_id: &TaskId, content: &Value) -> Result<()> {
        let builder = self
            .task_request(Method::POST, "video/subtitle", task_id)?
            .json(content);
        self.send_unit(builder).await
    }

    /// POST /video/test/extract-audio/{taskId}
    pub async fn test_extract_audio(&self, task_id: &TaskId) -> Result<Value> {
        let builder = self.task_request(Method::POST, "video/test/extract-audio", task_id)?;
        self.send_data(builder).await
    }

    /// POST /video/test/transcribe/{taskId}
    pub async fn test_transcribe(&self, task_id: &TaskId) -> Result<Value> {
        let builder = self.task_request(Method::POST, "video/test/transcribe", task_id)?;
        self.send_data(builder).await
    }

    /// POST /video/test/full-pipeline/{taskId}
    pub async fn test_full_pipeline(&self, task_id: &TaskId) -> Result<Value> {
        let builder = self.task_request(Method::POST, "video/test/full-pipeline", task_id)?;
        self.send_data(builder).await
    }

    /// POST /video/validate/{taskId}
    pub async fn validate_video(&self, task_id: &TaskId) -> Result<Value> {
        let builder = self.task_request(Method::POST, "video/validate", task_id)?;
        self.send_data(builder).await
    }

    /// GET /video/status
    pub async fn service_status(&self) -> Result<Value> {
        let builder = self.request(Method::GET, "video/status")?;
        self.send_data(builder).await
    }

    /// GET /video/ffmpeg-status
    pub async fn ffmpeg_status(&self) -> Result<Value> {
        let builder = self.request(Method::GET, "video/ffmpeg-status")?;
        self.send_data(builder).await
    }
}
