use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;

use crate::config::ClientConfig;
use crate::errors::{ClientResult, ErrorKind};
use crate::types::{ChatReply, EvaluationRecord};
use crate::upload::{IngestKind, UploadFile};

/// The backend calls this client makes. No retries, no client-side timeouts.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn health(&self) -> ClientResult<()>;
    async fn ingest(&self, file: UploadFile, kind: IngestKind) -> ClientResult<()>;
    async fn reprocess(&self) -> ClientResult<()>;
    async fn send_message(&self, text: &str) -> ClientResult<ChatReply>;
    async fn fetch_logs(&self) -> ClientResult<Vec<EvaluationRecord>>;
}

pub struct HttpGateway {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpGateway {
    pub fn try_new(config: ClientConfig) -> ClientResult<Self> {
        let config = config.validate()?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn health(&self) -> ClientResult<()> {
        let response = self
            .client
            .get(self.config.endpoint("/health"))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn ingest(&self, file: UploadFile, kind: IngestKind) -> ClientResult<()> {
        let mime = file.kind.mime();
        let size = file.bytes.len();
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        tracing::info!(
            "Uploading {} ({size} bytes) to {}",
            file.file_name,
            kind.endpoint()
        );
        let response = self
            .client
            .post(self.config.endpoint(kind.endpoint()))
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn reprocess(&self) -> ClientResult<()> {
        let response = self
            .client
            .post(self.config.endpoint("/process"))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn send_message(&self, text: &str) -> ClientResult<ChatReply> {
        let form = Form::new().text("message", text.to_string());
        let response = self
            .client
            .post(self.config.endpoint("/chat"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_logs(&self) -> ClientResult<Vec<EvaluationRecord>> {
        let response = self
            .client
            .get(self.config.endpoint("/logs"))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ErrorKind::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}
