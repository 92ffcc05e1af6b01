use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::{
    non_empty_token, ErrorBody, GenerateRequest, GenerateResponse, GeneratedSubtitles, SaveRequest, SaveResponse,
    UploadResponse,
};
use super::SubtitleBackend;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::intake::MediaFile;
use crate::selection::UserSelection;

/// Backend reached over HTTP
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
    base: String,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut builder =
            reqwest::Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_seconds));
        if let Some(seconds) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build()?;

        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { config, client, base })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path)
    }

    /// URL an output token is downloaded from
    pub fn download_url(&self, subtitle_file: &str) -> String {
        self.endpoint(&format!("download/{}", urlencoding::encode(subtitle_file)))
    }

    /// Turn a non-2xx response into a rejection carrying the server detail
    async fn rejection(response: Response) -> BackendError {
        let status = response.status().as_u16();
        let detail = match response.bytes().await {
            Ok(body) => ErrorBody::detail_from(&body),
            Err(_) => None,
        };
        debug!("Backend rejected request with {}: {:?}", status, detail);
        BackendError::Rejected { status, detail }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> Result<T, BackendError> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(format!("{} response: {}", what, e)))
    }
}

fn send_error(e: reqwest::Error) -> BackendError {
    if e.is_connect() {
        BackendError::Unreachable(e.to_string())
    } else {
        BackendError::Http(e)
    }
}

#[async_trait]
impl SubtitleBackend for HttpBackend {
    async fn upload(&self, file: &MediaFile) -> Result<String, BackendError> {
        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime())?;
        let form = Form::new().part("file", part);

        debug!("Uploading {} ({} bytes) to {}", file.name(), file.size(), self.base);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let upload: UploadResponse = Self::parse_json(response, "upload").await?;
        non_empty_token(upload.filename, "filename")
    }

    async fn generate(&self, upload_token: &str, selection: &UserSelection) -> Result<GeneratedSubtitles, BackendError> {
        let request = GenerateRequest::from(selection);
        debug!("Requesting subtitles for {}: {:?}", upload_token, request);

        let response = self
            .client
            .post(self.endpoint("generate-subtitles"))
            .query(&[("filename", upload_token)])
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let generated: GenerateResponse = Self::parse_json(response, "generate").await?;
        generated.into_generated()
    }

    async fn save_edits(&self, request: &SaveRequest) -> Result<String, BackendError> {
        debug!("Saving {} segments for {}", request.edits.len(), request.filename);

        let response = self
            .client
            .post(self.endpoint("edit-subtitles"))
            .json(request)
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let saved: SaveResponse = Self::parse_json(response, "save").await?;
        non_empty_token(saved.subtitle_file, "subtitle_file")
    }

    async fn download(&self, subtitle_file: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.download_url(subtitle_file);
        debug!("Downloading {}", url);

        let response = self.client.get(&url).send().await.map_err(send_error)?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn origin(&self) -> &str {
        &self.base
    }
}
