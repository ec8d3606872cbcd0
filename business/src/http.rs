//! `reqwest`-backed [`Transport`].
//!
//! Paths handed in by the pipelines (`/file/...`) are resolved against
//! [`BusinessConfig::api_url`]. Upload bodies are streamed in fixed-size chunks
//! so the number of bytes handed to the connection can be reported as progress.

use async_trait::async_trait;
use bytes::Bytes;
use flume::Sender;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use ustr::Ustr;

use crate::BusinessConfig;
use crate::transport::{FileRecord, Progress, Transport, TransportError, UploadRequest, bearer};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode {
            status: self.status,
            message: e.to_string(),
        })
    }

    /// Turns non-2xx responses into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                message: self.text(),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: Ustr,
}

impl HttpTransport {
    pub fn new(config: &BusinessConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &BusinessConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        request.header(AUTHORIZATION, bearer(token))
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Response { status, body })
    }
}

/// Splits `payload` into chunks and reports cumulative bytes as each chunk is
/// pulled by the connection.
fn progress_body(payload: Bytes, progress: Sender<Progress>) -> reqwest::Body {
    let total = payload.len() as u64;
    let chunks: Vec<Bytes> = (0..payload.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| payload.slice(start..(start + UPLOAD_CHUNK_SIZE).min(payload.len())))
        .collect();

    let mut loaded = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        // the pipeline may have stopped listening; the upload itself goes on
        let _ = progress.send(Progress { loaded, total });
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Sender<Progress>,
    ) -> Result<FileRecord, TransportError> {
        let UploadRequest {
            path,
            payload,
            content_type,
            token,
        } = request;
        log::debug!("POST {path} ({} bytes)", payload.len());

        let builder = self
            .request(Method::Post, &path, &token)
            .header(CONTENT_TYPE, content_type.as_str())
            .header(CONTENT_LENGTH, payload.len())
            .body(progress_body(payload, progress));

        Self::send(builder).await?.error_for_status()?.json()
    }

    async fn delete(&self, path: &str, token: &str) -> Result<(), TransportError> {
        log::debug!("DELETE {path}");
        Self::send(self.request(Method::Delete, path, token))
            .await?
            .error_for_status()
            .map(|_| ())
    }

    async fn fetch(&self, path: &str, token: &str) -> Result<FileRecord, TransportError> {
        log::debug!("GET {path}");
        Self::send(self.request(Method::Get, path, token))
            .await?
            .error_for_status()?
            .json()
    }
}
