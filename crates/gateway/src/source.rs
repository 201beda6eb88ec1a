use crate::error::PredictError;
use crate::fetch::ImageFetcher;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde::Deserialize;
use thiserror::Error;

/// Multipart field carrying an uploaded image.
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No image provided. Send 'file' or 'url'.")]
    MissingImage,

    #[error("No file selected: the uploaded 'file' part has an empty filename")]
    EmptyFilename,

    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),

    #[error("Failed to read request body: {0}")]
    Body(String),
}

/// Where the image of one prediction request comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    FileUpload(Bytes),
    RemoteUrl(String),
}

#[derive(Deserialize)]
struct UrlRequest {
    url: Option<String>,
}

impl ImageSource {
    /// Pick the image source of `request`.
    ///
    /// A multipart `file` part wins; otherwise a JSON body with a non-empty
    /// `url` is used. Anything else is `MissingImage`.
    pub async fn from_request<S>(
        request: Request,
        state: &S,
        max_body_bytes: usize,
    ) -> Result<Self, ResolveError>
    where
        S: Send + Sync,
    {
        let is_multipart = has_content_type(request.headers(), "multipart/form-data");
        let is_json = has_content_type(request.headers(), "application/json");

        if is_multipart {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|e| ResolveError::InvalidMultipart(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        if !is_json {
            return Err(ResolveError::MissingImage);
        }

        let body = axum::body::to_bytes(request.into_body(), max_body_bytes)
            .await
            .map_err(|e| ResolveError::Body(e.to_string()))?;

        Self::from_json(&body)
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ResolveError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ResolveError::InvalidMultipart(e.body_text()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            if field.file_name().is_none_or(|name| name.trim().is_empty()) {
                return Err(ResolveError::EmptyFilename);
            }

            let data = field
                .bytes()
                .await
                .map_err(|e| ResolveError::InvalidMultipart(e.body_text()))?;
            return Ok(ImageSource::FileUpload(data));
        }

        Err(ResolveError::MissingImage)
    }

    fn from_json(body: &[u8]) -> Result<Self, ResolveError> {
        let request: UrlRequest =
            serde_json::from_slice(body).map_err(|e| ResolveError::InvalidJson(e.to_string()))?;

        match request.url {
            None => Err(ResolveError::MissingImage),
            Some(url) if url.trim().is_empty() => Err(ResolveError::EmptyUrl),
            Some(url) => Ok(ImageSource::RemoteUrl(url.trim().to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::FileUpload(_) => "file",
            ImageSource::RemoteUrl(_) => "url",
        }
    }

    /// Produce the raw, still encoded image bytes. Remote URLs are fetched on
    /// the blocking pool.
    pub async fn into_bytes(self, fetcher: &ImageFetcher) -> Result<Bytes, PredictError> {
        match self {
            ImageSource::FileUpload(data) => Ok(data),
            ImageSource::RemoteUrl(url) => {
                tracing::info!(url = %url, "Downloading image");
                let fetcher = fetcher.clone();
                let body = tokio::task::spawn_blocking(move || fetcher.fetch(&url)).await??;
                Ok(Bytes::from(body))
            }
        }
    }
}

/// Resolve the raw image bytes of a prediction request.
pub async fn resolve<S>(
    request: Request,
    state: &S,
    fetcher: &ImageFetcher,
    max_body_bytes: usize,
) -> Result<Bytes, PredictError>
where
    S: Send + Sync,
{
    let source = ImageSource::from_request(request, state, max_body_bytes).await?;
    tracing::debug!(source = source.kind(), "Image source resolved");
    source.into_bytes(fetcher).await
}

fn has_content_type(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(expected))
}
