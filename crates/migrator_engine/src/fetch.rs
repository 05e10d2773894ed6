use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_debug;
use futures_util::StreamExt;
use migrator_core::MessageId;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, PublishProgress, Stage};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    /// Directory that relative media paths in the export are resolved against.
    pub base_dir: PathBuf,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_bytes: 100 * 1024 * 1024,
            base_dir: PathBuf::from("."),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink for callers that do not observe progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Retrieves the binary behind a media address from an export.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        message_id: MessageId,
        address: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote(Url),
    Local(PathBuf),
}

/// Fetches `http(s)` addresses over the network and everything else from disk.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn resolve(&self, address: &str) -> Result<Location, FetchError> {
        match Url::parse(address) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Location::Remote(url)),
            Ok(url) if url.scheme() == "file" => url.to_file_path().map(Location::Local).map_err(|_| {
                FetchError::new(FailureKind::InvalidAddress, format!("bad file url {address}"))
            }),
            // Windows drive letters parse as one-letter schemes.
            Ok(url) if url.scheme().len() == 1 => Ok(Location::Local(PathBuf::from(address))),
            Ok(url) => Err(FetchError::new(
                FailureKind::InvalidAddress,
                format!("unsupported scheme {}", url.scheme()),
            )),
            Err(_) => Ok(Location::Local(self.settings.base_dir.join(address))),
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "media too large",
        )
    }

    async fn fetch_remote(
        &self,
        message_id: MessageId,
        url: Url,
        sink: &dyn ProgressSink,
    ) -> Result<(Vec<u8>, Option<String>), FetchError> {
        let client = self.build_client()?;
        let response = client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
            sink.emit(EngineEvent::Progress(PublishProgress {
                message_id,
                stage: Stage::Fetching,
                bytes: Some(bytes.len() as u64),
            }));
        }

        Ok((bytes, content_type))
    }

    async fn fetch_local(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        if meta.len() > self.settings.max_bytes {
            return Err(self.too_large(meta.len()));
        }
        tokio::fs::read(path)
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, format!("{}: {err}", path.display())))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        message_id: MessageId,
        address: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        sink.emit(EngineEvent::Progress(PublishProgress {
            message_id,
            stage: Stage::Fetching,
            bytes: Some(0),
        }));

        let (bytes, content_type) = match self.resolve(address)? {
            Location::Remote(url) => self.fetch_remote(message_id, url, sink).await?,
            Location::Local(path) => {
                engine_debug!("Reading media for message {} from {:?}", message_id, path);
                (self.fetch_local(&path).await?, None)
            }
        };

        let metadata = FetchMetadata {
            address: address.to_string(),
            content_type,
            byte_len: bytes.len() as u64,
        };
        Ok(FetchOutput { bytes, metadata })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
