use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use engine_logging::engine_debug;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

const LOCAL_SCHEME: &str = "sha256://";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage rejected upload with status {0}")]
    HttpStatus(u16),
    #[error("storage request failed: {0}")]
    Network(String),
    #[error("storage response unusable: {0}")]
    Response(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Content-addressed storage. Returns a stable pointer for every upload.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, StoreError>;

    async fn upload_json(&self, document: &serde_json::Value) -> Result<String, StoreError>;
}

/// Stores blobs under their SHA-256 digest in a local directory.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    writer: AtomicFileWriter,
}

impl LocalContentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    /// Path of the blob a pointer from this store refers to.
    pub fn path_for(&self, pointer: &str) -> Option<PathBuf> {
        let digest = pointer.strip_prefix(LOCAL_SCHEME)?;
        if digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(self.writer.dir().join(digest))
        } else {
            None
        }
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        let digest = sha256_hex(&bytes);
        let writer = self.writer.clone();
        let name = digest.clone();
        tokio::task::spawn_blocking(move || writer.write(&name, bytes))
            .await
            .map_err(|err| StoreError::Response(err.to_string()))??;
        engine_debug!("Stored blob {} in {:?}", digest, self.writer.dir());
        Ok(format!("{LOCAL_SCHEME}{digest}"))
    }
}

#[async_trait::async_trait]
impl ContentStore for LocalContentStore {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        _file_name: &str,
        _mime_type: &str,
    ) -> Result<String, StoreError> {
        self.put(bytes).await
    }

    async fn upload_json(&self, document: &serde_json::Value) -> Result<String, StoreError> {
        let bytes = serde_json::to_vec(document)
            .map_err(|err| StoreError::Persist(PersistError::Serialize(err.to_string())))?;
        self.put(bytes).await
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    cid: Option<String>,
    url: Option<String>,
}

/// Uploads through an IPFS relay exposing `POST /upload` (multipart) and `POST /json`.
#[derive(Debug, Clone)]
pub struct IpfsRelayStore {
    endpoint: String,
    client: reqwest::Client,
}

impl IpfsRelayStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Network(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn pointer_from(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::HttpStatus(status.as_u16()));
        }
        let body: RelayResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Response(err.to_string()))?;
        match (body.url, body.cid) {
            (Some(url), _) if !url.is_empty() => Ok(url),
            (_, Some(cid)) if !cid.is_empty() => Ok(format!("ipfs://{cid}")),
            _ => Err(StoreError::Response("missing cid and url".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for IpfsRelayStore {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, StoreError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(format!("{}/upload", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;
        Self::pointer_from(response).await
    }

    async fn upload_json(&self, document: &serde_json::Value) -> Result<String, StoreError> {
        let response = self
            .client
            .post(format!("{}/json", self.endpoint))
            .json(document)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;
        Self::pointer_from(response).await
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
