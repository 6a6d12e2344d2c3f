use crate::core::{Result, SphynxError};
use crate::storage::PersistencePolicy;
use std::fs;
use std::path::{Path, PathBuf};

pub const CERT_FILE: &str = "cert.pem";
pub const PRIVATE_KEY_FILE: &str = "private-key.pem";

/// Server configuration
///
/// Every field has a default; the binary fills them from flags and the
/// `SPHYNX_PORT`, `ORDERED_SPHYNX_DATA_DIR` and `UNORDERED_SPHYNX_DATA_DIR`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory of the ordered disk tier
    pub ordered_data_dir: PathBuf,

    /// Directory reserved for unordered on-disk data
    pub unordered_data_dir: PathBuf,

    pub host: String,

    pub port: u16,

    /// Directory holding `cert.pem` and `private-key.pem`. Without it the
    /// listener is unencrypted.
    pub key_dir: Option<PathBuf>,

    pub persistence: PersistencePolicy,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            ordered_data_dir: PathBuf::from("sphynx-data/ordered"),
            unordered_data_dir: PathBuf::from("sphynx-data/unordered"),
            host: "0.0.0.0".to_string(),
            port: 50051,
            key_dir: None,
            persistence: PersistencePolicy::default(),
        }
    }

    /// Set the ordered data directory
    pub fn ordered_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ordered_data_dir = dir.into();
        self
    }

    /// Set the unordered data directory
    pub fn unordered_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unordered_data_dir = dir.into();
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable TLS with the key pair found in `dir`
    pub fn key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    pub fn persist_workers(mut self, workers: usize) -> Self {
        self.persistence.workers = workers;
        self
    }

    pub fn persist_queue_capacity(mut self, capacity: usize) -> Self {
        self.persistence.queue_capacity = capacity;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `(cert, key)` paths when TLS is configured.
    pub fn tls_files(&self) -> Option<(PathBuf, PathBuf)> {
        self.key_dir
            .as_ref()
            .map(|dir| (dir.join(CERT_FILE), dir.join(PRIVATE_KEY_FILE)))
    }

    /// Creates both data directories if they are missing.
    pub fn prepare_directories(&self) -> Result<()> {
        create_dir(&self.ordered_data_dir)?;
        create_dir(&self.unordered_data_dir)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        SphynxError::Persistence(format!(
            "Failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })
}
