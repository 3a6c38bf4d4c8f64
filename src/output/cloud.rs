//! Object storage sinks (S3, R2, GCS, Azure, memory, local)

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;

/// Durable destination for run output
#[async_trait]
pub trait Sink: Send + Sync {
    /// Store `data` under `key`, returning the full location written
    async fn put(&self, key: &str, data: Bytes) -> Result<String>;
}

/// Explicit S3 settings that take precedence over the `AWS_*` environment
#[derive(Clone, Default)]
pub struct S3Options {
    /// Access key id
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Region
    pub region: Option<String>,
    /// Custom endpoint (R2, MinIO, ...)
    pub endpoint: Option<String>,
    /// Allow plain-http endpoints
    pub allow_http: bool,
}

impl S3Options {
    /// Take the S3 fields of the storage section
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self {
            access_key_id: storage.access_key_id.clone(),
            secret_access_key: storage.secret_access_key.clone(),
            region: storage.region.clone(),
            endpoint: storage.endpoint.clone(),
            allow_http: storage.allow_http,
        }
    }
}

impl std::fmt::Debug for S3Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Options")
            .field("has_access_key_id", &self.access_key_id.is_some())
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("allow_http", &self.allow_http)
            .finish_non_exhaustive()
    }
}

/// Storage destination parsed from a URL
#[derive(Debug, Clone)]
pub struct CloudDestination {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL scheme (s3, r2, gs, az, memory, file)
    scheme: String,
    /// Location prefix used when reporting written objects
    root: String,
}

/// Split `bucket/some/prefix` into the bucket and the prefix
fn split_bucket(without_scheme: &str) -> (&str, String) {
    match without_scheme.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.trim_matches('/').to_string()),
        None => (without_scheme, String::new()),
    }
}

impl CloudDestination {
    /// Parse a destination URL using only environment credentials
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://path/` - in-process store
    /// - `/local/path/` or `./path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        Self::parse_with(url, &S3Options::default())
    }

    /// Build the destination described by the storage section
    pub fn from_config(storage: &StorageConfig) -> Result<Self> {
        Self::parse_with(&storage.destination, &S3Options::from_config(storage))
    }

    /// Parse a destination URL, applying explicit S3 settings
    pub fn parse_with(url: &str, s3: &S3Options) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::parse_s3(rest, "s3", s3)
        } else if let Some(rest) = url.strip_prefix("r2://") {
            Self::parse_s3(rest, "r2", s3)
        } else if let Some(rest) = url.strip_prefix("gs://") {
            Self::parse_gcs(rest)
        } else if let Some(rest) = url.strip_prefix("az://") {
            Self::parse_azure(rest)
        } else if let Some(rest) = url.strip_prefix("memory://") {
            Ok(Self::memory(rest))
        } else {
            Self::parse_local(url)
        }
    }

    /// In-process destination
    pub fn memory(prefix: &str) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: prefix.trim_matches('/').to_string(),
            scheme: "memory".to_string(),
            root: "memory:/".to_string(),
        }
    }

    fn parse_s3(without_scheme: &str, scheme: &str, s3: &S3Options) -> Result<Self> {
        let (bucket, prefix) = split_bucket(without_scheme);
        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in {scheme}:// URL")));
        }

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if scheme == "r2" {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }
        if let Some(key) = &s3.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &s3.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(region) = &s3.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &s3.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if s3.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: scheme.to_string(),
            root: format!("{scheme}://{bucket}"),
        })
    }

    fn parse_gcs(without_scheme: &str) -> Result<Self> {
        let (bucket, prefix) = split_bucket(without_scheme);

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "gs".to_string(),
            root: format!("gs://{bucket}"),
        })
    }

    fn parse_azure(without_scheme: &str) -> Result<Self> {
        let (container, prefix) = split_bucket(without_scheme);

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "az".to_string(),
            root: format!("az://{container}"),
        })
    }

    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
            root: path.trim_end_matches('/').to_string(),
        })
    }

    /// Check if this is a cloud destination
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Get the scheme (s3, r2, gs, az, memory, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn object_path(&self, key: &str) -> ObjectPath {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix))
        }
    }

    /// Write bytes under `key`, returning the full location
    pub async fn write(&self, key: &str, data: Bytes) -> Result<String> {
        let path = self.object_path(key);

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::storage(format!("Failed to write {path}: {e}")))?;

        Ok(format!("{}/{path}", self.root))
    }

    /// Read back the object stored under `key`
    pub async fn read(&self, key: &str) -> Result<Bytes> {
        let path = self.object_path(key);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| Error::storage(format!("Failed to read {path}: {e}")))?;

        result
            .bytes()
            .await
            .map_err(|e| Error::storage(format!("Failed to read {path}: {e}")))
    }
}

#[async_trait]
impl Sink for CloudDestination {
    async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        self.write(key, data).await
    }
}
