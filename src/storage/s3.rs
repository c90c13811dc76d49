use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};

use crate::{
    config::ServiceConfig,
    storage::{ObjectStore, StorageError},
};

/// [`ObjectStore`] over a single S3 bucket.
#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
    max_source_bytes: u64,
}

impl S3Store {
    /// Loads AWS credentials from the environment and builds a client for the configured bucket.
    pub async fn connect(config: &ServiceConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.storage_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.storage_endpoint,
            "connected s3 store"
        );

        Self::new(
            Client::from_conf(s3_builder.build()),
            config.bucket.clone(),
            config.max_source_bytes,
        )
    }

    pub fn new(client: Client, bucket: impl Into<String>, max_source_bytes: u64) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            max_source_bytes,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service) if service.is_no_such_key() => StorageError::NotFound(key.to_owned()),
                _ => StorageError::Transport(DisplayErrorContext(&err).to_string()),
            })?;

        let size = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(0);
        if size > self.max_source_bytes {
            return Err(StorageError::TooLarge {
                key: key.to_owned(),
                size,
                limit: self.max_source_bytes,
            });
        }

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?
            .into_bytes();
        // content_length is optional; check what actually arrived as well.
        if bytes.len() as u64 > self.max_source_bytes {
            return Err(StorageError::TooLarge {
                key: key.to_owned(),
                size: bytes.len() as u64,
                limit: self.max_source_bytes,
            });
        }
        tracing::debug!(bytes = bytes.len(), "fetched object");
        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self, bytes), fields(bucket = %self.bucket, bytes = bytes.len()))]
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| StorageError::Transport(DisplayErrorContext(&err).to_string()))?;
        tracing::debug!("stored object");
        Ok(())
    }
}
