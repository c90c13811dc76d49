use clap::Args;

use crate::{
    descriptor::HostTemplate,
    error::{RedirectorError, RedirectorResult},
    transform::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION, ImageTransform},
};

pub const DEFAULT_PORT: u16 = 4321;
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 32 * 1024 * 1024;

/// Service configuration. Every field is a flag with an environment variable behind it, read
/// once at startup.
#[derive(Args, Clone, Debug)]
pub struct ServiceConfig {
    /// Address to bind.
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bucket holding originals and derived images.
    #[arg(long, env = "AWS_BUCKET")]
    pub bucket: String,

    #[arg(long, env = "AWS_REGION")]
    pub region: String,

    /// Website endpoint label used in suffix-grammar redirect URIs.
    #[arg(long, env = "AWS_S3_ENDPOINT", default_value = "s3-website")]
    pub s3_endpoint: String,

    #[arg(long, env = "AWS_ENDPOINT_SCHEME", default_value = "https")]
    pub endpoint_scheme: String,

    /// Host serving params-grammar redirects. `/do` is only mounted when set.
    #[arg(long, env = "REDIRECT_HOST")]
    pub redirect_host: Option<String>,

    /// Custom S3 API endpoint (MinIO, LocalStack).
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub storage_endpoint: Option<String>,

    #[arg(long, env = "AWS_S3_FORCE_PATH_STYLE")]
    pub force_path_style: bool,

    /// Originals larger than this are not fetched.
    #[arg(long, env = "MAX_SOURCE_BYTES", default_value_t = DEFAULT_MAX_SOURCE_BYTES)]
    pub max_source_bytes: u64,

    #[arg(long, env = "JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Largest accepted output side, in pixels.
    #[arg(long, env = "MAX_DIMENSION", default_value_t = DEFAULT_MAX_DIMENSION)]
    pub max_dimension: u32,
}

impl ServiceConfig {
    pub fn validate(&self) -> RedirectorResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(RedirectorError::config("bucket must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(RedirectorError::config("region must not be empty"));
        }
        if self.s3_endpoint.trim().is_empty() {
            return Err(RedirectorError::config("s3 endpoint must not be empty"));
        }
        if !matches!(self.endpoint_scheme.as_str(), "http" | "https") {
            return Err(RedirectorError::config(format!(
                "endpoint scheme must be http or https, got '{}'",
                self.endpoint_scheme
            )));
        }
        if let Some(host) = &self.redirect_host
            && (host.is_empty() || host.contains("://") || host.ends_with('/'))
        {
            return Err(RedirectorError::config(format!(
                "redirect host must be a bare host name, got '{host}'"
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RedirectorError::config("jpeg quality must be in 1..=100"));
        }
        if self.max_dimension == 0 {
            return Err(RedirectorError::config("max dimension must be > 0"));
        }
        if self.max_source_bytes == 0 {
            return Err(RedirectorError::config("max source bytes must be > 0"));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Redirect targets for `/resize`.
    pub fn suffix_hosts(&self) -> HostTemplate {
        HostTemplate::S3Website {
            scheme: self.endpoint_scheme.clone(),
            bucket: self.bucket.clone(),
            endpoint: self.s3_endpoint.clone(),
            region: self.region.clone(),
        }
    }

    /// Redirect targets for `/do`, if that route is enabled.
    pub fn params_hosts(&self) -> Option<HostTemplate> {
        self.redirect_host
            .as_ref()
            .map(|host| HostTemplate::RedirectHost { host: host.clone() })
    }

    pub fn transform(&self) -> ImageTransform {
        ImageTransform {
            jpeg_quality: self.jpeg_quality,
            max_dimension: self.max_dimension,
        }
    }
}
