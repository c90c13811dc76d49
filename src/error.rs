use crate::{descriptor::DescriptorError, storage::StorageError, transform::TransformError};

pub type RedirectorResult<T> = Result<T, RedirectorError>;

#[derive(thiserror::Error, Debug)]
pub enum RedirectorError {
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RedirectorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RedirectorError::from(DescriptorError::MissingParameterToken)
                .to_string()
                .contains("descriptor error:")
        );
        assert!(
            RedirectorError::from(StorageError::NotFound("a/b.jpg".to_owned()))
                .to_string()
                .contains("storage error:")
        );
        assert!(
            RedirectorError::from(TransformError::UnsupportedFormat)
                .to_string()
                .contains("transform error:")
        );
        assert!(
            RedirectorError::config("x")
                .to_string()
                .contains("configuration error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RedirectorError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
