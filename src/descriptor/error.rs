use crate::descriptor::Variant;

/// Why a descriptor was rejected.
///
/// Clients never see the kind; it is kept for logs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor does not match the {variant} grammar at byte {offset}: {reason}")]
    GrammarMismatch {
        variant: Variant,
        offset: usize,
        reason: &'static str,
    },

    #[error("no usable width/height in `{segment}`")]
    DimensionExtractionFailure { segment: String },

    #[error("parameter segment has no width token")]
    MissingParameterToken,

    #[error("expected at least {expected} path segments, found {found}")]
    MalformedSegmentCount { expected: usize, found: usize },
}

impl DescriptorError {
    pub(crate) fn mismatch(variant: Variant, offset: usize, reason: &'static str) -> Self {
        Self::GrammarMismatch {
            variant,
            offset,
            reason,
        }
    }

    pub(crate) fn dimensions(segment: impl Into<String>) -> Self {
        Self::DimensionExtractionFailure {
            segment: segment.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_reports_variant_and_offset() {
        let err = DescriptorError::mismatch(Variant::Suffix, 7, "unsupported file extension");
        assert_eq!(
            err.to_string(),
            "descriptor does not match the suffix grammar at byte 7: unsupported file extension"
        );
    }
}
