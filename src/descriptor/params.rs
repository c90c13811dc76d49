//! Params grammar: `<client>/<w_500,h_500,c_fit,e_grayscale>/[dirs/]<file>.<ext>`.
//!
//! The client id may span several segments (`simplytest/c984c70e-.../w_500,h_500/x.jpg`); it
//! ends at the parameter segment. PNG sources are always re-encoded as JPEG, but that is only
//! known once the transform has looked at the bytes, so the destination key takes the reported
//! output format.

use serde::Serialize;

use crate::descriptor::{
    Conversion, DecodedDescriptor, DescriptorError, HostTemplate, RasterFormat, ResourceIdentity,
    TransformParams, Variant,
    grammar::{self, MIN_PARAMS_SEGMENTS, scan_param_list, segments_with_offsets, split_extension},
};

/// A decoded params-grammar descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamsDescriptor {
    identity: ResourceIdentity,
    params: TransformParams,
    /// The parameter segment verbatim, reused in the destination key.
    params_token: String,
    source_key: String,
    fallback_uri: String,
}

impl ParamsDescriptor {
    /// Validate and decode `descriptor`. `hosts` turns the source key into the fallback URI.
    pub fn decode(descriptor: &str, hosts: &HostTemplate) -> Result<Self, DescriptorError> {
        grammar::check(descriptor, Variant::Params)?;

        let segments = segments_with_offsets(descriptor);
        if segments.len() < MIN_PARAMS_SEGMENTS {
            return Err(DescriptorError::MalformedSegmentCount {
                expected: MIN_PARAMS_SEGMENTS,
                found: segments.len(),
            });
        }
        let last = segments.len() - 1;

        // Width is mandatory here: a list carrying only `h_` is not a parameter segment.
        let (idx, list) = (1..last)
            .find_map(|i| {
                let (at, segment) = segments[i];
                scan_param_list(segment, at)
                    .ok()
                    .filter(|list| list.width.is_some())
                    .map(|list| (i, list))
            })
            .ok_or(DescriptorError::MissingParameterToken)?;
        let params_token = segments[idx].1;
        if !list.has_dimension() {
            return Err(DescriptorError::dimensions(params_token));
        }

        let (_, filename) = segments[last];
        let (base, ext) = split_extension(filename).ok_or_else(|| {
            DescriptorError::mismatch(
                Variant::Params,
                descriptor.len(),
                "missing or unsupported file extension",
            )
        })?;

        let names = |range: std::ops::Range<usize>| -> Vec<&str> {
            segments[range].iter().map(|&(_, s)| s).collect()
        };
        let identity = ResourceIdentity {
            namespace: Some(names(0..idx).join("/")),
            prefix: names(idx + 1..last)
                .into_iter()
                .map(str::to_owned)
                .collect(),
            base: base.to_owned(),
            ext: ext.to_owned(),
        };

        let source_key = segments
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, &(_, s))| s)
            .collect::<Vec<_>>()
            .join("/");
        let fallback_uri = hosts.build_uri(&source_key);

        let params = TransformParams {
            width: list.width.unwrap_or(0),
            height: list.height.unwrap_or(0),
            crop: list.crop,
            grayscale: list.grayscale,
            conversion: Conversion::JpegIfPng,
        };

        tracing::debug!(
            descriptor,
            source_key = %source_key,
            params = params_token,
            "decoded params descriptor"
        );

        Ok(Self {
            identity,
            params,
            params_token: params_token.to_owned(),
            source_key,
            fallback_uri,
        })
    }

    /// Client id segment(s) in front of the parameter segment.
    pub fn namespace(&self) -> &str {
        self.identity.namespace.as_deref().unwrap_or_default()
    }

    pub fn params_token(&self) -> &str {
        &self.params_token
    }

    /// Number of segments in the namespace, as needed by [`ResourceIdentity::from_source_key`].
    pub fn namespace_depth(&self) -> usize {
        self.namespace().split('/').count()
    }
}

impl DecodedDescriptor for ParamsDescriptor {
    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn params(&self) -> &TransformParams {
        &self.params
    }

    fn source_key(&self) -> &str {
        &self.source_key
    }

    fn fallback_uri(&self) -> &str {
        &self.fallback_uri
    }

    /// `<client>/<params>/[dirs/]<file>`, with the extension switched to `jpg` when the transform
    /// read PNG bytes and wrote JPEG.
    fn destination_key(&self, input: RasterFormat, output: RasterFormat) -> String {
        let converted;
        let identity = if input == RasterFormat::Png && output == RasterFormat::Jpeg {
            converted = self
                .identity
                .with_extension(RasterFormat::Jpeg.canonical_extension());
            &converted
        } else {
            &self.identity
        };
        format!(
            "{}/{}/{}",
            self.namespace(),
            self.params_token,
            identity.resource_path()
        )
    }
}

/// Source key of a descriptor that may not decode: every segment except those that look like
/// parameter lists, provided the file name has a supported extension.
pub(crate) fn salvage_source_key(descriptor: &str) -> Option<String> {
    let segments: Vec<&str> = descriptor.split('/').collect();
    let (filename, dirs) = segments.split_last()?;
    split_extension(filename)?;
    let kept: Vec<&str> = dirs
        .iter()
        .copied()
        .filter(|s| !s.is_empty() && !s.contains(','))
        .collect();
    if kept.is_empty() {
        return None;
    }
    Some(format!("{}/{filename}", kept.join("/")))
}
