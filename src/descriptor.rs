//! Transform descriptor codec.
//!
//! A descriptor is the path-like string a client sends to ask for a derived image. Two grammars
//! are served:
//!
//! - [`Variant::Suffix`]: `crazy/images/blue_marble-500x500.jpg`, `images/gopher-800x0-jpg.png`
//! - [`Variant::Params`]: `client/w_500,h_500,c_fit/blue_marble.jpg`
//!
//! Decoding is pure and synchronous. The decoded value carries the source key (where the original
//! lives), the requested [`TransformParams`] and a fallback URI. The destination key is derived
//! from the decoded value once the pixel transform has reported its output format.

mod error;
pub mod grammar;
pub mod params;
pub mod suffix;
pub mod uri;

use std::fmt;

use serde::Serialize;

pub use error::DescriptorError;
pub use grammar::validate;
pub use params::ParamsDescriptor;
pub use suffix::SuffixDescriptor;
pub use uri::HostTemplate;

/// Which descriptor grammar a string is read with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `(<segment>/)*<name>-<w>x<h>[-jpg].<ext>`, served on `/resize?key=`.
    Suffix,
    /// `<client>/<params>/(<segment>/)*<file>.<ext>`, served on `/do?ref=`.
    Params,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suffix => f.write_str("suffix"),
            Self::Params => f.write_str("params"),
        }
    }
}

/// Raster formats the service reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterFormat {
    /// JPEG, the canonical conversion target.
    Jpeg,
    /// PNG.
    Png,
}

impl RasterFormat {
    /// Map a file extension (any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            Some(Self::Jpeg)
        } else if ext.eq_ignore_ascii_case("png") {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Extension written into destination keys after a conversion.
    pub fn canonical_extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Output format policy of a transform request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// Write the format the source key names.
    #[default]
    None,
    /// Re-encode as JPEG whatever the source is.
    Jpeg,
    /// Re-encode PNG sources as JPEG. Anything else is written in the format the key names.
    JpegIfPng,
}

impl Conversion {
    /// Effective output format. `declared` is the format the source key names, `input` the
    /// format sniffed from the source bytes.
    pub fn resolve(self, declared: RasterFormat, input: RasterFormat) -> RasterFormat {
        match self {
            Self::None => declared,
            Self::Jpeg => RasterFormat::Jpeg,
            Self::JpegIfPng => match input {
                RasterFormat::Png => RasterFormat::Jpeg,
                RasterFormat::Jpeg => declared,
            },
        }
    }
}

/// The operation set requested by a descriptor.
///
/// `0` for `width` or `height` means "unset": the other side drives the scale and the aspect
/// ratio is preserved. An accepted descriptor never has both at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransformParams {
    pub width: u32,
    pub height: u32,
    /// Resize to cover `width`x`height` and crop the overflow, centred.
    pub crop: bool,
    pub grayscale: bool,
    pub conversion: Conversion,
}

impl TransformParams {
    /// True when the descriptor explicitly asked for JPEG output.
    pub fn convert(&self) -> bool {
        self.conversion == Conversion::Jpeg
    }
}

/// Where an original lives, independent of any transform encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceIdentity {
    /// Client namespace; only the params grammar has one.
    pub namespace: Option<String>,
    /// Path segments between the namespace and the file, possibly empty.
    pub prefix: Vec<String>,
    /// File name without transform encoding and without extension.
    pub base: String,
    /// Extension spelled exactly as requested (`JPG` stays `JPG`).
    pub ext: String,
}

impl ResourceIdentity {
    pub fn filename(&self) -> String {
        format!("{}.{}", self.base, self.ext)
    }

    /// Prefix joined with `/`, `None` when there are no prefix segments.
    pub fn prefix_path(&self) -> Option<String> {
        (!self.prefix.is_empty()).then(|| self.prefix.join("/"))
    }

    /// `[prefix/]filename`, the part of a key below the namespace.
    pub fn resource_path(&self) -> String {
        match self.prefix_path() {
            Some(prefix) => format!("{prefix}/{}", self.filename()),
            None => self.filename(),
        }
    }

    /// Storage key of the untransformed original.
    pub fn source_key(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}/{}", self.resource_path()),
            None => self.resource_path(),
        }
    }

    pub fn format(&self) -> Option<RasterFormat> {
        RasterFormat::from_extension(&self.ext)
    }

    pub fn is_png(&self) -> bool {
        self.format() == Some(RasterFormat::Png)
    }

    /// Same identity under another extension.
    pub fn with_extension(&self, ext: &str) -> Self {
        Self {
            ext: ext.to_owned(),
            ..self.clone()
        }
    }

    /// Rebuild an identity from a source key.
    ///
    /// `namespace_depth` is the number of leading segments that form the namespace: `0` for the
    /// suffix grammar, the namespace segment count for the params grammar.
    pub fn from_source_key(key: &str, namespace_depth: usize) -> Result<Self, DescriptorError> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments.len() < namespace_depth + 1 {
            return Err(DescriptorError::MalformedSegmentCount {
                expected: namespace_depth + 1,
                found: segments.len(),
            });
        }
        let (filename, dirs) = segments
            .split_last()
            .ok_or(DescriptorError::MalformedSegmentCount {
                expected: 1,
                found: 0,
            })?;
        let Some((base, ext)) = filename.rsplit_once('.') else {
            return Err(DescriptorError::GrammarMismatch {
                variant: if namespace_depth == 0 {
                    Variant::Suffix
                } else {
                    Variant::Params
                },
                offset: key.len(),
                reason: "missing file extension",
            });
        };
        let (namespace, prefix) = dirs.split_at(namespace_depth);
        Ok(Self {
            namespace: (namespace_depth > 0).then(|| namespace.join("/")),
            prefix: prefix.iter().map(|s| (*s).to_owned()).collect(),
            base: base.to_owned(),
            ext: ext.to_owned(),
        })
    }
}

/// A decoded descriptor, as seen by the request flow.
pub trait DecodedDescriptor {
    fn identity(&self) -> &ResourceIdentity;

    fn params(&self) -> &TransformParams;

    /// Storage key of the original to fetch.
    fn source_key(&self) -> &str;

    /// Redirect target used when anything after decoding fails.
    fn fallback_uri(&self) -> &str;

    /// Storage key of the derived object, given the input and output formats the transform
    /// reported.
    fn destination_key(&self, input: RasterFormat, output: RasterFormat) -> String;

    /// Content type stored alongside the derived object.
    fn content_type(&self, output: RasterFormat) -> &'static str {
        output.content_type()
    }
}

/// Best-effort fallback URI for a descriptor, including one that fails to decode.
///
/// Strips whatever transform encoding can be recognised and points at the original. Returns
/// `None` when not even a file name with a supported extension can be found. For every
/// descriptor that decodes, the result equals the decoded fallback URI.
pub fn fallback_uri(descriptor: &str, variant: Variant, hosts: &HostTemplate) -> Option<String> {
    let key = match variant {
        Variant::Suffix => suffix::salvage_source_key(descriptor),
        Variant::Params => params::salvage_source_key(descriptor),
    }?;
    Some(hosts.build_uri(&key))
}
