//! Suffix grammar: `crazy/images/blue_marble-500x500.jpg`, `images/gopher-800x0-jpg.png`.
//!
//! The transform is encoded at the end of the file name: `-<width>x<height>`, optionally
//! followed by a convert tag (`-jpg`, `-jpeg`, `-JPG`, `-JPEG`) that turns a PNG source into
//! JPEG output.

use serde::Serialize;

use crate::descriptor::{
    Conversion, DecodedDescriptor, DescriptorError, HostTemplate, RasterFormat, ResourceIdentity,
    TransformParams, Variant,
    grammar::{self, parse_dimension, split_extension, strip_convert_tag},
};

/// A decoded suffix-grammar descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuffixDescriptor {
    identity: ResourceIdentity,
    params: TransformParams,
    /// Dimension token exactly as requested, e.g. `800x0` or `800x`.
    dimensions: String,
    source_key: String,
    fallback_uri: String,
}

impl SuffixDescriptor {
    /// Validate and decode `descriptor`. `hosts` turns the source key into the fallback URI.
    pub fn decode(descriptor: &str, hosts: &HostTemplate) -> Result<Self, DescriptorError> {
        grammar::check(descriptor, Variant::Suffix)?;

        let (dirs, encoded) = match descriptor.rsplit_once('/') {
            Some((dirs, encoded)) => (Some(dirs), encoded),
            None => (None, descriptor),
        };
        let prefix: Vec<String> = dirs
            .map(|dirs| dirs.split('/').map(str::to_owned).collect())
            .unwrap_or_default();

        let (stem, ext) = split_extension(encoded).ok_or_else(|| {
            DescriptorError::mismatch(
                Variant::Suffix,
                descriptor.len(),
                "missing or unsupported file extension",
            )
        })?;

        let (stem, tag) = match strip_convert_tag(stem) {
            Some((rest, tag)) => (rest, Some(tag)),
            None => (stem, None),
        };
        let convert = tag.is_some() && RasterFormat::from_extension(ext) == Some(RasterFormat::Png);

        let (base, dimensions) = stem
            .rsplit_once('-')
            .filter(|(_, dims)| dims.contains('x'))
            .ok_or_else(|| DescriptorError::dimensions(encoded))?;
        let (width, height) = extract_dimensions(dimensions)
            .filter(|&(w, h)| w != 0 || h != 0)
            .ok_or_else(|| DescriptorError::dimensions(encoded))?;

        let identity = ResourceIdentity {
            namespace: None,
            prefix,
            base: base.to_owned(),
            ext: ext.to_owned(),
        };
        let source_key = identity.source_key();
        let fallback_uri = hosts.build_uri(&source_key);

        tracing::debug!(
            descriptor,
            source_key = %source_key,
            width,
            height,
            convert,
            "decoded suffix descriptor"
        );

        Ok(Self {
            identity,
            params: TransformParams {
                width,
                height,
                crop: false,
                grayscale: false,
                conversion: if convert {
                    Conversion::Jpeg
                } else {
                    Conversion::None
                },
            },
            dimensions: dimensions.to_owned(),
            source_key,
            fallback_uri,
        })
    }

    pub fn convert(&self) -> bool {
        self.params.convert()
    }

    pub fn dimensions(&self) -> &str {
        &self.dimensions
    }

    /// Storage key of the resized object: `[prefix/]<base>-<dimensions>.<ext>`, with `jpg` as
    /// the extension when conversion was requested.
    pub fn encoded_destination_key(&self) -> String {
        let ext = if self.convert() {
            RasterFormat::Jpeg.canonical_extension()
        } else {
            self.identity.ext.as_str()
        };
        let filename = format!("{}-{}.{ext}", self.identity.base, self.dimensions);
        match self.identity.prefix_path() {
            Some(prefix) => format!("{prefix}/{filename}"),
            None => filename,
        }
    }

    /// `image/png` for an unconverted PNG, `image/jpeg` for everything else.
    pub fn stored_content_type(&self) -> &'static str {
        if !self.convert() && self.identity.is_png() {
            RasterFormat::Png.content_type()
        } else {
            RasterFormat::Jpeg.content_type()
        }
    }
}

impl DecodedDescriptor for SuffixDescriptor {
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

    // The output format is fixed by the request here, so the reported ones are not consulted.
    fn destination_key(&self, _input: RasterFormat, _output: RasterFormat) -> String {
        self.encoded_destination_key()
    }

    fn content_type(&self, _output: RasterFormat) -> &'static str {
        self.stored_content_type()
    }
}

/// `<width>x<height>` with either side possibly empty.
fn extract_dimensions(token: &str) -> Option<(u32, u32)> {
    let (width, height) = token.split_once('x')?;
    Some((parse_dimension(width)?, parse_dimension(height)?))
}

/// Source key of a descriptor that may not decode: the file name with a supported extension,
/// minus a convert tag and a trailing `-<digits>x<digits>` token.
pub(crate) fn salvage_source_key(descriptor: &str) -> Option<String> {
    let (dirs, encoded) = match descriptor.rsplit_once('/') {
        Some((dirs, encoded)) => (Some(dirs), encoded),
        None => (None, descriptor),
    };
    let (stem, ext) = split_extension(encoded)?;
    let stem = strip_convert_tag(stem).map_or(stem, |(rest, _)| rest);
    let base = match stem.rsplit_once('-') {
        Some((base, dims))
            if dims.contains('x') && dims.bytes().all(|b| b.is_ascii_digit() || b == b'x') =>
        {
            base
        }
        _ => stem,
    };
    if base.is_empty() {
        return None;
    }
    Some(match dirs {
        Some(dirs) => format!("{dirs}/{base}.{ext}"),
        None => format!("{base}.{ext}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> HostTemplate {
        HostTemplate::S3Website {
            scheme: "http".to_owned(),
            bucket: "simplytest".to_owned(),
            endpoint: "s3-website".to_owned(),
            region: "eu-central-1".to_owned(),
        }
    }

    #[test]
    fn decodes_usual_request() {
        let d = SuffixDescriptor::decode("crazy/images/blue_marble-500x500.jpg", &hosts()).unwrap();
        assert_eq!(d.identity().prefix_path().as_deref(), Some("crazy/images"));
        assert_eq!(d.identity().base, "blue_marble");
        assert_eq!(d.identity().ext, "jpg");
        assert_eq!(d.params().width, 500);
        assert_eq!(d.params().height, 500);
        assert!(!d.convert());
        assert_eq!(d.source_key(), "crazy/images/blue_marble.jpg");
        assert_eq!(
            d.fallback_uri(),
            "http://simplytest.s3-website.eu-central-1.amazonaws.com/crazy/images/blue_marble.jpg"
        );
        assert_eq!(
            d.destination_key(RasterFormat::Jpeg, RasterFormat::Jpeg),
            "crazy/images/blue_marble-500x500.jpg"
        );
    }

    #[test]
    fn decodes_png_to_jpg_conversion() {
        let d = SuffixDescriptor::decode("images/gopher-800x0-jpg.png", &hosts()).unwrap();
        assert!(d.convert());
        assert_eq!(d.params().width, 800);
        assert_eq!(d.params().height, 0);
        assert_eq!(d.source_key(), "images/gopher.png");
        assert_eq!(
            d.destination_key(RasterFormat::Jpeg, RasterFormat::Jpeg),
            "images/gopher-800x0.jpg"
        );
        assert_eq!(d.content_type(RasterFormat::Jpeg), "image/jpeg");
    }

    #[test]
    fn keeps_extension_spelling_and_missing_prefix() {
        let d = SuffixDescriptor::decode("gopher-800x0.PNG", &hosts()).unwrap();
        assert_eq!(d.identity().prefix, Vec::<String>::new());
        assert_eq!(d.source_key(), "gopher.PNG");
        assert_eq!(
            d.destination_key(RasterFormat::Png, RasterFormat::Png),
            "gopher-800x0.PNG"
        );
        assert_eq!(d.content_type(RasterFormat::Png), "image/png");

        let d = SuffixDescriptor::decode("crazy/images/blue_marble-500x0.JPG", &hosts()).unwrap();
        assert_eq!(d.source_key(), "crazy/images/blue_marble.JPG");
    }

    #[test]
    fn empty_height_reads_as_zero() {
        let d = SuffixDescriptor::decode("images/theshot-800x.jpeg", &hosts()).unwrap();
        assert_eq!((d.params().width, d.params().height), (800, 0));
        assert_eq!(d.dimensions(), "800x");
        assert_eq!(d.source_key(), "images/theshot.jpeg");
    }

    #[test]
    fn convert_tag_on_jpeg_source_is_stripped_without_converting() {
        let d = SuffixDescriptor::decode("gopher-480x0-jpg.jpg", &hosts()).unwrap();
        assert!(!d.convert());
        assert_eq!(d.source_key(), "gopher.jpg");
        assert_eq!(
            d.destination_key(RasterFormat::Jpeg, RasterFormat::Jpeg),
            "gopher-480x0.jpg"
        );
        assert_eq!(d.content_type(RasterFormat::Jpeg), "image/jpeg");
    }

    #[test]
    fn base_names_overlapping_the_tag_are_not_over_stripped() {
        let d = SuffixDescriptor::decode("img/bigjpg-100x100-jpg.png", &hosts()).unwrap();
        assert_eq!(d.source_key(), "img/bigjpg.png");

        let d = SuffixDescriptor::decode("img80-800x0.jpg", &hosts()).unwrap();
        assert_eq!(d.source_key(), "img80.jpg");
    }

    #[test]
    fn dimension_extraction() {
        let cases = [
            ("500x500", Some((500, 500))),
            ("480x0", Some((480, 0))),
            ("0x824", Some((0, 824))),
            ("600x", Some((600, 0))),
            ("600", None),
            ("6a0x1", None),
        ];
        for (token, want) in cases {
            assert_eq!(extract_dimensions(token), want, "{token}");
        }
    }

    #[test]
    fn rejects_what_the_grammar_rejects() {
        for descriptor in [
            "",
            "images/theshot.jpg",
            "dully/crazy/images/filename-450x450",
            "dully/crazy/images/filename-450x450.gif",
            "images/theshot-0x0.jpg",
        ] {
            assert!(
                SuffixDescriptor::decode(descriptor, &hosts()).is_err(),
                "{descriptor}"
            );
        }
    }

    #[test]
    fn salvage_matches_decoded_source_key() {
        for descriptor in [
            "crazy/images/blue_marble-500x500.jpg",
            "images/gopher-800x0-jpg.png",
            "AnotherImage-1024x0-jpg.png",
            "dully/crazy/images/theimage-920x0.jpeg",
        ] {
            let d = SuffixDescriptor::decode(descriptor, &hosts()).unwrap();
            assert_eq!(
                salvage_source_key(descriptor).as_deref(),
                Some(d.source_key())
            );
        }
        assert_eq!(
            salvage_source_key("images/theshot-0x0.jpg").as_deref(),
            Some("images/theshot.jpg")
        );
        assert_eq!(salvage_source_key("images/theshot-0x0.gif"), None);
    }
}
