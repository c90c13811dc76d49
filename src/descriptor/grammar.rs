//! Acceptance checks for both descriptor grammars.
//!
//! Each check walks the descriptor once and reports the byte offset of the first thing it could
//! not accept. [`validate`] is the plain predicate.

use crate::descriptor::{DescriptorError, Variant};

/// Extensions accepted by both grammars, spelled exactly.
pub(crate) const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "JPG", "JPEG", "png", "PNG"];

/// Trailing markers on a suffix-grammar stem asking for JPEG output.
pub(crate) const CONVERT_TAGS: [&str; 4] = ["-jpg", "-jpeg", "-JPG", "-JPEG"];

/// Client id, parameter segment and file name.
pub(crate) const MIN_PARAMS_SEGMENTS: usize = 3;

const MIN_BASE_LEN: usize = 3;
const MAX_PARAM_DIGITS: usize = 4;
const MIN_PARAM_TOKENS: usize = 2;
const MAX_PARAM_TOKENS: usize = 4;

/// True when `descriptor` is accepted by the grammar of `variant`. Never panics.
pub fn validate(descriptor: &str, variant: Variant) -> bool {
    check(descriptor, variant).is_ok()
}

/// Like [`validate`], keeping the reason for a rejection.
pub fn check(descriptor: &str, variant: Variant) -> Result<(), DescriptorError> {
    match variant {
        Variant::Suffix => check_suffix(descriptor),
        Variant::Params => check_params(descriptor),
    }
}

/// Tokens of a parameter segment such as `w_500,h_300,c_fit`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParamList {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) crop: bool,
    pub(crate) grayscale: bool,
}

impl ParamList {
    pub(crate) fn has_dimension(&self) -> bool {
        self.width.unwrap_or(0) != 0 || self.height.unwrap_or(0) != 0
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_ref_byte(b: u8) -> bool {
    is_name_byte(b) || b == b'+'
}

fn suffix_err(offset: usize, reason: &'static str) -> DescriptorError {
    DescriptorError::mismatch(Variant::Suffix, offset, reason)
}

fn params_err(offset: usize, reason: &'static str) -> DescriptorError {
    DescriptorError::mismatch(Variant::Params, offset, reason)
}

/// `/`-separated segments paired with their byte offset in `src`.
pub(crate) fn segments_with_offsets(src: &str) -> Vec<(usize, &str)> {
    let mut at = 0;
    src.split('/')
        .map(|segment| {
            let item = (at, segment);
            at += segment.len() + 1;
            item
        })
        .collect()
}

/// Split a file name at its last `.`; `None` unless the extension is on the allow-list.
pub(crate) fn split_extension(filename: &str) -> Option<(&str, &str)> {
    let (stem, ext) = filename.rsplit_once('.')?;
    IMAGE_EXTENSIONS.contains(&ext).then_some((stem, ext))
}

/// Remove a trailing convert tag (exact suffix match). Returns the rest and the tag without its
/// dash.
pub(crate) fn strip_convert_tag(stem: &str) -> Option<(&str, &'static str)> {
    CONVERT_TAGS
        .iter()
        .find_map(|&tag| stem.strip_suffix(tag).map(|rest| (rest, &tag[1..])))
}

/// One side of `<width>x<height>`. Empty reads as 0.
pub(crate) fn parse_dimension(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return Some(0);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn check_suffix(src: &str) -> Result<(), DescriptorError> {
    if src.is_empty() {
        return Err(suffix_err(0, "empty descriptor"));
    }

    let name_at = src.rfind('/').map_or(0, |i| i + 1);
    if let Some(pos) = src[..name_at]
        .bytes()
        .position(|b| b != b'/' && !is_name_byte(b))
    {
        return Err(suffix_err(pos, "invalid character in path segment"));
    }

    let filename = &src[name_at..];
    let Some((stem, _)) = split_extension(filename) else {
        let at = filename.rfind('.').map_or(src.len(), |dot| name_at + dot + 1);
        return Err(suffix_err(at, "missing or unsupported file extension"));
    };
    let stem = strip_convert_tag(stem).map_or(stem, |(rest, _)| rest);

    let Some(dash) = stem.rfind('-') else {
        return Err(suffix_err(
            name_at + stem.len(),
            "missing `-<width>x<height>` suffix",
        ));
    };
    let base = &stem[..dash];
    if let Some(pos) = base.bytes().position(|b| !is_name_byte(b)) {
        return Err(suffix_err(name_at + pos, "invalid character in file name"));
    }
    if base.len() < MIN_BASE_LEN {
        return Err(suffix_err(
            name_at,
            "file name shorter than three characters",
        ));
    }

    let dims_at = name_at + dash + 1;
    let Some((width, height)) = stem[dash + 1..].split_once('x') else {
        return Err(suffix_err(dims_at, "expected `<width>x<height>`"));
    };
    if width.is_empty() && height.is_empty() {
        return Err(suffix_err(dims_at, "width and height are both missing"));
    }
    let (Some(w), Some(h)) = (parse_dimension(width), parse_dimension(height)) else {
        return Err(suffix_err(dims_at, "dimension is not a decimal number"));
    };
    if w == 0 && h == 0 {
        return Err(suffix_err(dims_at, "width and height are both zero"));
    }
    Ok(())
}

fn check_ref_segment(segment: &str, at: usize) -> Result<(), DescriptorError> {
    if segment.is_empty() {
        return Err(params_err(at, "empty path segment"));
    }
    match segment.bytes().position(|b| !is_ref_byte(b)) {
        Some(pos) => Err(params_err(at + pos, "invalid character in path segment")),
        None => Ok(()),
    }
}

fn param_number(digits: &str, at: usize) -> Result<u32, DescriptorError> {
    if digits.is_empty()
        || digits.len() > MAX_PARAM_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(params_err(at, "expected one to four digits"));
    }
    digits
        .parse()
        .map_err(|_| params_err(at, "expected one to four digits"))
}

/// Parse a parameter segment starting at byte `at` of the descriptor.
pub(crate) fn scan_param_list(segment: &str, at: usize) -> Result<ParamList, DescriptorError> {
    let mut list = ParamList::default();
    let mut count = 0usize;
    let mut offset = at;
    for token in segment.split(',') {
        count += 1;
        match token {
            "c_fit" => list.crop = true,
            "e_grayscale" => list.grayscale = true,
            _ => {
                if let Some(digits) = token.strip_prefix("w_") {
                    list.width = Some(param_number(digits, offset + 2)?);
                } else if let Some(digits) = token.strip_prefix("h_") {
                    list.height = Some(param_number(digits, offset + 2)?);
                } else {
                    return Err(params_err(offset, "unknown parameter token"));
                }
            }
        }
        offset += token.len() + 1;
    }
    if !(MIN_PARAM_TOKENS..=MAX_PARAM_TOKENS).contains(&count) {
        return Err(params_err(at, "expected two to four parameters"));
    }
    Ok(list)
}

fn check_params(src: &str) -> Result<(), DescriptorError> {
    if src.is_empty() {
        return Err(params_err(0, "empty descriptor"));
    }

    let segments = segments_with_offsets(src);
    if segments.len() < MIN_PARAMS_SEGMENTS {
        return Err(DescriptorError::MalformedSegmentCount {
            expected: MIN_PARAMS_SEGMENTS,
            found: segments.len(),
        });
    }

    let last = segments.len() - 1;
    let (name_at, filename) = segments[last];
    let Some((stem, _)) = split_extension(filename) else {
        let at = filename.rfind('.').map_or(src.len(), |dot| name_at + dot + 1);
        return Err(params_err(at, "missing or unsupported file extension"));
    };
    check_ref_segment(stem, name_at)?;

    // The client id may span several segments; the first parameter list after it ends it.
    let Some(params_idx) =
        (1..last).find(|&i| scan_param_list(segments[i].1, segments[i].0).is_ok())
    else {
        return Err(params_err(segments[1].0, "no parameter segment"));
    };
    for (i, &(at, segment)) in segments[..last].iter().enumerate() {
        if i != params_idx {
            check_ref_segment(segment, at)?;
        }
    }

    let (params_at, params) = segments[params_idx];
    if !scan_param_list(params, params_at)?.has_dimension() {
        return Err(params_err(params_at, "width and height are both zero"));
    }
    Ok(())
}
