//! Accepted upload media types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("missing or empty content type")]
    Empty,
    #[error("malformed content type `{0}`")]
    Malformed(String),
    #[error("unsupported media type `{0}`")]
    Unsupported(String),
}

/// Strip parameters from a `Content-Type` value and normalise it.
///
/// `"Video/MP4; codecs=avc1"` becomes `"video/mp4"`. The result always has the
/// `type/subtype` shape with both halves non-empty.
pub fn parse_media_type(raw: &str) -> Result<String, MediaTypeError> {
    let essence = raw.split(';').next().unwrap_or("").trim();
    if essence.is_empty() {
        return Err(MediaTypeError::Empty);
    }

    let (top, sub) = essence
        .split_once('/')
        .ok_or_else(|| MediaTypeError::Malformed(raw.to_string()))?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&^_.+-".contains(&b))
    };
    if !valid(top) || !valid(sub) {
        return Err(MediaTypeError::Malformed(raw.to_string()));
    }

    Ok(essence.to_ascii_lowercase())
}

/// The single media type accepted for video uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMediaType {
    Mp4,
}

impl VideoMediaType {
    pub fn parse(raw: &str) -> Result<Self, MediaTypeError> {
        match parse_media_type(raw)?.as_str() {
            "video/mp4" => Ok(Self::Mp4),
            other => Err(MediaTypeError::Unsupported(other.to_string())),
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
        }
    }
}

/// Media types accepted for thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailMediaType {
    Jpeg,
    Png,
}

impl ThumbnailMediaType {
    pub fn parse(raw: &str) -> Result<Self, MediaTypeError> {
        match parse_media_type(raw)?.as_str() {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            other => Err(MediaTypeError::Unsupported(other.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}
