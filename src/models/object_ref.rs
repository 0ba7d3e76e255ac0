//! Object keys and the stored reference persisted in `Video::video_url`.

use crate::services::aspect_ratio::AspectRatio;
use std::fmt;
use thiserror::Error;

/// Separator between bucket and key in the persisted reference string.
/// Other tooling parses this format; it must stay a literal comma.
pub const REFERENCE_DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("reference component `{0}` contains the delimiter")]
    DelimiterInComponent(String),
    #[error("reference component is empty")]
    EmptyComponent,
    #[error("`{0}` is not a bucket,key reference")]
    Malformed(String),
}

/// Key of an object inside the bucket.
///
/// Keys are always generated by the service, never taken from user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// `<landscape|portrait|other>/<random_id>.<ext>`
    pub fn video(aspect: AspectRatio, random_id: &str, extension: &str) -> Self {
        Self(format!("{}/{}.{}", aspect.name(), random_id, extension))
    }

    /// `<random_id>.<ext>`, no folder prefix.
    pub fn thumbnail(random_id: &str, extension: &str) -> Self {
        Self(format!("{}.{}", random_id, extension))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a stored object, persisted as `"<bucket>,<key>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObjectReference {
    bucket: String,
    key: String,
}

impl StoredObjectReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, ReferenceError> {
        let bucket = bucket.into();
        let key = key.into();
        for part in [&bucket, &key] {
            if part.is_empty() {
                return Err(ReferenceError::EmptyComponent);
            }
            if part.contains(REFERENCE_DELIMITER) {
                return Err(ReferenceError::DelimiterInComponent(part.clone()));
            }
        }
        Ok(Self { bucket, key })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.bucket, REFERENCE_DELIMITER, self.key)
    }

    pub fn decode(raw: &str) -> Result<Self, ReferenceError> {
        let (bucket, key) = raw
            .split_once(REFERENCE_DELIMITER)
            .ok_or_else(|| ReferenceError::Malformed(raw.to_string()))?;
        Self::new(bucket, key).map_err(|_| ReferenceError::Malformed(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_key_is_prefixed_by_aspect_name() {
        let id = "a".repeat(43);
        assert_eq!(
            ObjectKey::video(AspectRatio::Landscape16x9, &id, "mp4").as_str(),
            format!("landscape/{id}.mp4")
        );
        assert_eq!(
            ObjectKey::video(AspectRatio::Portrait9x16, &id, "mp4").as_str(),
            format!("portrait/{id}.mp4")
        );
        assert_eq!(
            ObjectKey::video(AspectRatio::Other, &id, "mp4").as_str(),
            format!("other/{id}.mp4")
        );
    }

    #[test]
    fn thumbnail_key_has_no_folder() {
        let key = ObjectKey::thumbnail("abc", "png");
        assert_eq!(key.as_str(), "abc.png");
        assert!(!key.as_str().contains('/'));
    }

    #[test]
    fn reference_round_trips() {
        let cases = [
            ("tubely-private", "landscape/abc_-XYZ.mp4"),
            ("b", "k"),
            ("my.bucket-1", "other/deep/nested/key.mp4"),
        ];
        for (bucket, key) in cases {
            let encoded = StoredObjectReference::new(bucket, key).unwrap().encode();
            assert_eq!(encoded, format!("{bucket},{key}"));
            let decoded = StoredObjectReference::decode(&encoded).unwrap();
            assert_eq!((decoded.bucket(), decoded.key()), (bucket, key));
        }
    }

    #[test]
    fn rejects_delimiter_and_empty_parts() {
        assert_eq!(
            StoredObjectReference::new("a,b", "k"),
            Err(ReferenceError::DelimiterInComponent("a,b".into()))
        );
        assert!(StoredObjectReference::new("bucket", "k,1").is_err());
        assert_eq!(
            StoredObjectReference::new("", "k"),
            Err(ReferenceError::EmptyComponent)
        );
    }

    #[test]
    fn decode_rejects_non_references() {
        for raw in ["", "no-delimiter", ",key", "bucket,", "https://example.com/a,b,c"] {
            assert!(StoredObjectReference::decode(raw).is_err(), "{raw}");
        }
    }
}
