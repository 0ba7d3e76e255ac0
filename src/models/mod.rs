//! Core data models for the video ingestion service.
//!
//! `video` maps the persisted record, `media_type` holds the accepted upload
//! content types, and `object_ref` covers object keys and the reference
//! string persisted in `video_url`.

pub mod media_type;
pub mod object_ref;
pub mod video;
