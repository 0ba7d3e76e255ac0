pub mod aspect_ratio;
pub mod auth;
pub mod faststart;
pub mod keygen;
pub mod object_store;
pub mod process;
pub mod publisher;
pub mod upload_pipeline;
pub mod video_store;

#[cfg(test)]
pub mod testing;
