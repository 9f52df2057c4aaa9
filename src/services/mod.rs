pub mod media_tool;
pub mod probe;
pub mod reference;
pub mod signer;
pub mod storage;
pub mod transcoder;
pub mod video_pipeline;
pub mod video_repository;
