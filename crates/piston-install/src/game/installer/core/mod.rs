pub mod assets;
pub mod downloader;
pub mod engine;
pub mod jre_manager;
pub mod natives;
pub mod traits;
