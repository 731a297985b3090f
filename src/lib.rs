pub mod common;
pub mod id3;
pub mod ape;
pub mod config;
pub mod store;

pub use common::error::{Mp3TagError, Result};
pub use config::{ParseOptions, WriteOptions};
pub use id3::specs::Mp3FrameType;
pub use store::TagStore;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
