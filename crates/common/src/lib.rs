//! Common utilities and shared types for fourcut.
//!
//! This crate provides foundational components used across all fourcut crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: Blob storage backends for photos (local filesystem, in-memory)
//!
//! # Example
//!
//! ```no_run
//! use fourcut_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} (search limit {})", id, config.friendship.search_limit);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{
    LocalStorage, MemoryStorage, StorageBackend, StorageService, UploadedFile,
    generate_storage_key,
};
