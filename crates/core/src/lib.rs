//! Core business logic for fourcut.
//!
//! The relationship engine owns the friendship lifecycle; the visibility
//! resolver decides who may see a photo; the services wire both to
//! notifications and blob storage.

pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use services::*;
