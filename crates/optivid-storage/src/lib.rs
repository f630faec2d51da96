//! Cloudflare R2 storage client and artifact uploader.

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use uploader::{ArtifactStore, R2ArtifactStore, StoredArtifact};
