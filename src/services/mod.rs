//! Storage engine: blob bytes on disk, records in an ordered index, and the
//! object store that keeps the two in step.

pub mod address;
pub mod content_store;
pub mod error;
pub mod headers;
pub mod metadata_index;
pub mod object_store;
