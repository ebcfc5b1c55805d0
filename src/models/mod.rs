//! Core data models for the local blob store.
//!
//! `Object` is the record persisted in the metadata index; the remaining
//! types are option bags and the JSON shapes returned to clients.

pub mod object;
