//! API layer - documents and the in-process client

pub mod document;
pub mod native;
