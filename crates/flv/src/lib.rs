//! Streaming FLV reader and remuxer.
//!
//! The crate validates the FLV header and forwards a live stream tag by tag
//! without touching audio or video payloads. See [`remux::FlvRemuxer`].

pub mod encode;
pub mod error;
pub mod framing;
pub mod header;
pub mod remux;
pub mod tag;

pub use error::FlvError;
pub use header::FlvHeader;
pub use remux::{FlvMetadata, FlvRemuxer, RemuxOutcome};
pub use tag::FlvTagType;
