//! live-recorder library crate.
//!
//! Watches live-broadcast sources and records them while they are on air:
//! listeners poll status and publish transitions on an [`events::EventDispatcher`],
//! the [`recorder::RecorderManager`] reacts by starting and stopping recorders,
//! and each recorder drives a [`parser::StreamParser`] into a local file.

pub mod config;
pub mod error;
pub mod events;
pub mod listener;
pub mod live;
pub mod logging;
pub mod parser;
pub mod recorder;
pub mod utils;

pub use error::{Error, Result};
