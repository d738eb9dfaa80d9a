//! Core types for Ultron.

pub mod message;

pub use message::*;
