//! Shared types for the threadline workspace: conversation messages,
//! streaming events, tool definitions, the outbound framing protocol,
//! session query parameters, configuration, and the common error type.

pub mod config;
pub mod error;
pub mod frame;
pub mod query;
pub mod stream;
pub mod tool;
pub mod trace;
