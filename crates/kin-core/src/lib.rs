#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Core types and traits shared across the Kin Code agent core.
//!
//! This crate has no knowledge of HTTP, streaming transports, or the
//! filesystem — it defines the vocabulary (`Message`, `ToolCall`,
//! `AgentStats`, `Event`, ...) that every other `kin-*` crate builds on.

mod error;
mod event;
mod message;
mod middleware;
mod model;
mod profile;
mod stats;
mod tags;
mod tool_call;

pub use error::{KinError, KinResult};
pub use event::Event;
pub use message::{Message, Role};
pub use middleware::{MiddlewareAction, MiddlewareResult};
pub use model::{
    BackendKind, ModelConfig, Prices, ProviderConfig, ReasoningConfig, ReasoningMode, ToolCallFormat,
};
pub use profile::AgentProfile;
pub use stats::AgentStats;
pub use tags::{tag, ErrorTag};
pub use tool_call::{
    FailedToolCall, ParsedToolCall, RawArgValue, ResolvedToolCall, ToolCall, ToolPermission,
};
