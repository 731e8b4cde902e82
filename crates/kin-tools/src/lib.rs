#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The tool contract and tool manager.
//!
//! A tool describes itself with a JSON schema, validates its arguments,
//! and runs as a stream of progress events terminated by one result. The
//! manager discovers builtin and user-provided tools in a fixed order and
//! filters them by name patterns before a session ever sees them.

mod builtin;
mod context;
mod contract;
mod error;
mod external;
mod manager;
mod pattern;
mod subagent;

pub use builtin::{
    BashTool, EditFileTool, GlobTool, GrepTool, ListDirectoryTool, ReadFileTool, TaskTool,
    WebFetchTool, WebSearchTool, WriteFileTool,
};
pub use context::{ApprovalCallback, ApprovalDecision, DenyAllApproval, SubAgentSpawner, ToolContext, UserInputCallback};
pub use contract::{AllowlistVerdict, Tool, ToolDescription, ToolEvent, ToolEventStream, ToolFailure, ToolStreamEvent};
pub use error::{ToolError, ToolPermissionError, ToolResult};
pub use external::ExternalTool;
pub use manager::{ToolManager, ToolManagerConfig};
pub use pattern::Pattern;
pub use subagent::{SubAgentRequest, SubAgentResult};
