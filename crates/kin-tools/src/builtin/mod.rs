//! Built-in tools available to every Tool Manager before any discovery
//! directory is even consulted.

mod bash;
mod edit_file;
mod glob_tool;
mod grep;
mod list_directory;
mod read_file;
mod task;
mod web_fetch;
mod web_search;
mod write_file;

pub use bash::BashTool;
pub use edit_file::EditFileTool;
pub use glob_tool::GlobTool;
pub use grep::GrepTool;
pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use task::TaskTool;
pub use web_fetch::WebFetchTool;
pub use web_search::WebSearchTool;
pub use write_file::WriteFileTool;

use std::sync::Arc;

use crate::contract::Tool;

/// The standard builtin set, in the order the Tool Manager exposes them.
#[must_use]
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(EditFileTool),
        Arc::new(GlobTool),
        Arc::new(GrepTool),
        Arc::new(BashTool),
        Arc::new(ListDirectoryTool),
        Arc::new(WebSearchTool),
        Arc::new(WebFetchTool),
        Arc::new(TaskTool),
    ]
}
