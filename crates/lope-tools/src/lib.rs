//! Tool capability layer for the lope agent.
//!
//! A tool is anything implementing [`LopeTool`]: a name, a description, a
//! parameter schema, and an async body. Tools are collected in a
//! [`ToolRegistry`], and every execution goes through
//! [`ToolRegistry::dispatch`], which handles abort checks, parameter
//! validation, and error mapping so that tool bodies never have to.

pub mod errors;
pub mod notebook;
pub mod registry;
pub mod traits;

pub use errors::ToolError;
pub use notebook::NotebookTool;
pub use registry::ToolRegistry;
pub use traits::{LopeTool, ToolContext, ToolOutcome};
