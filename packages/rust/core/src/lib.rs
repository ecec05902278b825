//! Publish orchestration and the tool surface for halopub.
//!
//! This crate ties the backend client and the content analyzer together
//! into the `publish_post` workflow, and exposes it alongside the listing
//! tools (see [`tools`]).

pub mod tools;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use tools::{ToolDefinition, ToolHandlers, ToolResult, tool_definitions};
pub use workflow::{
    ProgressReporter, PublishFailure, PublishOutcome, PublishRequest, PublishStage,
    PublishWorkflow, SilentProgress,
};
