//! Answering: tools, the ReAct loop, the retrieval chain, and the orchestrator

mod chain;
mod orchestrator;
pub mod prompt;
mod react;
mod tools;

pub use chain::RetrievalChain;
pub use orchestrator::{Answerer, AnsweringOrchestrator};
pub use react::{parse_step, AgentRun, AgentStep, ParseFailure, ReactAgent};
pub use tools::{Tool, ToolKind, ToolRuntime, ToolSet};
