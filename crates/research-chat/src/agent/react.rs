//! ReAct reasoning loop
//!
//! The model is prompted with the tool list, the conversation so far and a
//! scratchpad of earlier steps. Each completion is parsed into either a tool
//! call or a final answer. Tool output is appended to the scratchpad as an
//! `Observation:` and the model is asked again, up to `max_iterations` times.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{ChatMessage, ChatModel};

use super::prompt::{react_prompt, DEFAULT_INSTRUCTIONS, OBSERVATION_STOP};
use super::tools::{ToolRuntime, ToolSet};

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("Invalid regex")
});
static ACTION_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("Invalid regex"));
static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").expect("Invalid regex")
});

/// One parsed model turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Call `tool` with `input`
    Action {
        tool: String,
        input: String,
        log: String,
    },
    /// Done
    Finish { output: String, log: String },
}

/// Completion that fits neither shape; `observation` is shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub observation: String,
    pub log: String,
}

/// Parse a completion in the Thought/Action/Action Input/Final Answer format
pub fn parse_step(text: &str) -> std::result::Result<AgentStep, ParseFailure> {
    let includes_answer = text.contains(FINAL_ANSWER);
    let failure = |observation: &str| ParseFailure {
        observation: observation.to_string(),
        log: text.to_string(),
    };

    if let Some(caps) = ACTION_RE.captures(text) {
        if includes_answer {
            return Err(failure(
                "Parsing LLM output produced both a final answer and a parse-able action. \
                 Reply with either an Action or a Final Answer.",
            ));
        }
        let tool = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let input = caps
            .get(2)
            .map(|m| m.as_str().trim().trim_matches('"'))
            .unwrap_or_default();
        return Ok(AgentStep::Action {
            tool: tool.to_string(),
            input: input.to_string(),
            log: text.to_string(),
        });
    }

    if includes_answer {
        let output = text
            .rsplit(FINAL_ANSWER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentStep::Finish {
            output,
            log: text.to_string(),
        });
    }

    if !ACTION_ONLY_RE.is_match(text) {
        Err(failure("Invalid Format: Missing 'Action:' after 'Thought:'"))
    } else if !ACTION_INPUT_RE.is_match(text) {
        Err(failure("Invalid Format: Missing 'Action Input:' after 'Action:'"))
    } else {
        Err(failure("Invalid Format: could not parse LLM output"))
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    pub output: String,
    /// Successful tool invocations
    pub tool_calls: usize,
    /// Model completions used
    pub iterations: usize,
}

/// Tool-using agent over a chat model
pub struct ReactAgent {
    chat: Arc<dyn ChatModel>,
    runtime: Arc<ToolRuntime>,
    tools: ToolSet,
    instructions: String,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(chat: Arc<dyn ChatModel>, runtime: Arc<ToolRuntime>, max_iterations: usize) -> Self {
        let tools = runtime.tool_set();
        Self {
            chat,
            runtime,
            tools,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Run until the model gives a final answer
    ///
    /// Model and tool failures end the run with that error. Running out of
    /// iterations is an `Error::Agent`.
    pub async fn run(&self, chat_history: &str, input: &str) -> Result<AgentRun> {
        let stop = vec![OBSERVATION_STOP.to_string()];
        let mut scratchpad = String::new();
        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            let prompt = react_prompt(
                &self.instructions,
                &self.tools,
                chat_history,
                input,
                &scratchpad,
            );
            let completion = self
                .chat
                .complete(&[ChatMessage::user(prompt)], &stop)
                .await?;

            match parse_step(&completion) {
                Ok(AgentStep::Finish { output, .. }) => {
                    tracing::debug!(
                        "Agent finished after {} step(s), {} tool call(s)",
                        iteration,
                        tool_calls
                    );
                    return Ok(AgentRun {
                        output,
                        tool_calls,
                        iterations: iteration,
                    });
                }
                Ok(AgentStep::Action { tool, input: tool_input, log }) => {
                    let observation = match self.tools.get(&tool) {
                        Some(found) => {
                            tracing::debug!("Step {}: {}({})", iteration, found.name, tool_input);
                            let out = self.runtime.invoke(found.kind, &tool_input).await?;
                            tool_calls += 1;
                            out
                        }
                        None => {
                            tracing::debug!("Step {}: unknown tool '{}'", iteration, tool);
                            format!(
                                "{} is not a valid tool, try one of [{}].",
                                tool,
                                self.tools.names().join(", ")
                            )
                        }
                    };
                    push_step(&mut scratchpad, &log, &observation);
                }
                Err(failure) => {
                    tracing::warn!("Step {}: {}", iteration, failure.observation);
                    push_step(&mut scratchpad, &failure.log, &failure.observation);
                }
            }
        }

        Err(Error::Agent(format!(
            "Agent stopped after {} iterations without a final answer",
            self.max_iterations
        )))
    }
}

fn push_step(scratchpad: &mut String, log: &str, observation: &str) {
    scratchpad.push_str(log);
    scratchpad.push_str("\nObservation: ");
    scratchpad.push_str(observation);
    scratchpad.push_str("\nThought: ");
}
