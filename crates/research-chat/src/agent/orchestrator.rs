//! Question answering with per-session memory

use std::sync::Arc;

use crate::config::{AgentConfig, AnswerMode};
use crate::error::{Error, Result};
use crate::providers::ChatModel;
use crate::session::{SessionId, SessionStore};
use crate::types::Exchange;

use super::chain::RetrievalChain;
use super::react::ReactAgent;
use super::tools::ToolRuntime;

/// Strategy used to produce an answer
pub enum Answerer {
    Agent(ReactAgent),
    Chain(RetrievalChain),
}

/// Runs the configured answerer and records the exchange
pub struct AnsweringOrchestrator {
    answerer: Answerer,
    sessions: Arc<SessionStore>,
}

impl AnsweringOrchestrator {
    pub fn new(answerer: Answerer, sessions: Arc<SessionStore>) -> Self {
        Self { answerer, sessions }
    }

    /// Build the answerer selected by `config.mode`
    pub fn from_config(
        config: &AgentConfig,
        chat: Arc<dyn ChatModel>,
        runtime: Arc<ToolRuntime>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let answerer = match config.mode {
            AnswerMode::Agent => {
                let mut agent = ReactAgent::new(chat, runtime, config.max_iterations);
                if let Some(instructions) = &config.instructions {
                    agent = agent.with_instructions(instructions.clone());
                }
                tracing::info!("Answer mode: agent (tools: {})", agent.tools().names().join(", "));
                Answerer::Agent(agent)
            }
            AnswerMode::RetrievalChain => {
                tracing::info!("Answer mode: retrieval chain");
                Answerer::Chain(RetrievalChain::new(
                    chat,
                    runtime.gateway().clone(),
                    config.retriever_top_k,
                ))
            }
        };
        Self::new(answerer, sessions)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer `question` in the context of the session's transcript
    ///
    /// The exchange is appended once, only when an answer was produced. On
    /// error the transcript is left as it was.
    pub async fn answer(&self, session: SessionId, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("No question provided"));
        }

        let history = self.sessions.transcript(session);

        let answer = match &self.answerer {
            Answerer::Agent(agent) => agent.run(&history.render(), question).await?.output,
            Answerer::Chain(chain) => chain.run(&history, question).await?,
        };

        let len = self.sessions.append(session, Exchange::new(question, answer.clone()));
        tracing::info!("User asked: {} (session {}, {} exchange(s))", question, session, len);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{runtime_with_docs, ScriptedChat};
    use std::time::Duration;

    fn sessions() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Duration::from_secs(3600), None))
    }

    #[tokio::test]
    async fn test_multi_tool_answer_recorded_once() {
        let chat = ScriptedChat::new(vec![
            "Action: Retriever\nAction Input: cats",
            "Action: Retriever\nAction Input: cat sleep",
            "Final Answer: Sixteen hours.",
        ]);
        let runtime = runtime_with_docs(&["Cats sleep sixteen hours a day."]).await;
        let sessions = sessions();
        let orchestrator = AnsweringOrchestrator::from_config(
            &AgentConfig::default(),
            chat,
            runtime,
            sessions.clone(),
        );
        let id = sessions.resolve(None).id;

        let answer = orchestrator.answer(id, "How long do cats sleep?").await.unwrap();
        assert_eq!(answer, "Sixteen hours.");

        let transcript = sessions.transcript(id);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.exchanges()[0].question, "How long do cats sleep?");
        assert_eq!(transcript.exchanges()[0].answer, "Sixteen hours.");
    }

    #[tokio::test]
    async fn test_failure_leaves_transcript_unchanged() {
        let chat = ScriptedChat::new(vec!["Final Answer: first"]);
        let runtime = runtime_with_docs(&[]).await;
        let sessions = sessions();
        let orchestrator = AnsweringOrchestrator::from_config(
            &AgentConfig::default(),
            chat,
            runtime,
            sessions.clone(),
        );
        let id = sessions.resolve(None).id;

        orchestrator.answer(id, "one").await.unwrap();
        // script exhausted -> model error
        assert!(orchestrator.answer(id, "two").await.is_err());
        assert_eq!(sessions.transcript(id).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_question_rejected_before_model() {
        let chat = ScriptedChat::new(vec!["Final Answer: unused"]);
        let runtime = runtime_with_docs(&[]).await;
        let sessions = sessions();
        let orchestrator = AnsweringOrchestrator::from_config(
            &AgentConfig::default(),
            chat.clone(),
            runtime,
            sessions.clone(),
        );
        let id = sessions.resolve(None).id;

        let err = orchestrator.answer(id, "   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(chat.prompts().is_empty());
        assert!(sessions.transcript(id).is_empty());
    }

    #[tokio::test]
    async fn test_history_reaches_next_prompt() {
        let chat = ScriptedChat::new(vec!["Final Answer: Paris.", "Final Answer: France."]);
        let runtime = runtime_with_docs(&[]).await;
        let sessions = sessions();
        let orchestrator = AnsweringOrchestrator::from_config(
            &AgentConfig::default(),
            chat.clone(),
            runtime,
            sessions.clone(),
        );
        let id = sessions.resolve(None).id;

        orchestrator.answer(id, "Capital of France?").await.unwrap();
        orchestrator.answer(id, "Which country was that?").await.unwrap();

        assert!(chat.prompts()[1].contains("Human: Capital of France?\nAI: Paris."));
        assert_eq!(sessions.transcript(id).len(), 2);
    }

    #[tokio::test]
    async fn test_chain_mode_selected_by_config() {
        let chat = ScriptedChat::new(vec!["Plain answer."]);
        let runtime = runtime_with_docs(&["context"]).await;
        let sessions = sessions();
        let config = AgentConfig {
            mode: AnswerMode::RetrievalChain,
            ..AgentConfig::default()
        };
        let orchestrator =
            AnsweringOrchestrator::from_config(&config, chat, runtime, sessions.clone());
        let id = sessions.resolve(None).id;

        assert_eq!(orchestrator.answer(id, "q").await.unwrap(), "Plain answer.");
        assert_eq!(sessions.transcript(id).len(), 1);
    }
}
