//! Single-pass conversational retrieval: condense, retrieve, answer

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{ChatMessage, ChatModel};
use crate::retrieval::VectorStoreGateway;
use crate::types::Transcript;

use super::prompt::{condense_question_prompt, grounded_answer_prompt};

/// Answers from retrieved passages without a tool loop
pub struct RetrievalChain {
    chat: Arc<dyn ChatModel>,
    gateway: Arc<VectorStoreGateway>,
    top_k: usize,
}

impl RetrievalChain {
    pub fn new(chat: Arc<dyn ChatModel>, gateway: Arc<VectorStoreGateway>, top_k: usize) -> Self {
        Self {
            chat,
            gateway,
            top_k,
        }
    }

    /// Follow-ups are first rewritten into a standalone question using the history
    pub async fn run(&self, history: &Transcript, question: &str) -> Result<String> {
        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            let prompt = condense_question_prompt(&history.render(), question);
            let rewritten = self.chat.complete(&[ChatMessage::user(prompt)], &[]).await?;
            tracing::debug!("Condensed question: {}", rewritten.trim());
            rewritten.trim().to_string()
        };

        let chunks = self.gateway.query(&standalone, self.top_k).await?;
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = grounded_answer_prompt(&context, &standalone);
        let answer = self.chat.complete(&[ChatMessage::user(prompt)], &[]).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{runtime_with_docs, ScriptedChat};
    use crate::types::Exchange;

    #[tokio::test]
    async fn test_first_question_skips_condense() {
        let chat = ScriptedChat::new(vec!["They sleep a lot."]);
        let runtime = runtime_with_docs(&["Cats sleep sixteen hours a day."]).await;
        let chain = RetrievalChain::new(chat.clone(), runtime.gateway().clone(), 4);

        let answer = chain.run(&Transcript::new(), "Do cats sleep?").await.unwrap();
        assert_eq!(answer, "They sleep a lot.");

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Cats sleep sixteen hours a day."));
        assert!(prompts[0].contains("Question: Do cats sleep?"));
    }

    #[tokio::test]
    async fn test_follow_up_is_condensed() {
        let chat = ScriptedChat::new(vec!["How long do cats sleep?", "About sixteen hours."]);
        let runtime = runtime_with_docs(&["Cats sleep sixteen hours a day."]).await;
        let chain = RetrievalChain::new(chat.clone(), runtime.gateway().clone(), 4);

        let mut history = Transcript::new();
        history.push(Exchange::new("Tell me about cats", "Cats are mammals."));

        let answer = chain.run(&history, "how long do they sleep?").await.unwrap();
        assert_eq!(answer, "About sixteen hours.");

        let prompts = chat.prompts();
        assert!(prompts[0].contains("Human: Tell me about cats\nAI: Cats are mammals."));
        assert!(prompts[1].contains("Question: How long do cats sleep?"));
    }
}
