//! Prompt templates for the reasoning loop and the retrieval chain

use super::tools::ToolSet;

/// Default agent instructions
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are a research assistant that answers questions by reasoning and acting with the tools available to you.

Retriever: fetches passages from the uploaded documents. Always try it first. The passages may not cover the whole question.

WebSearch (when listed): searches the web. Use it only when the retrieved passages are not enough, with a short, specific query.

How to work:
1. Break the question into its key parts.
2. Retrieve first and read the passages.
3. If they answer the question, answer from them alone. If not, search the web.
4. Combine what you found into a concise, accurate answer and cite document passages as (filename, Page N).
5. Briefly explain how you reached the answer.

Prefer the documents over the web. Avoid repeated or unnecessary searches."#;

/// Marker the model emits before an observation; generation stops here
pub const OBSERVATION_STOP: &str = "\nObservation";

/// Build the ReAct prompt
pub fn react_prompt(
    instructions: &str,
    tools: &ToolSet,
    chat_history: &str,
    input: &str,
    scratchpad: &str,
) -> String {
    format!(
        r#"{instructions}

TOOLS:
------

You have access to the following tools:

{tools}

To use a tool, please use the following format:

```
Thought: Do I need to use a tool? Yes
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
```

When you have a response to say to the Human, or if you do not need to use a tool, you MUST use the format:

```
Thought: Do I need to use a tool? No
Final Answer: [your response here]
```

Begin!

Previous conversation history:
{chat_history}

New input: {input}
{scratchpad}"#,
        instructions = instructions,
        tools = tools.describe(),
        tool_names = tools.names().join(", "),
        chat_history = chat_history,
        input = input,
        scratchpad = scratchpad,
    )
}

/// Rewrite a follow-up into a standalone question
pub fn condense_question_prompt(chat_history: &str, question: &str) -> String {
    format!(
        r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:"#
    )
}

/// Answer from retrieved context only
pub fn grounded_answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#
    )
}
