//! Tools the reasoning loop may call

use std::sync::Arc;

use crate::error::Result;
use crate::providers::WebSearchProvider;
use crate::retrieval::VectorStoreGateway;

/// Capabilities offered to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Similarity search over ingested documents
    Retriever,
    /// Organic web results from SerpAPI
    WebSearch,
}

/// A named tool as presented in the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
}

impl Tool {
    pub fn retriever() -> Self {
        Self {
            name: "Retriever".to_string(),
            description: "Use this tool to retrieve documents from the vector store. \
                          Input should be a search query."
                .to_string(),
            kind: ToolKind::Retriever,
        }
    }

    pub fn web_search() -> Self {
        Self {
            name: "WebSearch".to_string(),
            description: "Search the web. Use this only when the retrieved documents are \
                          insufficient. Input should be a precise search query."
                .to_string(),
            kind: ToolKind::WebSearch,
        }
    }
}

/// Fixed, ordered set of tools
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<Tool>,
}

impl ToolSet {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    /// Retriever first, then web search when available
    pub fn standard(with_web_search: bool) -> Self {
        let mut tools = vec![Tool::retriever()];
        if with_web_search {
            tools.push(Tool::web_search());
        }
        Self::new(tools)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// `name: description` lines for the prompt
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Executes tool calls against the backing services
pub struct ToolRuntime {
    gateway: Arc<VectorStoreGateway>,
    search: Option<Arc<dyn WebSearchProvider>>,
    retriever_top_k: usize,
    search_results: usize,
}

impl ToolRuntime {
    pub fn new(
        gateway: Arc<VectorStoreGateway>,
        search: Option<Arc<dyn WebSearchProvider>>,
        retriever_top_k: usize,
        search_results: usize,
    ) -> Self {
        Self {
            gateway,
            search,
            retriever_top_k,
            search_results,
        }
    }

    /// Tools this runtime can serve
    pub fn tool_set(&self) -> ToolSet {
        ToolSet::standard(self.search.is_some())
    }

    pub fn gateway(&self) -> &Arc<VectorStoreGateway> {
        &self.gateway
    }

    /// Run one tool and render its output as an observation
    pub async fn invoke(&self, kind: ToolKind, input: &str) -> Result<String> {
        match kind {
            ToolKind::Retriever => self.retrieve(input).await,
            ToolKind::WebSearch => self.web_search(input).await,
        }
    }

    /// Retrieved chunks as numbered, cited passages
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let chunks = self.gateway.query(query, self.retriever_top_k).await?;
        if chunks.is_empty() {
            return Ok("No relevant documents found.".to_string());
        }

        Ok(chunks
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}\n{}", i + 1, c.source.format_citation(), c.content))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    async fn web_search(&self, query: &str) -> Result<String> {
        let Some(search) = &self.search else {
            return Ok("Web search is not available.".to_string());
        };

        let hits = search.search(query, self.search_results).await?;
        if hits.is_empty() {
            return Ok("No results found.".to_string());
        }

        Ok(hits
            .iter()
            .map(|h| format!("{}\n{}\n{}", h.title, h.link, h.snippet))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
