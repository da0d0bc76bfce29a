//! Prompt templates with `{query}` and `{context}` placeholders.

pub mod template;

pub use template::PromptTemplate;
