// Prompt template loading (YAML) and rendering
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::{RagError, Result};

/// Used when no template file is configured
pub const DEFAULT_TEMPLATE: &str = "Based on the following context items, please answer the query.\n\
Give yourself room to think by extracting relevant passages from the context before answering the query.\n\
Don't return the thinking, only return the answer.\n\
Make sure your answers are as explanatory as possible.\n\
\n\
Context items:\n\
{context}\n\
\n\
User query: {query}\n\
Answer:";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Query,
    Context,
}

/// Parsed template; placeholders are validated once at parse time
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct TemplateFile {
    prompt: PromptSection,
}

#[derive(Deserialize)]
struct PromptSection {
    template: String,
}

impl PromptTemplate {
    /// Parse a template string.
    ///
    /// `{query}` and `{context}` are placeholders; `{{` and `}}` are literal
    /// braces. Anything else in braces is an error.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(RagError::Template(
                                    "unclosed '{' in template".to_string(),
                                ))
                            }
                        }
                    }
                    let segment = match name.trim() {
                        "query" => Segment::Query,
                        "context" => Segment::Context,
                        other => {
                            return Err(RagError::Template(format!(
                                "unknown placeholder '{{{}}}'; expected {{query}} or {{context}}",
                                other
                            )))
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => {
                    return Err(RagError::Template("unmatched '}' in template".to_string()));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Load `prompt.template` from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RagError::Template(format!(
                "template file does not exist: '{}'",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let file: TemplateFile = serde_yaml::from_str(&contents).map_err(|e| {
            RagError::Template(format!(
                "invalid template structure, expected 'prompt' and 'template' keys: {}",
                e
            ))
        })?;

        let template = Self::parse(&file.prompt.template)?;
        info!(path = %path.display(), "prompt template loaded");
        Ok(template)
    }

    /// Load from `path` when given, otherwise the built-in template
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Self::parse(DEFAULT_TEMPLATE),
        }
    }

    pub fn render(&self, query: &str, context: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Query => out.push_str(query),
                Segment::Context => out.push_str(context),
            }
        }
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).expect("built-in template is valid")
    }
}
