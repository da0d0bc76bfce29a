use serde::{Deserialize, Serialize};

/// Text extracted from one document page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub page_text: String,
}

/// One embedded chunk; `id` is the page number the chunk was cut from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEmbedding {
    pub id: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl PageText {
    pub fn new(page_number: u32, page_text: impl Into<String>) -> Self {
        Self {
            page_number,
            page_text: page_text.into(),
        }
    }
}

impl ChunkEmbedding {
    pub fn new(id: u32, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id,
            text: text.into(),
            embedding,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
