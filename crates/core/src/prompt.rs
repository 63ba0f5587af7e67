use crate::{ConversationTurn, RetrievedChunk};
use serde::{Deserialize, Serialize};

pub const SYSTEM_INSTRUCTION: &str =
    "You are a financial analyst AI that answers questions based on given documents.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Chunk texts in rank order, separated by a blank line.
pub fn build_context(sources: &[RetrievedChunk]) -> String {
    sources
        .iter()
        .map(|source| source.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(
    question: &str,
    context: &str,
    history: &[ConversationTurn],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::new(Role::System, SYSTEM_INSTRUCTION));

    for turn in history {
        messages.push(ChatMessage::new(Role::User, turn.user.as_str()));
        messages.push(ChatMessage::new(Role::Assistant, turn.assistant.as_str()));
    }

    messages.push(ChatMessage::new(
        Role::User,
        format!("Context:\n{context}\n\nQuestion: {question}"),
    ));
    messages
}
