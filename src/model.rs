use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// The exchange sent for every check: the system prompt, then the user's text.
pub fn correction_exchange(system_prompt: &str, user_text: &str) -> Vec<Message> {
    vec![Message::system(system_prompt), Message::user(user_text)]
}

/// One decoded chunk of a streaming chat response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatFragment {
    pub content: String,
    pub done: bool,
}

impl ChatFragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }
}

/// One installed model as reported by the server. Different server versions
/// name the field `model` or `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ModelDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            model: None,
            name: Some(name.into()),
        }
    }

    /// The entry's model name, trying `model` then `name`; blank values are
    /// treated as missing.
    pub fn model_name(&self) -> Option<&str> {
        [self.model.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}
