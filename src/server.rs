use anyhow::Result;
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::model::{ChatFragment, Message, ModelDescriptor};

pub type ServerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

/// Decoded fragments of one streaming chat response, in arrival order.
pub type FragmentStream<'a> = Pin<Box<dyn Stream<Item = Result<ChatFragment>> + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStreamRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

/// The three calls the front end makes against a language-model server.
pub trait ModelServer {
    fn host(&self) -> &str;

    /// Lightweight status probe.
    fn ping<'a>(&'a self) -> ServerFuture<'a, ()>;

    /// Installed models, in the order the server reports them.
    fn list_models<'a>(&'a self) -> ServerFuture<'a, Vec<ModelDescriptor>>;

    fn chat_stream<'a>(&'a self, request: ChatStreamRequest) -> ServerFuture<'a, FragmentStream<'a>>;
}
