pub mod model;
pub mod client;

pub use client::{ChatCompletion, CompletionClient};
pub use model::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Message, MessageRole, Usage,
};
