//! Chat-completions-style streaming adapter.
//!
//! Speaks the `choices[0].delta` SSE dialect (deltas keyed off a choice
//! array, an explicit `[DONE]` terminator, last-seen `finish_reason` and
//! `usage`) and normalizes it into canonical stream events.

mod provider;
mod stream_handler;
mod types;

pub use provider::OpenAiProvider;
pub use stream_handler::{finish_event, process_chunk, StreamState};
pub use types::ChatCompletionChunk;
