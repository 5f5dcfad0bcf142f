//! Messages-style streaming adapter.
//!
//! Speaks the `message_start` / `content_block_*` / `message_delta` SSE
//! dialect and normalizes it into canonical stream events.

mod provider;
mod stream_handler;
mod types;

pub use provider::AnthropicProvider;
pub use stream_handler::{process_sse_event, StreamState};
pub use types::AnthropicSseEvent;
