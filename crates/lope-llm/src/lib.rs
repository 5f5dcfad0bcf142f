//! # lope-llm
//!
//! Streaming provider adapters. Each vendor's SSE wire format is normalized
//! into the canonical [`lope_core::events::StreamEvent`] set, so everything
//! above this crate is provider-agnostic.
//!
//! Two adapters ship: [`openai`] (chat-completions style) and [`anthropic`]
//! (messages style). Both share the [`sse`] line parser.

pub mod anthropic;
pub mod error_parsing;
pub mod openai;
pub mod provider;
pub mod sse;

pub use provider::{
    provider_for, ChatProvider, EventStream, ProviderConfig, ProviderError, ProviderKind,
    ProviderResult,
};
