//! # lope-core
//!
//! Foundation types for the lope agent: the Turn/Part conversation model,
//! branded IDs, token usage and finish reasons, the canonical stream event
//! set produced by provider adapters, and the structural parameter schema
//! with its recursive validator.
//!
//! This crate is pure data: no I/O, no async.

pub mod events;
pub mod ids;
pub mod message;
pub mod part;
pub mod schema;
pub mod session;
pub mod turn;
pub mod usage;
