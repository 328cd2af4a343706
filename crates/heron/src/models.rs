//! These models represent the conversation as the client supplies it.
//!
//! Two related formats meet in this crate:
//! - conversation messages, sent from the interface: each turn may freely
//!   interleave text and tool calls, with results attached to the call that
//!   produced them
//! - prompt messages, sent to the model backend: a strict shape where tool
//!   results live in their own `tool` turn (see the `prompt` module)
//!
//! Incoming data is deserialized straight into these structs; the prompt
//! converter owns all validation of roles and part placement.
pub mod content;
pub mod message;
pub mod tool;
