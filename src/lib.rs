//! Mailflow — client-side email automation engine.
//!
//! Observes mailbox gestures, reports them (batched) to a remote
//! pattern-detection service over a duplex channel, and executes
//! user-authored automation hooks against incoming and closing emails.

pub mod applier;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod mailbox;
pub mod model;
pub mod notify;
pub mod store;
