pub mod automation;
/// Health check payload.
pub mod health;
/// Server-Sent Events payloads.
pub mod sse;
pub mod validation;
pub mod workflow;
