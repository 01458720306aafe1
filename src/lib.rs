//! Library crate for team-toss-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence backends.
pub mod dao;
/// Request, response and SSE payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes and the automation driver.
pub mod services;
/// Draft session model and shared application state.
pub mod state;
