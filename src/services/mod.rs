/// Automation driver running complete drafts unattended.
pub mod automation;
/// Schedule and manual-run operations behind the automation routes.
pub mod automation_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Daily scheduler for automation runs.
pub mod scheduler;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Draft session commands.
pub mod workflow_service;
