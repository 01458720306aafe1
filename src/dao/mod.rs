/// Persistence of the automation schedule between sessions.
pub mod schedule_store;
/// Storage error types shared by every backend.
pub mod storage;
