/// Transactional protocol workflow engine
pub mod workflow_engine;

/// Token-facing protocol service
pub mod protocol_service;

/// Periodic housekeeping jobs and their scheduler
pub mod housekeeping;
