// Library exports for the proxywarden process supervisor

pub mod config;
pub mod error;
pub mod logging;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use logging::{LogSink, MemorySink, SinkLevel, TracingSink};
pub use supervisor::{ProxySupervisor, SupervisorState};
