pub mod config;
pub mod error;
pub mod interrupt;
pub mod pipe;
pub mod region;
pub mod ring;
mod signal;

// Re-export configuration types for convenience
pub use config::{ConfigError, PipeConfig, DEFAULT_CAPACITY};

// Re-export error types for convenience
pub use error::PipeError;
pub use region::{DestRegion, RegionFault, SourceRegion};

// Re-export pipe endpoints for convenience
pub use interrupt::Interrupt;
pub use pipe::{Pipe, Reader, Writer};
