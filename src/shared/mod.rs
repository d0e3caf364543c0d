// Shared kernel: error types and cross-cutting utilities

pub mod errors; // Shared error types
pub mod utils; // Logging and input validation

// Re-exports for convenience
pub use errors::{AppError, AppResult};
