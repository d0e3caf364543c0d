pub mod app_error;
pub mod source_error;

pub use app_error::{AppError, AppResult};
pub use source_error::{classify, ClassifiedError, ErrorKind, SourceError};
