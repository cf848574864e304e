//! Core types: resource registry, access guard, prompt schema, paths

pub mod error;
pub mod guard;
pub mod paths;
pub mod prompt;
pub mod range;
pub mod registry;
pub mod tracing;

pub use error::{CoreError, CoreResult};
pub use guard::AccessGuard;
pub use paths::{APP_DIR_NAME, AppPaths};
pub use prompt::{PROMPT_COLUMN_SPAN, PROMPT_HEADERS, PromptRecord};
pub use range::SheetRange;
pub use registry::{ResourceEntry, ResourceKind, ResourceRegistry};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
