//! Outlook Profiler Library
//!
//! Exports Outlook mail profiles from the Windows Registry to `.reg` files,
//! converts them between Outlook 2010, 2013 and 2016 layouts and profile names, and
//! imports them again on another machine.
//!
//! # Architecture
//!
//! - **Run Layer**: `Profiler` - Carries out one export or import request
//! - **Domain Layer**: `office`, `resolver`, `rewrite` - Profile locations per Office
//!   version, default-profile resolution and case-insensitive path rewriting
//! - **Persistence Layer**: `store` and `regfile` - Registry access behind the
//!   `ConfigStore` trait and the `.reg` file codec
//!
//! # Example
//!
//! ```no_run
//! use outlook_profiler::{MemoryStore, OperationRequest, Profiler, RunLog};
//!
//! let request = OperationRequest::from_args(["Export2013=C:\\temp\\outlook.reg", "TargetProfile=Work"]);
//! let log = RunLog::console();
//! let mut profiler = Profiler::new(MemoryStore::new(), &log);
//! profiler.run(&request);
//! ```

pub mod office;
pub mod options;
pub mod output;
pub mod profiler;
pub mod regfile;
pub mod resolver;
pub mod rewrite;
pub mod store;
pub mod tree;

// Re-export commonly used types
pub use office::{OfficeVersion, ProfileLocation, TargetVersion};
pub use options::{OperationKind, OperationRequest};
pub use output::RunLog;
pub use profiler::{DefaultProfileError, Profiler, RunStatus, StepOutcome};
pub use resolver::{ResolvedProfile, ResolvedSource};
pub use rewrite::{ProfileConversion, RewriteError, RewriteRule, replace_caseless};
#[cfg(windows)]
pub use store::WindowsRegistry;
pub use store::{ConfigStore, MemoryStore, StoreError, WriteOptions};
pub use tree::{KeySection, RegTree, RegValue, ValueEntry};
