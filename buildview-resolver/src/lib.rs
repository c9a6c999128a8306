//! buildview Resolver - Repository Metadata Resolution
//!
//! Assembles the data behind a repository page from the cache and durable
//! stores: build status, the build database and its branch history, build
//! duration, artifact signature, recent logs, and the branch README.
//!
//! # Example
//!
//! ```ignore
//! let resolver = MetadataResolver::new(cache, durable, ResolverConfig::from_env()?);
//! match resolver.resolve_view(&repo, None).await? {
//!     ViewOutcome::Ready(view) => render(view),
//!     outcome @ ViewOutcome::NoBuild { .. } => show(outcome.user_message()),
//! }
//! ```

pub mod error;
pub mod resolver;
pub mod telemetry;
pub mod view;

pub use error::{ResolverError, ResolverResult, CORRUPT_BUILD_MESSAGE};
pub use resolver::{DatabaseLookup, MetadataResolver};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryError};
pub use view::{RepositoryView, ViewOutcome, NO_BUILD_MESSAGE};
