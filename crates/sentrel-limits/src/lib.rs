#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Rate and concurrency primitives (C10): a per-host token-bucket limiter
//! registry, a per-instance bounded concurrency registry, and the
//! cooperative cancellation token threaded through every worker
//! suspension point.

pub mod cancel;
pub mod concurrency;
pub mod error;
pub mod limiter;
pub mod retry;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use concurrency::ConcurrencyRegistry;
pub use error::{ErrorClass, LimitsError, LimitsResult};
pub use limiter::{LimiterRegistry, RateLimitConfig, TokenBucket};
pub use retry::{retry_with_backoff, BackoffConfig, Retryable};
