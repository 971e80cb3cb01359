//! Host Try
//!
//! Retries a caller-supplied check against an ordered set of redundant hosts
//! offering an equivalent service (NTP servers, mirrors, replicas) until one
//! host succeeds, the attempt budget is spent, or the caller cancels.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |    TryConfig     | --> |     HostTry      |  (scheme executor)
//! +------------------+     +------------------+
//!                             |            |
//!                             v            v
//!                  +---------------+  +--------------------+
//!                  | BackoffPolicy |  | interruptible_wait |
//!                  +---------------+  +--------------------+
//!                             |
//!                             v
//!                  +------------------+
//!                  |    HostCheck     |  (caller-supplied)
//!                  +------------------+
//!                             |
//!                             v
//!                  +------------------+
//!                  |    TryOutcome    |  (success host, failures)
//!                  +------------------+
//! ```
//!
//! # Schemes
//!
//! - [`Scheme::Direct`] - exhaust the attempt limit on each host in turn
//! - [`Scheme::Staggered`] - one try per host per round (default)
//! - [`Scheme::Until`] - cycle until success, forced by an attempt limit of 0
//!
//! # Example
//!
//! ```no_run
//! use host_try::{check_fn, HostTry, Scheme, TryConfig};
//!
//! # async fn demo() -> Result<(), host_try::HostTryError> {
//! let config = TryConfig::new(["ntp1.example.org", "ntp2.example.org"])?
//!     .with_scheme(Scheme::Direct)
//!     .with_attempt_limit(3);
//!
//! let check = check_fn(|host: String| async move {
//!     tokio::net::TcpStream::connect((host.as_str(), 123))
//!         .await
//!         .map(|_| ())
//! });
//!
//! let outcome = HostTry::new(config).run(&check).await;
//! if let Some(host) = outcome.success_host() {
//!     println!("using {host}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod errors;
pub mod runner;
pub mod wait;

pub use backoff::{BackoffComponent, BackoffPolicy, ParseComponentError};
pub use config::{CancelMode, Scheme, TryConfig, TryOption};
pub use errors::HostTryError;
pub use runner::{check_fn, do_try, FnCheck, HostAttempt, HostCheck, HostTry, TryOutcome};
pub use wait::{interruptible_wait, WaitOutcome};

pub use tokio_util::sync::CancellationToken;
