//! The operation retried against each host.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

/// A connection or service check run against a single host.
///
/// The runner treats the check as opaque: `Ok(())` means the host is usable,
/// any error is a transient failure whose `Display` text is recorded as the
/// failure reason for that host.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use host_try::HostCheck;
///
/// struct TcpCheck;
///
/// #[async_trait]
/// impl HostCheck for TcpCheck {
///     type Error = std::io::Error;
///
///     async fn check(&self, host: &str) -> Result<(), Self::Error> {
///         tokio::net::TcpStream::connect(host).await.map(|_| ())
///     }
/// }
/// ```
#[async_trait]
pub trait HostCheck: Send + Sync {
    /// Failure reason reported by the check.
    type Error: fmt::Display + Send;

    /// Run the check against `host`.
    async fn check(&self, host: &str) -> Result<(), Self::Error>;
}

/// Adapter turning an async closure into a [`HostCheck`].
pub struct FnCheck<F>(F);

/// Wrap `f` so it can be passed to [`HostTry::run`](crate::HostTry::run).
///
/// The closure receives an owned copy of the host identifier.
pub fn check_fn<F, Fut, E>(f: F) -> FnCheck<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: fmt::Display + Send,
{
    FnCheck(f)
}

#[async_trait]
impl<F, Fut, E> HostCheck for FnCheck<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: fmt::Display + Send,
{
    type Error = E;

    async fn check(&self, host: &str) -> Result<(), E> {
        (self.0)(host.to_string()).await
    }
}
