//! Definition resolution strategies.
//!
//! [`RemoteResolver`] asks the resolution server to answer one query under
//! the timeout/cancellation/retry contract. [`PrioritizedProvider`] chains
//! it with an injected fallback: remote first, fallback only on a miss.
//! Every internal failure is absorbed here and surfaces as "no result" so a
//! broken server can never break the editor's own navigation.

mod provider;
mod remote;
pub(crate) mod routes;

pub use provider::{
    ConnectionResolver, Definition, FallbackResolver, PrioritizedProvider,
};
pub use remote::{DEFAULT_TIMEOUT, MAX_ATTEMPTS, RemoteResolver, backoff_interval};
