//! Credential-injecting reverse proxy for the backend token API.
//!
//! Two pieces: a declarative route-classification table deciding which
//! credential an outbound request may carry, and a forwarder that applies
//! it while relaying requests and responses.

pub mod classify;
pub mod forward;

pub use classify::{classify, RoutePolicy};
pub use forward::{CustodyAction, ForwardOutcome, ForwardRequest, Forwarder};
