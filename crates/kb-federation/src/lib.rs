//! Federation bridge for third-party identity (Google).
//!
//! A three-phase protocol: initiate (mint CSRF state, redirect to the
//! provider), exchange (code → external token → external profile), and
//! reconcile (check-exists → register-if-absent → backend token issuance),
//! terminating in the custody layer.

pub mod backend;
pub mod bridge;
pub mod google;
pub mod state;

pub use backend::{BackendClient, NewUser};
pub use bridge::{CallbackOutcome, FederationBridge, FederationError, FlowStart};
pub use google::GoogleClient;
pub use state::{validate_state, CsrfState};
