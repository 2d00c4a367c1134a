//! obconnect Lifecycle - Registration and consent management
//!
//! The lifecycle layer owns the two stateful pieces of the connector:
//!
//! - **RegistrationManager**: one dynamic client registration per
//!   registration group, with at most one in-flight registration per group
//! - **ConsentLifecycleManager**: the consent state machine from creation
//!   through authorization, use and termination
//!
//! ```text
//! caller -> ConsentLifecycleManager -> RegistrationManager -> SignedRequestBuilder -> ExternalApiGateway
//!                 |                          |
//!                 v                          v
//!           consent store             registration store
//! ```
//!
//! Every lifecycle transition is applied under a per-consent lock so that
//! concurrent operations on one consent cannot interleave; operations on
//! distinct consents and registrations run fully in parallel.

pub mod config;
pub mod consent;
pub mod registration;
pub mod wire;

pub use config::*;
pub use consent::*;
pub use registration::*;
