//! obconnect Profiles - Bank profile registry
//!
//! Every supported bank environment is described by a `BankProfile` looked up
//! from an immutable registry built once at startup. The only place
//! bank-specific behavioral divergence may leak into the request pipeline is
//! the per-bank-group `RegistrationGroupResolver`; every other component is
//! bank-agnostic.
//!
//! Registration groups partition bank environments requiring independent
//! dynamic client registrations. For some bank groups every variant collapses
//! into Sandbox/Production; for others each variant is its own group.

pub mod groups;
pub mod profile;
pub mod registry;

pub use groups::*;
pub use profile::*;
pub use registry::*;
