//! obconnect Types - Canonical domain types for the Open Banking connector
//!
//! This crate contains all foundational types for obconnect with zero
//! dependencies on other obconnect crates. It defines:
//!
//! - Identity types (ConsentId, RegistrationId, BankProfileId)
//! - The consent lifecycle state machine and its transition rules
//! - Registration records and registration scope
//! - The software statement presented during dynamic client registration
//! - The connector-wide error taxonomy
//!
//! # Architectural Invariants
//!
//! 1. A consent's external API consent id is set exactly once, at the
//!    transition out of `Created`, and is immutable afterwards
//! 2. A registration's client credential always belongs to the registration
//!    group implied by its bank profile - cross-group reuse is a programming
//!    error, never a runtime recoverable condition
//! 3. Terminal consent states accept local reads only

pub mod consent;
pub mod error;
pub mod identity;
pub mod registration;
pub mod statement;

pub use consent::*;
pub use error::*;
pub use identity::*;
pub use registration::*;
pub use statement::*;
