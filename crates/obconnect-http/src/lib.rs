//! obconnect HTTP - Signed request construction and the external API gateway
//!
//! Every outbound call to a bank is wrapped in the financial-grade signing
//! convention: the request body is serialized to canonical JSON, signed into
//! a JWS, and the detached form travels in the `x-jws-signature` header
//! while the body travels as-is. The gateway sends the assembled request,
//! captures the bank's correlation identifier and classifies failures; it
//! never retries.

pub mod gateway;
pub mod request;

pub use gateway::*;
pub use request::*;
