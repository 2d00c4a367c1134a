//! obconnect Crypto - Signing layer for the Open Banking connector
//!
//! This crate provides:
//! - Signing key material and the in-process key store
//! - JOSE header construction for the financial-grade signing profile
//! - JWS signing (PS256) and detached-signature assembly
//!
//! # Security Invariant
//!
//! **Private key material never appears in logs or Debug output.**
//!
//! # Detached signatures
//!
//! Signed requests carry `<jose-header-b64>..<signature-b64>` in the
//! signature header; the payload segment is dropped because the payload
//! already travels as the request body. Verifiers reconstruct the middle
//! segment from the body before checking the signature.

pub mod jws;
pub mod keystore;

pub use jws::*;
pub use keystore::*;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
