//! Webauthn relying-party verification for Rust server applications.
//!
//! Webauthn is a standard allowing communication between servers, browsers
//! and authenticators to allow strong, passwordless, cryptographic
//! authentication to be performed. This library implements the server side
//! verification core: it validates credential creation attestations and
//! authentication assertions from opaque, untrusted inputs.
//!
//! It is deliberately not a framework. It hosts no endpoints, mints no
//! challenges and stores no credentials - the application supplies the
//! challenge and the stored public key, and receives parsed, verified
//! values (or the first error) back. Every operation is pure and
//! synchronous.
//!
//! To verify registrations and authentications, construct a [Webauthn]
//! for your relying party and use [Webauthn::verify_attestation] and
//! [Webauthn::verify_assertion]. To additionally validate authenticator
//! provenance, feed the output of [Webauthn::verify_attestation_object]
//! to an [attestation::AttestationStatementVerifier] such as
//! [attestation::PackedAttestationVerifier].

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]

#[macro_use]
extern crate tracing;

mod cbor;
mod constants;
mod core;
mod internals;

pub mod attestation;
pub mod crypto;
pub mod error;
pub mod interface;

/// Data model bindings for persistence and protocol handling.
pub mod proto {
    pub use crate::interface::*;
    pub use base64urlsafedata::Base64UrlSafeData;
}

pub use crate::constants::{CLIENT_DATA_TYPE_CREATE, CLIENT_DATA_TYPE_GET};
pub use crate::core::Webauthn;
pub use crate::error::{WebauthnError, WebauthnResult};
pub use crate::internals::{parse_authenticator_data, CollectedClientData};
