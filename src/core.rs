//! The core verification entry points. The [Webauthn] struct binds a
//! relying party identity and exposes the attestation and assertion
//! verification operations.

use std::convert::TryFrom;

use crate::attestation::AttestationObject;
use crate::constants::{AUTH_DATA_FIXED_LEN, CLIENT_DATA_TYPE_CREATE, CLIENT_DATA_TYPE_GET};
use crate::crypto::{compute_sha256, COSEKey};
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::{Assertion, AuthenticatorData, Flags};
use crate::internals::{parse_authenticator_data, CollectedClientData};

/// A verifier bound to one relying party. Construction is cheap and the
/// value is immutable, so it can be shared freely across threads.
///
/// Verification is pure and synchronous: a call touches only its arguments,
/// performs no I/O, and returns either a fully parsed value or the first
/// error encountered. Challenge issuance and credential storage belong to
/// the application, not to this type.
#[derive(Debug, Clone)]
pub struct Webauthn {
    rp_id: String,
    rp_origin: String,
    rp_id_hash: [u8; 32],
}

impl Webauthn {
    /// Create a verifier for a relying party.
    ///
    /// `rp_id` is the DNS-style relying party identifier the credentials
    /// are scoped to, e.g. `login.example.com`. `rp_origin` is the full
    /// origin the user agent reports, e.g. `https://login.example.com:8443`,
    /// compared byte for byte - no scheme or port normalisation is applied.
    pub fn new(rp_id: &str, rp_origin: &str) -> Self {
        Webauthn {
            rp_id: rp_id.to_string(),
            rp_origin: rp_origin.to_string(),
            rp_id_hash: compute_sha256(rp_id.as_bytes()),
        }
    }

    /// The configured relying party id.
    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    /// The configured origin.
    pub fn rp_origin(&self) -> &str {
        &self.rp_origin
    }

    // Shared client data validation for both ceremonies. Order matters for
    // the error surface: parse, then type, then origin, then challenge.
    fn verify_client_data(
        &self,
        client_data_json: &[u8],
        expected_type: &str,
        challenge: &[u8],
    ) -> WebauthnResult<CollectedClientData> {
        let client_data = CollectedClientData::try_from(client_data_json)?;

        if client_data.type_ != expected_type {
            return Err(WebauthnError::ClientDataTypeMismatch);
        }

        if client_data.origin != self.rp_origin {
            debug!(
                got = %client_data.origin,
                expected = %self.rp_origin,
                "client data origin mismatch"
            );
            return Err(WebauthnError::OriginMismatch);
        }

        if !client_data.challenge_matches(challenge) {
            return Err(WebauthnError::ChallengeMismatch);
        }

        Ok(client_data)
    }

    /// Verify a credential creation response and return the parsed
    /// authenticator data, including the new credential's public key.
    ///
    /// `challenge` is the value the application issued for this creation.
    /// `client_data_json` must be the exact bytes received from the user
    /// agent - re-encoding them would corrupt the signed payload hash.
    /// `attestation_object` is the raw CBOR attestation object.
    ///
    /// The attestation *statement* is not verified here: its verification
    /// procedure is format specific and delegated to an
    /// [crate::attestation::AttestationStatementVerifier]. Applications
    /// that do not validate authenticator provenance can use the returned
    /// credential directly.
    pub fn verify_attestation(
        &self,
        challenge: &[u8],
        client_data_json: &[u8],
        attestation_object: &[u8],
    ) -> WebauthnResult<AuthenticatorData> {
        self.verify_client_data(client_data_json, CLIENT_DATA_TYPE_CREATE, challenge)?;

        let att_obj = AttestationObject::try_from(attestation_object)?;
        trace!(fmt = %att_obj.fmt, "attestation object parsed");

        parse_authenticator_data(&self.rp_id, &att_obj.auth_data)
    }

    /// Like [Webauthn::verify_attestation], but stop after validating the
    /// client data and splitting the attestation object, returning the
    /// unparsed statement. This exists to support external verification of
    /// format specific attestation statements and shouldn't be needed by
    /// most consumers.
    pub fn verify_attestation_object(
        &self,
        challenge: &[u8],
        client_data_json: &[u8],
        attestation_object: &[u8],
    ) -> WebauthnResult<AttestationObject> {
        self.verify_client_data(client_data_json, CLIENT_DATA_TYPE_CREATE, challenge)?;

        AttestationObject::try_from(attestation_object)
    }

    /// Verify an authentication assertion against a registered credential
    /// public key, returning the flags and signature counter for the
    /// caller's clone detection and verification policy.
    ///
    /// `cred` is the credential public key recorded at registration (the
    /// algorithm travels inside it). `auth_data` and `signature` are the
    /// raw values from the assertion response; `client_data_json` must be
    /// the exact bytes produced by the user agent.
    pub fn verify_assertion(
        &self,
        cred: &COSEKey,
        challenge: &[u8],
        client_data_json: &[u8],
        auth_data: &[u8],
        signature: &[u8],
    ) -> WebauthnResult<Assertion> {
        self.verify_client_data(client_data_json, CLIENT_DATA_TYPE_GET, challenge)?;

        // The signed payload is the raw authenticator data followed by the
        // client data hash. Verify it before interpreting any of the
        // authenticator data fields.
        let client_data_hash = compute_sha256(client_data_json);
        let mut verification_data = Vec::with_capacity(auth_data.len() + client_data_hash.len());
        verification_data.extend_from_slice(auth_data);
        verification_data.extend_from_slice(&client_data_hash);

        cred.verify_signature(signature, &verification_data)?;

        if auth_data.len() < AUTH_DATA_FIXED_LEN {
            return Err(WebauthnError::MalformedAuthData);
        }
        if self.rp_id_hash != auth_data[..32] {
            return Err(WebauthnError::RelyingPartyMismatch);
        }

        Ok(Assertion {
            flags: Flags(auth_data[32]),
            counter: u32::from_be_bytes([auth_data[33], auth_data[34], auth_data[35], auth_data[36]]),
        })
    }
}
