//! Possible errors that may occur during Webauthn operations.

use thiserror::Error;

/// Things that can go wrong when we attempt to verify attestations and
/// assertions. The caller should treat *any* of these as an authentication
/// failure - the distinctions exist for diagnostics, not for policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebauthnError {
    /// A structural violation of the CBOR subset used by Webauthn was
    /// encountered at the contained byte offset. This includes all
    /// indefinite-length encodings, which are always rejected.
    #[error("malformed CBOR at offset {0}")]
    MalformedCbor(usize),

    /// The top level attestation object was missing a required field, had a
    /// field of the wrong type, or carried trailing garbage.
    #[error("malformed attestation object")]
    MalformedAttestation,

    /// The packed authenticator data structure was shorter or longer than
    /// its flags and length prefixes claim.
    #[error("malformed authenticator data")]
    MalformedAuthData,

    /// The COSE_Key map had an unknown key type or curve, was missing a
    /// required label, carried an oversize coordinate, or declared an
    /// algorithm inconsistent with its key type.
    #[error("malformed COSE key")]
    MalformedCOSEKey,

    /// The client data JSON could not be parsed, or its challenge was not
    /// valid base64url.
    #[error("malformed client data")]
    MalformedClientData,

    /// The client data ceremony type was not the one expected for this
    /// operation.
    #[error("client data type mismatch")]
    ClientDataTypeMismatch,

    /// The client data origin did not match the configured relying party
    /// origin.
    #[error("origin mismatch")]
    OriginMismatch,

    /// The client data challenge did not match the challenge issued for
    /// this operation.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The rpIdHash in the authenticator data was not the SHA-256 of the
    /// configured relying party id.
    #[error("authenticator data issued for a different relying party")]
    RelyingPartyMismatch,

    /// The COSE algorithm identifier is not one this library supports.
    /// There is deliberately no downgrade path for unknown algorithms.
    #[error("unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i64),

    /// The declared algorithm is inconsistent with the shape of the
    /// supplied public key.
    #[error("algorithm inconsistent with public key type")]
    AlgorithmKeyMismatch,

    /// Cryptographic signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// No attestation roots are known for the authenticator's AAGUID.
    #[error("no attestation roots known for this AAGUID")]
    UnknownAAGUID,

    /// The attestation certificate chain could not be linked to a trusted
    /// root, or self attestation was presented but not permitted.
    #[error("untrusted attestation chain")]
    UntrustedChain,

    /// An attestation certificate was unparseable, expired, or failed the
    /// packed attestation certificate requirements.
    #[error("invalid attestation certificate")]
    InvalidCertificate,
}

/// Alias for `Result<T, WebauthnError>`.
pub type WebauthnResult<T> = Result<T, WebauthnError>;
