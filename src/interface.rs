//! Extended structs and representations for Webauthn operations. These types
//! are designed to allow persistence and should not change.

use std::fmt;

use base64urlsafedata::Base64UrlSafeData;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{COSEAlgorithm, COSEKey};

/// The 16 byte identifier of an authenticator model, assigned by its
/// vendor. All-zero for authenticators that decline to identify themselves
/// (for example in FIDO U2F compatibility data). Comparison is bytewise;
/// display is the canonical lowercase UUID form.
/// <https://www.w3.org/TR/webauthn-3/#aaguid>
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aaguid([u8; 16]);

impl Aaguid {
    /// The raw 16 bytes of the identifier.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Aaguid {
    fn from(b: [u8; 16]) -> Self {
        Aaguid(b)
    }
}

impl AsRef<[u8]> for Aaguid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).as_hyphenated())
    }
}

// Keeps Debug output of parsed credentials readable - a 16 element byte
// array tells a human nothing.
impl fmt::Debug for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The flags byte of authenticator data, providing information such as user
/// presence and the sync state of a credential. The parser exposes whatever
/// bits the authenticator set; which combinations are acceptable is policy
/// for the caller.
/// <https://www.w3.org/TR/webauthn-3/#authdata-flags>
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags(pub u8);

impl Flags {
    /// The authenticator performed a successful user presence test.
    pub fn user_present(&self) -> bool {
        self.0 & (1 << 0) != 0
    }

    /// The authenticator additionally authorised the operation, for example
    /// by PIN entry or a biometric check.
    pub fn user_verified(&self) -> bool {
        self.0 & (1 << 2) != 0
    }

    /// The credential may be backed up to external storage (a synced
    /// passkey rather than a single-device credential).
    pub fn backup_eligible(&self) -> bool {
        self.0 & (1 << 3) != 0
    }

    /// The credential is currently backed up.
    pub fn backed_up(&self) -> bool {
        self.0 & (1 << 4) != 0
    }

    /// Attested credential data follows the counter.
    pub fn attested_credential_data(&self) -> bool {
        self.0 & (1 << 6) != 0
    }

    /// Extension data trails the structure.
    pub fn extensions(&self) -> bool {
        self.0 & (1 << 7) != 0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (1 << 0, "UP"),
            (1 << 1, "RFU1"),
            (1 << 2, "UV"),
            (1 << 3, "BE"),
            (1 << 4, "BS"),
            (1 << 5, "RFU2"),
            (1 << 6, "AT"),
            (1 << 7, "ED"),
        ];
        write!(f, "Flags(")?;
        let mut first = true;
        for (bit, name) in names {
            if self.0 & bit != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A credential ID generated by an authenticator.
pub type CredentialID = Base64UrlSafeData;

/// The attested credential data block of authenticator data, present when
/// the AT flag is set. Carries the newly created credential and its
/// authenticator model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedCredentialData {
    /// The guid of the authenticator. May indicate manufacturer.
    pub aaguid: Aaguid,
    /// The credential ID.
    pub credential_id: CredentialID,
    /// The credential's public key.
    pub credential_pk: COSEKey,
}

impl AttestedCredentialData {
    /// The algorithm the credential signs with.
    pub fn algorithm(&self) -> COSEAlgorithm {
        self.credential_pk.type_
    }
}

/// The decoded view of the packed authenticator data structure produced
/// during registration.
/// <https://www.w3.org/TR/webauthn-3/#authenticator-data>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the relying party id the operation was bound to.
    pub rp_id_hash: [u8; 32],
    /// The authenticator flags byte.
    pub flags: Flags,
    /// Signature counter. Zero for authenticators without counter support.
    pub counter: u32,
    /// The attested credential, when the AT flag is set.
    pub acd: Option<AttestedCredentialData>,
    /// Raw CBOR extension data, when the ED flag is set.
    pub extensions: Option<Base64UrlSafeData>,
}

/// The subset of authenticator data returned from assertion verification:
/// enough to detect cloned credentials via the counter and to gate
/// user-verification policies on the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// The authenticator flags byte.
    pub flags: Flags,
    /// Signature counter at the time of the assertion.
    pub counter: u32,
}

/// A user's registered credential in the form an application persists: the
/// credential id, its public key, and the last seen signature counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The ID of this credential.
    pub cred_id: CredentialID,
    /// The public key of this credential.
    pub cred: COSEKey,
    /// The counter for this credential.
    pub counter: u32,
}

impl Credential {
    /// Build the persistable credential from freshly attested data.
    pub fn new(acd: &AttestedCredentialData, counter: u32) -> Self {
        Credential {
            cred_id: acd.credential_id.clone(),
            cred: acd.credential_pk.clone(),
            counter,
        }
    }
}
