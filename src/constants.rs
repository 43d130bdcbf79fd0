//! Literal values fixed by the Webauthn and COSE specifications.

use der::asn1::ObjectIdentifier;

/// The ceremony type emitted by the client for credential creation.
pub const CLIENT_DATA_TYPE_CREATE: &str = "webauthn.create";

/// The ceremony type emitted by the client for authentication.
pub const CLIENT_DATA_TYPE_GET: &str = "webauthn.get";

// The fixed prefix of authenticator data: rpIdHash (32) | flags (1) |
// counter (4).
pub(crate) const AUTH_DATA_FIXED_LEN: usize = 37;

// COSE_Key map labels, per RFC 8152 section 7 and section 13.
pub(crate) const COSE_LABEL_KTY: i64 = 1;
pub(crate) const COSE_LABEL_ALG: i64 = 3;
pub(crate) const COSE_LABEL_CRV_OR_N: i64 = -1;
pub(crate) const COSE_LABEL_X_OR_E: i64 = -2;
pub(crate) const COSE_LABEL_Y: i64 = -3;

// COSE key type registry values.
pub(crate) const COSE_KTY_OKP: i64 = 1;
pub(crate) const COSE_KTY_EC2: i64 = 2;
pub(crate) const COSE_KTY_RSA: i64 = 3;

// id-fido-gen-ce-aaguid - carries the AAGUID in packed attestation
// certificates issued for multi-model roots.
pub(crate) const ID_FIDO_GEN_CE_AAGUID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.45724.1.1.4");

pub(crate) const ID_CE_BASIC_CONSTRAINTS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.29.19");

// X.500 attribute types checked by the packed certificate requirements.
pub(crate) const ID_AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
pub(crate) const ID_AT_COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub(crate) const ID_AT_ORGANIZATION_NAME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.4.10");
pub(crate) const ID_AT_ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.4.11");

pub(crate) const PACKED_ATTEST_SUBJECT_OU: &str = "Authenticator Attestation";

// SubjectPublicKeyInfo algorithm identifiers.
pub(crate) const ID_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub(crate) const ID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub(crate) const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

// Named curve parameters for EC SubjectPublicKeyInfo.
pub(crate) const ID_SECP256R1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
pub(crate) const ID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
pub(crate) const ID_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

// Certificate signature algorithms accepted when walking an attestation
// chain.
pub(crate) const ID_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub(crate) const ID_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
pub(crate) const ID_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
pub(crate) const ID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
pub(crate) const ID_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
pub(crate) const ID_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
