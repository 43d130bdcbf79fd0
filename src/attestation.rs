//! Attestation object parsing and attestation statement verification.
//!
//! The attestation statement is format specific, so statement verification
//! is a pluggable capability: this module ships verifiers for the `packed`
//! and `none` formats and exposes the [AttestationStatementVerifier] trait
//! for external formats (`tpm`, `apple`, `android-key`, ...). Verifiers
//! never perform I/O - trust anchors arrive through a caller supplied
//! lookup keyed by AAGUID.

use std::convert::TryFrom;
use std::time::SystemTime;

use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode};
use x509_cert::certificate::Version;
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::cbor;
use crate::constants::*;
use crate::crypto::{compute_sha256, COSEAlgorithm, COSEKey};
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::{Aaguid, AuthenticatorData};
use crate::internals::parse_authenticator_data;

/// The raw fields of a CBOR attestation object, split but not yet
/// interpreted. The statement stays unparsed so that format specific
/// verifiers - in-tree or external - can consume it.
/// <https://www.w3.org/TR/webauthn-3/#attestation-object>
#[derive(Debug, Clone)]
pub struct AttestationObject {
    /// The attestation statement format identifier, e.g. "packed".
    pub fmt: String,
    /// The unparsed attStmt, a complete CBOR item.
    pub att_stmt: Vec<u8>,
    /// The unparsed authData bytes.
    pub auth_data: Vec<u8>,
}

impl TryFrom<&[u8]> for AttestationObject {
    type Error = WebauthnError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let mut decoder = cbor::Decoder::new(data);
        let mut fmt: Option<&str> = None;
        let mut att_stmt: Option<&[u8]> = None;
        let mut auth_data: Option<&[u8]> = None;

        decoder.map(|kv| {
            match kv.text()? {
                "fmt" => fmt = Some(kv.text()?),
                "attStmt" => att_stmt = Some(kv.raw()?),
                "authData" => auth_data = Some(kv.bytes()?),
                _ => kv.skip()?,
            }
            Ok(())
        })?;

        // The attestation object is the whole input; trailing bytes mean
        // the caller handed us something else.
        if !decoder.done() {
            return Err(WebauthnError::MalformedAttestation);
        }

        let fmt = fmt.ok_or(WebauthnError::MalformedAttestation)?;
        let att_stmt = att_stmt.ok_or(WebauthnError::MalformedAttestation)?;
        let auth_data = auth_data.ok_or(WebauthnError::MalformedAttestation)?;
        if auth_data.is_empty() {
            return Err(WebauthnError::MalformedAttestation);
        }

        Ok(AttestationObject {
            fmt: fmt.to_string(),
            att_stmt: att_stmt.to_vec(),
            auth_data: auth_data.to_vec(),
        })
    }
}

/// The registered attestation statement formats.
/// <https://www.w3.org/TR/webauthn-3/#sctn-defined-attestation-formats>
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttestationFormat {
    /// The "packed" format.
    Packed,
    /// The "tpm" format.
    Tpm,
    /// The "android-key" format.
    AndroidKey,
    /// The "android-safetynet" format.
    AndroidSafetyNet,
    /// The "fido-u2f" format.
    FIDOU2F,
    /// The "apple" anonymous format.
    AppleAnonymous,
    /// The "compound" format.
    Compound,
    /// The "none" format.
    None,
}

impl TryFrom<&str> for AttestationFormat {
    type Error = WebauthnError;

    fn try_from(a: &str) -> Result<AttestationFormat, Self::Error> {
        match a {
            "packed" => Ok(AttestationFormat::Packed),
            "tpm" => Ok(AttestationFormat::Tpm),
            "android-key" => Ok(AttestationFormat::AndroidKey),
            "android-safetynet" => Ok(AttestationFormat::AndroidSafetyNet),
            "fido-u2f" => Ok(AttestationFormat::FIDOU2F),
            "apple" => Ok(AttestationFormat::AppleAnonymous),
            "compound" => Ok(AttestationFormat::Compound),
            "none" => Ok(AttestationFormat::None),
            _ => Err(WebauthnError::MalformedAttestation),
        }
    }
}

/// How an attestation statement vouched for the credential.
#[derive(Debug)]
#[allow(non_camel_case_types)]
pub enum AttestationType {
    /// The statement chains to a trusted vendor root; carries the leaf
    /// (attestation) certificate.
    Basic(Box<Certificate>),
    /// Surrogate (self) attestation signed with the credential's own key.
    Self_,
    /// No attestation was provided.
    None,
}

/// The outcome of verifying an attestation statement.
#[derive(Debug)]
pub struct AttestationResult {
    /// The parsed and relying-party-bound authenticator data.
    pub auth_data: AuthenticatorData,
    /// The kind of trust the statement established.
    pub attestation: AttestationType,
}

/// A verifier for one attestation statement format.
///
/// Implementations receive the split attestation object together with the
/// relying party id and the exact clientDataJSON bytes, since the
/// statement signature covers `authData || SHA-256(clientDataJSON)`.
pub trait AttestationStatementVerifier {
    /// Verify the attestation statement of `att_obj`.
    fn verify(
        &self,
        att_obj: &AttestationObject,
        rp_id: &str,
        client_data_json: &[u8],
    ) -> WebauthnResult<AttestationResult>;
}

/// Trust anchor lookup for full attestation: given the authenticator's
/// AAGUID, return the vendor root certificates the chain may terminate at,
/// or `None` when the model is unknown. Typically backed by data from the
/// FIDO Metadata Service, which the caller fetches and validates out of
/// band.
pub type RootLookup = Box<dyn Fn(&Aaguid) -> Option<Vec<Certificate>> + Send + Sync>;

/// Verifier for the "packed" attestation statement format.
/// <https://www.w3.org/TR/webauthn-3/#sctn-packed-attestation>
pub struct PackedAttestationVerifier {
    get_roots: RootLookup,
    allow_self_attested: bool,
}

// The split attStmt map: { alg: int, sig: bytes, x5c?: [bytes, ...] }.
#[derive(Debug)]
struct PackedStatement<'a> {
    alg: i64,
    sig: &'a [u8],
    x5c: Option<Vec<&'a [u8]>>,
}

impl<'a> PackedStatement<'a> {
    fn parse(att_stmt: &'a [u8]) -> WebauthnResult<Self> {
        let mut decoder = cbor::Decoder::new(att_stmt);
        let mut alg: Option<i64> = None;
        let mut sig: Option<&[u8]> = None;
        let mut x5c: Option<Vec<&[u8]>> = None;

        decoder.map(|kv| {
            match kv.text()? {
                "alg" => alg = Some(kv.int()?),
                "sig" => sig = Some(kv.bytes()?),
                "x5c" => {
                    let certs = kv.array()?;
                    let mut chain = Vec::new();
                    for _ in 0..certs {
                        chain.push(kv.bytes()?);
                    }
                    x5c = Some(chain);
                }
                _ => kv.skip()?,
            }
            Ok(())
        })?;
        if !decoder.done() {
            return Err(WebauthnError::MalformedAttestation);
        }

        // An empty certificate array is not a chain.
        if matches!(&x5c, Some(chain) if chain.is_empty()) {
            return Err(WebauthnError::MalformedAttestation);
        }

        Ok(PackedStatement {
            alg: alg.ok_or(WebauthnError::MalformedAttestation)?,
            sig: sig.ok_or(WebauthnError::MalformedAttestation)?,
            x5c,
        })
    }
}

impl PackedAttestationVerifier {
    /// Create a packed verifier. `get_roots` supplies the trusted vendor
    /// roots per AAGUID; `allow_self_attested` permits statements signed
    /// with the credential's own key instead of a vendor certificate.
    pub fn new(
        get_roots: impl Fn(&Aaguid) -> Option<Vec<Certificate>> + Send + Sync + 'static,
        allow_self_attested: bool,
    ) -> Self {
        PackedAttestationVerifier {
            get_roots: Box::new(get_roots),
            allow_self_attested,
        }
    }
}

impl AttestationStatementVerifier for PackedAttestationVerifier {
    fn verify(
        &self,
        att_obj: &AttestationObject,
        rp_id: &str,
        client_data_json: &[u8],
    ) -> WebauthnResult<AttestationResult> {
        if AttestationFormat::try_from(att_obj.fmt.as_str())? != AttestationFormat::Packed {
            return Err(WebauthnError::MalformedAttestation);
        }

        let auth_data = parse_authenticator_data(rp_id, &att_obj.auth_data)?;
        let acd = auth_data
            .acd
            .as_ref()
            .ok_or(WebauthnError::MalformedAttestation)?;

        let stmt = PackedStatement::parse(&att_obj.att_stmt)?;
        let alg = COSEAlgorithm::try_from(stmt.alg)?;

        // The signature covers the authenticator data and the hash of the
        // exact clientDataJSON bytes the user agent produced.
        let client_data_hash = compute_sha256(client_data_json);
        let mut verification_data =
            Vec::with_capacity(att_obj.auth_data.len() + client_data_hash.len());
        verification_data.extend_from_slice(&att_obj.auth_data);
        verification_data.extend_from_slice(&client_data_hash);

        let attestation = match &stmt.x5c {
            Some(x5c) => {
                let chain = x5c
                    .iter()
                    .map(|raw| {
                        Certificate::from_der(raw).map_err(|_| WebauthnError::InvalidCertificate)
                    })
                    .collect::<WebauthnResult<Vec<_>>>()?;

                // The attestation certificate is the first element of the
                // array; it must satisfy the packed certificate profile
                // and the whole chain must currently be within validity.
                let attestn_cert = &chain[0];
                assert_packed_attest_req(attestn_cert, &acd.aaguid)?;
                for certificate in &chain {
                    assert_time_valid(certificate)?;
                }

                let attestn_key = COSEKey::try_from((alg, attestn_cert))?;
                attestn_key.verify_signature(stmt.sig, &verification_data)?;

                let roots = (self.get_roots)(&acd.aaguid)
                    .filter(|roots| !roots.is_empty())
                    .ok_or(WebauthnError::UnknownAAGUID)?;
                verify_attestation_ca_chain(&chain, &roots)?;

                AttestationType::Basic(Box::new(attestn_cert.clone()))
            }
            None => {
                if !self.allow_self_attested {
                    debug!("self attestation presented but not permitted");
                    return Err(WebauthnError::UntrustedChain);
                }
                // For self attestation the statement algorithm must be the
                // one the credential was created with, and the credential
                // key itself verifies the signature.
                if alg != acd.credential_pk.type_ {
                    return Err(WebauthnError::AlgorithmKeyMismatch);
                }
                acd.credential_pk
                    .verify_signature(stmt.sig, &verification_data)?;
                AttestationType::Self_
            }
        };

        Ok(AttestationResult {
            auth_data,
            attestation,
        })
    }
}

/// Verifier for the "none" attestation statement format: the statement
/// must be an empty map, and establishes no trust in the authenticator.
pub struct NoneAttestationVerifier;

impl AttestationStatementVerifier for NoneAttestationVerifier {
    fn verify(
        &self,
        att_obj: &AttestationObject,
        rp_id: &str,
        _client_data_json: &[u8],
    ) -> WebauthnResult<AttestationResult> {
        if AttestationFormat::try_from(att_obj.fmt.as_str())? != AttestationFormat::None {
            return Err(WebauthnError::MalformedAttestation);
        }

        let mut decoder = cbor::Decoder::new(&att_obj.att_stmt);
        let mut entries = 0usize;
        decoder.map(|kv| {
            entries += 1;
            kv.skip()?;
            kv.skip()
        })?;
        if entries != 0 || !decoder.done() {
            return Err(WebauthnError::MalformedAttestation);
        }

        Ok(AttestationResult {
            auth_data: parse_authenticator_data(rp_id, &att_obj.auth_data)?,
            attestation: AttestationType::None,
        })
    }
}

// Verify that attestnCert meets the requirements in 8.2.1 Packed
// Attestation Statement Certificate Requirements:
//   - Version MUST be set to 3.
//   - Subject must carry C and O, OU must be the literal string
//     "Authenticator Attestation", and CN is required (content is the
//     vendor's choosing).
//   - The Basic Constraints extension MUST have the CA component set to
//     false.
//   - If the id-fido-gen-ce-aaguid extension is present, it must not be
//     critical and must contain the authData AAGUID as an OCTET STRING.
fn assert_packed_attest_req(certificate: &Certificate, aaguid: &Aaguid) -> WebauthnResult<()> {
    let tbs = &certificate.tbs_certificate;

    if tbs.version != Version::V3 {
        return Err(WebauthnError::InvalidCertificate);
    }

    let subject_c = subject_attribute(&tbs.subject, ID_AT_COUNTRY_NAME);
    let subject_o = subject_attribute(&tbs.subject, ID_AT_ORGANIZATION_NAME);
    let subject_ou = subject_attribute(&tbs.subject, ID_AT_ORGANIZATIONAL_UNIT_NAME);
    let subject_cn = subject_attribute(&tbs.subject, ID_AT_COMMON_NAME);

    if subject_c.is_none() || subject_o.is_none() || subject_cn.is_none() {
        return Err(WebauthnError::InvalidCertificate);
    }
    if subject_ou != Some(PACKED_ATTEST_SUBJECT_OU) {
        return Err(WebauthnError::InvalidCertificate);
    }

    let extensions = tbs.extensions.as_deref().unwrap_or(&[]);

    let basic_constraints = extensions
        .iter()
        .find(|ext| ext.extn_id == ID_CE_BASIC_CONSTRAINTS)
        .ok_or(WebauthnError::InvalidCertificate)?;
    let basic_constraints = BasicConstraints::from_der(basic_constraints.extn_value.as_bytes())
        .map_err(|_| WebauthnError::InvalidCertificate)?;
    if basic_constraints.ca {
        return Err(WebauthnError::InvalidCertificate);
    }

    if let Some(ext) = extensions
        .iter()
        .find(|ext| ext.extn_id == ID_FIDO_GEN_CE_AAGUID)
    {
        if ext.critical {
            return Err(WebauthnError::InvalidCertificate);
        }
        let value = OctetString::from_der(ext.extn_value.as_bytes())
            .map_err(|_| WebauthnError::InvalidCertificate)?;
        if value.as_bytes() != aaguid.as_ref() {
            return Err(WebauthnError::InvalidCertificate);
        }
    }

    Ok(())
}

// First attribute value for `oid` in a subject name, as a str. Packed
// subjects use UTF8String and PrintableString, both of which carry their
// text as UTF-8 content bytes.
fn subject_attribute(name: &Name, oid: ObjectIdentifier) -> Option<&str> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == oid)
        .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
}

fn assert_time_valid(certificate: &Certificate) -> WebauthnResult<()> {
    let validity = &certificate.tbs_certificate.validity;
    let now = SystemTime::now();
    if now < validity.not_before.to_system_time() || now > validity.not_after.to_system_time() {
        return Err(WebauthnError::InvalidCertificate);
    }
    Ok(())
}

/// Verify that `chain` (leaf first) is internally signed and terminates at
/// one of the supplied `roots`. A chain terminates at a root either by
/// being issued by it or by being the root itself.
pub fn verify_attestation_ca_chain(
    chain: &[Certificate],
    roots: &[Certificate],
) -> WebauthnResult<()> {
    let terminal = chain.last().ok_or(WebauthnError::MalformedAttestation)?;

    // Each certificate must be signed by its successor.
    for pair in chain.windows(2) {
        verify_cert_signature(&pair[0], &pair[1]).map_err(|_| WebauthnError::UntrustedChain)?;
    }

    for root in roots {
        if root == terminal || verify_cert_signature(terminal, root).is_ok() {
            return Ok(());
        }
    }
    debug!("attestation chain did not terminate at a supplied root");
    Err(WebauthnError::UntrustedChain)
}

// Check that `child` is signed by the subject key of `issuer`, funnelling
// through the same COSE dispatch used for credential signatures.
fn verify_cert_signature(child: &Certificate, issuer: &Certificate) -> WebauthnResult<()> {
    let alg = cose_alg_for_certificate_signature(&child.signature_algorithm.oid)?;
    let issuer_key = COSEKey::try_from((alg, issuer))?;
    let tbs = child
        .tbs_certificate
        .to_der()
        .map_err(|_| WebauthnError::InvalidCertificate)?;
    let sig = child
        .signature
        .as_bytes()
        .ok_or(WebauthnError::InvalidCertificate)?;
    issuer_key.verify_signature(sig, &tbs)
}

fn cose_alg_for_certificate_signature(oid: &ObjectIdentifier) -> WebauthnResult<COSEAlgorithm> {
    if *oid == ID_ECDSA_WITH_SHA256 {
        Ok(COSEAlgorithm::ES256)
    } else if *oid == ID_ECDSA_WITH_SHA384 {
        Ok(COSEAlgorithm::ES384)
    } else if *oid == ID_ECDSA_WITH_SHA512 {
        Ok(COSEAlgorithm::ES512)
    } else if *oid == ID_SHA256_WITH_RSA {
        Ok(COSEAlgorithm::RS256)
    } else if *oid == ID_SHA384_WITH_RSA {
        Ok(COSEAlgorithm::RS384)
    } else if *oid == ID_SHA512_WITH_RSA {
        Ok(COSEAlgorithm::RS512)
    } else if *oid == ID_ED25519 {
        Ok(COSEAlgorithm::EDDSA)
    } else {
        Err(WebauthnError::InvalidCertificate)
    }
}
