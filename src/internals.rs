//! Parsers for the binary and JSON structures a user agent delivers to the
//! relying party: the packed authenticator data and the collected client
//! data document.

use std::convert::TryFrom;

use base64urlsafedata::Base64UrlSafeData;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::cbor;
use crate::constants::AUTH_DATA_FIXED_LEN;
use crate::crypto::{compute_sha256, COSEKey};
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::{Aaguid, AttestedCredentialData, AuthenticatorData, Flags};

impl AuthenticatorData {
    // Strict left-to-right parse of the packed structure:
    //
    //   rpIdHash(32) | flags(1) | counter(4)
    //     | [aaguid(16) | credIdLen(2) | credId | coseKey]   when AT
    //     | [one CBOR item of extension data]                when ED
    //
    // Every read is length checked; the input must be fully consumed.
    pub(crate) fn parse(data: &[u8]) -> WebauthnResult<AuthenticatorData> {
        if data.len() < AUTH_DATA_FIXED_LEN {
            return Err(WebauthnError::MalformedAuthData);
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&data[..32]);
        let flags = Flags(data[32]);
        let counter = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        let mut body = &data[AUTH_DATA_FIXED_LEN..];

        let acd = if flags.attested_credential_data() {
            if body.len() < 18 {
                return Err(WebauthnError::MalformedAuthData);
            }
            let mut raw_aaguid = [0u8; 16];
            raw_aaguid.copy_from_slice(&body[..16]);
            let cred_id_len = usize::from(u16::from_be_bytes([body[16], body[17]]));
            body = &body[18..];

            if body.len() < cred_id_len {
                return Err(WebauthnError::MalformedAuthData);
            }
            let credential_id = body[..cred_id_len].to_vec();
            body = &body[cred_id_len..];

            // The credential key is exactly one CBOR item; whatever trails
            // it belongs to the extension block.
            let mut decoder = cbor::Decoder::new(body);
            let credential_pk = COSEKey::decode(&mut decoder)?;
            body = decoder.rest();

            Some(AttestedCredentialData {
                aaguid: Aaguid::from(raw_aaguid),
                credential_id: credential_id.into(),
                credential_pk,
            })
        } else {
            None
        };

        let extensions = if flags.extensions() {
            let mut decoder = cbor::Decoder::new(body);
            let raw = decoder.raw()?;
            if !decoder.done() {
                return Err(WebauthnError::MalformedAuthData);
            }
            Some(Base64UrlSafeData::from(raw.to_vec()))
        } else {
            if !body.is_empty() {
                return Err(WebauthnError::MalformedAuthData);
            }
            None
        };

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            counter,
            acd,
            extensions,
        })
    }
}

/// Parse authenticator data and bind it to a relying party: the leading
/// rpIdHash must equal the SHA-256 of `rp_id`.
///
/// This is exported to support external validation of attestation
/// statements; most consumers should obtain an [AuthenticatorData] from
/// `Webauthn::verify_attestation` instead.
pub fn parse_authenticator_data(rp_id: &str, data: &[u8]) -> WebauthnResult<AuthenticatorData> {
    if data.len() < 32 {
        return Err(WebauthnError::MalformedAuthData);
    }
    let expected = compute_sha256(rp_id.as_bytes());
    if expected != data[..32] {
        return Err(WebauthnError::RelyingPartyMismatch);
    }
    AuthenticatorData::parse(data)
}

/// The client data document assembled by the user agent during a ceremony.
/// Its serialised bytes participate in the signed payload, so it is only
/// ever parsed - never re-encoded.
/// <https://www.w3.org/TR/webauthn-3/#dictionary-client-data>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    /// The ceremony type, "webauthn.create" or "webauthn.get".
    #[serde(rename = "type")]
    pub type_: String,
    /// The challenge, transported as unpadded base64url.
    pub challenge: Base64UrlSafeData,
    /// The origin the user agent performed the ceremony in.
    pub origin: String,
    /// The top level origin, present in cross-origin iframe ceremonies.
    #[serde(default)]
    pub top_origin: Option<String>,
    /// Whether the ceremony ran in a cross-origin iframe.
    #[serde(default)]
    pub cross_origin: Option<bool>,
}

impl CollectedClientData {
    /// Compare the transported challenge against the expected value in
    /// constant time.
    pub fn challenge_matches(&self, expected: &[u8]) -> bool {
        self.challenge.as_ref().ct_eq(expected).into()
    }
}

impl TryFrom<&[u8]> for CollectedClientData {
    type Error = WebauthnError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(data).map_err(|err| {
            debug!(?err, "client data json");
            WebauthnError::MalformedClientData
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::crypto::COSEAlgorithm;
    use hex_literal::hex;

    // The RFC 8152 appendix C example P-256 key, as authenticators encode
    // it.
    fn es256_key_cbor() -> Vec<u8> {
        hex!(
            "A5 01 02 03 26 20 01"
            "21 58 20   65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d"
            "22 58 20   1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19c"
        )
        .to_vec()
    }

    fn build_auth_data(
        rp_id: &str,
        flags: u8,
        counter: u32,
        attested: Option<(&[u8; 16], &[u8], &[u8])>,
        extensions: Option<&[u8]>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&compute_sha256(rp_id.as_bytes()));
        out.push(flags);
        out.extend_from_slice(&counter.to_be_bytes());
        if let Some((aaguid, cred_id, key)) = attested {
            out.extend_from_slice(aaguid);
            out.extend_from_slice(&(cred_id.len() as u16).to_be_bytes());
            out.extend_from_slice(cred_id);
            out.extend_from_slice(key);
        }
        if let Some(ext) = extensions {
            out.extend_from_slice(ext);
        }
        out
    }

    #[test]
    fn parse_minimal_assertion_auth_data() {
        let data = build_auth_data("localhost", 0x01, 20, None, None);
        let ad = parse_authenticator_data("localhost", &data).unwrap();
        assert!(ad.flags.user_present());
        assert!(!ad.flags.user_verified());
        assert_eq!(ad.counter, 20);
        assert!(ad.acd.is_none());
        assert!(ad.extensions.is_none());
    }

    #[test]
    fn parse_attested_credential_block() {
        let key = es256_key_cbor();
        let data = build_auth_data(
            "localhost",
            0x45,
            7,
            Some((&[0xab; 16], &[0x11; 48], &key)),
            None,
        );
        let ad = parse_authenticator_data("localhost", &data).unwrap();
        let acd = ad.acd.expect("attested credential data");
        assert_eq!(acd.aaguid.as_bytes(), &[0xab; 16]);
        assert_eq!(acd.credential_id.as_ref(), &[0x11; 48]);
        assert_eq!(acd.algorithm(), COSEAlgorithm::ES256);
    }

    #[test]
    fn extension_bytes_are_retained_raw() {
        // {"credProtect": 3}
        let ext = hex!("a1 6b 6372656450726f74656374 03");
        let key = es256_key_cbor();
        let data = build_auth_data(
            "localhost",
            0xc5,
            0,
            Some((&[0u8; 16], &[0x22; 16], &key)),
            Some(&ext),
        );
        let ad = parse_authenticator_data("localhost", &data).unwrap();
        assert_eq!(ad.extensions.unwrap().as_ref(), &ext);
    }

    #[test]
    fn extensions_without_attested_data() {
        let ext = hex!("a0");
        let data = build_auth_data("localhost", 0x81, 1, None, Some(&ext));
        let ad = parse_authenticator_data("localhost", &data).unwrap();
        assert!(ad.acd.is_none());
        assert_eq!(ad.extensions.unwrap().as_ref(), &ext);
    }

    #[test]
    fn relying_party_mismatch_detected() {
        let data = build_auth_data("localhost", 0x01, 0, None, None);
        assert_eq!(
            parse_authenticator_data("example.com", &data),
            Err(WebauthnError::RelyingPartyMismatch)
        );

        // A flipped byte inside the hash region is the same failure.
        let mut flipped = data;
        flipped[3] ^= 0x40;
        assert_eq!(
            parse_authenticator_data("localhost", &flipped),
            Err(WebauthnError::RelyingPartyMismatch)
        );
    }

    #[test]
    fn truncated_inputs_rejected() {
        let data = build_auth_data("localhost", 0x01, 0, None, None);
        for len in [0, 10, 32, 36] {
            assert_eq!(
                parse_authenticator_data("localhost", &data[..len]),
                Err(WebauthnError::MalformedAuthData)
            );
        }

        // AT set, but the block is cut off mid credential id.
        let key = es256_key_cbor();
        let full = build_auth_data(
            "localhost",
            0x41,
            0,
            Some((&[0xab; 16], &[0x11; 48], &key)),
            None,
        );
        for len in [37 + 10, 37 + 16, 37 + 18, 37 + 18 + 20] {
            assert_eq!(
                parse_authenticator_data("localhost", &full[..len]),
                Err(WebauthnError::MalformedAuthData)
            );
        }
    }

    #[test]
    fn trailing_garbage_rejected() {
        let mut data = build_auth_data("localhost", 0x01, 0, None, None);
        data.push(0x00);
        assert_eq!(
            parse_authenticator_data("localhost", &data),
            Err(WebauthnError::MalformedAuthData)
        );

        // Trailing bytes after the credential key without ED set.
        let key = es256_key_cbor();
        let mut data = build_auth_data(
            "localhost",
            0x41,
            0,
            Some((&[0xab; 16], &[0x11; 16], &key)),
            None,
        );
        data.push(0xa0);
        assert_eq!(
            parse_authenticator_data("localhost", &data),
            Err(WebauthnError::MalformedAuthData)
        );

        // Two CBOR items in the extension tail.
        let mut data = build_auth_data("localhost", 0x81, 0, None, Some(&hex!("a0")));
        data.push(0x01);
        assert_eq!(
            parse_authenticator_data("localhost", &data),
            Err(WebauthnError::MalformedAuthData)
        );
    }

    #[test]
    fn unrecognised_credential_algorithm_rejected() {
        // An EC2 shaped key declaring alg -9999 embedded in otherwise
        // valid authenticator data.
        let key = hex!(
            "A5 01 02 03 39 270e 20 01"
            "21 58 20   65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d"
            "22 58 20   1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19c"
        );
        let data = build_auth_data(
            "localhost",
            0x41,
            1,
            Some((&[0u8; 16], &[1, 2, 3, 4], &key)),
            None,
        );
        assert_eq!(
            parse_authenticator_data("localhost", &data),
            Err(WebauthnError::UnsupportedAlgorithm(-9999))
        );
    }

    #[test]
    fn client_data_parses_the_standard_document() {
        let raw = br#"{"type":"webauthn.create","challenge":"-ium4NdjLD6Acqy9p66NtA","origin":"http://localhost:8080","crossOrigin":false}"#;
        let client_data = CollectedClientData::try_from(raw.as_slice()).unwrap();
        assert_eq!(client_data.type_, "webauthn.create");
        assert_eq!(client_data.origin, "http://localhost:8080");
        assert_eq!(client_data.cross_origin, Some(false));
        assert_eq!(client_data.top_origin, None);
        assert_eq!(
            client_data.challenge.as_ref(),
            hex!("fa2ba6e0d7632c3e8072acbda7ae8db4")
        );
    }

    #[test]
    fn client_data_ignores_unknown_fields() {
        let raw = br#"{"challenge":"AAAA","clientExtensions":{},"hashAlgorithm":"SHA-256","origin":"http://localhost:8080","type":"webauthn.get","other_keys_can_be_added_here":"do not compare"}"#;
        let client_data = CollectedClientData::try_from(raw.as_slice()).unwrap();
        assert_eq!(client_data.type_, "webauthn.get");
        assert_eq!(client_data.challenge.as_ref(), &[0, 0, 0]);
    }

    #[test]
    fn client_data_missing_type_rejected() {
        let raw = br#"{"challenge":"AAAA","origin":"http://localhost:8080"}"#;
        assert_eq!(
            CollectedClientData::try_from(raw.as_slice()),
            Err(WebauthnError::MalformedClientData)
        );
    }

    #[test]
    fn client_data_bad_json_rejected() {
        assert_eq!(
            CollectedClientData::try_from(b"{not json".as_slice()),
            Err(WebauthnError::MalformedClientData)
        );
        assert_eq!(
            CollectedClientData::try_from(
                br#"{"type":"webauthn.create","challenge":"!!!","origin":"o"}"#.as_slice()
            ),
            Err(WebauthnError::MalformedClientData)
        );
    }

    #[test]
    fn challenge_comparison_is_exact() {
        let raw = br#"{"type":"webauthn.get","challenge":"AQIDBA","origin":"o"}"#;
        let client_data = CollectedClientData::try_from(raw.as_slice()).unwrap();
        assert!(client_data.challenge_matches(&[1, 2, 3, 4]));
        assert!(!client_data.challenge_matches(&[1, 2, 3, 5]));
        // Length differences never compare equal.
        assert!(!client_data.challenge_matches(&[1, 2, 3]));
        assert!(!client_data.challenge_matches(&[1, 2, 3, 4, 0]));
        assert!(!client_data.challenge_matches(&[]));
    }
}
