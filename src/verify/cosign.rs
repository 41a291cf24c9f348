//! cosign-style ECDSA P-256 signature verification, keyed (external public key or certificate)
//! or keyless (a JSON bundle embedding an ephemeral certificate alongside the signature).

use base64::Engine;
use openssl::ec::EcKey;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Verifier;
use openssl::x509::X509;
use serde::Deserialize;

use crate::core::GenericResult;

/// `rekorBundle` payload fields, retained for diagnostics but not independently re-verified
/// against a transparency log (that would require network access, out of scope here).
#[derive(Debug, Deserialize)]
pub struct RekorPayload {
    pub body: String,
    #[serde(rename = "integratedTime")]
    pub integrated_time: i64,
    #[serde(rename = "logIndex")]
    pub log_index: i64,
    #[serde(rename = "logID")]
    pub log_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RekorBundle {
    #[serde(rename = "SignedEntryTimestamp")]
    pub signed_entry_timestamp: String,
    #[serde(rename = "Payload")]
    pub payload: RekorPayload,
}

#[derive(Debug, Deserialize)]
pub struct Bundle {
    #[serde(rename = "base64Signature")]
    pub base64_signature: String,
    pub cert: String,
    #[serde(rename = "rekorBundle")]
    pub rekor_bundle: Option<RekorBundle>,
}

/// Verify a keyed cosign signature: `key_bytes` is a PEM `PUBLIC KEY` or `CERTIFICATE` block
/// (optionally itself base64-encoded), `signature_b64` is the base64-encoded ECDSA-ASN.1
/// signature over the SHA-256 digest of `signed_data`.
pub fn verify_keyed(key_bytes: &[u8], signature_b64: &str, signed_data: &[u8]) -> GenericResult<()> {
    let pem = normalize_pem(key_bytes)?;
    let pkey = parse_public_key(&pem)?;
    verify_signature(&pkey, signature_b64, signed_data)
}

/// Verify a keyless cosign bundle: parses the JSON `Bundle`, uses its embedded certificate as
/// the key material and its signature field as the signature.
pub fn verify_bundle(bundle_json: &[u8], signed_data: &[u8]) -> GenericResult<()> {
    let bundle: Bundle = serde_json::from_slice(bundle_json)
        .map_err(|err| format!("failed to parse the cosign bundle: {err}"))?;

    let pem = normalize_pem(bundle.cert.as_bytes())?;
    let pkey = parse_public_key(&pem)?;
    verify_signature(&pkey, &bundle.base64_signature, signed_data)
}

fn normalize_pem(bytes: &[u8]) -> GenericResult<Vec<u8>> {
    if bytes.starts_with(b"-----BEGIN") {
        return Ok(bytes.to_vec());
    }

    // Some publishers base64-encode the whole PEM block again.
    base64::engine::general_purpose::STANDARD.decode(
        String::from_utf8_lossy(bytes).trim()
    ).map_err(|err| format!("key material is neither PEM nor base64-encoded PEM: {err}").into())
}

fn parse_public_key(pem: &[u8]) -> GenericResult<PKey<openssl::pkey::Public>> {
    if let Ok(cert) = X509::from_pem(pem) {
        return Ok(cert.public_key()?);
    }

    if let Ok(key) = PKey::public_key_from_pem(pem) {
        return Ok(key);
    }

    let ec_key = EcKey::public_key_from_pem(pem)
        .map_err(|err| format!("failed to parse the public key (not PKIX, X509 or raw EC PEM): {err}"))?;
    Ok(PKey::from_ec_key(ec_key)?)
}

fn verify_signature(pkey: &PKey<openssl::pkey::Public>, signature_b64: &str, signed_data: &[u8]) -> GenericResult<()> {
    let signature = base64::engine::general_purpose::STANDARD.decode(signature_b64.trim())
        .map_err(|err| format!("invalid base64 signature: {err}"))?;

    let mut verifier = Verifier::new(MessageDigest::sha256(), pkey)?;
    verifier.update(signed_data)?;

    if verifier.verify(&signature)? {
        Ok(())
    } else {
        Err!("cosign signature verification failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_parses_expected_shape() {
        let json = indoc::indoc! {r#"
            {
                "base64Signature": "MEQCIAbase64stub==",
                "cert": "-----BEGIN CERTIFICATE-----\nMIIB...\n-----END CERTIFICATE-----\n",
                "rekorBundle": {
                    "SignedEntryTimestamp": "stub",
                    "Payload": {
                        "body": "stub",
                        "integratedTime": 1700000000,
                        "logIndex": 42,
                        "logID": "stub"
                    }
                }
            }
        "#};

        let bundle: Bundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.base64_signature, "MEQCIAbase64stub==");
        assert!(bundle.rekor_bundle.is_some());
        assert_eq!(bundle.rekor_bundle.unwrap().payload.log_index, 42);
    }

    #[test]
    fn bundle_without_rekor_bundle_is_accepted() {
        let json = indoc::indoc! {r#"
            {"base64Signature": "stub", "cert": "stub"}
        "#};
        let bundle: Bundle = serde_json::from_str(json).unwrap();
        assert!(bundle.rekor_bundle.is_none());
    }

    #[test]
    fn garbage_key_material_is_rejected() {
        assert!(parse_public_key(b"not a key").is_err());
    }
}
