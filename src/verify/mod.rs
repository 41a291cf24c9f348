//! Verification pipeline: checksum comparison, GPG/cosign signature verification, and the
//! policy layer that decides whether a missing artifact is fatal, a warning, or silent.

pub mod checksum;
pub mod cosign;
pub mod gpg;

use std::fs;
use std::path::Path;

use log::warn;

use crate::config::{Policy, Settings};
use crate::core::EmptyResult;

pub enum SignatureKind {
    Gpg,
    CosignKeyed,
    CosignBundle,
}

/// Apply `policy` to the absence of an artifact: fatal under `Error`, logged under `Warn`,
/// silent under `Ignore`.
fn apply_missing_policy(policy: Policy, what: &str) -> EmptyResult {
    match policy {
        Policy::Error => Err!("{what} is missing"),
        Policy::Warn => {
            warn!("{what} is missing, proceeding without verification.");
            Ok(())
        },
        Policy::Ignore => Ok(()),
    }
}

pub fn verify_checksum(
    settings: &Settings, checksum_path: Option<&Path>, target_name: &str, target_path: &Path,
) -> EmptyResult {
    let Some(checksum_path) = checksum_path else {
        return apply_missing_policy(settings.checksum_missing, "checksum file");
    };

    let contents = fs::read_to_string(checksum_path)?;

    match checksum::verify(&contents, target_name, target_path) {
        Ok(()) => Ok(()),
        Err(err) if err.to_string().starts_with("unsupported hash length") => {
            apply_missing_policy(settings.checksum_unknown, "checksum algorithm")
        },
        Err(err) => Err(err),
    }
}

pub fn verify_signature(
    settings: &Settings, kind: SignatureKind,
    signature_path: Option<&Path>, key_bytes: Option<&[u8]>, signed_path: &Path,
) -> EmptyResult {
    let Some(signature_path) = signature_path else {
        return apply_missing_policy(settings.signature_missing, "signature file");
    };

    let signature_bytes = fs::read(signature_path)?;
    let signed_data = fs::read(signed_path)?;

    match kind {
        SignatureKind::Gpg => {
            let Some(key_bytes) = key_bytes else {
                return apply_missing_policy(settings.signature_missing, "GPG public key");
            };
            gpg::verify(key_bytes, &signature_bytes, &signed_data)
        },
        SignatureKind::CosignKeyed => {
            let Some(key_bytes) = key_bytes else {
                return apply_missing_policy(settings.signature_missing, "cosign public key");
            };
            let signature_b64 = String::from_utf8_lossy(&signature_bytes);
            cosign::verify_keyed(key_bytes, signature_b64.trim(), &signed_data)
        },
        SignatureKind::CosignBundle => cosign::verify_bundle(&signature_bytes, &signed_data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checksum_respects_error_policy() {
        let mut settings = Settings::default();
        settings.checksum_missing = Policy::Error;
        assert!(verify_checksum(&settings, None, "app", Path::new("app")).is_err());
    }

    #[test]
    fn missing_checksum_respects_warn_policy() {
        let settings = Settings::default();
        assert!(verify_checksum(&settings, None, "app", Path::new("app")).is_ok());
    }

    #[test]
    fn missing_checksum_respects_ignore_policy() {
        let mut settings = Settings::default();
        settings.checksum_missing = Policy::Ignore;
        assert!(verify_checksum(&settings, None, "app", Path::new("app")).is_ok());
    }
}
