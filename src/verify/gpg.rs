//! GPG detached-signature verification, armored or raw binary, against a single known public
//! key certificate.

use std::io::Write as _;

use sequoia_openpgp::armor::{Kind as ArmorKind, Reader as ArmorReader, ReaderMode, Writer as ArmorWriter};
use sequoia_openpgp::cert::Cert;
use sequoia_openpgp::parse::stream::{
    DetachedVerifierBuilder, GoodChecksum, MessageLayer, MessageStructure, VerificationHelper,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::{Cert as OpenPgpCert, Fingerprint, KeyHandle};

use crate::core::GenericResult;

/// Verify `signature_bytes` (armored or raw binary) as a detached signature over `signed_data`,
/// using `key_bytes` (an armored or binary public key / keyring) as the trust anchor.
pub fn verify(key_bytes: &[u8], signature_bytes: &[u8], signed_data: &[u8]) -> GenericResult<()> {
    let cert = Cert::from_bytes(key_bytes)
        .map_err(|err| format!("failed to parse the public key: {err}"))?;

    let policy = StandardPolicy::new();
    let helper = Helper {cert: &cert};

    let try_verify = |bytes: &[u8], helper: Helper| -> sequoia_openpgp::Result<()> {
        let mut verifier = DetachedVerifierBuilder::from_bytes(bytes)?.with_policy(&policy, None, helper)?;
        verifier.verify_bytes(signed_data)
    };

    if try_verify(signature_bytes, helper.clone()).is_ok() {
        return Ok(());
    }

    // Some publishers save a binary OpenPGP signature packet under a `.asc` extension, or an
    // armored one without it; retry against the opposite representation before giving up.
    let alternate = if signature_bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
        dearmor(signature_bytes)
    } else {
        rearmor(signature_bytes)
    };

    match alternate {
        Some(alternate) => try_verify(&alternate, helper)
            .map_err(|err| format!("signature verification failed: {err}").into()),
        None => Err!("signature verification failed"),
    }
}

fn dearmor(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut reader = ArmorReader::from_bytes(bytes, ReaderMode::Tolerant(None));
    let mut out = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut out).ok()?;
    Some(out)
}

fn rearmor(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut writer = ArmorWriter::new(&mut out, ArmorKind::Signature).ok()?;
    writer.write_all(bytes).ok()?;
    writer.finalize().ok()?;
    Some(out)
}

#[derive(Clone)]
struct Helper<'a> {
    cert: &'a OpenPgpCert,
}

impl<'a> VerificationHelper for Helper<'a> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<OpenPgpCert>> {
        Ok(vec![self.cert.clone()])
    }

    fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        for layer in structure.into_iter() {
            match layer {
                MessageLayer::SignatureGroup {results} => {
                    if !results.iter().any(|r| matches!(r, Ok(GoodChecksum {..}))) {
                        return Err(anyhow::Error::msg("no valid signature found"));
                    }
                },
                MessageLayer::Compression {..} | MessageLayer::Encryption {..} => {},
            }
        }
        Ok(())
    }
}

/// The 64-bit key ID a `.asc` signature was produced with, used to look up a missing public
/// key from a keyserver. Scans the (possibly armored) signature packet stream.
pub fn signature_key_id(signature_bytes: &[u8]) -> GenericResult<Option<Fingerprint>> {
    use sequoia_openpgp::parse::PacketParser;
    use sequoia_openpgp::packet::Packet;

    let mut ppr = PacketParser::from_bytes(signature_bytes)
        .map_err(|err| format!("failed to parse the signature: {err}"))?;

    while let sequoia_openpgp::parse::PacketParserResult::Some(pp) = ppr {
        let (packet, next) = pp.recurse()?;
        if let Packet::Signature(sig) = packet {
            if let Some(issuer) = sig.issuer_fingerprints().next() {
                return Ok(Some(issuer.clone()));
            }
        }
        ppr = next;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_rejects_garbage_input() {
        let result = verify(b"not a key", b"not a signature", b"data");
        assert!(result.is_err());
    }
}
