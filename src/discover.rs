//! Four-phase release-asset discovery: pair signatures with keys, then pick the binary,
//! checksum file and signature out of a release's asset list.

use std::collections::HashMap;

use crate::asset::{self, Asset, ChecksumKind, Kind};
use crate::core::GenericResult;
use crate::osconfig::{Arch, Os};
use crate::scorer::{self, Profile};

const MIN_SCORE: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    None,
    File,
    Checksum,
}

#[derive(Debug, Default)]
pub struct Discovered {
    pub binary: Option<String>,
    pub checksum: Option<String>,
    pub checksum_kind: ChecksumKind,
    pub signature: Option<String>,
    pub signature_type: SignatureType,
    pub key: Option<String>,
}

pub struct Options {
    pub repo_name: String,
    pub version: String,
    pub os: Os,
    pub arch: Arch,
    pub no_score_check: bool,
}

/// Run all four phases against the given asset list, returning the winners and mutating
/// `assets` in place to record `matched_asset` links discovered along the way.
pub fn discover(assets: &mut Vec<Asset>, opts: &Options) -> GenericResult<Discovered> {
    match_signatures_and_keys(assets);

    let binary = discover_binary(assets, opts)?;
    let checksum = discover_checksum(assets, opts, binary.as_deref());
    let signature_type = determine_signature_type(assets);
    let (signature, key) = discover_signature(
        assets, opts, signature_type, binary.as_deref(), checksum.as_deref().map(|(n, _)| n.as_str()),
    );

    Ok(Discovered {
        binary,
        checksum: checksum.as_ref().map(|(n, _)| n.clone()),
        checksum_kind: checksum.map(|(_, k)| k).unwrap_or(ChecksumKind::None),
        signature,
        signature_type,
        key,
    })
}

fn match_signatures_and_keys(assets: &mut Vec<Asset>) {
    let mut links: HashMap<String, String> = HashMap::new();

    {
        let signatures: Vec<usize> = assets.iter().enumerate()
            .filter(|(_, a)| a.kind == Kind::Signature).map(|(i, _)| i).collect();
        let keys: Vec<usize> = assets.iter().enumerate()
            .filter(|(_, a)| a.kind == Kind::Key).map(|(i, _)| i).collect();

        for &si in &signatures {
            let sig_base = asset::get_base_name(&assets[si].name);
            for &ki in &keys {
                if links.contains_key(&assets[ki].name) {
                    continue;
                }
                let key_base = asset::get_base_name(&assets[ki].name);
                if sig_base == key_base {
                    links.insert(assets[si].name.clone(), assets[ki].name.clone());
                    links.insert(assets[ki].name.clone(), assets[si].name.clone());
                    break;
                }
            }
        }
    }

    // Synthesize a companion public-key asset for any unmatched `.asc` signature.
    let mut synthesized = Vec::new();
    for a in assets.iter() {
        if a.kind == Kind::Signature && a.name.ends_with(".asc") && !links.contains_key(&a.name) {
            let key_name = format!("{}.pub", a.name.strip_suffix(".asc").unwrap());
            links.insert(a.name.clone(), key_name.clone());
            links.insert(key_name.clone(), a.name.clone());
            synthesized.push(key_name);
        }
    }
    for name in synthesized {
        let mut key_asset = Asset::new(format!("synthesized:{name}"), name);
        key_asset.kind = Kind::Key;
        assets.push(key_asset);
    }

    for a in assets.iter_mut() {
        a.matched_asset = links.get(&a.name).cloned();
    }
}

fn discover_binary(assets: &[Asset], opts: &Options) -> GenericResult<Option<String>> {
    let profile = Profile {
        os: opts.os.terms(),
        arch: opts.arch.synonyms().to_vec(),
        extensions: opts.os.extensions().to_vec(),
        terms: vec![opts.repo_name.as_str()],
        versions: vec![opts.version.as_str()],
        invalid_os: opts.os.invalid_terms(),
        invalid_arch: opts.arch.invalid_terms(),
        invalid_extensions: vec!["zst"],
        weighted_terms: [("source", -20)].into_iter().collect(),
        ..Default::default()
    };

    for kind in [Kind::Unknown, Kind::Binary, Kind::Archive] {
        let candidates: Vec<String> = assets.iter()
            .filter(|a| a.kind == kind).map(|a| a.name.clone()).collect();
        if candidates.is_empty() {
            continue;
        }

        let scored = scorer::score(&candidates, &profile);
        if let Some(best) = scored.first() {
            if best.score >= MIN_SCORE || opts.no_score_check {
                return Ok(Some(best.name.clone()));
            }
        }
    }

    Err!("no matching asset found, score too low")
}

fn discover_checksum(assets: &[Asset], opts: &Options, binary: Option<&str>) -> Option<(String, ChecksumKind)> {
    let candidates: Vec<String> = assets.iter()
        .filter(|a| a.kind == Kind::Checksum).map(|a| a.name.clone()).collect();
    if candidates.is_empty() {
        return None;
    }

    let mut names = vec![];
    if let Some(binary) = binary {
        names.push(binary);
    }

    let profile = Profile {
        os: opts.os.terms(),
        arch: opts.arch.synonyms().to_vec(),
        extensions: vec!["sha256", "md5", "sha1", "txt", "sha256sum", "sha1sum", "md5sum", "sha512", "sha512sum"],
        names,
        weighted_terms: [
            ("checksums", 100), ("sha512sum", 50), ("sha512", 50),
            ("sha256sum", 40), ("sha256", 40),
            ("md5sum", 30), ("md5", 30),
            ("sha1sum", 20), ("sha1", 20),
            ("shasum", 15), ("sha", 15),
            ("sums", 10),
        ].into_iter().collect(),
        ..Default::default()
    };

    let scored = scorer::score(&candidates, &profile);
    let best = scored.first()?;
    if best.score < MIN_SCORE {
        return None;
    }

    let kind = assets.iter().find(|a| a.name == best.name).map(|a| a.checksum_kind).unwrap_or(ChecksumKind::None);
    Some((best.name.clone(), kind))
}

fn determine_signature_type(assets: &[Asset]) -> SignatureType {
    let mut has_checksum_cover = false;

    for a in assets.iter().filter(|a| a.kind == Kind::Signature) {
        match a.parent_kind {
            Kind::Binary | Kind::Archive | Kind::Unknown => return SignatureType::File,
            Kind::Checksum => has_checksum_cover = true,
            _ => {},
        }
    }

    if has_checksum_cover { SignatureType::Checksum } else { SignatureType::None }
}

fn discover_signature(
    assets: &[Asset], opts: &Options, sig_type: SignatureType,
    binary: Option<&str>, checksum: Option<&str>,
) -> (Option<String>, Option<String>) {
    if sig_type == SignatureType::None {
        return (None, None);
    }

    let covered = match sig_type {
        SignatureType::Checksum => checksum,
        SignatureType::File => binary,
        SignatureType::None => None,
    };

    let candidates: Vec<String> = assets.iter()
        .filter(|a| a.kind == Kind::Signature).map(|a| a.name.clone()).collect();
    if candidates.is_empty() {
        return (None, None);
    }

    let mut names: Vec<&str> = Vec::new();
    let asc;
    let sig;
    if let Some(covered) = covered {
        asc = format!("{covered}.asc");
        sig = format!("{covered}.sig");
        names.push(covered);
        names.push(&asc);
        names.push(&sig);
    }

    let profile = Profile {
        os: opts.os.terms(),
        arch: opts.arch.synonyms().to_vec(),
        extensions: vec!["sig", "asc", "sig.asc", "gpg", "keyless.sig"],
        names,
        ..Default::default()
    };

    let scored = scorer::score(&candidates, &profile);
    let Some(best) = scored.first() else { return (None, None) };
    if best.score < MIN_SCORE {
        return (None, None);
    }

    let key = assets.iter().find(|a| a.name == best.name).and_then(|a| a.matched_asset.clone());
    (Some(best.name.clone()), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(os: Os, arch: Arch) -> Options {
        Options {repo_name: "pulumi".into(), version: "3.133.0".into(), os, arch, no_score_check: false}
    }

    fn make(names: &[&str]) -> Vec<Asset> {
        names.iter().enumerate().map(|(i, n)| Asset::new(i.to_string(), *n)).collect()
    }

    #[test]
    fn pulumi_linux_amd64() {
        let mut assets = make(&[
            "pulumi-v3.133.0-linux-x64.tar.gz",
            "pulumi-v3.133.0-linux-x64.tar.gz.sig",
            "pulumi-3.133.0-checksums.txt",
            "pulumi-v3.133.0-darwin-arm64.tar.gz",
        ]);
        let result = discover(&mut assets, &opts(Os::Linux, Arch::Amd64)).unwrap();
        assert_eq!(result.binary.as_deref(), Some("pulumi-v3.133.0-linux-x64.tar.gz"));
        assert_eq!(result.checksum.as_deref(), Some("pulumi-3.133.0-checksums.txt"));
        assert_eq!(result.signature.as_deref(), Some("pulumi-v3.133.0-linux-x64.tar.gz.sig"));
        assert_eq!(result.signature_type, SignatureType::File);
    }

    #[test]
    fn cosign_deprioritizes_keyless_signatures() {
        let mut assets = make(&[
            "cosign-linux-amd64", "cosign-linux-amd64.sig", "cosign-linux-amd64-keyless.sig",
            "cosign_checksums.txt", "release-cosign.pub",
        ]);
        let result = discover(&mut assets, &opts(Os::Linux, Arch::Amd64)).unwrap();
        assert_eq!(result.binary.as_deref(), Some("cosign-linux-amd64"));
        assert_eq!(result.signature.as_deref(), Some("cosign-linux-amd64.sig"));
        assert_eq!(result.key.as_deref(), Some("release-cosign.pub"));
    }

    #[test]
    fn darwin_matches_mac_alias() {
        let mut assets = make(&["caddy_2.9.0_mac_arm64.tar.gz", "caddy_2.9.0_linux_arm64.tar.gz"]);
        let mut opts = opts(Os::Darwin, Arch::Arm64);
        opts.repo_name = "caddy".into();
        opts.version = "2.9.0".into();
        let result = discover(&mut assets, &opts).unwrap();
        assert_eq!(result.binary.as_deref(), Some("caddy_2.9.0_mac_arm64.tar.gz"));
    }

    #[test]
    fn no_matching_platform_fails_low_score() {
        let mut assets = make(&["nerdctl-1.7.7-linux-amd64.tar.gz", "nerdctl-1.7.7-windows-amd64.zip"]);
        let mut opts = opts(Os::Darwin, Arch::Amd64);
        opts.repo_name = "nerdctl".into();
        opts.version = "1.7.7".into();
        assert!(discover(&mut assets, &opts).is_err());
    }

    #[test]
    fn no_score_check_bypasses_threshold() {
        let mut assets = make(&["nerdctl-1.7.7-linux-amd64.tar.gz"]);
        let mut opts = opts(Os::Darwin, Arch::Amd64);
        opts.repo_name = "nerdctl".into();
        opts.version = "1.7.7".into();
        opts.no_score_check = true;
        assert!(discover(&mut assets, &opts).is_ok());
    }
}
