//! Release asset model: the semantic classification of a filename, and the runtime state a
//! candidate asset accumulates as it moves through discovery, download, verification and
//! extraction.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Unknown,
    Archive,
    Binary,
    Installer,
    Checksum,
    Signature,
    Key,
    Sbom,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    None,
    Single,
    Multi,
}

const INSTALLER_EXTENSIONS: &[&str] = &["deb", "rpm", "msi", "apk", "pkg"];
const ARCHIVE_EXTENSIONS: &[&str] = &["gz", "zip", "xz", "tar", "bz2", "tgz", "zst", "zstd"];
const SIGNATURE_EXTENSIONS: &[&str] = &["sig", "asc"];
const KEY_EXTENSIONS: &[&str] = &["pem", "pub", "cert", "crt"];
const CHECKSUM_SUFFIXES: &[&str] = &[
    ".sha512", ".sha512sum", ".sha256", ".sha256sum",
    ".md5", ".md5sum", ".sha1", ".sha1sum", ".shasum",
];

/// Classify a filename into its semantic `Kind`. Pure function of the name; the same name
/// always classifies the same way.
pub fn classify(name: &str) -> Kind {
    let lower = name.to_ascii_lowercase();
    let ext = last_extension(&lower);

    if let Some(ext) = ext {
        if INSTALLER_EXTENSIONS.contains(&ext) {
            return Kind::Installer;
        }
        if ARCHIVE_EXTENSIONS.contains(&ext) {
            return Kind::Archive;
        }
        if ext == "exe" {
            return Kind::Binary;
        }
        if SIGNATURE_EXTENSIONS.contains(&ext) {
            return Kind::Signature;
        }
        if KEY_EXTENSIONS.contains(&ext) {
            return Kind::Key;
        }
        if ext == "json" {
            if lower.contains(".sbom") || lower.contains(".bom") {
                return Kind::Sbom;
            }
            return Kind::Data;
        }
        if ext == "sbom" || ext == "bom" {
            return Kind::Sbom;
        }
    }

    if CHECKSUM_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return Kind::Checksum;
    }
    if lower.contains("checksums") {
        return Kind::Checksum;
    }
    if lower.contains("sha") && lower.contains("sums") {
        return Kind::Checksum;
    }
    if lower.contains("sums") {
        return Kind::Checksum;
    }

    if lower.contains("-pivkey-") {
        return Kind::Key;
    }
    if lower.contains("pkcs") && lower.contains("key") {
        return Kind::Key;
    }

    Kind::Unknown
}

/// The checksum "shape" of a classified-Checksum name: whether the file covers a single asset
/// (sidecar, e.g. `foo.tar.gz.sha256`) or a table of many (e.g. `checksums.txt`).
pub fn checksum_kind(name: &str) -> ChecksumKind {
    let lower = name.to_ascii_lowercase();

    if CHECKSUM_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return ChecksumKind::Single;
    }
    if lower.contains("checksums") || lower.contains("checksum")
        || (lower.contains("sha") && lower.contains("sums")) || lower.contains("sums") {
        return ChecksumKind::Multi;
    }

    ChecksumKind::None
}

fn last_extension(lower_name: &str) -> Option<&str> {
    lower_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Strip the signature/checksum extension from a name to recover the name of the file it
/// covers, e.g. `foo.tar.gz.asc` -> `foo.tar.gz`, `foo.tar.gz.sig` -> `foo.tar.gz`.
pub fn strip_covering_extension(name: &str) -> &str {
    for ext in SIGNATURE_EXTENSIONS.iter().chain(["sig.asc", "gpg", "keyless.sig"].iter()) {
        let suffix = format!(".{ext}");
        if let Some(stripped) = name.strip_suffix(&suffix) {
            return stripped;
        }
    }
    for suffix in CHECKSUM_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped;
        }
    }
    name
}

/// Iteratively strip trailing extensions (stopping at an extension that's empty, too long, or
/// contains an underscore) the way the scorer's accuracy-bonus tokenizer does.
pub fn get_base_name(name: &str) -> String {
    let mut current = name.to_string();

    loop {
        let Some((stem, ext)) = current.rsplit_once('.') else { break };
        if ext.is_empty() || ext.len() > 5 || ext.contains('_') {
            break;
        }
        current = stem.to_string();
    }

    current
}

#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub alias: Option<String>,
    pub installable: bool,
}

/// A single candidate file attached to a release, accumulating state as it is processed.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub kind: Kind,
    pub parent_kind: Kind,
    pub checksum_kind: ChecksumKind,
    pub matched_asset: Option<String>,
    pub download_path: Option<PathBuf>,
    pub hash: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub files: Vec<File>,
}

impl Asset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Asset {
        let name = name.into();
        let kind = classify(&name);
        let parent_kind = match kind {
            Kind::Signature | Kind::Checksum => classify(strip_covering_extension(&name)),
            _ => Kind::Unknown,
        };
        let checksum_kind = checksum_kind(&name);

        Asset {
            id: id.into(),
            display_name: name.clone(),
            name,
            kind,
            parent_kind,
            checksum_kind,
            matched_asset: None,
            download_path: None,
            hash: None,
            temp_dir: None,
            files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_archives_and_binaries() {
        assert_eq!(classify("app-linux-amd64.tar.gz"), Kind::Archive);
        assert_eq!(classify("app-windows-amd64.exe"), Kind::Binary);
        assert_eq!(classify("app.deb"), Kind::Installer);
        assert_eq!(classify("app-linux-amd64"), Kind::Unknown);
    }

    #[test]
    fn classifies_checksum_variants() {
        assert_eq!(classify("app.tar.gz.sha256"), Kind::Checksum);
        assert_eq!(classify("checksums.txt"), Kind::Checksum);
        assert_eq!(classify("cosign_checksums.txt"), Kind::Checksum);
        assert_eq!(classify("SHA256SUMS"), Kind::Checksum);
    }

    #[test]
    fn classifies_signature_and_key() {
        assert_eq!(classify("app.tar.gz.sig"), Kind::Signature);
        assert_eq!(classify("app.tar.gz.asc"), Kind::Signature);
        assert_eq!(classify("release-cosign.pub"), Kind::Key);
        assert_eq!(classify("cert.pem"), Kind::Key);
    }

    #[test]
    fn classifies_sbom_and_data() {
        assert_eq!(classify("app.sbom.json"), Kind::Sbom);
        assert_eq!(classify("app.cdx.json"), Kind::Data);
    }

    #[test]
    fn parent_kind_is_covered_files_kind() {
        let sig = Asset::new("1", "pulumi-v3.133.0-linux-x64.tar.gz.sig");
        assert_eq!(sig.kind, Kind::Signature);
        assert_eq!(sig.parent_kind, Kind::Archive);

        let checksum = Asset::new("2", "cosign-linux-amd64.sha256");
        assert_eq!(checksum.kind, Kind::Checksum);
        assert_eq!(checksum.parent_kind, Kind::Unknown);
    }

    #[test]
    fn base_name_strips_known_extensions_only() {
        assert_eq!(get_base_name("app-linux-amd64.tar.gz"), "app-linux-amd64");
        assert_eq!(get_base_name("app_with_underscored_ext.tar_gz"), "app_with_underscored_ext.tar_gz");
        assert_eq!(get_base_name("app"), "app");
    }
}
