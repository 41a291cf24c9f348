//! Checksum-file parsing and comparison: infers the hash family from the hex length of the
//! first field, then scans every line for a match on the target filename.

use openssl::hash::{Hasher, MessageDigest};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::core::GenericResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    fn digest(self) -> MessageDigest {
        match self {
            HashAlgorithm::Md5 => MessageDigest::md5(),
            HashAlgorithm::Sha1 => MessageDigest::sha1(),
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    fn from_hex_len(len: usize) -> Option<HashAlgorithm> {
        match len {
            32 => Some(HashAlgorithm::Md5),
            40 => Some(HashAlgorithm::Sha1),
            64 => Some(HashAlgorithm::Sha256),
            128 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// Verify that `checksum_contents` lists a matching hash for `target_name`, hashing the file
/// at `target_path`. Returns an error describing why verification failed.
pub fn verify(checksum_contents: &str, target_name: &str, target_path: &Path) -> GenericResult<()> {
    let first_line = checksum_contents.lines().find(|l| !l.trim().is_empty())
        .ok_or("checksum file is empty")?;
    let first_field = first_line.split_whitespace().next().ok_or("checksum file is empty")?;

    let algorithm = HashAlgorithm::from_hex_len(first_field.trim_start_matches('*').len())
        .ok_or_else(|| format!("unsupported hash length: {}", first_field.len()))?;

    let actual = hash_file(target_path, algorithm)?;

    for line in checksum_contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(hash) = fields.next() else { continue };
        let hash = hash.trim_start_matches('*');
        let name_field = fields.next();

        if !hash.eq_ignore_ascii_case(&actual) {
            continue;
        }

        match name_field {
            None => return Ok(()),
            Some(name) => {
                let name = name.trim_start_matches('*');
                let basename = Path::new(name).file_name().and_then(|n| n.to_str()).unwrap_or(name);
                if name == target_name || basename == target_name {
                    return Ok(());
                }
            },
        }
    }

    Err!("checksum mismatch for {target_name:?}")
}

fn hash_file(path: &Path, algorithm: HashAlgorithm) -> GenericResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new(algorithm.digest())?;

    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read])?;
    }

    Ok(hex_encode(hasher.finish()?.as_ref()))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write as _;

    fn write_file(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    #[test]
    fn single_column_matches_any_name() {
        let f = write_file(b"hello world");
        let hash = hash_file(f.path(), HashAlgorithm::Sha256).unwrap();
        assert!(verify(&hash, "app.tar.gz", f.path()).is_ok());
    }

    #[test]
    fn two_column_requires_filename_match() {
        let f = write_file(b"hello world");
        let hash = hash_file(f.path(), HashAlgorithm::Sha256).unwrap();
        let contents = format!("{hash}  app.tar.gz\n{hash}  other.tar.gz\n");
        assert!(verify(&contents, "app.tar.gz", f.path()).is_ok());
        assert!(verify(&contents, "missing.tar.gz", f.path()).is_err());
    }

    #[test]
    fn star_prefixed_filename_is_stripped() {
        let f = write_file(b"hello world");
        let hash = hash_file(f.path(), HashAlgorithm::Sha256).unwrap();
        let contents = format!("{hash} *app.tar.gz\n");
        assert!(verify(&contents, "app.tar.gz", f.path()).is_ok());
    }

    #[test]
    fn mismatched_hash_fails() {
        let f = write_file(b"hello world");
        let contents = "0".repeat(64) + "  app.tar.gz\n";
        assert!(verify(&contents, "app.tar.gz", f.path()).is_err());
    }
}
