//! Content-addressed asset downloader: fetches a URL to the downloads cache, recording a
//! SHA-256 hex sentinel alongside it, skipping the network entirely when the sentinel already
//! exists.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use const_format::formatcp;
use log::debug;
use openssl::hash::{Hasher, MessageDigest};
use reqwest::blocking::{Client, ClientBuilder};
use url::Url;

use crate::core::{EmptyResult, GenericResult};

pub static USER_AGENT: &str = formatcp!(
    "{name}/{version} ({homepage})",
    name=env!("CARGO_PKG_NAME"), version=env!("CARGO_PKG_VERSION"), homepage=env!("CARGO_PKG_REPOSITORY"),
);

pub fn build_client() -> GenericResult<Client> {
    Ok(ClientBuilder::new().user_agent(USER_AGENT).build()?)
}

/// Download `url` into `<downloads_dir>/<asset_id>` unless a `.sha256` sentinel already marks
/// it complete. Returns the destination path and its hex SHA-256 digest.
pub fn fetch_to_cache(
    client: &Client, url: &Url, downloads_dir: &Path, asset_id: &str,
) -> GenericResult<(PathBuf, String)> {
    fs::create_dir_all(downloads_dir)?;

    let dest = downloads_dir.join(asset_id);
    let sentinel = sentinel_path(&dest);

    if let Some(hash) = read_sentinel(&sentinel)? {
        debug!("{dest:?} is already downloaded (sha256:{hash}), skipping.");
        return Ok((dest, hash));
    }

    debug!("Downloading {url} to {dest:?}...");

    let mut response = client.get(url.clone()).send()?;
    if !response.status().is_success() {
        return Err!("the server returned an error: {}", response.status());
    }

    let tmp_path = dest.with_extension("tmp");
    let hash = {
        let mut tmp_file = File::create(&tmp_path)?;
        let mut hasher = Hasher::new(MessageDigest::sha256())?;
        copy_tee(&mut response, &mut tmp_file, &mut hasher)?;
        tmp_file.flush()?;
        hex::encode(hasher.finish()?.as_ref())
    };

    fs::rename(&tmp_path, &dest)?;
    write_sentinel(&sentinel, &hash)?;

    Ok((dest, hash))
}

/// Copy `src` into both `dest` and `hasher` in a single pass over the bytes. Exactly one
/// write per byte read — no redundant second pass over the body.
fn copy_tee(src: &mut impl Read, dest: &mut impl Write, hasher: &mut Hasher) -> EmptyResult {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = src.read(&mut buf)?;
        if read == 0 {
            break;
        }
        dest.write_all(&buf[..read])?;
        hasher.update(&buf[..read])?;
    }
    Ok(())
}

fn sentinel_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap().to_os_string();
    name.push(".sha256");
    dest.with_file_name(name)
}

fn read_sentinel(path: &Path) -> GenericResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_owned())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_sentinel(path: &Path, hash: &str) -> EmptyResult {
    fs::write(path, hash)?;
    Ok(())
}

/// Manual hex encoding: the digest is fixed-width and this is the only call site, so pulling
/// in a dedicated hex crate isn't warranted.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            write!(out, "{byte:02x}").unwrap();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sentinel_round_trip() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("asset-123");
        let sentinel = sentinel_path(&dest);

        assert_eq!(read_sentinel(&sentinel).unwrap(), None);
        write_sentinel(&sentinel, "deadbeef").unwrap();
        assert_eq!(read_sentinel(&sentinel).unwrap(), Some("deadbeef".to_owned()));
    }

    #[test]
    fn hex_encode_matches_known_digest() {
        let hasher_empty = {
            let mut h = Hasher::new(MessageDigest::sha256()).unwrap();
            h.finish().unwrap()
        };
        assert_eq!(
            hex::encode(hasher_empty.as_ref()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85",
        );
    }
}