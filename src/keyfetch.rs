//! On-demand fetch of a PGP public key from a keyserver, keyed by its 64-bit key ID.

use reqwest::blocking::Client;

use crate::core::GenericResult;

pub fn fetch_public_key(client: &Client, key_id_hex: &str) -> GenericResult<Vec<u8>> {
    let url = format!("https://keyserver.ubuntu.com/pks/lookup?op=get&search=0x{key_id_hex}");

    let response = client.get(&url).send()?;
    if !response.status().is_success() {
        return Err!("keyserver returned an error for key 0x{key_id_hex}: {}", response.status());
    }

    Ok(response.bytes()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_url_is_well_formed() {
        let url = format!("https://keyserver.ubuntu.com/pks/lookup?op=get&search=0x{}", "ABCDEF0123456789");
        assert!(url.starts_with("https://keyserver.ubuntu.com/pks/lookup?op=get&search=0x"));
        let _ = fetch_public_key; // keep the import exercised without a live network call
    }
}
