//! Top-level install orchestration: resolves an identifier, fetches the release, runs discovery
//! over its assets, downloads the selected subset, verifies, extracts and installs. This is the
//! one place that wires every other module together.

use std::collections::HashMap;
use std::path::Path;

use log::info;

use crate::asset::{Asset, Kind};
use crate::config::Config;
use crate::core::GenericResult;
use crate::discover::{self, SignatureType};
use crate::download;
use crate::extract;
use crate::identifier;
use crate::install::{self, InstalledBinary};
use crate::keyfetch;
use crate::osconfig::HostPlatform;
use crate::provider::github::GitHub;
use crate::provider::{ReleaseAsset, ReleaseSource};
use crate::verify::{self, SignatureKind};

#[derive(Default)]
pub struct InstallOptions {
    pub force: bool,
    pub no_score_check: bool,
    pub no_checksum_verify: bool,
    pub no_signature_verify: bool,
}

pub struct Installed {
    pub identifier: identifier::Identifier,
    pub tag: String,
    pub binaries: Vec<InstalledBinary>,
}

/// Install a single `<source>/<owner>/<repo>[@version]` identifier.
pub fn install(config: &Config, raw_identifier: &str, opts: &InstallOptions) -> GenericResult<Installed> {
    let id = identifier::parse(config, raw_identifier)?;
    if id.source != "github" {
        return Err!("unsupported source {:?}: only github is implemented", id.source);
    }

    let host = HostPlatform::detect()?;
    let source = GitHub::new()?;

    let requested_version = if id.version == "latest" { None } else { Some(id.version.as_str()) };
    let release = source.get_release(&id.owner, &id.repo, requested_version)?;

    let opt_dir = config.get_opt_path().join(&id.source).join(&id.owner).join(&id.repo).join(&release.tag);
    if !opts.force && opt_dir.is_dir() {
        return Err!("{} is already installed at {:?}, use --force to reinstall", id.key(), opt_dir);
    }

    let by_name: HashMap<&str, &ReleaseAsset> = release.assets.iter().map(|a| (a.name.as_str(), a)).collect();
    let mut assets: Vec<Asset> = release.assets.iter().enumerate()
        .map(|(i, a)| Asset::new(i.to_string(), a.name.clone())).collect();

    let discovered = discover::discover(&mut assets, &discover::Options {
        repo_name: id.repo.clone(),
        version: release.tag.clone(),
        os: host.os,
        arch: host.arch,
        no_score_check: opts.no_score_check,
    })?;

    let binary_name = discovered.binary.as_ref().ok_or("no installable asset found")?;
    let binary_asset = *by_name.get(binary_name.as_str()).ok_or("discovered asset vanished from the release")?;

    let downloads_dir = config.get_downloads_path();
    let client = download::build_client()?;

    let (binary_path, _binary_hash) = download::fetch_to_cache(
        &client, &reqwest::Url::parse(&binary_asset.url)?, &downloads_dir, binary_name,
    )?;

    let checksum_path = match &discovered.checksum {
        Some(name) => {
            let asset = *by_name.get(name.as_str()).ok_or("discovered checksum asset vanished")?;
            Some(download::fetch_to_cache(&client, &reqwest::Url::parse(&asset.url)?, &downloads_dir, name)?.0)
        },
        None => None,
    };

    if !opts.no_checksum_verify {
        verify::verify_checksum(&config.settings, checksum_path.as_deref(), binary_name, &binary_path)?;
    }

    if !opts.no_signature_verify {
        verify_signature(&client, &downloads_dir, config, &discovered, &by_name, binary_name, &binary_path, checksum_path.as_deref())?;
    }

    let binary_kind = assets.iter().find(|a| a.name == *binary_name).map(|a| a.kind).unwrap_or(Kind::Unknown);
    let (temp_dir, entry_names) = extract::extract(&binary_path, binary_name, binary_kind)?;

    let binaries = install::install_extracted(
        config, &host, &id.source, &id.owner, &id.repo, &release.tag,
        host.os, host.arch, temp_dir.path(), &entry_names,
    )?;

    info!("{} ({}): installed {} binarie(s).", id.key(), release.tag, binaries.len());

    Ok(Installed {identifier: id, tag: release.tag, binaries})
}

#[allow(clippy::too_many_arguments)]
fn verify_signature(
    client: &reqwest::blocking::Client, downloads_dir: &Path, config: &Config,
    discovered: &discover::Discovered, by_name: &HashMap<&str, &ReleaseAsset>,
    binary_name: &str, binary_path: &Path, checksum_path: Option<&Path>,
) -> GenericResult<()> {
    let Some(signature_name) = &discovered.signature else {
        return verify::verify_signature(
            &config.settings, SignatureKind::Gpg, None, None,
            checksum_path.unwrap_or(binary_path),
        );
    };

    let signature_asset = *by_name.get(signature_name.as_str()).ok_or("discovered signature asset vanished")?;
    let (signature_path, _) = download::fetch_to_cache(
        client, &reqwest::Url::parse(&signature_asset.url)?, downloads_dir, signature_name,
    )?;

    let signed_path = match discovered.signature_type {
        SignatureType::Checksum => checksum_path.unwrap_or(binary_path),
        SignatureType::File | SignatureType::None => binary_path,
    };

    if signature_name.ends_with(".asc") {
        let key_bytes = match &discovered.key {
            Some(key_name) => {
                let key_asset = *by_name.get(key_name.as_str()).ok_or("discovered key asset vanished")?;
                let (key_path, _) = download::fetch_to_cache(client, &reqwest::Url::parse(&key_asset.url)?, downloads_dir, key_name)?;
                std::fs::read(&key_path)?
            },
            None => {
                let signature_bytes = std::fs::read(&signature_path)?;
                let key_id = crate::verify::gpg::signature_key_id(&signature_bytes)?
                    .ok_or("signature carries no key ID and no public key asset was found")?;
                keyfetch::fetch_public_key(client, &key_id.to_hex())?
            },
        };
        return verify::verify_signature(&config.settings, SignatureKind::Gpg, Some(&signature_path), Some(&key_bytes), signed_path);
    }

    let contents = std::fs::read(&signature_path)?;
    if contents.trim_ascii_start().starts_with(b"{") {
        return verify::verify_signature(&config.settings, SignatureKind::CosignBundle, Some(&signature_path), None, signed_path);
    }

    let key_bytes = match &discovered.key {
        Some(key_name) => {
            let key_asset = *by_name.get(key_name.as_str()).ok_or("discovered key asset vanished")?;
            let (key_path, _) = download::fetch_to_cache(client, &reqwest::Url::parse(&key_asset.url)?, downloads_dir, key_name)?;
            Some(std::fs::read(&key_path)?)
        },
        None => None,
    };

    verify::verify_signature(&config.settings, SignatureKind::CosignKeyed, Some(&signature_path), key_bytes.as_deref(), signed_path)
}

/// Drives a Distfile's install commands through [`install`], collecting per-identifier errors.
pub fn install_many(config: &Config, identifiers: &[String], parallel: usize, opts: &InstallOptions) -> GenericResult<()> {
    let commands: Vec<crate::recipe::Command> = identifiers.iter()
        .map(|id| crate::recipe::Command::Install {identifier: id.clone()})
        .collect();

    crate::recipe::run(&commands, parallel, || false, |identifier| {
        install(config, identifier, opts).map(|_| ())
    })
}
