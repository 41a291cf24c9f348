//! Inverse of install: remove bin symlinks and the opt directory for one or more installed
//! tool keys, optionally pinned to a single version.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;

use crate::config::Config;
use crate::core::{EmptyResult, GenericResult};
use crate::inventory::Inventory;
use crate::util;

pub fn uninstall(config: &Config, keys: &[String], yes: bool) -> GenericResult<()> {
    let bin_path = config.get_bin_path();
    let opt_path = config.get_opt_path();
    let inventory = Inventory::build(&bin_path, &opt_path)?;

    let mut plans = Vec::new();
    for raw in keys {
        let (key, version) = match raw.split_once('@') {
            Some((key, version)) => (key, Some(version)),
            None => (raw.as_str(), None),
        };

        let versions = inventory.get_bin_versions(key)
            .ok_or_else(|| format!("{key} isn't installed"))?;

        let selected: Vec<_> = match version {
            Some(version) => versions.iter().filter(|v| v.version == version).collect(),
            None => versions.iter().collect(),
        };
        if selected.is_empty() {
            return Err!("{key}@{}: no such installed version", version.unwrap_or("?"));
        }

        plans.push((key, selected));
    }

    if !yes && !util::confirm("Are you sure you want to uninstall the specified tools?") {
        return Err!("aborted");
    }

    for (key, versions) in plans {
        for version in &versions {
            remove_symlink(&version.path)?;
            if version.latest {
                remove_unversioned_link(&bin_path, version)?;
            }
            remove_opt_dir(version.target.parent().ok_or("malformed opt path")?)?;
            info!("{key}@{}: uninstalled.", version.version);
        }
    }

    Ok(())
}

fn remove_symlink(path: &Path) -> EmptyResult {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err!("unable to delete {path:?}: {err}"),
    }
}

fn remove_unversioned_link(bin_path: &Path, version: &crate::inventory::Version) -> EmptyResult {
    let basename = version.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let Some((name, _)) = basename.split_once('@') else { return Ok(()) };
    let link_path = bin_path.join(name);

    match fs::read_link(&link_path) {
        Ok(target) if target == version.target => remove_symlink(&link_path),
        Ok(_) | Err(_) => Ok(()),
    }
}

fn remove_opt_dir(version_dir: &Path) -> EmptyResult {
    match fs::remove_dir_all(version_dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err!("unable to delete {version_dir:?}: {err}"),
    }
}
