//! Reconstructs the installed-bins model by walking the bin symlink tree and mapping each
//! link's target back onto a `(source, owner, repo)` key and version.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::GenericResult;

#[derive(Debug, Clone)]
pub struct Version {
    pub version: String,
    pub path: PathBuf,
    pub target: PathBuf,
    pub latest: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Bin {
    pub versions: Vec<Version>,
}

#[derive(Debug, Default)]
pub struct Inventory {
    bins: BTreeMap<String, Bin>,
}

impl Inventory {
    pub fn build(bin_path: &Path, opt_path: &Path) -> GenericResult<Inventory> {
        let mut latest_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut pending: BTreeMap<String, Vec<(String, PathBuf, PathBuf)>> = BTreeMap::new();

        let entries = match fs::read_dir(bin_path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Inventory::default()),
            Err(err) => return Err(err.into()),
        };

        for entry in entries {
            let entry = entry?;
            let link_path = entry.path();

            let metadata = fs::symlink_metadata(&link_path)?;
            if !metadata.file_type().is_symlink() {
                continue;
            }

            let target = fs::read_link(&link_path)?;
            let basename = link_path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

            let (name, version) = match basename.split_once('@') {
                Some((name, version)) => (name.to_owned(), Some(version.to_owned())),
                None => (basename.to_owned(), None),
            };

            let Some(key) = bin_key(opt_path, &target) else { continue };

            match version {
                None => {
                    latest_paths.insert(key, target);
                },
                Some(version) => {
                    pending.entry(key).or_default().push((version, link_path, target));
                },
            }
        }

        let mut bins = BTreeMap::new();
        for (key, versions) in pending {
            let latest_target = latest_paths.get(&key);
            let mut bin = Bin::default();
            for (version, path, target) in versions {
                let latest = latest_target.is_some_and(|lt| *lt == target);
                bin.versions.push(Version {version, path, target, latest});
            }
            bin.versions.sort_by(|a, b| a.version.cmp(&b.version));
            bins.insert(key, bin);
        }

        Ok(Inventory {bins})
    }

    pub fn get_bin_versions(&self, key: &str) -> Option<&[Version]> {
        self.bins.get(key).map(|bin| bin.versions.as_slice())
    }

    pub fn get_bin_version(&self, key: &str, version: &str) -> Option<&Version> {
        let versions = self.get_bin_versions(key)?;
        if version == "latest" {
            return versions.iter().find(|v| v.latest);
        }
        versions.iter().find(|v| v.version == version)
    }

    pub fn get_latest_version(&self, key: &str) -> Option<&Version> {
        self.get_bin_versions(key)?.iter().find(|v| v.latest)
    }

    pub fn count(&self) -> usize {
        self.bins.len()
    }

    pub fn full_count(&self) -> usize {
        self.bins.values().map(|bin| bin.versions.len()).sum()
    }

    pub fn bins_sorted_keys(&self) -> Vec<&str> {
        self.bins.keys().map(|s| s.as_str()).collect()
    }
}

/// `opt/<source>/<owner>/<repo>/<version>/<executable>` -> `source/owner/repo`.
fn bin_key(opt_path: &Path, target: &Path) -> Option<String> {
    let relative = target.strip_prefix(opt_path).ok().unwrap_or(target);
    let components: Vec<&str> = relative.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    if components.len() < 3 {
        return None;
    }

    Some(format!("{}/{}/{}", components[0], components[1], components[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn reconstructs_latest_and_pinned_versions() {
        let root = tempdir().unwrap();
        let bin = root.path().join("bin");
        let opt = root.path().join("opt");
        fs::create_dir_all(&bin).unwrap();

        let v1 = opt.join("github/owner/repo/1.0.0/repo");
        let v2 = opt.join("github/owner/repo/2.0.0/repo");
        fs::create_dir_all(v1.parent().unwrap()).unwrap();
        fs::create_dir_all(v2.parent().unwrap()).unwrap();
        fs::write(&v1, b"").unwrap();
        fs::write(&v2, b"").unwrap();

        symlink(&v2, bin.join("repo")).unwrap();
        symlink(&v1, bin.join("repo@1.0.0")).unwrap();
        symlink(&v2, bin.join("repo@2.0.0")).unwrap();

        let inventory = Inventory::build(&bin, &opt).unwrap();
        let key = "github/owner/repo";

        assert_eq!(inventory.get_bin_versions(key).unwrap().len(), 2);
        assert_eq!(inventory.get_latest_version(key).unwrap().version, "2.0.0");
        assert!(!inventory.get_bin_version(key, "1.0.0").unwrap().latest);
        assert!(inventory.get_bin_version(key, "2.0.0").unwrap().latest);
        assert!(inventory.get_bin_version(key, "latest").unwrap().latest);
    }

    #[test]
    fn at_most_one_version_is_latest() {
        let root = tempdir().unwrap();
        let bin = root.path().join("bin");
        let opt = root.path().join("opt");
        fs::create_dir_all(&bin).unwrap();

        let v1 = opt.join("github/owner/repo/1.0.0/repo");
        fs::create_dir_all(v1.parent().unwrap()).unwrap();
        fs::write(&v1, b"").unwrap();
        symlink(&v1, bin.join("repo@1.0.0")).unwrap();

        let inventory = Inventory::build(&bin, &opt).unwrap();
        let versions = inventory.get_bin_versions("github/owner/repo").unwrap();
        assert_eq!(versions.iter().filter(|v| v.latest).count(), 0);
    }

    #[test]
    fn missing_bin_directory_yields_empty_inventory() {
        let root = tempdir().unwrap();
        let inventory = Inventory::build(&root.path().join("bin"), &root.path().join("opt")).unwrap();
        assert_eq!(inventory.count(), 0);
    }
}
