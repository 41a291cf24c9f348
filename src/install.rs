//! Installation: name normalization, the installable-file sniff, copying into the opt
//! directory, and creating the bin-directory symlinks.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{symlink, OpenOptionsExt};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::core::{EmptyResult, GenericResult};
use crate::file_types;
use crate::osconfig::{Arch, HostPlatform, Os};

pub struct InstalledBinary {
    pub name: String,
    pub opt_path: PathBuf,
}

/// Strip every OS/arch/version token from `file_name` so the installed executable has a
/// stable, tool-shaped name (`app-linux-amd64-v1.2.3` -> `app`).
pub fn normalize_name(file_name: &str, os: Os, arch: Arch, version: &str) -> String {
    let had_exe = file_name.to_ascii_lowercase().ends_with(".exe");
    let mut name = if had_exe {
        file_name[..file_name.len() - 4].to_owned()
    } else {
        file_name.to_owned()
    };

    let mut terms: Vec<String> = Vec::new();
    terms.push(os.canonical_name().to_owned());
    terms.extend(os.aliases().iter().map(|s| s.to_string()));
    terms.push(arch.canonical_name().to_owned());
    terms.extend(arch.synonyms().iter().map(|s| s.to_string()));
    terms.push(version.to_owned());
    terms.push(format!("v{version}"));

    for term in &terms {
        name = remove_case_insensitive(&name, term);
    }
    name = strip_version_stamp(&name);

    let name = name.trim_matches(|c: char| c == ' ' || c == '-' || c == '_').to_owned();
    let name = if name.is_empty() { file_name.to_owned() } else { name };

    if matches!(os, Os::Windows) || had_exe {
        format!("{name}.exe")
    } else {
        name
    }
}

fn remove_case_insensitive(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_owned();
    }

    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut result = String::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut lower_rest = lower_haystack.as_str();

    while let Some(pos) = lower_rest.find(&lower_needle) {
        result.push_str(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
        lower_rest = &lower_rest[pos + needle.len()..];
    }
    result.push_str(rest);

    result
}

/// Strip trailing `\d+\.\d+(\.\d+)?`-shaped OS-version stamps left over after removing the
/// tool's own version (e.g. a macOS SDK suffix).
fn strip_version_stamp(name: &str) -> String {
    let bytes: Vec<char> = name.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let mut j = i;
            let mut dots = 0;
            while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == '.') {
                if bytes[j] == '.' {
                    dots += 1;
                }
                j += 1;
            }
            if dots >= 1 && bytes[i..j].iter().any(|c| c.is_ascii_digit()) {
                i = j;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

/// Copy every installable extracted file into `opt/<source>/<owner>/<repo>/<version>/` under
/// its normalized name. When the host platform matches the asset's platform, also create the
/// `bin/<name>` and `bin/<name>@<version>` symlinks, replacing whatever was there before.
pub fn install_extracted(
    config: &Config, host: &HostPlatform,
    source: &str, owner: &str, repo: &str, version: &str,
    asset_os: Os, asset_arch: Arch,
    extracted_dir: &Path, entry_names: &[String],
) -> GenericResult<Vec<InstalledBinary>> {
    let mut installed = Vec::new();

    for entry in entry_names {
        let entry_path = extracted_dir.join(entry);
        if !entry_path.is_file() {
            continue;
        }
        if !file_types::sniff_installable(&entry_path, host.os)? {
            continue;
        }

        let normalized = normalize_name(entry, asset_os, asset_arch, version);
        let opt_dir = config.get_opt_path().join(source).join(owner).join(repo).join(version);
        fs::create_dir_all(&opt_dir)?;

        let opt_path = opt_dir.join(&normalized);
        copy_executable(&entry_path, &opt_path)?;
        info!("Installed {normalized:?} to {opt_path:?}.");

        if host.os == asset_os && host.arch == asset_arch {
            create_symlinks(config, &normalized, version, &opt_path)?;
        }

        installed.push(InstalledBinary {name: normalized, opt_path});
    }

    if installed.is_empty() {
        return Err!("binary not found in release");
    }

    Ok(installed)
}

fn copy_executable(src: &Path, dest: &Path) -> EmptyResult {
    let tmp_path = dest.with_extension("tmp");

    {
        let mut input = File::open(src)?;
        let mut output = OpenOptions::new()
            .create(true).write(true).truncate(true)
            .mode(0o755)
            .custom_flags(libc::O_NOFOLLOW)
            .open(&tmp_path)
            .map_err(|e| format!("unable to create {tmp_path:?}: {e}"))?;
        io::copy(&mut input, &mut output)?;
        output.sync_all()?;
    }

    fs::rename(&tmp_path, dest).map_err(|e| format!("unable to rename {tmp_path:?} to {dest:?}: {e}"))?;
    Ok(())
}

fn create_symlinks(config: &Config, name: &str, version: &str, opt_path: &Path) -> EmptyResult {
    let bin_dir = config.get_bin_path();
    fs::create_dir_all(&bin_dir)?;

    let version_stripped = version.strip_prefix('v').unwrap_or(version);

    for link_name in [name.to_owned(), format!("{name}@{version_stripped}")] {
        let link_path = bin_dir.join(&link_name);
        match fs::symlink_metadata(&link_path) {
            Ok(_) => fs::remove_file(&link_path)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => return Err(err.into()),
        }
        symlink(opt_path, &link_path).map_err(|e| format!("unable to symlink {link_path:?}: {e}"))?;
        debug!("Created symlink {link_path:?} -> {opt_path:?}.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_os_arch_and_version_tokens() {
        assert_eq!(normalize_name("app-linux-amd64-v1.2.3", Os::Linux, Arch::Amd64, "1.2.3"), "app");
        assert_eq!(normalize_name("app_darwin_arm64_1.2.3", Os::Darwin, Arch::Arm64, "1.2.3"), "app");
    }

    #[test]
    fn windows_names_keep_exe_suffix() {
        assert_eq!(normalize_name("app-windows-amd64.exe", Os::Windows, Arch::Amd64, "1.2.3"), "app.exe");
    }

    #[test]
    fn darwin_alias_mac_is_stripped() {
        assert_eq!(normalize_name("caddy_2.9.0_mac_arm64", Os::Darwin, Arch::Arm64, "2.9.0"), "caddy");
    }

    #[test]
    fn empty_result_falls_back_to_original_name() {
        assert_eq!(normalize_name("linux-amd64-1.0.0", Os::Linux, Arch::Amd64, "1.0.0"), "linux-amd64-1.0.0");
    }
}

