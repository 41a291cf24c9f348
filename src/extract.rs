//! Archive format detection and streaming extraction into a fresh temporary directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tar::Archive;
use tempfile::TempDir;

use crate::asset::Kind;
use crate::core::GenericResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    TarGz,
    TarBz2,
    TarXz,
    TarZstd,
    Tar,
    Zip,
    Gz,
    Bz2,
    Xz,
    Zstd,
}

fn detect(name: &str) -> Option<Format> {
    let lower = name.to_ascii_lowercase();

    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") { return Some(Format::TarGz); }
    if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") { return Some(Format::TarBz2); }
    if lower.ends_with(".tar.xz") || lower.ends_with(".txz") { return Some(Format::TarXz); }
    if lower.ends_with(".tar.zst") || lower.ends_with(".tar.zstd") { return Some(Format::TarZstd); }
    if lower.ends_with(".tar") { return Some(Format::Tar); }
    if lower.ends_with(".zip") { return Some(Format::Zip); }
    if lower.ends_with(".gz") { return Some(Format::Gz); }
    if lower.ends_with(".bz2") { return Some(Format::Bz2); }
    if lower.ends_with(".xz") { return Some(Format::Xz); }
    if lower.ends_with(".zst") || lower.ends_with(".zstd") { return Some(Format::Zstd); }

    None
}

/// Extract `archive_path` (whose format is sniffed from `display_name`) into a freshly created
/// temporary directory and return it. Entry names (not full paths) are returned alongside.
///
/// An asset with no recognized archive suffix is only an error if it was classified as
/// [`Kind::Archive`] (a format we should have recognized but didn't); anything else with no
/// archive suffix is a direct file and is copied into the temp dir verbatim.
pub fn extract(archive_path: &Path, display_name: &str, kind: Kind) -> GenericResult<(TempDir, Vec<String>)> {
    let Some(format) = detect(display_name) else {
        if kind == Kind::Archive {
            return Err!("invalid archive format");
        }
        return extract_direct_file(archive_path, display_name);
    };

    let dir = TempDir::new()?;
    let mut names = Vec::new();

    match format {
        Format::TarGz | Format::TarBz2 | Format::TarXz | Format::TarZstd | Format::Tar => {
            let file = File::open(archive_path)?;
            let reader: Box<dyn Read> = match format {
                Format::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
                Format::TarBz2 => Box::new(bzip2::read::BzDecoder::new(file)),
                Format::TarXz => Box::new(xz2::read::XzDecoder::new(file)),
                Format::TarZstd => Box::new(zstd::stream::Decoder::new(file)?),
                Format::Tar => Box::new(file),
                _ => unreachable!(),
            };
            extract_tar(reader, dir.path(), &mut names)?;
        },
        Format::Zip => extract_zip(archive_path, dir.path(), &mut names)?,
        Format::Gz | Format::Bz2 | Format::Xz | Format::Zstd => {
            let file = File::open(archive_path)?;
            let mut reader: Box<dyn Read> = match format {
                Format::Gz => Box::new(flate2::read::GzDecoder::new(file)),
                Format::Bz2 => Box::new(bzip2::read::BzDecoder::new(file)),
                Format::Xz => Box::new(xz2::read::XzDecoder::new(file)),
                Format::Zstd => Box::new(zstd::stream::Decoder::new(file)?),
                _ => unreachable!(),
            };

            let name = strip_compression_extension(display_name);
            let dest = dir.path().join(&name);
            let mut out = File::create(&dest)?;
            std::io::copy(&mut reader, &mut out)?;
            names.push(name);
        },
    }

    Ok((dir, names))
}

/// Copy a non-archive asset into a fresh temp dir under its display name, unchanged.
fn extract_direct_file(path: &Path, display_name: &str) -> GenericResult<(TempDir, Vec<String>)> {
    let dir = TempDir::new()?;
    fs::copy(path, dir.path().join(display_name))?;
    Ok((dir, vec![display_name.to_owned()]))
}

fn strip_compression_extension(name: &str) -> String {
    for ext in [".gz", ".bz2", ".xz", ".zst", ".zstd"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            return stripped.to_owned();
        }
    }
    name.to_owned()
}

fn extract_tar(reader: impl Read, dest: &Path, names: &mut Vec<String>) -> GenericResult<()> {
    let mut archive = Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        let path = entry.path()?.to_path_buf();

        if entry_type.is_dir() {
            fs::create_dir_all(dest.join(&path))?;
            continue;
        }
        if !(entry_type.is_file() || entry_type.is_continuous()) {
            continue;
        }

        let out_path = dest.join(&path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&out_path)?;

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_owned());
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path, names: &mut Vec<String>) -> GenericResult<()> {
    let file = File::open(archive_path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else { continue };

        if entry.is_dir() {
            fs::create_dir_all(dest.join(&enclosed))?;
            continue;
        }

        let out_path = dest.join(&enclosed);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;

        if let Some(name) = enclosed.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_owned());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_archive_extensions() {
        assert_eq!(detect("app-linux-amd64.tar.gz"), Some(Format::TarGz));
        assert_eq!(detect("app.tgz"), Some(Format::TarGz));
        assert_eq!(detect("app.tar.xz"), Some(Format::TarXz));
        assert_eq!(detect("app.zip"), Some(Format::Zip));
        assert_eq!(detect("app.tar.zst"), Some(Format::TarZstd));
        assert_eq!(detect("app-linux-amd64"), None);
    }

    #[test]
    fn strips_single_level_compression_extension() {
        assert_eq!(strip_compression_extension("app.gz"), "app");
        assert_eq!(strip_compression_extension("app.zst"), "app");
    }

    #[test]
    fn unrecognized_non_archive_is_installed_as_a_direct_file() {
        let src = tempfile::NamedTempFile::new().unwrap();
        fs::write(src.path(), b"#!/bin/sh\necho hi\n").unwrap();

        let (dir, names) = extract(src.path(), "cosign-linux-amd64", Kind::Unknown).unwrap();
        assert_eq!(names, vec!["cosign-linux-amd64".to_owned()]);
        assert!(dir.path().join("cosign-linux-amd64").is_file());
    }

    #[test]
    fn unrecognized_archive_kind_is_an_error() {
        let src = tempfile::NamedTempFile::new().unwrap();
        let result = extract(src.path(), "app-linux-amd64", Kind::Archive);
        assert!(result.is_err());
    }
}
