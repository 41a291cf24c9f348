//! Removes bin symlinks whose target no longer exists on disk (e.g. after an opt directory was
//! deleted manually).

use std::fs;

use log::info;

use crate::config::Config;
use crate::core::GenericResult;

pub fn clean(config: &Config) -> GenericResult<usize> {
    let bin_path = config.get_bin_path();
    let mut removed = 0;

    let entries = match fs::read_dir(&bin_path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        let Ok(metadata) = fs::symlink_metadata(&path) else { continue };
        if !metadata.file_type().is_symlink() {
            continue;
        }

        if fs::metadata(&path).is_err() {
            fs::remove_file(&path)?;
            info!("Removed orphaned symlink {path:?}.");
            removed += 1;
        }
    }

    Ok(removed)
}
