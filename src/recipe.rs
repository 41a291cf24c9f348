//! Distfile recipe parsing and the bounded-concurrency install dispatcher.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use log::warn;

use crate::core::{EmptyResult, GenericResult};
use crate::inventory::Inventory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Install {identifier: String},
    Include {path: PathBuf},
}

/// Parse a Distfile, recursively following `file`/`distfile` includes. `currently_including`
/// is threaded explicitly (not a module-level global) so parsing is reentrant and testable.
pub fn parse_file(path: &Path, currently_including: &mut HashSet<PathBuf>) -> GenericResult<Vec<Command>> {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    if !currently_including.insert(canonical.clone()) {
        return Err!("circular inclusion detected: {path:?}");
    }

    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    let mut commands = Vec::new();

    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.splitn(2, char::is_whitespace);
        let action = tokens.next().unwrap_or_default();
        let rest = tokens.next().unwrap_or_default().trim();

        match action {
            "install" | "distill" | "dist" => {
                if rest.is_empty() {
                    return Err!("{path:?}:{}: missing identifier argument", lineno + 1);
                }
                commands.push(Command::Install {identifier: rest.to_owned()});
            },
            "file" | "distfile" => {
                if rest.is_empty() {
                    return Err!("{path:?}:{}: missing path argument", lineno + 1);
                }
                let included_path = resolve_relative(path, rest);
                let nested = parse_file(&included_path, currently_including)?;
                commands.extend(nested);
            },
            other => return Err!("{path:?}:{}: unknown action {other:?}", lineno + 1),
        }
    }

    currently_including.remove(&canonical);
    Ok(commands)
}

fn resolve_relative(base: &Path, included: &str) -> PathBuf {
    let included = Path::new(included);
    if included.is_absolute() {
        return included.to_owned();
    }
    base.parent().unwrap_or(Path::new(".")).join(included)
}

/// Locate the Distfile to run when the user didn't name one explicitly: `./Distfile`, then
/// `$HOME/Distfile`.
pub fn discover_default_path() -> GenericResult<PathBuf> {
    let cwd_candidate = PathBuf::from("Distfile");
    if cwd_candidate.is_file() {
        return Ok(cwd_candidate);
    }

    if let Some(home) = std::env::var_os("HOME") {
        let home_candidate = PathBuf::from(home).join("Distfile");
        if home_candidate.is_file() {
            return Ok(home_candidate);
        }
    }

    Err!("no Distfile found in the current directory or $HOME")
}

/// Render the install commands needed to reproduce `inventory`, one per distinct version,
/// deduplicating a version already emitted for a different bin.
pub fn build(inventory: &Inventory, latest_only: bool) -> String {
    let mut seen_versions: HashSet<String> = HashSet::new();
    let mut lines = Vec::new();

    for key in inventory.bins_sorted_keys() {
        let Some(versions) = inventory.get_bin_versions(key) else { continue };
        for version in versions {
            if latest_only && !version.latest {
                continue;
            }
            let id = format!("{key}@{}", version.version);
            if !seen_versions.insert(id.clone()) {
                continue;
            }
            lines.push(format!("install {id}"));
        }
    }

    lines.join("\n")
}

/// Run every `Command::Install` through `install_one`, at most `parallel` at a time. Scheduling
/// stops once `cancelled` reports true before a new batch, but in-flight installs are allowed
/// to finish. All errors are collected; a single failure does not stop the others.
pub fn run<F>(commands: &[Command], parallel: usize, cancelled: impl Fn() -> bool, install_one: F) -> EmptyResult
where F: Fn(&str) -> EmptyResult + Sync {
    let parallel = parallel.max(1);
    if parallel > 1 {
        warn!("Running installs with parallelism > 1 is experimental.");
    }

    let identifiers: Vec<&str> = commands.iter()
        .filter_map(|c| match c { Command::Install {identifier} => Some(identifier.as_str()), _ => None })
        .collect();

    let errors = Mutex::new(Vec::new());

    for batch in identifiers.chunks(parallel) {
        if cancelled() {
            break;
        }

        thread::scope(|scope| {
            for identifier in batch {
                let errors = &errors;
                let install_one = &install_one;
                scope.spawn(move || {
                    if let Err(err) = install_one(identifier) {
                        errors.lock().unwrap().push(format!("{identifier}: {err}"));
                    }
                });
            }
        });
    }

    let errors = errors.into_inner().unwrap();
    if errors.is_empty() {
        Ok(())
    } else {
        Err!("{} install(s) failed:\n{}", errors.len(), errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_install_and_comments() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "Distfile", "# comment\ninstall owner/repo@1.0.0\n\ndist owner/other\n");
        let mut seen = HashSet::new();
        let commands = parse_file(&path, &mut seen).unwrap();
        assert_eq!(commands, vec![
            Command::Install {identifier: "owner/repo@1.0.0".to_owned()},
            Command::Install {identifier: "owner/other".to_owned()},
        ]);
    }

    #[test]
    fn follows_includes() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "included", "install owner/included\n");
        let path = write_file(dir.path(), "Distfile", "install owner/repo\nfile included\n");
        let mut seen = HashSet::new();
        let commands = parse_file(&path, &mut seen).unwrap();
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn detects_circular_inclusion() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "a", "file b\n");
        let b_path = write_file(dir.path(), "b", "file a\n");
        let a_path = dir.path().join("a");
        let _ = b_path;
        let mut seen = HashSet::new();
        assert!(parse_file(&a_path, &mut seen).is_err());
    }

    #[test]
    fn unknown_action_fails() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "Distfile", "frobnicate owner/repo\n");
        let mut seen = HashSet::new();
        assert!(parse_file(&path, &mut seen).is_err());
    }

    #[test]
    fn run_aggregates_errors_without_stopping_others() {
        let commands = vec![
            Command::Install {identifier: "a".to_owned()},
            Command::Install {identifier: "b".to_owned()},
        ];
        let result = run(&commands, 2, || false, |id| {
            if id == "a" { Err!("boom") } else { Ok(()) }
        });
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("a: boom"));
    }
}
