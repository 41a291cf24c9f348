//! `<source>/<owner>/<repo>[@version]` identifier grammar, with alias substitution.

use semver::Version;

use crate::config::Config;
use crate::core::GenericResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub source: String,
    pub owner: String,
    pub repo: String,
    pub version: String,
}

impl Identifier {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.source, self.owner, self.repo)
    }
}

const KNOWN_SOURCES: &[&str] = &["github", "github.com"];

/// Parse a user-supplied identifier, substituting a configured alias first and falling back to
/// `config.default_source` when no source is given.
pub fn parse(config: &Config, raw: &str) -> GenericResult<Identifier> {
    let (resolved, alias_version) = config.resolve_alias(raw);

    let (path, version) = match resolved.split_once('@') {
        Some((path, version)) => (path, Some(version.to_owned())),
        None => (resolved, alias_version.map(|v| v.to_owned())),
    };

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let (source, owner, repo) = match parts.as_slice() {
        [owner, repo] => (config.default_source.clone(), owner.to_string(), repo.to_string()),
        [source, owner, repo] => (canonicalize_source(source), owner.to_string(), repo.to_string()),
        _ => return Err!("invalid identifier {raw:?}: expected <owner>/<repo> or <source>/<owner>/<repo>"),
    };

    if owner.is_empty() || repo.is_empty() {
        return Err!("invalid identifier {raw:?}: owner and repo must be non-empty");
    }

    Ok(Identifier {
        source,
        owner,
        repo,
        version: version.unwrap_or_else(|| "latest".to_owned()),
    })
}

fn canonicalize_source(source: &str) -> String {
    match source {
        "github.com" | "github" => "github".to_owned(),
        other => other.to_owned(),
    }
}

#[allow(dead_code)]
fn is_known_source(source: &str) -> bool {
    KNOWN_SOURCES.contains(&source)
}

/// Whether a release tag (e.g. `v1.7.2`) names `requested` (e.g. `1.7.2`): exact match, or
/// match after stripping a leading `v` and parsing both sides as semver.
pub fn tag_matches(requested: &str, tag: &str) -> bool {
    if requested == tag {
        return true;
    }

    let parse = |s: &str| Version::parse(s.strip_prefix('v').unwrap_or(s)).ok();
    match (parse(requested), parse(tag)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn bare_owner_repo_uses_default_source() {
        let id = parse(&config(), "caddyserver/caddy").unwrap();
        assert_eq!(id.source, "github");
        assert_eq!(id.owner, "caddyserver");
        assert_eq!(id.repo, "caddy");
        assert_eq!(id.version, "latest");
    }

    #[test]
    fn explicit_source() {
        let id = parse(&config(), "github/caddyserver/caddy").unwrap();
        assert_eq!(id.source, "github");
    }

    #[test]
    fn github_dot_com_source_canonicalizes() {
        let id = parse(&config(), "github.com/caddyserver/caddy").unwrap();
        assert_eq!(id.source, "github");
    }

    #[test]
    fn version_suffix_is_parsed() {
        let id = parse(&config(), "caddyserver/caddy@2.9.0").unwrap();
        assert_eq!(id.version, "2.9.0");
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        assert!(parse(&config(), "just-a-name").is_err());
        assert!(parse(&config(), "a/b/c/d").is_err());
    }

    #[test]
    fn tag_matches_with_and_without_v_prefix() {
        assert!(tag_matches("1.7.2", "v1.7.2"));
        assert!(tag_matches("v1.7.2", "1.7.2"));
        assert!(tag_matches("2.9.0", "2.9.0"));
        assert!(!tag_matches("1.7.2", "1.7.3"));
        assert!(!tag_matches("r38", "38.0.0"));
    }

    #[test]
    fn alias_substitution_applies_before_parsing() {
        let mut config = config();
        config.aliases.insert("caddy".to_owned(), crate::config::Alias {
            id: "caddyserver/caddy".to_owned(), version: Some("2.9.0".to_owned()),
        });
        let id = parse(&config, "caddy").unwrap();
        assert_eq!(id.owner, "caddyserver");
        assert_eq!(id.version, "2.9.0");
    }
}
