//! Weighted scoring of candidate filenames against a profile of positive and negative term
//! bags. Used by the discovery engine to rank binary/checksum/signature candidates.

use std::collections::HashMap;

use crate::asset::get_base_name;

#[derive(Debug, Default, Clone)]
pub struct Profile<'a> {
    pub os: Vec<&'a str>,
    pub arch: Vec<&'a str>,
    pub extensions: Vec<&'a str>,
    pub terms: Vec<&'a str>,
    pub names: Vec<&'a str>,
    pub versions: Vec<&'a str>,

    pub invalid_os: Vec<&'a str>,
    pub invalid_arch: Vec<&'a str>,
    pub invalid_extensions: Vec<&'a str>,

    pub weighted_terms: HashMap<&'a str, i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub name: String,
    pub score: i32,
}

/// Score every candidate and return them sorted by descending score, ties broken alphabetically.
pub fn score(candidates: &[impl AsRef<str>], profile: &Profile) -> Vec<Scored> {
    let mut scored: Vec<Scored> = candidates.iter()
        .map(|name| {
            let name = name.as_ref().to_string();
            if profile.names.iter().any(|n| *n == name) {
                return Scored {name, score: 200};
            }
            let score = score_one(&name, profile);
            Scored {name, score}
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    scored
}

fn score_one(name: &str, profile: &Profile) -> i32 {
    let lower = name.to_ascii_lowercase();
    let mut total = 0;

    if lower.contains("update") {
        total -= 100;
    }
    if lower.contains("-keyless.sig") {
        total -= 10;
    }

    for term in &profile.os {
        if lower.contains(&term.to_ascii_lowercase()) {
            total += 40;
        }
    }
    for term in &profile.arch {
        if lower.contains(&term.to_ascii_lowercase()) {
            total += 30;
        }
    }
    if let Some(ext) = name.rsplit_once('.').map(|(_, e)| e) {
        if profile.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            total += 20;
        }
    }
    for term in &profile.terms {
        if lower.contains(&term.to_ascii_lowercase()) {
            total += 10;
        }
    }

    for term in &profile.invalid_os {
        if lower.contains(&term.to_ascii_lowercase()) {
            total -= 40;
        }
    }
    for term in &profile.invalid_arch {
        if lower.contains(&term.to_ascii_lowercase()) {
            total -= 30;
        }
    }
    if let Some(ext) = name.rsplit_once('.').map(|(_, e)| e) {
        if profile.invalid_extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext)) {
            total -= 20;
        }
    }

    for (term, weight) in &profile.weighted_terms {
        if lower.contains(&term.to_ascii_lowercase()) {
            total += weight;
        }
    }

    total += accuracy_bonus(name, profile);

    total
}

fn accuracy_bonus(name: &str, profile: &Profile) -> i32 {
    let stem = get_base_name(name);

    let mut known: Vec<String> = Vec::new();
    known.extend(profile.os.iter().map(|s| s.to_ascii_lowercase()));
    known.extend(profile.arch.iter().map(|s| s.to_ascii_lowercase()));
    known.extend(profile.terms.iter().map(|s| s.to_ascii_lowercase()));
    known.extend(profile.names.iter().map(|s| s.to_ascii_lowercase()));
    known.extend(profile.versions.iter().map(|s| s.to_ascii_lowercase()));
    known.extend(profile.versions.iter().map(|v| format!("v{}", v.to_ascii_lowercase())));

    let mut bonus = 0;
    for token in stem.split(['-', '_']) {
        if token.is_empty() {
            continue;
        }
        let token_lower = token.to_ascii_lowercase();
        if stem.eq_ignore_ascii_case(token) {
            bonus += 10;
        } else if known.iter().any(|k| *k == token_lower) {
            bonus += 2;
        } else {
            bonus -= 5;
        }
    }

    bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_os_and_arch_matches_over_mismatches() {
        let profile = Profile {
            os: vec!["linux"],
            arch: vec!["amd64", "x86_64"],
            invalid_os: vec!["windows", "darwin"],
            invalid_arch: vec!["arm64", "aarch64"],
            terms: vec!["app"],
            ..Default::default()
        };

        let candidates = ["app-linux-amd64.tar.gz", "app-darwin-arm64.tar.gz", "app-windows-amd64.exe"];
        let results = score(&candidates, &profile);

        assert_eq!(results[0].name, "app-linux-amd64.tar.gz");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn exact_name_hint_short_circuits() {
        let profile = Profile {names: vec!["exact-match.bin"], ..Default::default()};
        let results = score(&["exact-match.bin", "other.bin"], &profile);
        assert_eq!(results[0].name, "exact-match.bin");
        assert_eq!(results[0].score, 200);
    }

    #[test]
    fn ties_break_alphabetically() {
        let profile = Profile::default();
        let results = score(&["zzz", "aaa"], &profile);
        assert_eq!(results[0].name, "aaa");
    }

    #[test]
    fn keyless_sig_is_penalized() {
        let profile = Profile {terms: vec!["app"], ..Default::default()};
        let results = score(&["app.sig", "app-keyless.sig"], &profile);
        let app_sig = results.iter().find(|r| r.name == "app.sig").unwrap();
        let keyless = results.iter().find(|r| r.name == "app-keyless.sig").unwrap();
        assert!(app_sig.score > keyless.score);
    }
}
