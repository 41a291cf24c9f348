//! Canonical OS/architecture catalog: names, aliases, extension hints and the derived
//! "invalid" sets used by the scorer to penalize wrong-platform candidates.

use std::env::consts;
use std::fmt;

use crate::core::GenericResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Os {
    Windows,
    Linux,
    Darwin,
    FreeBsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    Arm32,
    Amd32,
}

pub const ALL_OS: &[Os] = &[Os::Windows, Os::Linux, Os::Darwin, Os::FreeBsd];
pub const ALL_ARCH: &[Arch] = &[Arch::Amd64, Arch::Arm64, Arch::Arm32, Arch::Amd32];

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl Os {
    pub fn canonical_name(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::FreeBsd => "freebsd",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Os::Windows => &["win"],
            Os::Linux => &[],
            Os::Darwin => &["osx", "macos", "mac", "apple", "ventura", "sonoma", "sequoia"],
            Os::FreeBsd => &[],
        }
    }

    /// All tokens that should be treated as naming this OS (canonical name plus aliases).
    pub fn terms(self) -> Vec<&'static str> {
        let mut terms = vec![self.canonical_name()];
        terms.extend_from_slice(self.aliases());
        terms
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Os::Windows => &["exe"],
            Os::Linux => &["AppImage"],
            Os::Darwin => &["universal"],
            Os::FreeBsd => &[],
        }
    }

    pub fn from_canonical(name: &str) -> GenericResult<Os> {
        ALL_OS.iter().copied().find(|os| os.canonical_name() == name)
            .ok_or_else(|| format!("unknown OS: {name}").into())
    }

    /// The set of terms naming any OS other than this one; used as the scorer's negative bag.
    pub fn invalid_terms(self) -> Vec<&'static str> {
        ALL_OS.iter().copied()
            .filter(|&os| os != self)
            .flat_map(Os::terms)
            .collect()
    }
}

impl Arch {
    pub fn canonical_name(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::Arm32 => "arm32",
            Arch::Amd32 => "amd32",
        }
    }

    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Arch::Amd64 => &["amd64", "x86_64", "x86-64", "64bit", "x64", "64-bit"],
            Arch::Arm64 => &["arm64", "aarch64", "armv8-a", "arm64-bit"],
            Arch::Arm32 => &["armv7", "armv6", "armv5", "armv4"],
            Arch::Amd32 => &["x86", "i686", "i386"],
        }
    }

    pub fn from_canonical(name: &str) -> GenericResult<Arch> {
        ALL_ARCH.iter().copied().find(|arch| arch.canonical_name() == name)
            .ok_or_else(|| format!("unknown architecture: {name}").into())
    }

    /// Arch family considered "opposite" of this one for the invalid-arch negative bag.
    /// 64-bit families are opposite to each other; 32-bit families are opposite to each other.
    fn opposite_family(self) -> &'static [Arch] {
        match self {
            Arch::Amd64 => &[Arch::Arm64],
            Arch::Arm64 => &[Arch::Amd64],
            Arch::Arm32 => &[Arch::Amd32],
            Arch::Amd32 => &[Arch::Arm32],
        }
    }

    pub fn invalid_terms(self) -> Vec<&'static str> {
        self.opposite_family().iter().copied().flat_map(Arch::synonyms).collect()
    }
}

pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    pub fn detect() -> GenericResult<HostPlatform> {
        let os = match consts::OS {
            "windows" => Os::Windows,
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            "freebsd" => Os::FreeBsd,
            other => return Err!("unsupported host OS: {other}"),
        };

        let arch = match consts::ARCH {
            "x86_64" => Arch::Amd64,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm32,
            "x86" => Arch::Amd32,
            other => return Err!("unsupported host architecture: {other}"),
        };

        Ok(HostPlatform {os, arch})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_os_excludes_self() {
        assert!(!Os::Darwin.invalid_terms().contains(&"darwin"));
        assert!(Os::Darwin.invalid_terms().contains(&"windows"));
        assert!(Os::Darwin.invalid_terms().contains(&"win"));
    }

    #[test]
    fn invalid_arch_is_opposite_family_only() {
        let invalid = Arch::Amd64.invalid_terms();
        assert!(invalid.contains(&"aarch64"));
        assert!(!invalid.contains(&"x86_64"));
        // 32-bit arches aren't considered invalid for a 64-bit target lookup.
        assert!(!invalid.contains(&"i686"));
    }

    #[test]
    fn darwin_aliases_include_mac() {
        assert!(Os::Darwin.terms().contains(&"mac"));
    }
}
