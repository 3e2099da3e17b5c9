//! Target architectures and their selector flag tables.

use std::fmt;
use std::str::FromStr;

use crate::core::CrawlError;

/// A conda target architecture (subdir).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    Linux64,
    LinuxPpc64le,
    LinuxAarch64,
    LinuxS390x,
    Osx64,
    OsxArm64,
    Win64,
    Noarch,
}

impl Arch {
    /// Every architecture accepted on the command line.
    pub const SUPPORTED: [Arch; 8] = [
        Arch::Linux64,
        Arch::LinuxPpc64le,
        Arch::LinuxAarch64,
        Arch::LinuxS390x,
        Arch::Osx64,
        Arch::OsxArm64,
        Arch::Win64,
        Arch::Noarch,
    ];

    /// Architectures a crawl checks when none are requested.
    pub const DEFAULT: [Arch; 7] = [
        Arch::Linux64,
        Arch::LinuxPpc64le,
        Arch::LinuxAarch64,
        Arch::LinuxS390x,
        Arch::Osx64,
        Arch::OsxArm64,
        Arch::Win64,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Arch::Linux64 => "linux-64",
            Arch::LinuxPpc64le => "linux-ppc64le",
            Arch::LinuxAarch64 => "linux-aarch64",
            Arch::LinuxS390x => "linux-s390x",
            Arch::Osx64 => "osx-64",
            Arch::OsxArm64 => "osx-arm64",
            Arch::Win64 => "win-64",
            Arch::Noarch => "noarch",
        }
    }

    /// Value of a selector flag on this architecture.
    ///
    /// Returns `None` for names outside the flag table. `noarch` answers
    /// `true` for every known flag so noarch recipes keep all lines.
    pub fn flag(self, name: &str) -> Option<bool> {
        let value = match name {
            "linux" => self.is_linux(),
            "osx" => self.is_osx(),
            "win" => self == Arch::Win64,
            "unix" => self.is_linux() || self.is_osx(),
            "x86_64" => matches!(self, Arch::Linux64 | Arch::Osx64 | Arch::Win64),
            "x86" => false,
            "linux64" => self == Arch::Linux64,
            "arm64" => self == Arch::OsxArm64,
            "aarch64" => self == Arch::LinuxAarch64,
            "ppc64le" => self == Arch::LinuxPpc64le,
            "s390x" => self == Arch::LinuxS390x,
            "noarch" => self == Arch::Noarch,
            _ => return None,
        };
        Some(value || self == Arch::Noarch)
    }

    pub const fn is_linux(self) -> bool {
        matches!(
            self,
            Arch::Linux64 | Arch::LinuxPpc64le | Arch::LinuxAarch64 | Arch::LinuxS390x
        )
    }

    pub const fn is_osx(self) -> bool {
        matches!(self, Arch::Osx64 | Arch::OsxArm64)
    }

    /// Machine part of the subdir, e.g. `x86_64` or `aarch64`.
    pub const fn machine(self) -> &'static str {
        match self {
            Arch::Linux64 | Arch::Osx64 | Arch::Win64 => "x86_64",
            Arch::LinuxPpc64le => "ppc64le",
            Arch::LinuxAarch64 => "aarch64",
            Arch::LinuxS390x => "s390x",
            Arch::OsxArm64 => "arm64",
            Arch::Noarch => "noarch",
        }
    }

    /// Parse a space or comma separated list, rejecting unknown names.
    pub fn parse_list(raw: &str) -> Result<Vec<Arch>, CrawlError> {
        let mut archs = Vec::new();
        for token in raw.split([' ', ',']).filter(|t| !t.is_empty()) {
            let arch = token.parse()?;
            if !archs.contains(&arch) {
                archs.push(arch);
            }
        }
        Ok(archs)
    }

    /// First non-noarch architecture, used for template variables.
    pub fn primary(archs: &[Arch]) -> Arch {
        archs.iter().copied().find(|a| *a != Arch::Noarch).unwrap_or(Arch::Linux64)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Arch::SUPPORTED.iter().copied().find(|a| a.as_str() == s.trim()).ok_or_else(|| {
            CrawlError::UnsupportedArch {
                arch: s.to_string(),
            }
        })
    }
}
