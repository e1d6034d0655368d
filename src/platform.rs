//! Host platform detection and package manager resolution.
//!
//! The OS family drives two things: which package manager candidates are
//! tried for `system` recipes, and whether a package's descriptor
//! `supports` lists admit the current host. Family detection on Linux
//! parses `/etc/os-release`; the parser is pure so it can be tested on
//! string fixtures.

use std::fmt;

use crate::exec::Executor;

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Debian, Ubuntu and derivatives.
    Debian,
    /// Fedora, RHEL, CentOS and derivatives.
    Redhat,
    /// Arch Linux and derivatives.
    Arch,
    /// A Linux that is none of the known families.
    LinuxOther,
    /// macOS.
    Macos,
    /// Windows.
    Windows,
    /// Anything else.
    Unknown,
}

impl OsFamily {
    /// Whether this family is a Linux.
    #[must_use]
    pub const fn is_linux(self) -> bool {
        matches!(self, Self::Debian | Self::Redhat | Self::Arch | Self::LinuxOther)
    }

    /// Whether a descriptor platform tag admits this family.
    ///
    /// The generic tag `linux` matches every Linux family; otherwise the tag
    /// must equal the family slug.
    #[must_use]
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.trim().to_ascii_lowercase();
        if tag == "linux" {
            return self.is_linux();
        }
        tag == self.to_string()
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Self::Debian => "debian",
            Self::Redhat => "redhat",
            Self::Arch => "arch",
            Self::LinuxOther => "linux-other",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        };
        write!(f, "{slug}")
    }
}

impl std::str::FromStr for OsFamily {
    type Err = String;

    /// Parse a family slug. `unknown` is not accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debian" => Ok(Self::Debian),
            "redhat" => Ok(Self::Redhat),
            "arch" => Ok(Self::Arch),
            "linux-other" => Ok(Self::LinuxOther),
            "macos" => Ok(Self::Macos),
            "windows" => Ok(Self::Windows),
            _ => Err(format!(
                "unknown OS family '{s}' (expected debian, redhat, arch, linux-other, macos or windows)"
            )),
        }
    }
}

/// CPU architecture of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuArch {
    /// 64-bit ARM.
    Arm64,
    /// 64-bit x86.
    X86_64,
}

impl CpuArch {
    /// Whether a descriptor architecture tag admits this architecture.
    ///
    /// Accepts the common synonyms (`arm64`/`aarch64`, `x86_64`/`amd64`).
    #[must_use]
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.trim().to_ascii_lowercase();
        match self {
            Self::Arm64 => tag == "arm64" || tag == "aarch64",
            Self::X86_64 => tag == "x86_64" || tag == "amd64",
        }
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "arm64"),
            Self::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    /// Detected OS family.
    pub os: OsFamily,
    /// Detected CPU architecture.
    pub arch: CpuArch,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os: detect_os(),
            arch: detect_arch(),
        }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(os: OsFamily, arch: CpuArch) -> Self {
        Self { os, arch }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.os, self.arch)
    }
}

fn detect_os() -> OsFamily {
    if cfg!(target_os = "linux") {
        std::fs::read_to_string("/etc/os-release")
            .map_or(OsFamily::LinuxOther, |content| detect_from_os_release(&content))
    } else if cfg!(target_os = "macos") {
        OsFamily::Macos
    } else if cfg!(target_os = "windows") {
        OsFamily::Windows
    } else {
        OsFamily::Unknown
    }
}

fn detect_arch() -> CpuArch {
    if std::env::consts::ARCH == "aarch64" {
        CpuArch::Arm64
    } else {
        CpuArch::X86_64
    }
}

/// Classify a Linux distribution from `/etc/os-release` content.
///
/// Looks at `ID=` first, then falls back to the `ID_LIKE=` ancestry list, so
/// derivatives (Mint, Rocky, Manjaro) land in their parent family.
#[must_use]
pub fn detect_from_os_release(content: &str) -> OsFamily {
    let mut id = None;
    let mut id_like = None;
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(unquote(value));
        } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
            id_like = Some(unquote(value));
        }
    }

    if let Some(id) = id
        && let Some(family) = family_for_distro(&id)
    {
        return family;
    }
    if let Some(id_like) = id_like {
        for token in id_like.split_whitespace() {
            if let Some(family) = family_for_distro(token) {
                return family;
            }
        }
    }
    OsFamily::LinuxOther
}

fn family_for_distro(id: &str) -> Option<OsFamily> {
    match id.to_ascii_lowercase().as_str() {
        "ubuntu" | "debian" => Some(OsFamily::Debian),
        "fedora" | "rhel" | "centos" => Some(OsFamily::Redhat),
        "arch" => Some(OsFamily::Arch),
        _ => None,
    }
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').trim_matches('\'').to_string()
}

/// A system package manager with its command templates.
///
/// Templates contain a `{pkg}` placeholder substituted by
/// [`install_command`](Self::install_command) and
/// [`remove_command`](Self::remove_command).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManager {
    /// Binary name probed on PATH.
    pub name: &'static str,
    install_template: &'static str,
    remove_template: &'static str,
}

impl PackageManager {
    /// Full shell command installing `package`.
    #[must_use]
    pub fn install_command(&self, package: &str) -> String {
        self.install_template.replace("{pkg}", package)
    }

    /// Full shell command removing `package`.
    #[must_use]
    pub fn remove_command(&self, package: &str) -> String {
        self.remove_template.replace("{pkg}", package)
    }
}

const DEBIAN_MANAGERS: &[PackageManager] = &[
    PackageManager {
        name: "apt",
        install_template: "sudo apt update && sudo apt install -y {pkg}",
        remove_template: "sudo apt remove -y {pkg}",
    },
    PackageManager {
        name: "apt-get",
        install_template: "sudo apt-get update && sudo apt-get install -y {pkg}",
        remove_template: "sudo apt-get remove -y {pkg}",
    },
];

const REDHAT_MANAGERS: &[PackageManager] = &[
    PackageManager {
        name: "dnf",
        install_template: "sudo dnf install -y {pkg}",
        remove_template: "sudo dnf remove -y {pkg}",
    },
    PackageManager {
        name: "yum",
        install_template: "sudo yum install -y {pkg}",
        remove_template: "sudo yum remove -y {pkg}",
    },
];

const ARCH_MANAGERS: &[PackageManager] = &[PackageManager {
    name: "pacman",
    install_template: "sudo pacman -S --noconfirm {pkg}",
    remove_template: "sudo pacman -Rns --noconfirm {pkg}",
}];

const MACOS_MANAGERS: &[PackageManager] = &[PackageManager {
    name: "brew",
    install_template: "brew install {pkg}",
    remove_template: "brew uninstall {pkg}",
}];

const WINDOWS_MANAGERS: &[PackageManager] = &[
    PackageManager {
        name: "winget",
        install_template: "winget install -e {pkg}",
        remove_template: "winget uninstall -e {pkg}",
    },
    PackageManager {
        name: "choco",
        install_template: "choco install -y {pkg}",
        remove_template: "choco uninstall -y {pkg}",
    },
];

/// Ordered package manager candidates for an OS family.
///
/// Order encodes preference: the first candidate present on PATH wins.
#[must_use]
pub const fn manager_candidates(os: OsFamily) -> &'static [PackageManager] {
    match os {
        OsFamily::Debian => DEBIAN_MANAGERS,
        OsFamily::Redhat => REDHAT_MANAGERS,
        OsFamily::Arch => ARCH_MANAGERS,
        OsFamily::Macos => MACOS_MANAGERS,
        OsFamily::Windows => WINDOWS_MANAGERS,
        OsFamily::LinuxOther | OsFamily::Unknown => &[],
    }
}

/// Resolve the package manager for a platform: the first candidate of the
/// family's preference list whose binary is on PATH.
#[must_use]
pub fn resolve_package_manager(
    platform: Platform,
    executor: &dyn Executor,
) -> Option<&'static PackageManager> {
    manager_candidates(platform.os)
        .iter()
        .find(|m| executor.which(m.name))
}
