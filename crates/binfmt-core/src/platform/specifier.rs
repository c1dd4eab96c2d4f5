//! OCI-style platform specifiers (`os/arch[/variant]`).
//!
//! Parsing and normalisation follow the conventions container tooling uses,
//! so `linux/aarch64`, `arm64` and `linux/arm64/v8` all name the same
//! architecture.

use crate::error::{BinfmtError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("platform component regex must compile"));

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "ppc64", "ppc64le",
    "loong64", "mips", "mipsle", "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc",
    "riscv", "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// A target platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

impl Platform {
    pub fn new(os: &str, architecture: &str, variant: &str) -> Self {
        Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
            variant: variant.to_string(),
        }
    }

    /// Parse a specifier such as `arm64`, `linux/amd64` or `linux/arm/v7`.
    ///
    /// A single component is accepted only when it is a known OS (the host
    /// architecture is filled in) or a known architecture (the OS defaults
    /// to `linux`). Two and three component forms are taken as given after
    /// alias normalisation.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| BinfmtError::InvalidPlatform {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = spec.split('/').collect();
        if parts.len() > 3 {
            return Err(invalid("too many components"));
        }
        if let Some(bad) = parts.iter().find(|p| !COMPONENT.is_match(p)) {
            return Err(invalid(&format!("invalid component {:?}", bad)));
        }

        match parts.as_slice() {
            [single] => {
                let lowered = single.to_lowercase();
                let os = normalize_os(&lowered);
                if KNOWN_OS.contains(&os.as_str()) {
                    let host = Platform::host();
                    return Ok(Platform {
                        os,
                        architecture: host.architecture,
                        variant: host.variant,
                    });
                }
                let (architecture, variant) = normalize_arch(&lowered, "");
                if KNOWN_ARCH.contains(&architecture.as_str()) {
                    return Ok(Platform {
                        os: "linux".to_string(),
                        variant: strip_default_arm_variant(&architecture, variant),
                        architecture,
                    });
                }
                Err(invalid("unknown operating system or architecture"))
            }
            [os, arch] => {
                let (architecture, variant) = normalize_arch(&arch.to_lowercase(), "");
                Ok(Platform {
                    os: normalize_os(&os.to_lowercase()),
                    variant: strip_default_arm_variant(&architecture, variant),
                    architecture,
                })
            }
            [os, arch, variant] => {
                let (architecture, mut variant) =
                    normalize_arch(&arch.to_lowercase(), &variant.to_lowercase());
                if architecture == "arm64" && variant.is_empty() {
                    variant = "v8".to_string();
                }
                Ok(Platform {
                    os: normalize_os(&os.to_lowercase()),
                    architecture,
                    variant,
                })
            }
            _ => Err(invalid("empty specifier")),
        }
    }

    /// Canonical form: arm gets its default `v7`, arm64 loses `v8`.
    pub fn normalize(&self) -> Platform {
        let (architecture, variant) = normalize_arch(&self.architecture, &self.variant);
        Platform {
            os: normalize_os(&self.os),
            architecture,
            variant,
        }
    }

    /// The platform this binary was compiled for.
    pub fn host() -> Platform {
        let architecture = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "arm" => "arm",
            "loongarch64" => "loong64",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            "mips64" if cfg!(target_endian = "little") => "mips64le",
            other => other,
        };
        Platform::new(std::env::consts::OS, architecture, "").normalize()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if !self.variant.is_empty() {
            write!(f, "/{}", self.variant)?;
        }
        Ok(())
    }
}

fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Map architecture aliases onto GOARCH names and canonical variants.
fn normalize_arch(arch: &str, variant: &str) -> (String, String) {
    let arch = arch.to_lowercase();
    let variant = variant.to_lowercase();
    match arch.as_str() {
        "i386" | "i686" => ("386".into(), String::new()),
        "x86_64" | "x86-64" | "amd64" => {
            let variant = if variant == "v1" { String::new() } else { variant };
            ("amd64".into(), variant)
        }
        "aarch64" | "arm64" => {
            let variant = match variant.as_str() {
                "8" | "v8" | "" => String::new(),
                _ => variant,
            };
            ("arm64".into(), variant)
        }
        "armhf" | "armv7l" => ("arm".into(), "v7".into()),
        "armel" | "armv6l" => ("arm".into(), "v6".into()),
        "arm" => {
            let variant = match variant.as_str() {
                "" | "7" => "v7".to_string(),
                "5" | "6" | "8" => format!("v{}", variant),
                _ => variant,
            };
            ("arm".into(), variant)
        }
        _ => (arch, variant),
    }
}

fn strip_default_arm_variant(architecture: &str, variant: String) -> String {
    if architecture == "arm" && variant == "v7" {
        String::new()
    } else {
        variant
    }
}
