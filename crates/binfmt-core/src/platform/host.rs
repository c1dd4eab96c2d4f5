//! Host capability discovery.
//!
//! Reports which platforms this host can execute: its own, anything the CPU
//! runs natively alongside it, and every table architecture that already has
//! an enabled binfmt_misc handler.

use super::specifier::Platform;
use crate::config::is_reserved_entry;
use crate::kernel::{BinfmtInterface, EntryStatus};
use crate::signature::{ArchitectureConfig, SignatureTable};
use tracing::warn;

/// Source of the platforms a host can run.
pub trait PlatformProbe {
    /// Supported platforms, host platform first, without duplicates.
    fn supported_platforms(&self, kernel: &dyn BinfmtInterface) -> Vec<Platform>;
}

/// Probe for the machine this binary runs on.
#[derive(Debug, Clone)]
pub struct HostProbe {
    native: Platform,
    amd64_level: u8,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe {
    pub fn new() -> Self {
        Self {
            native: Platform::host(),
            amd64_level: detect_amd64_level(),
        }
    }

    /// Probe as if running on `native`, with a baseline CPU.
    pub fn for_native(native: Platform) -> Self {
        Self {
            native: native.normalize(),
            amd64_level: 1,
        }
    }

    /// Override the x86-64 micro-architecture level (1 to 4).
    pub fn with_amd64_level(mut self, level: u8) -> Self {
        self.amd64_level = level.clamp(1, 4);
        self
    }

    /// Platforms the CPU executes without emulation.
    ///
    /// On amd64 every micro-architecture level the CPU reaches is listed as
    /// `amd64/vN`, followed by 386.
    pub fn native_platforms(&self) -> Vec<Platform> {
        let mut platforms = vec![self.native.clone()];
        if self.native.architecture == "amd64" {
            for level in 2..=self.amd64_level {
                platforms.push(Platform::new(&self.native.os, "amd64", &format!("v{}", level)));
            }
            platforms.push(Platform::new(&self.native.os, "386", ""));
        }
        platforms
    }
}

impl PlatformProbe for HostProbe {
    fn supported_platforms(&self, kernel: &dyn BinfmtInterface) -> Vec<Platform> {
        let mut platforms = self.native_platforms();

        let entries = match kernel.list_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list binfmt_misc entries, reporting native platforms only: {}", e);
                return platforms;
            }
        };

        let mut emulated: Vec<&'static ArchitectureConfig> = Vec::new();
        for name in entries.iter().filter(|name| !is_reserved_entry(name)) {
            let status = match kernel.read_entry(name) {
                Ok(text) => EntryStatus::parse(&text),
                Err(e) => {
                    warn!("Cannot read binfmt_misc entry {}: {}", name, e);
                    continue;
                }
            };
            if !status.enabled {
                continue;
            }
            if let Some(cfg) = handled_architecture(name, &status) {
                if !emulated.contains(&cfg) {
                    emulated.push(cfg);
                }
            }
        }
        emulated.sort_by_key(|cfg| cfg.name);

        for cfg in emulated {
            for platform in emulated_platforms(cfg) {
                if !platforms.contains(&platform) {
                    platforms.push(platform);
                }
            }
        }
        platforms
    }
}

/// Highest x86-64 micro-architecture level this CPU supports.
///
/// Levels follow the psABI definitions: v2 adds SSE4.2 and POPCNT, v3 adds
/// AVX2 and BMI, v4 adds the AVX-512 core set.
#[cfg(target_arch = "x86_64")]
pub fn detect_amd64_level() -> u8 {
    macro_rules! has {
        ($($feature:tt),+) => {
            true $(&& std::arch::is_x86_feature_detected!($feature))+
        };
    }

    if !has!("cmpxchg16b", "popcnt", "sse3", "ssse3", "sse4.1", "sse4.2") {
        return 1;
    }
    if !has!("avx", "avx2", "bmi1", "bmi2", "f16c", "fma", "lzcnt", "xsave") {
        return 2;
    }
    if !has!("avx512f", "avx512bw", "avx512cd", "avx512dq", "avx512vl") {
        return 3;
    }
    4
}

#[cfg(not(target_arch = "x86_64"))]
pub fn detect_amd64_level() -> u8 {
    1
}

/// The table architecture an enabled entry serves, by signature or by name.
fn handled_architecture(name: &str, status: &EntryStatus) -> Option<&'static ArchitectureConfig> {
    if let (Some(magic), Some(mask)) = (&status.magic, &status.mask) {
        if let Some(cfg) = SignatureTable::by_signature(magic, mask) {
            return Some(cfg);
        }
    }
    SignatureTable::architectures()
        .iter()
        .find(|cfg| name.ends_with(cfg.emulator))
}

fn emulated_platforms(cfg: &ArchitectureConfig) -> Vec<Platform> {
    match cfg.name {
        "arm" => vec![
            Platform::new("linux", "arm", "v7"),
            Platform::new("linux", "arm", "v6"),
        ],
        name => vec![Platform::new("linux", name, "")],
    }
}

/// A fixed platform list, for callers that already know the answer.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub platforms: Vec<Platform>,
}

impl StaticProbe {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }
}

impl PlatformProbe for StaticProbe {
    fn supported_platforms(&self, _kernel: &dyn BinfmtInterface) -> Vec<Platform> {
        self.platforms.clone()
    }
}
