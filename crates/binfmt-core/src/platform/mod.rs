//! Host-facing platform layer.
//!
//! Everything that touches the host beyond the binfmt_misc protocol itself
//! lives here:
//! - `specifier` - OCI platform strings (`linux/arm/v7`)
//! - `host` - which platforms the host can execute
//! - `mount` - mounting and unmounting binfmt_misc
//! - `permissions` - emulator binary presence checks

pub mod host;
pub mod mount;
pub mod permissions;
pub mod specifier;

// Re-export commonly used items
pub use host::{detect_amd64_level, HostProbe, PlatformProbe, StaticProbe};
pub use mount::{ensure_mounted, ensure_mounted_with, is_mounted, MountGuard, MountOps, SystemMount};
pub use permissions::{binary_presence, is_executable, BinaryPresence};
pub use specifier::Platform;

/// Format platforms as canonical `os/arch[/variant]` strings.
pub fn format_platforms(platforms: &[Platform]) -> Vec<String> {
    platforms
        .iter()
        .map(|p| p.normalize().to_string())
        .collect()
}

/// Returns true if binfmt_misc can exist on this platform.
pub fn is_supported_platform() -> bool {
    cfg!(target_os = "linux")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_platforms() {
        let platforms = vec![
            Platform::new("linux", "arm", ""),
            Platform::new("linux", "aarch64", ""),
            Platform::new("linux", "amd64", ""),
        ];
        assert_eq!(
            format_platforms(&platforms),
            vec!["linux/arm/v7", "linux/arm64", "linux/amd64"]
        );
    }

    #[test]
    fn test_is_supported_platform() {
        #[cfg(target_os = "linux")]
        assert!(is_supported_platform());
    }
}
