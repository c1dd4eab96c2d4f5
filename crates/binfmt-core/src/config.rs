//! Centralized configuration for the binfmt manager.
//!
//! Compile-time constants for the kernel protocol live in [`BinfmtConfig`];
//! the environment-driven emulator settings live in [`EmulatorEnv`].

use crate::error::{BinfmtError, Result};
use std::path::{Path, PathBuf};

/// Kernel protocol and default path configuration.
pub struct BinfmtConfig;

impl BinfmtConfig {
    pub const DEFAULT_MOUNT: &'static str = "/proc/sys/fs/binfmt_misc";
    pub const FS_TYPE: &'static str = "binfmt_misc";

    // Control entries inside the mount point
    pub const REGISTER_ENTRY: &'static str = "register";
    pub const STATUS_ENTRY: &'static str = "status";
    pub const WSL_INTEROP_ENTRY: &'static str = "WSLInterop";

    /// Written to an entry to remove it.
    pub const DEREGISTER_PAYLOAD: &'static [u8] = b"-1";
    /// First token of an active entry's status text.
    pub const ENABLED_TOKEN: &'static str = "enabled";

    /// Registration flags always set: clear argv handling (C) and fix binary (F).
    pub const BASE_FLAGS: &'static str = "CF";
    pub const PRESERVE_ARGV0_FLAG: char = 'P';
}

/// Emulator binary location configuration.
pub struct EmulatorConfig;

impl EmulatorConfig {
    pub const DEFAULT_BINARY_DIR: &'static str = "/usr/bin";
    pub const BINARY_PATH_VAR: &'static str = "QEMU_BINARY_PATH";
    pub const BINARY_PREFIX_VAR: &'static str = "QEMU_BINARY_PREFIX";
    pub const PRESERVE_ARGV0_VAR: &'static str = "QEMU_PRESERVE_ARGV0";
    pub const QEMU_NAME_PREFIX: &'static str = "qemu-";
}

/// Entries in the mount point that are never registrations.
///
/// `status` listing skips only `register` and `status`; uninstall matching
/// also skips the WSL interop handler so it can never be removed by suffix.
pub fn is_reserved_entry(name: &str) -> bool {
    name == BinfmtConfig::REGISTER_ENTRY
        || name == BinfmtConfig::STATUS_ENTRY
        || name == BinfmtConfig::WSL_INTEROP_ENTRY
}

/// Emulator settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorEnv {
    /// Directory holding the emulator binaries. `None` means the default.
    pub binary_dir: Option<PathBuf>,
    /// Prefix prepended to every emulator binary name.
    pub binary_prefix: Option<String>,
    /// Register with the `P` flag so argv[0] reaches the guest unchanged.
    pub preserve_argv0: bool,
}

impl EmulatorEnv {
    /// Read the emulator settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset, matching shell `${VAR:-default}`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            binary_dir: non_empty(EmulatorConfig::BINARY_PATH_VAR).map(PathBuf::from),
            binary_prefix: non_empty(EmulatorConfig::BINARY_PREFIX_VAR),
            preserve_argv0: non_empty(EmulatorConfig::PRESERVE_ARGV0_VAR).is_some(),
        }
    }

    /// The directory emulator binaries are expected in.
    pub fn binary_dir(&self) -> &Path {
        self.binary_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(EmulatorConfig::DEFAULT_BINARY_DIR))
    }

    /// Validate the prefix and return it, or the empty string when unset.
    pub fn validated_prefix(&self) -> Result<&str> {
        match self.binary_prefix.as_deref() {
            Some(prefix) if prefix.contains(std::path::MAIN_SEPARATOR) || prefix.contains('/') => {
                Err(BinfmtError::Config {
                    message: format!(
                        "binary prefix must not contain path separator (Hint: set ${} to specify the directory)",
                        EmulatorConfig::BINARY_PATH_VAR
                    ),
                })
            }
            Some(prefix) => Ok(prefix),
            None => Ok(""),
        }
    }

    /// Registration flags for records written with these settings.
    pub fn registration_flags(&self) -> String {
        let mut flags = BinfmtConfig::BASE_FLAGS.to_string();
        if self.preserve_argv0 {
            flags.push(BinfmtConfig::PRESERVE_ARGV0_FLAG);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> EmulatorEnv {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EmulatorEnv::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let env = env_of(&[]);
        assert_eq!(env.binary_dir(), Path::new("/usr/bin"));
        assert_eq!(env.validated_prefix().unwrap(), "");
        assert_eq!(env.registration_flags(), "CF");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let env = env_of(&[
            ("QEMU_BINARY_PATH", ""),
            ("QEMU_BINARY_PREFIX", ""),
            ("QEMU_PRESERVE_ARGV0", ""),
        ]);
        assert_eq!(env, EmulatorEnv::default());
    }

    #[test]
    fn test_overrides() {
        let env = env_of(&[
            ("QEMU_BINARY_PATH", "/opt/qemu/bin"),
            ("QEMU_BINARY_PREFIX", "static-"),
            ("QEMU_PRESERVE_ARGV0", "1"),
        ]);
        assert_eq!(env.binary_dir(), Path::new("/opt/qemu/bin"));
        assert_eq!(env.validated_prefix().unwrap(), "static-");
        assert_eq!(env.registration_flags(), "CFP");
    }

    #[test]
    fn test_prefix_with_separator_rejected() {
        let env = env_of(&[("QEMU_BINARY_PREFIX", "../")]);
        let err = env.validated_prefix().unwrap_err();
        assert!(matches!(err, BinfmtError::Config { .. }));
        assert!(err.to_string().contains("QEMU_BINARY_PATH"));
    }

    #[test]
    fn test_reserved_entries() {
        assert!(is_reserved_entry("register"));
        assert!(is_reserved_entry("status"));
        assert!(is_reserved_entry("WSLInterop"));
        assert!(!is_reserved_entry("qemu-aarch64"));
    }
}
