//! Emulator binary resolution.

use crate::config::EmulatorEnv;
use crate::error::Result;
use crate::signature::ArchitectureConfig;
use std::path::PathBuf;

/// Where an emulator is expected and under which name it gets registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    /// Registration entry name, prefix included.
    pub name: String,
    /// Absolute interpreter path written into the registration record.
    pub path: PathBuf,
}

/// Resolves emulator binary names and paths from [`EmulatorEnv`].
///
/// No existence check happens here. A missing binary only shows up when the
/// kernel tries to execute it.
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    env: EmulatorEnv,
}

impl BinaryLocator {
    pub fn new(env: EmulatorEnv) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &EmulatorEnv {
        &self.env
    }

    /// Resolve the registered name and full path for `cfg`.
    ///
    /// # Errors
    /// Returns a configuration error if the prefix contains a path separator.
    pub fn resolve(&self, cfg: &ArchitectureConfig) -> Result<ResolvedBinary> {
        let prefix = self.env.validated_prefix()?;
        let name = format!("{}{}", prefix, cfg.emulator);
        let path = self.env.binary_dir().join(&name);
        Ok(ResolvedBinary { name, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BinfmtError;
    use crate::signature::SignatureTable;
    use std::path::Path;

    #[test]
    fn test_resolve_default_dir() {
        let locator = BinaryLocator::new(EmulatorEnv::default());
        let cfg = SignatureTable::lookup("amd64").unwrap();
        let resolved = locator.resolve(cfg).unwrap();
        assert_eq!(resolved.name, "qemu-x86_64");
        assert_eq!(resolved.path, Path::new("/usr/bin/qemu-x86_64"));
    }

    #[test]
    fn test_resolve_with_dir_and_prefix() {
        let locator = BinaryLocator::new(EmulatorEnv {
            binary_dir: Some(PathBuf::from("/opt/emu")),
            binary_prefix: Some("buildkit-".into()),
            preserve_argv0: false,
        });
        let cfg = SignatureTable::lookup("arm64").unwrap();
        let resolved = locator.resolve(cfg).unwrap();
        assert_eq!(resolved.name, "buildkit-qemu-aarch64");
        assert_eq!(resolved.path, Path::new("/opt/emu/buildkit-qemu-aarch64"));
    }

    #[test]
    fn test_resolve_rejects_traversal_prefix() {
        let locator = BinaryLocator::new(EmulatorEnv {
            binary_prefix: Some("../".into()),
            ..Default::default()
        });
        let cfg = SignatureTable::lookup("arm").unwrap();
        assert!(matches!(
            locator.resolve(cfg),
            Err(BinfmtError::Config { .. })
        ));
    }
}
