//! Emulator binary presence and permission checks.

use std::path::Path;
use tracing::debug;

/// What is on disk at an emulator's resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPresence {
    Missing,
    /// Present but no execute bit set; the kernel will fail to exec it.
    NotExecutable,
    Executable,
}

/// Inspect the file at `path`.
pub fn binary_presence(path: &Path) -> BinaryPresence {
    if std::fs::metadata(path).is_err() {
        debug!("Emulator binary not found: {}", path.display());
        return BinaryPresence::Missing;
    }
    if is_executable(path) {
        BinaryPresence::Executable
    } else {
        BinaryPresence::NotExecutable
    }
}

/// Check if a file has executable permissions.
///
/// # Platform Behavior
/// - **Unix**: Checks if any execute bit is set
/// - **Other**: Any existing file counts as executable
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            // Any of user, group or other execute bits
            metadata.is_file() && mode & 0o111 != 0
        } else {
            false
        }
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_missing_binary() {
        let temp_dir = TempDir::new().unwrap();
        let presence = binary_presence(&temp_dir.path().join("qemu-arm"));
        assert_eq!(presence, BinaryPresence::Missing);
    }

    #[test]
    fn test_is_executable_unix() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let temp_dir = TempDir::new().unwrap();
            let file_path = temp_dir.path().join("qemu-arm");
            File::create(&file_path).unwrap();

            let mut perms = std::fs::metadata(&file_path).unwrap().permissions();
            perms.set_mode(0o644);
            std::fs::set_permissions(&file_path, perms).unwrap();
            assert!(!is_executable(&file_path));
            assert_eq!(binary_presence(&file_path), BinaryPresence::NotExecutable);

            let mut perms = std::fs::metadata(&file_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&file_path, perms).unwrap();
            assert!(is_executable(&file_path));
            assert_eq!(binary_presence(&file_path), BinaryPresence::Executable);
        }
    }

    #[test]
    fn test_directory_is_not_executable() {
        let temp_dir = TempDir::new().unwrap();
        #[cfg(unix)]
        assert!(!is_executable(temp_dir.path()));
    }
}
