use super::{BinfmtInterface, RegistrationRecord};
use crate::config::BinfmtConfig;
use crate::error::{BinfmtError, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A live binfmt_misc mount.
#[derive(Debug, Clone)]
pub struct MountPoint {
    root: PathBuf,
}

impl MountPoint {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn register_path(&self) -> PathBuf {
        self.root.join(BinfmtConfig::REGISTER_ENTRY)
    }

    fn map_open_error(err: io::Error, path: PathBuf) -> BinfmtError {
        match err.kind() {
            io::ErrorKind::NotFound => BinfmtError::MountUnavailable { path },
            io::ErrorKind::PermissionDenied => BinfmtError::PermissionDenied { path },
            _ => BinfmtError::io_with_path(err, path),
        }
    }
}

impl BinfmtInterface for MountPoint {
    fn list_entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let dir = fs::read_dir(&self.root).map_err(|e| BinfmtError::io_with_path(e, &self.root))?;
        for entry in dir {
            let entry = entry.map_err(|e| BinfmtError::io_with_path(e, &self.root))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn read_entry(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|e| BinfmtError::io_with_path(e, path))
    }

    fn register(&self, record: &RegistrationRecord) -> Result<()> {
        let register = self.register_path();
        let mut file = OpenOptions::new()
            .write(true)
            .open(&register)
            .map_err(|e| Self::map_open_error(e, register.clone()))?;

        let line = record.to_string();
        debug!("Writing registration record to {}: {}", register.display(), line);

        // The kernel parses one record per write() and never sees a resumed
        // partial write, so a short write is as terminal as an error.
        let registration_error = |source: io::Error| BinfmtError::Registration {
            name: record.name.clone(),
            interpreter: record.interpreter.clone(),
            path: register.clone(),
            record: line.clone(),
            source,
        };
        match file.write(line.as_bytes()) {
            Ok(n) if n == line.len() => Ok(()),
            Ok(n) => Err(registration_error(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write ({} of {} bytes)", n, line.len()),
            ))),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(BinfmtError::AlreadyRegistered {
                    name: record.name.clone(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(BinfmtError::PermissionDenied {
                    path: register.clone(),
                })
            }
            Err(e) => Err(registration_error(e)),
        }
    }

    fn write_entry(&self, name: &str, payload: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        debug!("Writing {:?} to {}", String::from_utf8_lossy(payload), path.display());
        fs::write(&path, payload).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => BinfmtError::PermissionDenied { path },
            _ => BinfmtError::io_with_path(e, path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> RegistrationRecord {
        RegistrationRecord {
            name: "qemu-riscv64".into(),
            magic: vec![0x7f, 0x45],
            mask: vec![0xff, 0xff],
            interpreter: PathBuf::from("/usr/bin/qemu-riscv64"),
            flags: "CF".into(),
        }
    }

    #[test]
    fn test_register_without_control_file_is_unmounted() {
        let temp_dir = TempDir::new().unwrap();
        let mount = MountPoint::new(temp_dir.path());

        let err = mount.register(&record()).unwrap_err();
        assert!(matches!(err, BinfmtError::MountUnavailable { .. }));
        assert!(err.to_string().contains("is it mounted?"));
    }

    #[test]
    fn test_register_writes_single_record() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("register"), "").unwrap();
        let mount = MountPoint::new(temp_dir.path());

        mount.register(&record()).unwrap();

        let written = fs::read_to_string(temp_dir.path().join("register")).unwrap();
        assert_eq!(written, record().to_string());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_reports_record() {
        let temp_dir = TempDir::new().unwrap();
        // Every write to /dev/full fails with ENOSPC.
        std::os::unix::fs::symlink("/dev/full", temp_dir.path().join("register")).unwrap();
        let mount = MountPoint::new(temp_dir.path());

        let err = mount.register(&record()).unwrap_err();
        assert!(matches!(err, BinfmtError::Registration { .. }));
        let text = err.to_string();
        assert!(text.contains(&record().to_string()));
        assert!(text.contains(&mount.register_path().display().to_string()));
    }

    #[test]
    fn test_list_entries_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["status", "qemu-arm", "register", "qemu-aarch64"] {
            fs::write(temp_dir.path().join(name), "enabled\n").unwrap();
        }
        let mount = MountPoint::new(temp_dir.path());
        assert_eq!(
            mount.list_entries().unwrap(),
            vec!["qemu-aarch64", "qemu-arm", "register", "status"]
        );
    }

    #[test]
    fn test_write_entry_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("qemu-arm"), "enabled\n").unwrap();
        let mount = MountPoint::new(temp_dir.path());

        mount.write_entry("qemu-arm", b"-1").unwrap();
        assert_eq!(mount.read_entry("qemu-arm").unwrap(), "-1");
    }

    #[test]
    fn test_missing_mount_dir() {
        let mount = MountPoint::new("/nonexistent/binfmt_misc");
        assert!(mount.list_entries().is_err());
        assert!(mount.read_entry("status").is_err());
    }
}
