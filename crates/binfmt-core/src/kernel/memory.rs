use super::{BinfmtInterface, EntryStatus, RegistrationRecord};
use crate::config::{is_reserved_entry, BinfmtConfig};
use crate::error::{BinfmtError, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// In-memory model of the kernel side of binfmt_misc.
///
/// Accepts and rejects records the way `fs/binfmt_misc.c` does for magic
/// registrations: duplicate names fail with `EEXIST`, `-1` removes an entry,
/// `0`/`1` disable and enable it.
#[derive(Debug)]
pub struct MemoryKernel {
    root: PathBuf,
    mounted: bool,
    entries: Mutex<BTreeMap<String, EntryStatus>>,
}

impl Default for MemoryKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKernel {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(BinfmtConfig::DEFAULT_MOUNT),
            mounted: true,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// A kernel whose filesystem is not mounted: every access fails like a
    /// missing `register` file would.
    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            ..Self::new()
        }
    }

    /// Seed an entry, bypassing record validation.
    pub fn with_entry(self, name: &str, status: EntryStatus) -> Self {
        self.lock().insert(name.to_string(), status);
        self
    }

    /// Current state of one entry.
    pub fn entry(&self, name: &str) -> Option<EntryStatus> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, EntryStatus>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_mounted(&self, name: &str) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(BinfmtError::MountUnavailable {
                path: self.root.join(name),
            })
        }
    }

    fn io_error(&self, kind: io::ErrorKind, name: &str) -> BinfmtError {
        BinfmtError::io_with_path(io::Error::from(kind), self.root.join(name))
    }
}

/// Flags as the kernel prints them: `C` implies `O`.
fn kernel_flags(flags: &str) -> String {
    let mut out = String::new();
    if flags.contains('P') {
        out.push('P');
    }
    if flags.contains('O') || flags.contains('C') {
        out.push('O');
    }
    if flags.contains('C') {
        out.push('C');
    }
    if flags.contains('F') {
        out.push('F');
    }
    out
}

impl BinfmtInterface for MemoryKernel {
    fn list_entries(&self) -> Result<Vec<String>> {
        self.check_mounted("")?;
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.push(BinfmtConfig::REGISTER_ENTRY.to_string());
        names.push(BinfmtConfig::STATUS_ENTRY.to_string());
        names.sort();
        Ok(names)
    }

    fn read_entry(&self, name: &str) -> Result<String> {
        self.check_mounted(name)?;
        if name == BinfmtConfig::STATUS_ENTRY {
            return Ok("enabled\n".to_string());
        }
        if name == BinfmtConfig::REGISTER_ENTRY {
            return Err(self.io_error(io::ErrorKind::PermissionDenied, name));
        }
        self.lock()
            .get(name)
            .map(EntryStatus::render)
            .ok_or_else(|| self.io_error(io::ErrorKind::NotFound, name))
    }

    fn register(&self, record: &RegistrationRecord) -> Result<()> {
        self.check_mounted(BinfmtConfig::REGISTER_ENTRY)?;

        let line = record.to_string();
        let invalid = || BinfmtError::Registration {
            name: record.name.clone(),
            interpreter: record.interpreter.clone(),
            path: self.root.join(BinfmtConfig::REGISTER_ENTRY),
            record: line.clone(),
            source: io::Error::from(io::ErrorKind::InvalidInput),
        };

        let parsed = RegistrationRecord::parse(&line).ok_or_else(invalid)?;
        if is_reserved_entry(&parsed.name) || parsed.name.contains('/') || parsed.name == "." {
            return Err(invalid());
        }

        let mut entries = self.lock();
        if entries.contains_key(&parsed.name) {
            return Err(BinfmtError::AlreadyRegistered { name: parsed.name });
        }
        entries.insert(
            parsed.name.clone(),
            EntryStatus {
                enabled: true,
                interpreter: Some(parsed.interpreter.display().to_string()),
                flags: kernel_flags(&parsed.flags),
                offset: Some(0),
                magic: Some(parsed.magic),
                mask: Some(parsed.mask),
            },
        );
        Ok(())
    }

    fn write_entry(&self, name: &str, payload: &[u8]) -> Result<()> {
        self.check_mounted(name)?;
        let mut entries = self.lock();

        if name == BinfmtConfig::STATUS_ENTRY {
            if payload == BinfmtConfig::DEREGISTER_PAYLOAD {
                entries.clear();
            }
            return Ok(());
        }

        let missing = || self.io_error(io::ErrorKind::NotFound, name);
        match payload {
            b"-1" => {
                entries.remove(name).ok_or_else(missing)?;
            }
            b"0" | b"1" => {
                let entry = entries.get_mut(name).ok_or_else(missing)?;
                entry.enabled = payload == b"1";
            }
            _ => return Err(self.io_error(io::ErrorKind::InvalidInput, name)),
        }
        Ok(())
    }
}
