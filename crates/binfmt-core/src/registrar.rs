//! Installing and removing binfmt_misc registrations.

use crate::config::{is_reserved_entry, BinfmtConfig};
use crate::error::{BinfmtError, Result};
use crate::kernel::{BinfmtInterface, RegistrationRecord};
use crate::locator::{BinaryLocator, ResolvedBinary};
use crate::signature::SignatureTable;
use tracing::debug;

/// Registers and deregisters emulators through a [`BinfmtInterface`].
pub struct Registrar<'a, B: BinfmtInterface + ?Sized> {
    kernel: &'a B,
    locator: &'a BinaryLocator,
}

impl<'a, B: BinfmtInterface + ?Sized> Registrar<'a, B> {
    pub fn new(kernel: &'a B, locator: &'a BinaryLocator) -> Self {
        Self { kernel, locator }
    }

    /// Build the registration record for an architecture without writing it.
    pub fn record_for(&self, arch: &str) -> Result<(RegistrationRecord, ResolvedBinary)> {
        let cfg = SignatureTable::lookup(arch)
            .ok_or_else(|| BinfmtError::UnsupportedArchitecture(arch.to_string()))?;
        let binary = self.locator.resolve(cfg)?;

        let record = RegistrationRecord {
            name: binary.name.clone(),
            magic: cfg.magic.to_vec(),
            mask: cfg.mask.to_vec(),
            interpreter: binary.path.clone(),
            flags: self.locator.env().registration_flags(),
        };
        Ok((record, binary))
    }

    /// Register the emulator for `arch`.
    ///
    /// The record is written once. Nothing is retried; an existing entry
    /// under the same name surfaces as [`BinfmtError::AlreadyRegistered`]
    /// and is left as it was.
    pub fn install(&self, arch: &str) -> Result<ResolvedBinary> {
        let (record, binary) = self.record_for(arch)?;
        self.kernel.register(&record)?;
        debug!("Registered {} -> {}", binary.name, binary.path.display());
        Ok(binary)
    }

    /// Deregister the first entry named `target` or ending in `-<target>`.
    ///
    /// Returns the name of the removed entry. Only one entry is removed per
    /// call; wildcard targets must be expanded first.
    pub fn uninstall(&self, target: &str) -> Result<String> {
        let entries = self.kernel.list_entries()?;
        let suffix = format!("-{}", target);

        let name = entries
            .into_iter()
            .filter(|name| !is_reserved_entry(name))
            .find(|name| name == target || name.ends_with(&suffix))
            .ok_or_else(|| BinfmtError::NotFound {
                target: target.to_string(),
            })?;

        self.kernel
            .write_entry(&name, BinfmtConfig::DEREGISTER_PAYLOAD)?;
        debug!("Deregistered {}", name);
        Ok(name)
    }
}
