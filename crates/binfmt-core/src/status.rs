//! Snapshot of supported platforms and active emulators.

use crate::config::BinfmtConfig;
use crate::error::Result;
use crate::kernel::BinfmtInterface;
use crate::platform::{format_platforms, PlatformProbe};
use serde::{Deserialize, Serialize};

/// What the host can run and which handlers are enabled.
///
/// Recomputed on every request; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Canonical platform strings, host platform first.
    pub supported: Vec<String>,
    /// Names of enabled registration entries, sorted.
    pub emulators: Vec<String>,
}

impl StatusSnapshot {
    /// Read the current state. Has no side effects.
    pub fn collect<B, P>(kernel: &B, probe: &P) -> Result<Self>
    where
        B: BinfmtInterface,
        P: PlatformProbe + ?Sized,
    {
        Ok(Self {
            supported: format_platforms(&probe.supported_platforms(kernel)),
            emulators: enabled_emulators(kernel)?,
        })
    }

    /// Indented JSON, as printed on stdout.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Names of entries whose status text starts with `enabled`.
pub fn enabled_emulators<B: BinfmtInterface + ?Sized>(kernel: &B) -> Result<Vec<String>> {
    let mut emulators = Vec::new();
    for name in kernel.list_entries()? {
        if name == BinfmtConfig::REGISTER_ENTRY || name == BinfmtConfig::STATUS_ENTRY {
            continue;
        }
        let content = kernel.read_entry(&name)?;
        if content.starts_with(BinfmtConfig::ENABLED_TOKEN) {
            emulators.push(name);
        }
    }
    Ok(emulators)
}
