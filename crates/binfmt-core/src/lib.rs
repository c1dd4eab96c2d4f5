//! binfmt-core - binfmt_misc registration manager.
//!
//! Registers user-space emulators (QEMU user-mode binaries) with the Linux
//! `binfmt_misc` subsystem so foreign-architecture ELF executables run
//! transparently, removes those registrations, and reports what is active.
//!
//! # Example
//!
//! ```rust,no_run
//! use binfmt_core::{ensure_mounted, BinfmtManager, EmulatorEnv, HostProbe, MountPoint};
//!
//! fn main() -> binfmt_core::Result<()> {
//!     let mount = "/proc/sys/fs/binfmt_misc";
//!     let _guard = ensure_mounted(mount.as_ref())?;
//!
//!     let manager = BinfmtManager::new(
//!         MountPoint::new(mount),
//!         HostProbe::new(),
//!         EmulatorEnv::from_env(),
//!     );
//!     manager.install_targets("arm64,riscv64").log();
//!
//!     println!("{}", manager.status()?.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod kernel;
pub mod locator;
pub mod manager;
pub mod platform;
pub mod registrar;
pub mod report;
pub mod signature;
pub mod status;

// Re-export commonly used types
pub use config::{BinfmtConfig, EmulatorConfig, EmulatorEnv};
pub use discovery::{expand_install_targets, expand_uninstall_targets, ALL_SELECTOR};
pub use error::{BinfmtError, Result};
pub use kernel::{BinfmtInterface, EntryStatus, MemoryKernel, MountPoint, RegistrationRecord};
pub use locator::{BinaryLocator, ResolvedBinary};
pub use manager::BinfmtManager;
pub use platform::{
    ensure_mounted, ensure_mounted_with, HostProbe, MountGuard, MountOps, Platform, PlatformProbe,
    StaticProbe, SystemMount,
};
pub use registrar::Registrar;
pub use report::{Action, BatchReport, ItemOutcome};
pub use signature::{ArchitectureConfig, SignatureTable};
pub use status::StatusSnapshot;
