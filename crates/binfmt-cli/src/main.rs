//! binfmt - install and uninstall QEMU binfmt_misc handlers.
//!
//! Mounts binfmt_misc if needed, applies the requested uninstalls and then
//! installs, and prints the resulting status as JSON on stdout. Per-item
//! outcomes are logged to stderr.

mod version;

use anyhow::{Context, Result};
use binfmt_core::{
    ensure_mounted_with, BatchReport, BinfmtConfig, BinfmtManager, EmulatorEnv, HostProbe,
    MountOps, MountPoint, SystemMount,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "binfmt")]
#[command(about = "Manage QEMU binfmt_misc registrations")]
#[command(disable_version_flag = true)]
struct Args {
    /// binfmt_misc mount point
    #[arg(long, default_value = BinfmtConfig::DEFAULT_MOUNT)]
    mount: PathBuf,

    /// Architectures to install (comma-separated names, platforms, or "all")
    #[arg(long, default_value = "")]
    install: String,

    /// Architectures or emulators to uninstall (comma-separated, globs allowed)
    #[arg(long, default_value = "")]
    uninstall: String,

    /// Display version
    #[arg(long)]
    version: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the status JSON.
    // RUST_LOG overrides the level chosen by --debug.
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if args.version {
        eprintln!("{}", version::version_line());
        return Ok(());
    }

    run(&args, Arc::new(SystemMount))
}

/// Stop the run if a batch hit an error no later step can recover from.
fn check_fatal(report: &BatchReport) -> Result<()> {
    match report.fatal() {
        Some(err) => anyhow::bail!("aborting: {}", err),
        None => Ok(()),
    }
}

fn run(args: &Args, mount_ops: Arc<dyn MountOps>) -> Result<()> {
    if !binfmt_core::platform::is_supported_platform() {
        anyhow::bail!("binfmt_misc is only available on Linux");
    }

    // Held until the end of run so a mount we made is undone on every exit path.
    let guard = ensure_mounted_with(&args.mount, mount_ops)?;
    debug!(
        "Using binfmt_misc at {} (mounted by us: {})",
        guard.path().display(),
        guard.mounted_by_us()
    );

    let manager = BinfmtManager::new(
        MountPoint::new(&args.mount),
        HostProbe::new(),
        EmulatorEnv::from_env(),
    );

    let uninstalled = manager.uninstall_targets(&args.uninstall);
    uninstalled.log();
    check_fatal(&uninstalled)?;

    let installed = manager.install_targets(&args.install);
    installed.log();
    check_fatal(&installed)?;

    let status = manager
        .status()
        .with_context(|| format!("Cannot read binfmt_misc status at {}", args.mount.display()))?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["binfmt"]).unwrap();
        assert_eq!(args.mount, PathBuf::from("/proc/sys/fs/binfmt_misc"));
        assert!(args.install.is_empty());
        assert!(args.uninstall.is_empty());
        assert!(!args.version);
    }

    #[test]
    fn test_install_and_uninstall_lists() {
        let args = Args::try_parse_from([
            "binfmt",
            "--mount",
            "/tmp/binfmt",
            "--install",
            "arm64,linux/riscv64",
            "--uninstall",
            "qemu-*",
            "--version",
        ])
        .unwrap();
        assert_eq!(args.mount, PathBuf::from("/tmp/binfmt"));
        assert_eq!(args.install, "arm64,linux/riscv64");
        assert_eq!(args.uninstall, "qemu-*");
        assert!(args.version);
    }

    #[test]
    fn test_run_against_existing_mount() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("status"), "enabled\n").unwrap();
        std::fs::write(temp_dir.path().join("qemu-arm"), "enabled\n").unwrap();

        let args = Args::try_parse_from([
            "binfmt",
            "--mount",
            temp_dir.path().to_str().unwrap(),
            "--uninstall",
            "arm",
        ])
        .unwrap();
        run(&args, Arc::new(SystemMount)).unwrap();

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("qemu-arm")).unwrap(),
            "-1"
        );
    }

    /// Mount calls that succeed without touching the filesystem.
    #[derive(Debug, Default)]
    struct CountingMount {
        unmounts: AtomicUsize,
    }

    impl MountOps for CountingMount {
        fn mount(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }

        fn unmount(&self, _path: &Path) -> io::Result<()> {
            self.unmounts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_run_unmounts_when_status_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        // The fake mount leaves this directory missing, so reading status fails.
        let mount = temp_dir.path().join("binfmt_misc");
        let args =
            Args::try_parse_from(["binfmt", "--mount", mount.to_str().unwrap()]).unwrap();

        let ops = Arc::new(CountingMount::default());
        assert!(run(&args, ops.clone()).is_err());
        assert_eq!(ops.unmounts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_leaves_existing_mount_alone() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("status"), "enabled\n").unwrap();
        let args =
            Args::try_parse_from(["binfmt", "--mount", temp_dir.path().to_str().unwrap()])
                .unwrap();

        let ops = Arc::new(CountingMount::default());
        run(&args, ops.clone()).unwrap();
        assert_eq!(ops.unmounts.load(Ordering::SeqCst), 0);
    }
}
