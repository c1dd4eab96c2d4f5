//! Build identification.
//!
//! `BINFMT_REVISION` and `BINFMT_QEMU_VERSION` are read at compile time so
//! release builds can stamp the git revision and the bundled QEMU version.

pub const REVISION: &str = match option_env!("BINFMT_REVISION") {
    Some(revision) => revision,
    None => "unknown",
};

pub const QEMU_VERSION: &str = match option_env!("BINFMT_QEMU_VERSION") {
    Some(version) => version,
    None => "unknown",
};

pub fn version_line() -> String {
    format!(
        "binfmt/{} qemu/{} binfmt-cli/{}",
        REVISION,
        QEMU_VERSION,
        env!("CARGO_PKG_VERSION")
    )
}
