//! The binfmt_misc pseudo-filesystem protocol.
//!
//! Registrations are created by writing one record to the `register` control
//! file, removed by writing `-1` to the entry itself, and described by the
//! plain-text content of each entry. [`BinfmtInterface`] is the seam between
//! that protocol and everything above it:
//!
//! - [`MountPoint`] talks to a live mount (usually `/proc/sys/fs/binfmt_misc`)
//! - [`MemoryKernel`] models the kernel side in memory for tests and dry runs

mod memory;
mod mount_point;
mod record;

pub use memory::MemoryKernel;
pub use mount_point::MountPoint;
pub use record::RegistrationRecord;

use crate::config::BinfmtConfig;
use crate::error::Result;

/// Operations the binfmt_misc filesystem offers.
pub trait BinfmtInterface {
    /// Every entry in the mount point, control files included, sorted by name.
    fn list_entries(&self) -> Result<Vec<String>>;

    /// The status text of one entry.
    fn read_entry(&self, name: &str) -> Result<String>;

    /// Write a registration record to `register` in a single write.
    fn register(&self, record: &RegistrationRecord) -> Result<()>;

    /// Write a control payload (`-1`, `0`, `1`) to an entry.
    fn write_entry(&self, name: &str, payload: &[u8]) -> Result<()>;
}

/// Parsed status text of a registration entry.
///
/// ```text
/// enabled
/// interpreter /usr/bin/qemu-aarch64
/// flags: OCF
/// offset 0
/// magic 7f454c460201010000000000000000000200b700
/// mask ffffffffffffff00fffffffffffffffffeffffff
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryStatus {
    pub enabled: bool,
    pub interpreter: Option<String>,
    pub flags: String,
    pub offset: Option<u32>,
    pub magic: Option<Vec<u8>>,
    pub mask: Option<Vec<u8>>,
}

impl EntryStatus {
    pub fn parse(text: &str) -> Self {
        let mut status = EntryStatus {
            enabled: text.starts_with(BinfmtConfig::ENABLED_TOKEN),
            ..Default::default()
        };

        for line in text.lines().skip(1) {
            let (key, value) = match line.split_once(' ') {
                Some(pair) => pair,
                None => continue,
            };
            let value = value.trim();
            match key {
                "interpreter" => status.interpreter = Some(value.to_string()),
                "flags:" => status.flags = value.to_string(),
                "offset" => status.offset = value.parse().ok(),
                "magic" => status.magic = decode_hex(value),
                "mask" => status.mask = decode_hex(value),
                _ => {}
            }
        }
        status
    }

    /// Render the status text the way the kernel does.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(if self.enabled { "enabled\n" } else { "disabled\n" });
        if let Some(interpreter) = &self.interpreter {
            out.push_str(&format!("interpreter {}\n", interpreter));
        }
        out.push_str(&format!("flags: {}\n", self.flags));
        if let Some(offset) = self.offset {
            out.push_str(&format!("offset {}\n", offset));
        }
        if let Some(magic) = &self.magic {
            out.push_str(&format!("magic {}\n", encode_hex(magic)));
        }
        if let Some(mask) = &self.mask {
            out.push_str(&format!("mask {}\n", encode_hex(mask)));
        }
        out
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}
