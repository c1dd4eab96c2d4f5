//! Compiled-in ELF signatures for every supported guest architecture.
//!
//! Each magic covers the first 20 bytes of an ELF header: the `\x7fELF`
//! identification, `EI_CLASS`, `EI_DATA`, `EI_VERSION`, the OS/ABI and ABI
//! version bytes, padding, `e_type` and `e_machine`. The mask clears the bytes
//! that vary between otherwise identical binaries (OS/ABI, ABI version, the
//! low bit of `e_type` so both `ET_EXEC` and `ET_DYN` match).
//!
//! Reference: QEMU `scripts/qemu-binfmt-conf.sh`.

use std::fmt::Write as _;

/// Signature and emulator for one guest architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchitectureConfig {
    /// Architecture name in GOARCH/OCI form (`amd64`, `arm64`, ...).
    pub name: &'static str,
    /// Base name of the emulator binary (`qemu-x86_64`, ...).
    pub emulator: &'static str,
    pub magic: &'static [u8],
    pub mask: &'static [u8],
}

impl ArchitectureConfig {
    /// Magic in the `\xHH` form the kernel parses out of a registration record.
    pub fn escaped_magic(&self) -> String {
        hex_escape(self.magic)
    }

    /// Mask in the `\xHH` form the kernel parses out of a registration record.
    pub fn escaped_mask(&self) -> String {
        hex_escape(self.mask)
    }

    /// Whether `header` would be handed to this emulator by the kernel.
    ///
    /// Compares `(header ^ magic) & mask` byte by byte over the magic length.
    pub fn matches(&self, header: &[u8]) -> bool {
        header.len() >= self.magic.len()
            && self
                .magic
                .iter()
                .zip(self.mask)
                .zip(header)
                .all(|((magic, mask), byte)| (byte ^ magic) & mask == 0)
    }

    /// Whether some byte sequence exists that both signatures accept.
    pub fn overlaps(&self, other: &ArchitectureConfig) -> bool {
        let len = self.magic.len().min(other.magic.len());
        (0..len).all(|i| {
            (self.magic[i] ^ other.magic[i]) & self.mask[i] & other.mask[i] == 0
        })
    }

    /// Emulator name without the `qemu-` prefix (`aarch64` for arm64).
    pub fn qemu_suffix(&self) -> &'static str {
        self.emulator
            .strip_prefix(crate::config::EmulatorConfig::QEMU_NAME_PREFIX)
            .unwrap_or(self.emulator)
    }
}

/// Escape every byte as `\xHH`.
///
/// Escaping printable bytes too keeps `:` and NUL out of the record fields.
pub fn hex_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "\\x{:02x}", byte);
    }
    out
}

/// Decode a `\xHH`-escaped string back into bytes. Unescaped characters are
/// taken literally, matching the kernel's parser.
pub fn hex_unescape(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            let hex = text.get(i + 2..i + 4)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// The compiled-in table, sorted by architecture name.
static TABLE: &[ArchitectureConfig] = &[
    ArchitectureConfig {
        name: "386",
        emulator: "qemu-i386",
        magic: b"\x7fELF\x01\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x03\x00",
        mask: b"\xff\xff\xff\xff\xff\xfe\xfe\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "amd64",
        emulator: "qemu-x86_64",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x3e\x00",
        mask: b"\xff\xff\xff\xff\xff\xfe\xfe\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "arm",
        emulator: "qemu-arm",
        magic: b"\x7fELF\x01\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x28\x00",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "arm64",
        emulator: "qemu-aarch64",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\xb7\x00",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "loong64",
        emulator: "qemu-loongarch64",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x02\x01",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\xfc\x00\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "mips64",
        emulator: "qemu-mips64",
        magic: b"\x7fELF\x02\x02\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x08",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff",
    },
    ArchitectureConfig {
        name: "mips64le",
        emulator: "qemu-mips64el",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x08\x00",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\x00\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "ppc64le",
        emulator: "qemu-ppc64le",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x15\x00",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\x00",
    },
    ArchitectureConfig {
        name: "riscv64",
        emulator: "qemu-riscv64",
        magic: b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\xf3\x00",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff\xff",
    },
    ArchitectureConfig {
        name: "s390x",
        emulator: "qemu-s390x",
        magic: b"\x7fELF\x02\x02\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x02\x00\x16",
        mask: b"\xff\xff\xff\xff\xff\xff\xff\x00\xff\xff\xff\xff\xff\xff\xff\xff\xff\xfe\xff\xff",
    },
];

/// Lookup into the compiled-in architecture signatures.
pub struct SignatureTable;

impl SignatureTable {
    /// Find the signature for an architecture name.
    pub fn lookup(name: &str) -> Option<&'static ArchitectureConfig> {
        TABLE
            .binary_search_by(|cfg| cfg.name.cmp(name))
            .ok()
            .map(|idx| &TABLE[idx])
    }

    /// Every entry, sorted by architecture name.
    pub fn architectures() -> &'static [ArchitectureConfig] {
        TABLE
    }

    /// Find the entry whose emulator has this base name.
    pub fn by_emulator(emulator: &str) -> Option<&'static ArchitectureConfig> {
        TABLE.iter().find(|cfg| cfg.emulator == emulator)
    }

    /// Find the entry with exactly this magic and mask.
    pub fn by_signature(magic: &[u8], mask: &[u8]) -> Option<&'static ArchitectureConfig> {
        TABLE.iter().find(|cfg| cfg.magic == magic && cfg.mask == mask)
    }

    /// The single entry accepting this ELF header, if any.
    pub fn identify(header: &[u8]) -> Option<&'static ArchitectureConfig> {
        let mut hits = TABLE.iter().filter(|cfg| cfg.matches(header));
        let first = hits.next()?;
        match hits.next() {
            Some(_) => None,
            None => Some(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal ELF header prefix.
    fn elf_header(class: u8, data: u8, e_type: u16, machine: u16) -> Vec<u8> {
        let mut header = vec![0x7f, b'E', b'L', b'F', class, data, 1, 0];
        header.extend_from_slice(&[0; 8]);
        if data == 1 {
            header.extend_from_slice(&e_type.to_le_bytes());
            header.extend_from_slice(&machine.to_le_bytes());
        } else {
            header.extend_from_slice(&e_type.to_be_bytes());
            header.extend_from_slice(&machine.to_be_bytes());
        }
        header
    }

    #[test]
    fn test_table_sorted_and_unique() {
        let names: Vec<_> = TABLE.iter().map(|c| c.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_magic_and_mask_lengths_match() {
        for cfg in SignatureTable::architectures() {
            assert_eq!(cfg.magic.len(), cfg.mask.len(), "{}", cfg.name);
            assert!(cfg.magic.starts_with(b"\x7fELF"), "{}", cfg.name);
            assert_eq!(&cfg.mask[..4], b"\xff\xff\xff\xff", "{}", cfg.name);
        }
    }

    #[test]
    fn test_signatures_pairwise_unambiguous() {
        let table = SignatureTable::architectures();
        for (i, a) in table.iter().enumerate() {
            for b in &table[i + 1..] {
                assert!(!a.overlaps(b), "{} and {} overlap", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_identify_real_headers() {
        let cases = [
            (elf_header(2, 1, 2, 0x3e), "amd64"),
            (elf_header(2, 1, 3, 0x3e), "amd64"),
            (elf_header(1, 1, 2, 0x03), "386"),
            (elf_header(2, 1, 2, 0xb7), "arm64"),
            (elf_header(1, 1, 3, 0x28), "arm"),
            (elf_header(2, 2, 2, 0x16), "s390x"),
            (elf_header(2, 1, 2, 0x15), "ppc64le"),
            (elf_header(2, 1, 2, 0xf3), "riscv64"),
            (elf_header(2, 2, 2, 0x08), "mips64"),
            (elf_header(2, 1, 2, 0x08), "mips64le"),
            (elf_header(2, 1, 2, 0x102), "loong64"),
        ];
        for (header, expected) in cases {
            let cfg = SignatureTable::identify(&header).expect(expected);
            assert_eq!(cfg.name, expected);
        }
    }

    #[test]
    fn test_identify_rejects_foreign_headers() {
        // SPARC64 and a truncated header
        assert!(SignatureTable::identify(&elf_header(2, 2, 2, 0x2b)).is_none());
        assert!(SignatureTable::identify(b"\x7fELF\x02").is_none());
        assert!(SignatureTable::identify(b"#!/bin/sh\n").is_none());
    }

    #[test]
    fn test_lookup() {
        let cfg = SignatureTable::lookup("arm64").unwrap();
        assert_eq!(cfg.emulator, "qemu-aarch64");
        assert_eq!(cfg.qemu_suffix(), "aarch64");
        assert!(SignatureTable::lookup("sparc64").is_none());
        assert_eq!(
            SignatureTable::by_emulator("qemu-mips64el").map(|c| c.name),
            Some("mips64le")
        );
    }

    #[test]
    fn test_hex_escape() {
        assert_eq!(hex_escape(b"\x7fELF"), "\\x7f\\x45\\x4c\\x46");
        assert_eq!(hex_escape(&[]), "");
        assert_eq!(hex_unescape("\\x7fELF").unwrap(), b"\x7fELF");
        assert!(hex_unescape("\\x7").is_none());

        let cfg = SignatureTable::lookup("riscv64").unwrap();
        assert_eq!(hex_unescape(&cfg.escaped_magic()).unwrap(), cfg.magic);
        assert_eq!(hex_unescape(&cfg.escaped_mask()).unwrap(), cfg.mask);
    }
}
