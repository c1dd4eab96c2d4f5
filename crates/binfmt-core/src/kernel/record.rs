use crate::signature::{hex_escape, hex_unescape};
use std::fmt;
use std::path::PathBuf;

/// One registration line for the `register` control file.
///
/// Rendered as `:<name>:M:0:<magic>:<mask>:<interpreter>:<flags>`. Matching
/// always starts at offset 0 of the candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub name: String,
    pub magic: Vec<u8>,
    pub mask: Vec<u8>,
    pub interpreter: PathBuf,
    pub flags: String,
}

impl RegistrationRecord {
    /// Parse a record back into its fields.
    ///
    /// The first character is the field delimiter, as in the kernel. Only the
    /// magic (`M`) type at offset 0 is accepted.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches('\n');
        let delimiter = line.chars().next()?;
        let fields: Vec<&str> = line[delimiter.len_utf8()..].split(delimiter).collect();
        let [name, kind, offset, magic, mask, interpreter, flags] = fields.as_slice() else {
            return None;
        };
        if *kind != "M" || !matches!(*offset, "" | "0") || name.is_empty() {
            return None;
        }

        let magic = hex_unescape(magic)?;
        let mask = if mask.is_empty() {
            vec![0xff; magic.len()]
        } else {
            hex_unescape(mask)?
        };
        if magic.is_empty() || magic.len() != mask.len() || interpreter.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            magic,
            mask,
            interpreter: PathBuf::from(interpreter),
            flags: flags.to_string(),
        })
    }
}

impl fmt::Display for RegistrationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ":{}:M:0:{}:{}:{}:{}",
            self.name,
            hex_escape(&self.magic),
            hex_escape(&self.mask),
            self.interpreter.display(),
            self.flags
        )
    }
}
