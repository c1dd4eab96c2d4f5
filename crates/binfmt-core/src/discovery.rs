//! Expansion of user selectors into concrete install and uninstall targets.

use crate::config::is_reserved_entry;
use crate::kernel::BinfmtInterface;
use crate::locator::BinaryLocator;
use crate::platform::{binary_presence, BinaryPresence, Platform, PlatformProbe};
use crate::signature::SignatureTable;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Selector value that installs every missing architecture.
pub const ALL_SELECTOR: &str = "all";

/// Split a comma-separated list, dropping empty tokens.
fn tokens(selector: &str) -> impl Iterator<Item = &str> {
    selector.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Architectures to install for `selector`.
///
/// `all` yields every table architecture the host cannot already run whose
/// emulator binary is present on disk (or whose binary path cannot even be
/// resolved, so the install step reports why). Otherwise each
/// comma-separated token is parsed as a platform and reduced to its
/// architecture, or kept verbatim when it does not parse.
pub fn expand_install_targets<B, P>(
    selector: &str,
    kernel: &B,
    probe: &P,
    locator: &BinaryLocator,
) -> Vec<String>
where
    B: BinfmtInterface,
    P: PlatformProbe + ?Sized,
{
    if selector == ALL_SELECTOR {
        return all_architectures(kernel, probe, locator);
    }

    tokens(selector)
        .map(|token| match Platform::parse(token) {
            Ok(platform) => platform.architecture,
            Err(_) => token.to_string(),
        })
        .collect()
}

fn all_architectures<B, P>(kernel: &B, probe: &P, locator: &BinaryLocator) -> Vec<String>
where
    B: BinfmtInterface,
    P: PlatformProbe + ?Sized,
{
    let supported: HashSet<String> = probe
        .supported_platforms(kernel)
        .into_iter()
        .map(|p| p.architecture)
        .collect();

    let mut out = Vec::new();
    for cfg in SignatureTable::architectures() {
        if supported.contains(cfg.name) {
            continue;
        }
        match locator.resolve(cfg) {
            Ok(binary) => match binary_presence(&binary.path) {
                BinaryPresence::Missing => {
                    debug!("Skipping {}: {} not found", cfg.name, binary.path.display());
                }
                BinaryPresence::NotExecutable => {
                    warn!("{} is not executable", binary.path.display());
                    out.push(cfg.name.to_string());
                }
                BinaryPresence::Executable => out.push(cfg.name.to_string()),
            },
            // Keep it so the install step reports the configuration error.
            Err(_) => out.push(cfg.name.to_string()),
        }
    }
    out
}

/// Entry names to uninstall for `selector`.
///
/// Tokens that parse as a platform of a known architecture are translated
/// to the emulator suffix (`arm64` becomes `aarch64`). Tokens containing
/// `*`, `?` or `[` are matched against the live entries and replaced by
/// every match; a pattern matching nothing is kept verbatim so it is
/// reported as not found.
pub fn expand_uninstall_targets<B>(selector: &str, kernel: &B) -> Vec<String>
where
    B: BinfmtInterface + ?Sized,
{
    let mut entries: Option<Vec<String>> = None;
    let mut out = Vec::new();

    for token in tokens(selector) {
        let target = match Platform::parse(token)
            .ok()
            .and_then(|p| SignatureTable::lookup(&p.architecture))
        {
            Some(cfg) => cfg.qemu_suffix().to_string(),
            None => token.to_string(),
        };

        if !is_glob(&target) {
            out.push(target);
            continue;
        }

        let pattern = match glob_to_regex(&target) {
            Some(pattern) => pattern,
            None => {
                warn!("Invalid pattern {:?}", target);
                out.push(target);
                continue;
            }
        };

        if entries.is_none() {
            entries = Some(kernel.list_entries().unwrap_or_else(|e| {
                warn!("Cannot list binfmt_misc entries: {}", e);
                Vec::new()
            }));
        }
        let matched: Vec<String> = entries
            .iter()
            .flatten()
            .filter(|name| !is_reserved_entry(name) && pattern.is_match(name))
            .cloned()
            .collect();

        if matched.is_empty() {
            out.push(target);
        } else {
            out.extend(matched);
        }
    }
    out
}

/// Whether a token contains shell wildcard characters.
pub fn is_glob(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

/// Translate a shell glob into an anchored regex.
///
/// Supports `*`, `?`, `[...]` classes (negated with `^` or `!`) and
/// backslash escapes. Returns `None` for malformed patterns.
pub fn glob_to_regex(glob: &str) -> Option<Regex> {
    let mut re = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '\\' => {
                let escaped = chars.next()?;
                re.push_str(&regex::escape(&escaped.to_string()));
            }
            '[' => {
                re.push('[');
                if matches!(chars.peek(), Some('^') | Some('!')) {
                    chars.next();
                    re.push('^');
                }
                let mut empty = true;
                loop {
                    match chars.next()? {
                        ']' if !empty => break,
                        '\\' => {
                            let escaped = chars.next()?;
                            re.push_str(&regex::escape(&escaped.to_string()));
                        }
                        '-' if !empty && chars.peek() != Some(&']') => re.push('-'),
                        other => re.push_str(&regex::escape(&other.to_string())),
                    }
                    empty = false;
                }
                re.push(']');
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}
