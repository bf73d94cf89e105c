// src/probe.rs

//! Small questions asked of the host: a free port, terminal colours, whether
//! a file looks like text.

use std::io::{IsTerminal, Read};
use std::net::TcpListener;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::fs::FileSystem;

/// Interface used by [`available_port`] when the caller has no preference.
pub const DEFAULT_INTERFACE: &str = "localhost";

/// ASCII control bytes (tab included; LF, CR and SO excluded) and lead bytes
/// that are invalid in UTF-8.
const NON_TEXT_BYTES: &[u8] = &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0B, 0x0C, 0x0F, 0x10, 0x11,
    0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, 0xC0,
    0xC1, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

const TEXT_SNIFF_LEN: u64 = 100;

/// Ask the OS for a currently unused TCP port on `interface`.
///
/// The listener is closed before returning, so another process may grab the
/// port before the caller binds it.
pub fn available_port(interface: &str) -> Result<u16> {
    let listener = TcpListener::bind((interface, 0))
        .with_context(|| format!("binding a probe socket on {interface}"))?;
    let port = listener.local_addr()?.port();
    drop(listener);

    if port == 0 {
        return Err(HarnessError::Other(anyhow::anyhow!(
            "kernel assigned port 0 on {interface}"
        )));
    }
    debug!(interface, port, "found available port");
    Ok(port)
}

/// True when both stdout and stderr are terminals whose terminfo entry can
/// set a foreground colour.
pub fn supports_terminal_colors() -> bool {
    if !std::io::stdout().is_terminal() || !std::io::stderr().is_terminal() {
        return false;
    }
    terminal_has_setaf()
}

fn terminal_has_setaf() -> bool {
    match terminfo::Database::from_env() {
        Ok(db) => db
            .get::<terminfo::capability::SetAForeground>()
            .is_some(),
        Err(e) => {
            debug!(error = %e, "terminfo lookup failed");
            false
        }
    }
}

/// Guess whether `path` holds text by looking at its first bytes.
pub fn guess_is_text_file(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    let mut head = Vec::with_capacity(TEXT_SNIFF_LEN as usize);
    fs.open_read(path)?
        .take(TEXT_SNIFF_LEN)
        .read_to_end(&mut head)?;
    Ok(looks_like_text(&head))
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.iter().any(|b| NON_TEXT_BYTES.contains(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn control_bytes_and_bad_utf8_leads_are_not_text() {
        assert!(looks_like_text(b"rethinkdb 2.4.0\nready\r\n"));
        assert!(looks_like_text("caf\u{e9}".as_bytes()));
        assert!(looks_like_text(b""));
        assert!(!looks_like_text(b"col1\tcol2"));
        assert!(!looks_like_text(b"\x7fELF\x02\x01\x01\x00"));
        assert!(!looks_like_text(&[b'a', 0x1B, b'[']));
        assert!(!looks_like_text(&[0xC0, 0x80]));
    }

    #[test]
    fn only_the_first_hundred_bytes_are_inspected() {
        let fs = MockFileSystem::new();
        let mut content = vec![b'x'; 100];
        content.push(0x00);
        fs.add_file("/logs/server.log", content);
        fs.add_file("/bin/blob", vec![0x00, 0x01, 0x02]);

        assert!(guess_is_text_file(&fs, Path::new("/logs/server.log")).unwrap());
        assert!(!guess_is_text_file(&fs, Path::new("/bin/blob")).unwrap());
        assert!(guess_is_text_file(&fs, Path::new("/missing")).is_err());
    }
}
