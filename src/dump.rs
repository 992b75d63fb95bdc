//! # Hex Dumps
//!
//! Byte formatting used by [`Printer::dump_hex`](crate::Printer::dump_hex)
//! and available inline through [`HexBytes`].
//!
//! ```text
//!     HexBytes   0001020304050607 08090a0b
//!                └── 8 bytes ───┘ └─ rest ─┘
//!
//!     hex dump   DUMP 20 bytes from 0x55d0c4a1e2f0:
//!                DUMP +0000:  00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f
//!                DUMP +0010:  10 11 12 13
//! ```

use std::fmt::{self, Write as _};

/// Bytes per row of a hex dump.
pub(crate) const HEX_ROW_BYTES: usize = 16;

/// Bytes per group within a row.
pub(crate) const HEX_GROUP_BYTES: usize = 8;

/// Displays bytes as lowercase hex with a space between groups of eight.
///
/// ```rust
/// use qprint::HexBytes;
///
/// let bytes: Vec<u8> = (0..10).collect();
/// assert_eq!(HexBytes(&bytes).to_string(), "0001020304050607 0809");
/// assert_eq!(HexBytes(&[]).to_string(), "");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx != 0 && idx % HEX_GROUP_BYTES == 0 {
                f.write_char(' ')?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Multi-line dump body: a summary line, then one row per 16 bytes.
///
/// Rows are labelled with their offset into `bytes`. No trailing newline.
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    let rows = (bytes.len() + HEX_ROW_BYTES - 1) / HEX_ROW_BYTES;
    let mut out = String::with_capacity(48 + rows * (12 + HEX_ROW_BYTES * 3 + 2));
    let _ = write!(out, "DUMP {} bytes from {:p}:", bytes.len(), bytes.as_ptr());

    for (row, chunk) in bytes.chunks(HEX_ROW_BYTES).enumerate() {
        let _ = write!(out, "\nDUMP +{:04x}:", row * HEX_ROW_BYTES);
        for (idx, byte) in chunk.iter().enumerate() {
            let sep = if idx % HEX_GROUP_BYTES == 0 { "  " } else { " " };
            let _ = write!(out, "{}{:02x}", sep, byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_groups() {
        let bytes: Vec<u8> = (0xf0..=0xff).chain(0..3).collect();
        assert_eq!(
            HexBytes(&bytes).to_string(),
            "f0f1f2f3f4f5f6f7 f8f9fafbfcfdfeff 000102"
        );
        assert_eq!(HexBytes(&[0xab; 8]).to_string(), "abababababababab");
    }

    #[test]
    fn test_hex_dump_rows() {
        let bytes: Vec<u8> = (0..20).collect();
        let dump = hex_dump(&bytes);
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!("DUMP 20 bytes from {:p}:", bytes.as_ptr())
        );
        assert_eq!(
            lines[1],
            "DUMP +0000:  00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f"
        );
        assert_eq!(lines[2], "DUMP +0010:  10 11 12 13");
        assert!(!dump.ends_with('\n'));
    }

    #[test]
    fn test_hex_dump_empty() {
        let dump = hex_dump(&[]);
        assert!(dump.starts_with("DUMP 0 bytes from "));
        assert_eq!(dump.lines().count(), 1);
    }
}
