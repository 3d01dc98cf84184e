//! RFC 1035 domain-name codec, including compression pointers.

use rustc_hash::FxHashMap;

use super::wire::Cursor;
use super::{MAX_LABEL_LEN, MAX_NAME_LEN, MAX_POINTER_HOPS, POINTER_MASK};
use crate::error::DnsError;

/// Largest offset expressible in a 14-bit compression pointer.
const MAX_POINTER_TARGET: usize = 0x3FFF;

/// Decode a domain name starting at the cursor position.
///
/// The cursor ends up two bytes past the first compression pointer
/// encountered, or one byte past the terminating zero if the name was read
/// without jumping. Case is preserved; normalization happens at match time.
pub fn decode_name(cur: &mut Cursor<'_>) -> Result<String, DnsError> {
    let data = cur.data();
    let len = data.len();
    let mut pos = cur.pos();
    let mut jumped = false;
    let mut hops = 0;
    let mut name: Vec<u8> = Vec::new();

    loop {
        if pos >= len {
            return Err(DnsError::ParseTruncated);
        }
        let octet = data[pos];

        // End of name.
        if octet == 0 {
            if !jumped {
                cur.set_pos(pos + 1);
            }
            break;
        }

        match octet & POINTER_MASK {
            POINTER_MASK => {
                // Pointer: low 6 bits of this octet plus the next byte form a
                // 14-bit absolute offset into the datagram.
                if pos + 1 >= len {
                    return Err(DnsError::ParsePtrOob);
                }
                let target = (usize::from(octet & 0x3F) << 8) | usize::from(data[pos + 1]);
                if target >= len {
                    return Err(DnsError::ParsePtrOob);
                }
                // Only the first pointer freezes the caller-visible position.
                if !jumped {
                    cur.set_pos(pos + 2);
                }
                jumped = true;
                pos = target;
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DnsError::ParsePtrLoop);
                }
            }
            0 => {
                // Literal label, 1-63 bytes.
                let label_len = usize::from(octet);
                pos += 1;
                if pos + label_len > len {
                    return Err(DnsError::ParseTruncated);
                }
                if !name.is_empty() {
                    name.push(b'.');
                }
                name.extend_from_slice(&data[pos..pos + label_len]);
                pos += label_len;
                if name.len() > MAX_NAME_LEN {
                    return Err(DnsError::ParseNameTooLong);
                }
            }
            // The 01 and 10 tag values are reserved.
            _ => return Err(DnsError::ParseBadLabel),
        }
    }

    // Names on the wire are A-labels, so ASCII in practice.
    String::from_utf8(name).map_err(|_| DnsError::ParseBadLabel)
}

/// Append a dotted name to `buf` in wire format.
///
/// With a compression table, each suffix already written to the datagram is
/// replaced by a two-byte pointer; fresh suffixes are registered at their
/// absolute offset, which is simply `buf.len()` because the message encoder
/// writes into a single buffer from byte zero. The root (empty) name encodes
/// as a lone zero byte.
pub fn encode_name(
    name: &str,
    mut table: Option<&mut FxHashMap<String, u16>>,
    buf: &mut Vec<u8>,
) -> Result<(), DnsError> {
    let start = buf.len();
    let mut pos = 0;

    while pos < name.len() {
        let suffix = &name[pos..];

        if let Some(table) = table.as_deref_mut() {
            if let Some(&offset) = table.get(suffix) {
                buf.push(0xC0 | (offset >> 8) as u8);
                buf.push(offset as u8);
                return Ok(());
            }
            // Offsets past 0x3FFF cannot be expressed in 14 bits; the 4096-byte
            // payload cap keeps this branch from ever skipping in practice.
            if buf.len() <= MAX_POINTER_TARGET {
                table.insert(suffix.to_owned(), buf.len() as u16);
            }
        }

        let label_end = suffix.find('.').unwrap_or(suffix.len());
        let label = &suffix[..label_end];
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(DnsError::EncodeLabelTooLong);
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
        pos += label.len() + 1;
    }

    buf.push(0);
    if buf.len() - start > MAX_NAME_LEN {
        return Err(DnsError::EncodeNameTooLong);
    }
    Ok(())
}
