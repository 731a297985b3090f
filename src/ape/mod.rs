use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use memchr::memmem;

use crate::common::error::{Mp3TagError, Result};
use crate::common::util;

pub const APE_PREAMBLE: &[u8; 8] = b"APETAGEX";
/// Size of the APE header and of the footer.
pub const APE_HEADER_SIZE: usize = 32;
/// Window size of the backward signature search.
pub const SEARCH_CHUNK_SIZE: u64 = 4096;

pub const FLAG_READ_ONLY: u32 = 1;
pub const FLAG_BINARY: u32 = 1 << 1;
pub const FLAG_IS_HEADER: u32 = 1 << 29;
pub const FLAG_HAS_FOOTER: u32 = 1 << 30;
pub const FLAG_HAS_HEADER: u32 = 1 << 31;

const MAX_KEY_LEN: usize = 255;
// value size + flags
const ITEM_PREFIX_SIZE: usize = 8;

/// APE tag header or footer (same 32-byte layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApeHeader {
    pub version: u32,
    /// Items plus footer, excluding the header.
    pub tag_size: u32,
    pub item_count: u32,
    pub flags: u32,
}

impl ApeHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < APE_HEADER_SIZE || &data[..8] != APE_PREAMBLE {
            return Err(Mp3TagError::Ape("missing APETAGEX preamble".into()));
        }

        let mut cursor = Cursor::new(&data[8..APE_HEADER_SIZE]);
        let version = cursor.read_u32::<LittleEndian>()?;
        let tag_size = cursor.read_u32::<LittleEndian>()?;
        let item_count = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;

        Ok(ApeHeader {
            version,
            tag_size,
            item_count,
            flags,
        })
    }

    pub fn contains_header(&self) -> bool {
        self.flags & FLAG_HAS_HEADER != 0
    }

    pub fn contains_footer(&self) -> bool {
        self.flags & FLAG_HAS_FOOTER != 0
    }

    /// Set on the header, clear on the footer.
    pub fn is_header(&self) -> bool {
        self.flags & FLAG_IS_HEADER != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & FLAG_READ_ONLY != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApeValue {
    Text(String),
    Binary(Vec<u8>),
}

/// A single key/value item of an APE tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApeItem {
    pub key: String,
    pub flags: u32,
    pub value: ApeValue,
}

impl ApeItem {
    pub fn is_read_only(&self) -> bool {
        self.flags & FLAG_READ_ONLY != 0
    }

    pub fn is_binary(&self) -> bool {
        self.flags & FLAG_BINARY != 0
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            ApeValue::Text(s) => Some(s),
            ApeValue::Binary(_) => None,
        }
    }

    pub fn value_size(&self) -> usize {
        match &self.value {
            ApeValue::Text(s) => s.len(),
            ApeValue::Binary(b) => b.len(),
        }
    }

    /// Bytes the item occupies on disk.
    pub fn size(&self) -> usize {
        ITEM_PREFIX_SIZE + self.key.len() + 1 + self.value_size()
    }
}

/// A parsed APEv2 tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApeTag {
    /// Absolute file offset of the header, or of the first item if there is no header.
    pub offset: u64,
    pub header: ApeHeader,
    pub items: Vec<ApeItem>,
}

impl ApeTag {
    /// Case-insensitive key lookup.
    pub fn get(&self, key: &str) -> Option<&ApeItem> {
        self.items.iter().find(|item| item.key.eq_ignore_ascii_case(key))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Search backward from the end of the stream for the APE signature.
///
/// Reads `SEARCH_CHUNK_SIZE` windows from the end toward the start; each
/// window extends 7 bytes into the previously searched one so a signature
/// split across a window boundary is still seen. Within a window the last
/// match wins. Returns the absolute offset of the match.
pub fn find_ape_tag<R: Read + Seek>(reader: &mut R) -> Result<Option<u64>> {
    let len = reader.seek(SeekFrom::End(0))?;
    let overlap = APE_PREAMBLE.len() as u64 - 1;
    let finder = memmem::FinderRev::new(APE_PREAMBLE);

    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(SEARCH_CHUNK_SIZE);
        let read_end = (end + overlap).min(len);
        let window = util::read_at(reader, start, (read_end - start) as usize)?;

        if let Some(pos) = finder.rfind(&window) {
            return Ok(Some(start + pos as u64));
        }
        end = start;
    }

    Ok(None)
}

/// Parse `item_count` items from `data`. Stops early, without failing, when
/// an item would run past the buffer. Returns the items and the bytes consumed.
pub fn parse_items(data: &[u8], item_count: u32) -> (Vec<ApeItem>, usize) {
    let mut items = Vec::new();
    let mut offset = 0usize;

    for _ in 0..item_count {
        if offset + ITEM_PREFIX_SIZE > data.len() {
            log::debug!("APE item header runs past the tag, stopping");
            break;
        }
        let value_size = LittleEndian::read_u32(&data[offset..offset + 4]) as usize;
        let flags = LittleEndian::read_u32(&data[offset + 4..offset + 8]);

        let key_start = offset + ITEM_PREFIX_SIZE;
        let key_area = &data[key_start..(key_start + MAX_KEY_LEN + 1).min(data.len())];
        let Some(key_len) = memchr::memchr(0, key_area) else {
            log::debug!("APE item key is unterminated or too long, stopping");
            break;
        };

        let value_start = key_start + key_len + 1;
        let Some(value_end) = value_start
            .checked_add(value_size)
            .filter(|&end| end <= data.len())
        else {
            log::debug!("APE item value runs past the tag, stopping");
            break;
        };

        let key = String::from_utf8_lossy(&key_area[..key_len]).into_owned();
        let raw = &data[value_start..value_end];
        let value = if flags & FLAG_BINARY != 0 {
            ApeValue::Binary(raw.to_vec())
        } else {
            ApeValue::Text(String::from_utf8_lossy(raw).into_owned())
        };

        items.push(ApeItem { key, flags, value });
        offset = value_end;
    }

    (items, offset)
}

/// Locate and parse an APEv2 tag. `Ok(None)` means the file has no APE tag.
pub fn read_ape_tag<R: Read + Seek>(reader: &mut R) -> Result<Option<ApeTag>> {
    let Some(pos) = find_ape_tag(reader)? else {
        log::debug!("No APE tag found");
        return Ok(None);
    };

    let found = ApeHeader::parse(&util::read_at(reader, pos, APE_HEADER_SIZE)?)?;

    // The search usually lands on the footer; walk back to the items
    let (items_start, tag_offset) = if found.is_header() {
        (pos + APE_HEADER_SIZE as u64, pos)
    } else {
        let items_start = (pos + APE_HEADER_SIZE as u64)
            .checked_sub(found.tag_size as u64)
            .ok_or_else(|| Mp3TagError::Ape("tag size exceeds file size".into()))?;
        let tag_offset = if found.contains_header() {
            items_start.saturating_sub(APE_HEADER_SIZE as u64)
        } else {
            items_start
        };
        (items_start, tag_offset)
    };

    let body = util::read_at(reader, items_start, found.tag_size as usize)?;
    let (items, consumed) = parse_items(&body, found.item_count);

    match ApeHeader::parse(&body[consumed..]) {
        Ok(footer) if !footer.is_header() => {}
        Ok(_) => log::warn!("APE footer has the header flag set"),
        Err(_) => log::warn!("APE items are not followed by a footer"),
    }

    Ok(Some(ApeTag {
        offset: tag_offset,
        header: found,
        items,
    }))
}
