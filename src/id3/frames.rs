use crate::common::error::Result;
use crate::id3::header::{BitPaddedInt, HEADER_SIZE};
use crate::id3::specs::{self, Encoding, Mp3FrameType};

pub const FRAME_ID_LEN: usize = 4;

/// Language written into new comment frames.
pub const COMMENT_LANGUAGE: &[u8; 3] = b"eng";

const ENCODING_OFFSET: usize = HEADER_SIZE;
const TEXT_OFFSET: usize = HEADER_SIZE + 1;
const LANGUAGE_OFFSET: usize = HEADER_SIZE + 1;
const DESCRIPTION_OFFSET: usize = LANGUAGE_OFFSET + 3;

/// True if the ID is four characters from `A-Z` and `0-9`.
pub fn is_valid_frame_id(id: &[u8]) -> bool {
    id.len() == FRAME_ID_LEN
        && id
            .iter()
            .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// True if `data` starts with something that looks like a frame header.
/// A zero first byte means the padding area has been reached.
pub fn is_valid_frame(data: &[u8]) -> bool {
    match data.first() {
        None | Some(0) => false,
        Some(_) => data.len() >= FRAME_ID_LEN && is_valid_frame_id(&data[..FRAME_ID_LEN]),
    }
}

/// Read-only accessors over the bytes of a single ID3v2.3/2.4 frame.
///
/// Every offset is checked against both the declared frame size and the
/// slice length, so a lying size field produces empty results instead of
/// out-of-bounds access.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    version: u8,
}

impl<'a> FrameView<'a> {
    /// Returns `None` if the slice cannot even hold a frame header.
    pub fn new(data: &'a [u8], version: u8) -> Option<Self> {
        if data.len() < HEADER_SIZE {
            return None;
        }
        Some(FrameView { data, version })
    }

    pub fn id(&self) -> [u8; 4] {
        [self.data[0], self.data[1], self.data[2], self.data[3]]
    }

    pub fn id_str(&self) -> &'a str {
        std::str::from_utf8(&self.data[..FRAME_ID_LEN]).unwrap_or("XXXX")
    }

    pub fn is_frame_type(&self, frame_type: Mp3FrameType) -> bool {
        &self.data[..FRAME_ID_LEN] == frame_type.frame_id()
    }

    pub fn is_text_frame(&self) -> bool {
        self.data[0] == b'T'
    }

    pub fn is_comment_frame(&self) -> bool {
        self.is_frame_type(Mp3FrameType::Comment)
    }

    pub fn is_private_frame(&self) -> bool {
        &self.data[..FRAME_ID_LEN] == b"PRIV"
    }

    /// Declared payload size, decoded for the tag version.
    pub fn size(&self) -> u32 {
        BitPaddedInt::decode(&self.data[4..8], BitPaddedInt::bits_for_version(self.version))
    }

    /// Header plus declared payload.
    pub fn frame_bytes(&self) -> usize {
        HEADER_SIZE.saturating_add(self.size() as usize)
    }

    pub fn status_flags(&self) -> u8 {
        self.data[8]
    }

    pub fn format_flags(&self) -> u8 {
        self.data[9]
    }

    pub fn is_read_only(&self) -> bool {
        let mask = if self.version == 3 { 0x20 } else { 0x10 };
        self.status_flags() & mask != 0
    }

    fn end(&self) -> usize {
        self.frame_bytes().min(self.data.len())
    }

    /// Number of payload bytes from `start` to the end of the frame.
    /// Zero when `start` lies past the end, which marks a malformed frame.
    pub fn text_bytes(&self, start: usize) -> usize {
        self.end().saturating_sub(start)
    }

    fn span(&self, start: usize) -> &'a [u8] {
        let len = self.text_bytes(start);
        if len == 0 {
            if start > self.end() {
                log::debug!("Frame {} is shorter than its fields, treating as empty", self.id_str());
            }
            return &[];
        }
        &self.data[start..start + len]
    }

    /// The encoding byte of a text or comment frame, if present.
    pub fn encoding(&self) -> Result<Option<Encoding>> {
        match self.data.get(ENCODING_OFFSET) {
            Some(&b) if ENCODING_OFFSET < self.end() => Ok(Some(Encoding::from_byte(b)?)),
            _ => Ok(None),
        }
    }

    /// Value of a text frame.
    pub fn text(&self) -> Result<String> {
        let Some(encoding) = self.encoding()? else {
            return Ok(String::new());
        };
        let text = specs::decode_text(self.span(TEXT_OFFSET), encoding);
        Ok(specs::trim_trailing_nuls(text))
    }

    /// ISO-639-2 language of a comment frame.
    pub fn comment_language(&self) -> Option<[u8; 3]> {
        let lang = self.span(LANGUAGE_OFFSET);
        (lang.len() >= 3).then(|| [lang[0], lang[1], lang[2]])
    }

    /// Short content description preceding the comment text.
    pub fn comment_description(&self) -> Result<String> {
        let Some(encoding) = self.encoding()? else {
            return Ok(String::new());
        };
        let (desc, _) = specs::read_encoded_text(self.span(DESCRIPTION_OFFSET), encoding);
        Ok(desc)
    }

    /// Comment text, found after the terminated description.
    pub fn comment_text(&self) -> Result<String> {
        let Some(encoding) = self.encoding()? else {
            return Ok(String::new());
        };
        let rest = self.span(DESCRIPTION_OFFSET);
        let (_, consumed) = specs::read_encoded_text(rest, encoding);
        let text = specs::decode_text(&rest[consumed..], encoding);
        Ok(specs::trim_trailing_nuls(text))
    }

    /// Owner identifier of a PRIV frame.
    pub fn private_owner(&self) -> String {
        let (owner, _) = specs::read_encoded_text(self.span(HEADER_SIZE), Encoding::Latin1);
        owner
    }

    /// Opaque data following the owner identifier of a PRIV frame.
    pub fn private_data(&self) -> &'a [u8] {
        let rest = self.span(HEADER_SIZE);
        match memchr::memchr(0, rest) {
            Some(pos) => &rest[pos + 1..],
            None => &[],
        }
    }
}

// ---- Write functions ----

fn render_header(out: &mut Vec<u8>, id: &[u8; 4], payload_len: usize, version: u8) {
    out.extend_from_slice(id);
    out.extend_from_slice(&BitPaddedInt::encode(
        payload_len as u32,
        BitPaddedInt::bits_for_version(version),
    ));
    // Status and format flags are not used
    out.extend_from_slice(&[0u8; 2]);
}

/// Build a complete text frame (header included).
pub fn render_text_frame(id: &[u8; 4], text: &str, version: u8) -> Vec<u8> {
    let (encoding, encoded) = specs::encode_text(text);
    let payload_len = 1 + encoded.len();

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
    render_header(&mut frame, id, payload_len, version);
    frame.push(encoding as u8);
    frame.extend_from_slice(&encoded);
    frame
}

/// Build a complete comment frame with an empty description.
pub fn render_comment_frame(text: &str, version: u8) -> Vec<u8> {
    let (encoding, encoded) = specs::encode_text(text);
    let payload_len = 1 + COMMENT_LANGUAGE.len() + 1 + encoded.len();

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
    render_header(&mut frame, Mp3FrameType::Comment.frame_id(), payload_len, version);
    frame.push(encoding as u8);
    frame.extend_from_slice(COMMENT_LANGUAGE);
    frame.push(0); // empty description
    frame.extend_from_slice(&encoded);
    frame
}
