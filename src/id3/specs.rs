use crate::common::error::{Mp3TagError, Result};

/// Text encoding types used in ID3v2 frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf16Be = 2,
    Utf8 = 3,
}

impl Encoding {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Encoding::Latin1),
            1 => Ok(Encoding::Utf16),
            2 => Ok(Encoding::Utf16Be),
            3 => Ok(Encoding::Utf8),
            _ => Err(Mp3TagError::UnsupportedEncoding(b)),
        }
    }

    /// Encoding used when writing `text`.
    /// Latin-1 when every char fits in a byte, UTF-8 otherwise. UTF-16 is never written.
    pub fn for_text(text: &str) -> Self {
        if text.chars().all(|c| c as u32 <= 0xFF) {
            Encoding::Latin1
        } else {
            Encoding::Utf8
        }
    }

    pub fn is_wide(self) -> bool {
        matches!(self, Encoding::Utf16 | Encoding::Utf16Be)
    }
}

/// Decode text from bytes using the specified encoding.
///
/// UTF-16 data starts with a byte order mark which selects the byte order and is
/// skipped. UTF-16BE is decoded big-endian; a BOM is skipped there too if present.
pub fn decode_text(data: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Latin1 => {
            if data.is_ascii() {
                String::from_utf8_lossy(data).into_owned()
            } else {
                data.iter().map(|&b| b as char).collect()
            }
        }
        Encoding::Utf16 | Encoding::Utf16Be => {
            let (decoder, start) = match data {
                [0xFF, 0xFE, ..] => (encoding_rs::UTF_16LE, 2),
                [0xFE, 0xFF, ..] => (encoding_rs::UTF_16BE, 2),
                // No BOM: LE is what writers without one produce for type 1
                _ if encoding == Encoding::Utf16 => (encoding_rs::UTF_16LE, 0),
                _ => (encoding_rs::UTF_16BE, 0),
            };
            let body = &data[start..];
            // A dangling odd byte is not a code unit
            let body = &body[..body.len() & !1];
            let (result, _) = decoder.decode_without_bom_handling(body);
            result.into_owned()
        }
        Encoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Encode `text` for a new frame, returning the encoding byte to write with it.
pub fn encode_text(text: &str) -> (Encoding, Vec<u8>) {
    match Encoding::for_text(text) {
        Encoding::Latin1 => (Encoding::Latin1, text.chars().map(|c| c as u8).collect()),
        _ => (Encoding::Utf8, text.as_bytes().to_vec()),
    }
}

/// Strip trailing NULs. Some encoders count a terminator inside the frame size.
pub fn trim_trailing_nuls(mut text: String) -> String {
    let len = text.trim_end_matches('\0').len();
    text.truncate(len);
    text
}

/// Find the null terminator for the given encoding.
/// Returns the position of the null terminator (not including it).
pub fn find_null_terminator(data: &[u8], encoding: Encoding) -> Option<usize> {
    if encoding.is_wide() {
        data.chunks_exact(2)
            .position(|unit| unit == [0, 0])
            .map(|i| i * 2)
    } else {
        memchr::memchr(0, data)
    }
}

/// Size of the null terminator for each encoding.
pub fn null_terminator_size(encoding: Encoding) -> usize {
    if encoding.is_wide() {
        2
    } else {
        1
    }
}

/// Read a terminated string from data, returning (text, bytes_consumed).
/// The text ends at the terminator or at the end of data.
pub fn read_encoded_text(data: &[u8], encoding: Encoding) -> (String, usize) {
    match find_null_terminator(data, encoding) {
        Some(pos) => (
            decode_text(&data[..pos], encoding),
            pos + null_terminator_size(encoding),
        ),
        None => (decode_text(data, encoding), data.len()),
    }
}

/// Logical tag fields and the ID3v2 frames that carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mp3FrameType {
    Title,
    Subtitle,
    Genre,
    Artist,
    Album,
    Composer,
    Orchestra,
    OrigArtist,
    Year,
    OrigYear,
    TrackNum,
    BeatsPerMinute,
    Duration,
    Key,
    Conductor,
    Language,
    Mood,
    Comment,
}

// Not every frame ID3 defines, only the commonly useful ones
const FRAME_IDS: [(Mp3FrameType, &[u8; 4]); 18] = [
    (Mp3FrameType::Title, b"TIT2"),
    (Mp3FrameType::Subtitle, b"TIT3"), // rare, e.g. "Op. 6"
    (Mp3FrameType::Genre, b"TCON"),    // may be numeric, e.g. "(21)"
    (Mp3FrameType::Artist, b"TPE1"),
    (Mp3FrameType::Album, b"TALB"),
    (Mp3FrameType::Composer, b"TCOM"),
    (Mp3FrameType::Orchestra, b"TPE2"), // usually shown as "Album Artist"
    (Mp3FrameType::OrigArtist, b"TOPE"),
    (Mp3FrameType::Year, b"TYER"),
    (Mp3FrameType::OrigYear, b"TORY"),
    (Mp3FrameType::TrackNum, b"TRCK"), // "5" or "5/12"
    (Mp3FrameType::BeatsPerMinute, b"TBPM"),
    (Mp3FrameType::Duration, b"TLEN"), // milliseconds
    (Mp3FrameType::Key, b"TKEY"),
    (Mp3FrameType::Conductor, b"TPE3"),
    (Mp3FrameType::Language, b"TLAN"),
    (Mp3FrameType::Mood, b"TMOO"),
    (Mp3FrameType::Comment, b"COMM"),
];

impl Mp3FrameType {
    /// The 4-byte frame ID for this type.
    pub fn frame_id(self) -> &'static [u8; 4] {
        FRAME_IDS[self as usize].1
    }

    pub fn frame_id_str(self) -> &'static str {
        std::str::from_utf8(self.frame_id()).unwrap_or("XXXX")
    }

    pub fn from_frame_id(id: &[u8]) -> Option<Self> {
        FRAME_IDS
            .iter()
            .find(|(_, frame_id)| frame_id.as_slice() == id)
            .map(|(t, _)| *t)
    }

    /// All ID3 text frames start with 'T'.
    pub fn is_text(self) -> bool {
        self.frame_id()[0] == b'T'
    }

    pub fn all() -> impl Iterator<Item = Mp3FrameType> {
        FRAME_IDS.iter().map(|(t, _)| *t)
    }

    pub fn text_types() -> impl Iterator<Item = Mp3FrameType> {
        Self::all().filter(|t| t.is_text())
    }
}

/// Highest index in [`GENRES`].
pub const MAX_GENRE: usize = 125;

/// ID3v1 genre list (index → genre name).
pub const GENRES: [&str; MAX_GENRE + 1] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge",
    "Hip-Hop", "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B",
    "Rap", "Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska",
    "Death Metal", "Pranks", "Soundtrack", "Euro-Techno", "Ambient",
    "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical",
    "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
    "AlternRock", "Bass", "Soul", "Punk", "Space", "Meditative",
    "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic", "Darkwave",
    "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap",
    "Pop/Funk", "Jungle", "Native American", "Cabaret", "New Wave",
    "Psychedelic", "Rave", "Showtunes", "Trailer", "Lo-Fi", "Tribal",
    "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll",
    "Hard Rock", "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion",
    "Bebop", "Latin", "Revival", "Celtic", "Bluegrass", "Avantgarde",
    "Gothic Rock", "Progressive Rock", "Psychedelic Rock", "Symphonic Rock",
    "Slow Rock", "Big Band", "Chorus", "Easy Listening", "Acoustic", "Humour",
    "Speech", "Chanson", "Opera", "Chamber Music", "Sonata", "Symphony",
    "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam", "Club",
    "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul",
    "Freestyle", "Duet", "Punk Rock", "Drum Solo", "A capella", "Euro-House",
    "Dance Hall",
];

/// Genre name for an ID3v1 genre index.
pub fn genre(n: usize) -> Option<&'static str> {
    GENRES.get(n).copied()
}
