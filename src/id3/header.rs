use crate::common::error::{Mp3TagError, Result};

/// Size of the ID3v2 file header and of every v2.3/v2.4 frame header.
pub const HEADER_SIZE: usize = 10;

pub const FLAG_UNSYNCHRONISATION: u8 = 0x80;
pub const FLAG_EXTENDED: u8 = 0x40;
pub const FLAG_EXPERIMENTAL: u8 = 0x20;
pub const FLAG_FOOTER: u8 = 0x10;
/// Low nibble of the header flags; must be zero.
pub const FLAGS_RESERVED: u8 = 0x0F;

/// Largest value a 4-byte syncsafe integer holds.
pub const MAX_SYNCHSAFE: u32 = 0x0FFF_FFFF;

/// Syncsafe integer encoding used in ID3v2 tags.
/// Each byte uses only 7 bits (MSB is always 0).
pub struct BitPaddedInt;

impl BitPaddedInt {
    /// Decode a big-endian integer from bytes.
    /// `bits` is the number of significant bits per byte (7 for syncsafe, 8 for normal).
    pub fn decode(data: &[u8], bits: u8) -> u32 {
        let mut result: u32 = 0;
        let mask = (1u32 << bits) - 1;
        for &b in data {
            result = (result << bits) | (b as u32 & mask);
        }
        result
    }

    /// Decode standard syncsafe (7 bits per byte).
    pub fn syncsafe(data: &[u8]) -> u32 {
        Self::decode(data, 7)
    }

    /// Decode as normal integer (8 bits per byte).
    pub fn normal(data: &[u8]) -> u32 {
        Self::decode(data, 8)
    }

    /// Encode an integer into 4 big-endian bytes, `bits` significant bits per byte.
    ///
    /// With 7 bits only 28 bits fit; anything above is silently dropped.
    pub fn encode(value: u32, bits: u8) -> [u8; 4] {
        let mut result = [0u8; 4];
        let mask = (1u32 << bits) - 1;
        let mut val = value;
        for i in (0..4).rev() {
            result[i] = (val & mask) as u8;
            val >>= bits;
        }
        result
    }

    /// Bits per byte used for frame sizes in the given major version.
    /// ID3v2.3 uses plain big-endian integers, later versions are syncsafe.
    pub fn bits_for_version(major: u8) -> u8 {
        if major == 3 {
            8
        } else {
            7
        }
    }
}

/// ID3v2 header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ID3Flags {
    pub unsynchronisation: bool,
    pub extended: bool,
    pub experimental: bool,
    pub footer: bool,
}

impl ID3Flags {
    pub fn from_byte(flag_byte: u8) -> Self {
        ID3Flags {
            unsynchronisation: flag_byte & FLAG_UNSYNCHRONISATION != 0,
            extended: flag_byte & FLAG_EXTENDED != 0,
            experimental: flag_byte & FLAG_EXPERIMENTAL != 0,
            footer: flag_byte & FLAG_FOOTER != 0,
        }
    }
}

/// Parsed ID3v2 file header (10 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub version: (u8, u8), // (major, revision) e.g. (4, 0) for ID3v2.4
    pub flags: u8,
    pub size: u32, // Frame section size excluding this header
}

impl Default for TagHeader {
    fn default() -> Self {
        TagHeader {
            version: (4, 0),
            flags: 0,
            size: 0,
        }
    }
}

impl TagHeader {
    /// Parse and validate an ID3v2 header from the first 10 bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Mp3TagError::ID3NoHeader);
        }

        if &data[0..3] != b"ID3" {
            return Err(Mp3TagError::ID3NoHeader);
        }

        let major = data[3];
        let revision = data[4];

        // v2.2 and older are obsolete; 0xFF never appears in a real version byte
        if major < 3 || major == 0xFF || revision == 0xFF {
            return Err(Mp3TagError::ID3UnsupportedVersion(format!(
                "ID3v2.{}.{}",
                major, revision
            )));
        }

        let flags = data[5];
        if flags & (FLAG_EXTENDED | FLAG_EXPERIMENTAL | FLAGS_RESERVED) != 0 {
            return Err(Mp3TagError::ID3InvalidFlags(flags));
        }

        // Size is always syncsafe in the header
        let size = BitPaddedInt::syncsafe(&data[6..10]);

        Ok(TagHeader {
            version: (major, revision),
            flags,
            size,
        })
    }

    pub fn major_version(&self) -> u8 {
        self.version.0
    }

    pub fn flags(&self) -> ID3Flags {
        ID3Flags::from_byte(self.flags)
    }

    /// Bits per byte for frame sizes in this tag.
    pub fn frame_size_bits(&self) -> u8 {
        BitPaddedInt::bits_for_version(self.version.0)
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    /// Tag size including the 10-byte header.
    pub fn full_size(&self) -> u32 {
        self.size.saturating_add(HEADER_SIZE as u32)
    }

    /// Serialize back to the 10 on-disk bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..3].copy_from_slice(b"ID3");
        out[3] = self.version.0;
        out[4] = self.version.1;
        out[5] = self.flags;
        out[6..10].copy_from_slice(&BitPaddedInt::encode(self.size, 7));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syncsafe_round_trip() {
        for value in [0u32, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 23, 257, 1_000_000, 0x0FFF_FFFF] {
            assert_eq!(BitPaddedInt::syncsafe(&BitPaddedInt::encode(value, 7)), value);
        }
    }

    #[test]
    fn test_normal_round_trip() {
        for value in [0u32, 0x80, 0xFFFF, 0x1234_5678, u32::MAX] {
            let bytes = BitPaddedInt::encode(value, 8);
            assert_eq!(bytes, value.to_be_bytes());
            assert_eq!(BitPaddedInt::normal(&bytes), value);
        }
    }

    #[test]
    fn test_syncsafe_known_values() {
        assert_eq!(BitPaddedInt::encode(23, 7), [0, 0, 0, 23]);
        assert_eq!(BitPaddedInt::encode(257, 7), [0, 0, 2, 1]);
        assert_eq!(BitPaddedInt::syncsafe(&[0x7F, 0x7F, 0x7F, 0x7F]), 0x0FFF_FFFF);
        // High bits are ignored when decoding
        assert_eq!(BitPaddedInt::syncsafe(&[0, 0, 0x81, 0x80]), 0x80);
    }

    #[test]
    fn test_syncsafe_overflow_truncates() {
        assert_eq!(BitPaddedInt::encode(0x1000_0000, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn test_bits_for_version() {
        assert_eq!(BitPaddedInt::bits_for_version(3), 8);
        assert_eq!(BitPaddedInt::bits_for_version(4), 7);
    }

    #[test]
    fn test_full_size_saturates() {
        let mut header = TagHeader::default();
        header.set_size(23);
        assert_eq!(header.full_size(), 33);
        header.set_size(u32::MAX);
        assert_eq!(header.full_size(), u32::MAX);
    }

    #[test]
    fn test_parse_header() {
        let data = [b'I', b'D', b'3', 4, 0, 0x80, 0, 0, 0x02, 0x01];
        let header = TagHeader::parse(&data).unwrap();
        assert_eq!(header.version, (4, 0));
        assert_eq!(header.size, 257);
        assert!(header.flags().unsynchronisation);
        assert_eq!(header.full_size(), 267);
        assert_eq!(header.to_bytes(), data);
    }

    #[test]
    fn test_parse_header_rejects() {
        assert!(matches!(
            TagHeader::parse(b"TAG\x04\x00\x00\x00\x00\x00\x00"),
            Err(Mp3TagError::ID3NoHeader)
        ));
        assert!(matches!(
            TagHeader::parse(b"ID3\x04\x00"),
            Err(Mp3TagError::ID3NoHeader)
        ));
        for (major, minor) in [(2u8, 0u8), (0xFF, 0), (4, 0xFF)] {
            let data = [b'I', b'D', b'3', major, minor, 0, 0, 0, 0, 0];
            assert!(matches!(
                TagHeader::parse(&data),
                Err(Mp3TagError::ID3UnsupportedVersion(_))
            ));
        }
        for flags in [FLAG_EXTENDED, FLAG_EXPERIMENTAL, 0x01, 0x08] {
            let data = [b'I', b'D', b'3', 3, 0, flags, 0, 0, 0, 0];
            assert!(matches!(
                TagHeader::parse(&data),
                Err(Mp3TagError::ID3InvalidFlags(_))
            ));
        }
    }

    #[test]
    fn test_footer_flag_accepted() {
        let data = [b'I', b'D', b'3', 4, 0, FLAG_FOOTER, 0, 0, 0, 0];
        assert!(TagHeader::parse(&data).unwrap().flags().footer);
    }
}
