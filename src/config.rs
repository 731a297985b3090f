use crate::id3::header::MAX_SYNCHSAFE;

/// Options to control how a [`TagStore`](crate::TagStore) reads a file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParseOptions {
    pub(crate) read_ape: bool,
    pub(crate) max_frame_section: u32,
}

impl ParseOptions {
    /// Default upper bound on the ID3v2 frame section size.
    pub const DEFAULT_MAX_FRAME_SECTION: u32 = 8 * 1024 * 1024;

    /// Creates a new `ParseOptions`, alias for `Default` implementation
    pub const fn new() -> Self {
        Self {
            read_ape: true,
            max_frame_section: Self::DEFAULT_MAX_FRAME_SECTION,
        }
    }

    /// Whether to search for and parse a trailing APEv2 tag
    ///
    /// The search scans backward through the whole file when no tag exists, so
    /// callers that never look at APE items can turn it off.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mp3tag::config::ParseOptions;
    ///
    /// let options = ParseOptions::new().read_ape(false);
    /// ```
    pub fn read_ape(mut self, read_ape: bool) -> Self {
        self.read_ape = read_ape;
        self
    }

    /// Largest frame section, in bytes, that will be loaded
    ///
    /// Headers declaring a bigger section are rejected as implausible. Values
    /// above the largest syncsafe size are clamped to it.
    pub fn max_frame_section(mut self, max_frame_section: u32) -> Self {
        self.max_frame_section = max_frame_section.min(MAX_SYNCHSAFE);
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options to control how a [`TagStore`](crate::TagStore) writes a file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WriteOptions {
    pub(crate) growth_padding: u32,
}

impl WriteOptions {
    /// Padding added when the frames no longer fit in the existing tag; a
    /// common choice among MP3 taggers.
    pub const DEFAULT_GROWTH_PADDING: u32 = 2048;

    /// Creates a new `WriteOptions`, alias for `Default` implementation
    pub const fn new() -> Self {
        Self {
            growth_padding: Self::DEFAULT_GROWTH_PADDING,
        }
    }

    /// Set the padding written after the frames when the tag has to grow
    ///
    /// When the new frames fit in the old tag, the leftover space is used as
    /// padding instead and this value is ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mp3tag::config::WriteOptions;
    ///
    /// let options = WriteOptions::new().growth_padding(4096);
    /// ```
    pub fn growth_padding(mut self, growth_padding: u32) -> Self {
        self.growth_padding = growth_padding;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}
