use std::fmt;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::ape::{self, ApeTag};
use crate::common::error::{Mp3TagError, Result};
use crate::common::util;
use crate::config::{ParseOptions, WriteOptions};
use crate::id3::header::{TagHeader, FLAG_FOOTER, HEADER_SIZE, MAX_SYNCHSAFE};
use crate::id3::specs::Mp3FrameType;
use crate::id3::tags::{FrameTable, PrivateFrame};

/// Tags of one MP3 file: the ID3v2 frames and an optional trailing APEv2 tag.
///
/// Load with [`TagStore::open`] or [`TagStore::load`], edit with the setters,
/// then [`TagStore::write`]. Not meant for concurrent use; callers serialize
/// access to a store and to the file behind it.
#[derive(Debug)]
pub struct TagStore {
    path: Option<PathBuf>,
    header: TagHeader,
    audio_offset: u32,
    frames: FrameTable,
    ape: Option<ApeTag>,
    parse_options: ParseOptions,
    write_options: WriteOptions,
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStore {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::new(), WriteOptions::new())
    }

    pub fn with_options(parse_options: ParseOptions, write_options: WriteOptions) -> Self {
        let header = TagHeader::default();
        TagStore {
            path: None,
            header,
            audio_offset: 0,
            frames: FrameTable::new(header.major_version()),
            ape: None,
            parse_options,
            write_options,
        }
    }

    /// Load the tags of the file at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = Self::new();
        store.load(path)?;
        Ok(store)
    }

    fn reset(&mut self) {
        self.path = None;
        self.header = TagHeader::default();
        self.audio_offset = 0;
        self.frames = FrameTable::new(self.header.major_version());
        self.ape = None;
    }

    /// Read the tags of the file at `path`, replacing anything loaded before.
    ///
    /// Fails on I/O errors, a missing or obsolete ID3v2 header, disallowed
    /// header flags, or an implausibly large frame section; the store is left
    /// empty and cannot be written in that case. Malformed frames end frame
    /// parsing without failing.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.reset();

        self.read_tags(path).map_err(|e| {
            log::warn!("Failed to load tags from {}: {}", path.display(), e);
            e
        })?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn read_tags(&mut self, path: &Path) -> Result<()> {
        let mut file = util::open_ro(path)?;

        let header = TagHeader::parse(&util::read_up_to(&mut file, HEADER_SIZE)?)?;
        if header.size > self.parse_options.max_frame_section {
            return Err(Mp3TagError::ID3TagTooLarge(header.size));
        }

        let section = util::read_up_to(&mut file, header.size as usize)?;
        if section.len() < header.size as usize {
            log::debug!(
                "Frame section cut short by EOF ({} of {} bytes)",
                section.len(),
                header.size
            );
        }

        // The APE scan and the handle close run beside frame parsing
        let version = header.major_version();
        let read_ape = self.parse_options.read_ape;
        let (ape, frames) = rayon::join(
            move || {
                let ape = if read_ape {
                    ape::read_ape_tag(&mut file)
                } else {
                    Ok(None)
                };
                drop(file);
                ape
            },
            move || FrameTable::parse(section, version),
        );

        self.ape = match ape {
            Ok(ape) => ape,
            Err(e) => {
                log::warn!("Ignoring unreadable APE tag in {}: {}", path.display(), e);
                None
            }
        };
        self.header = header;
        self.audio_offset = header.full_size().saturating_add(footer_size(&header) as u32);
        self.frames = frames;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn header(&self) -> &TagHeader {
        &self.header
    }

    /// ID3v2 (major, revision) version.
    pub fn version(&self) -> (u8, u8) {
        self.header.version
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    /// Number of frames, including ones flagged for deletion.
    pub fn frame_count(&self) -> usize {
        self.frames.frame_count()
    }

    /// Value of a text field; `None` if the frame is absent or unreadable.
    pub fn text(&self, frame_type: Mp3FrameType) -> Option<String> {
        self.frames.get_text(frame_type)
    }

    pub fn comment_count(&self) -> usize {
        self.frames.comment_count()
    }

    pub fn comment(&self, index: usize) -> Option<String> {
        self.frames.get_comment(index)
    }

    /// Set a text field. An empty value removes the frame.
    pub fn set_text(&mut self, frame_type: Mp3FrameType, value: &str) -> Result<()> {
        self.frames.set_text(frame_type, value)
    }

    /// Set the comment at `index`; `index == comment_count()` adds one.
    /// An empty value removes the comment.
    pub fn set_comment(&mut self, index: usize, value: &str) -> Result<()> {
        self.frames.set_comment(index, value)
    }

    pub fn private_frames(&self) -> Vec<PrivateFrame> {
        self.frames.private_frames()
    }

    pub fn ape_tag(&self) -> Option<&ApeTag> {
        self.ape.as_ref()
    }

    /// Offset where MPEG audio data begins, after the tag footer if there is one.
    pub fn audio_buffer_offset(&self) -> u32 {
        self.audio_offset
    }

    pub fn is_dirty(&self) -> bool {
        self.frames.is_dirty()
    }

    /// Write pending changes back to the file, then reload it.
    ///
    /// Returns `Ok(false)` without touching the file when nothing changed, and
    /// `NotLoaded` unless the last [`load`](Self::load) succeeded.
    /// After an error the file may be partially written; reload before
    /// trusting the in-memory state.
    pub fn write(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let path = self.path.clone().ok_or(Mp3TagError::NotLoaded)?;

        self.write_tags(&path).map_err(|e| {
            log::warn!("Failed to write tags to {}: {}", path.display(), e);
            e
        })?;

        // The file on disk is the source of truth from here on
        self.load(&path)?;
        Ok(true)
    }

    fn write_tags(&self, path: &Path) -> Result<()> {
        let frame_section = self.frames.total_write_bytes();
        // A v2.4 footer is not rewritten; its bytes are reused as padding
        let old_region = self.frames.raw_len() + footer_size(&self.header);

        // Keep the old tag size when the frames fit; otherwise grow with headroom
        let grows = frame_section > old_region;
        let padding = if grows {
            self.write_options.growth_padding as usize
        } else {
            old_region - frame_section
        };

        let size = frame_section.saturating_add(padding);
        if size > MAX_SYNCHSAFE as usize {
            return Err(Mp3TagError::ID3TagTooLarge(u32::try_from(size).unwrap_or(u32::MAX)));
        }

        let mut header = self.header;
        header.flags &= !FLAG_FOOTER;
        header.set_size(size as u32);

        let mut file = util::open_rw_retry(path)?;

        // A bigger tag overlaps the audio, so read everything after the old tag first
        let trailing = if grows {
            Some(util::read_trailing(&mut file, (HEADER_SIZE + old_region) as u64)?)
        } else {
            None
        };

        file.seek(SeekFrom::Start(0))?;
        let mut writer = BufWriter::new(&mut file);
        writer.write_all(&header.to_bytes())?;
        self.frames.write_to(&mut writer)?;
        io::copy(&mut io::repeat(0).take(padding as u64), &mut writer)?;
        if let Some(trailing) = trailing {
            writer.write_all(&trailing)?;
        }
        writer.flush()?;

        log::debug!(
            "Wrote {} frame bytes and {} padding bytes to {}",
            frame_section,
            padding,
            path.display()
        );
        Ok(())
    }
}

fn footer_size(header: &TagHeader) -> usize {
    if header.flags & FLAG_FOOTER != 0 {
        HEADER_SIZE
    } else {
        0
    }
}

impl fmt::Display for TagStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .as_deref()
            .map_or_else(|| "<none>".into(), |p| p.display().to_string());
        writeln!(f, "Path: {}", path)?;
        writeln!(f, "Id3: ID3")?;
        writeln!(f, "Version: {}.{}", self.header.version.0, self.header.version.1)?;
        writeln!(f, "Flags: 0x{:02X}", self.header.flags)?;
        writeln!(f, "Size: {} (0x{:X})", self.header.size, self.header.size)?;
        writeln!(f, "Audio offset: {}", self.audio_offset)?;
        for id in self.frames.frame_ids() {
            writeln!(f, "FrameID: {}", id)?;
        }
        if let Some(ape) = &self.ape {
            writeln!(f, "APE items: {}", ape.len())?;
        }
        Ok(())
    }
}
