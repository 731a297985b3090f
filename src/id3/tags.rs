use std::io::Write;
use std::ops::Range;

use crate::common::error::{Mp3TagError, Result};
use crate::id3::frames::{self, FrameView};
use crate::id3::specs::Mp3FrameType;

/// Where a frame's bytes currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameState {
    /// Untouched; a range into the table's raw buffer.
    Unmodified(Range<usize>),
    /// Rebuilt in memory; supersedes the original bytes.
    Replaced(Vec<u8>),
    /// Dropped on the next write.
    Deleted,
}

/// One ID3v2 frame tracked by a [`FrameTable`].
#[derive(Debug, Clone)]
pub struct Frame {
    id: [u8; 4],
    state: FrameState,
}

impl Frame {
    pub fn id(&self) -> &[u8; 4] {
        &self.id
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn is_modified(&self) -> bool {
        !matches!(self.state, FrameState::Unmodified(_))
    }

    fn bytes<'a>(&'a self, raw: &'a [u8]) -> Option<&'a [u8]> {
        match &self.state {
            FrameState::Unmodified(range) => Some(&raw[range.clone()]),
            FrameState::Replaced(data) => Some(data),
            FrameState::Deleted => None,
        }
    }
}

/// Owner and payload of a PRIV frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateFrame {
    pub owner: String,
    pub data: Vec<u8>,
}

/// All frames of one tag, in on-disk order, with indices of the text and
/// comment frames among them.
///
/// Deleted frames stay in `frames` so positions stored in the indices remain
/// valid; they are only dropped from the indices.
#[derive(Debug, Clone)]
pub struct FrameTable {
    raw: Vec<u8>,
    version: u8,
    frames: Vec<Frame>,
    text_frames: Vec<usize>,
    comment_frames: Vec<usize>,
}

impl FrameTable {
    pub fn new(version: u8) -> Self {
        FrameTable {
            raw: Vec::new(),
            version,
            frames: Vec::new(),
            text_frames: Vec::new(),
            comment_frames: Vec::new(),
        }
    }

    /// Parse the frame section of a tag. Parsing stops at padding, at an
    /// invalid frame ID, or at a frame that runs past the end of the buffer;
    /// frames read up to that point are kept.
    pub fn parse(raw: Vec<u8>, version: u8) -> Self {
        let mut table = FrameTable::new(version);
        let mut offset = 0usize;

        while offset < raw.len() {
            let rest = &raw[offset..];
            if !frames::is_valid_frame(rest) {
                log::debug!("End of frames at offset {}", offset);
                break;
            }

            let Some(view) = FrameView::new(rest, version) else {
                log::debug!("Truncated frame header at offset {}", offset);
                break;
            };

            let len = view.frame_bytes();
            if len > raw.len() - offset {
                log::debug!(
                    "Frame {} at offset {} runs past the end of the tag, ignoring",
                    view.id_str(),
                    offset
                );
                break;
            }

            let pos = table.frames.len();
            if view.is_text_frame() {
                table.text_frames.push(pos);
            } else if view.is_comment_frame() {
                table.comment_frames.push(pos);
            }
            table.frames.push(Frame {
                id: view.id(),
                state: FrameState::Unmodified(offset..offset + len),
            });
            offset += len;
        }

        table.raw = raw;

        for frame_type in table.duplicate_text_frames() {
            log::warn!("Duplicate frame {}", frame_type.frame_id_str());
        }

        table
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Length of the frame section this table was parsed from.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// Number of tracked frames, including ones flagged for deletion.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_dirty(&self) -> bool {
        self.frames.iter().any(Frame::is_modified)
    }

    fn view(&self, pos: usize) -> Option<FrameView<'_>> {
        let bytes = self.frames.get(pos)?.bytes(&self.raw)?;
        FrameView::new(bytes, self.version)
    }

    /// Views over every frame that will be written.
    pub fn views(&self) -> impl Iterator<Item = FrameView<'_>> {
        (0..self.frames.len()).filter_map(|pos| self.view(pos))
    }

    /// Known text frame types that occur more than once.
    pub fn duplicate_text_frames(&self) -> Vec<Mp3FrameType> {
        Mp3FrameType::text_types()
            .filter(|t| {
                self.text_frames
                    .iter()
                    .filter(|&&pos| self.frames[pos].id == *t.frame_id())
                    .count()
                    > 1
            })
            .collect()
    }

    fn text_frame_pos(&self, frame_type: Mp3FrameType) -> Option<usize> {
        self.text_frames
            .iter()
            .copied()
            .find(|&pos| self.frames[pos].id == *frame_type.frame_id())
    }

    /// Value of the first text frame of the given type.
    pub fn get_text(&self, frame_type: Mp3FrameType) -> Option<String> {
        if !frame_type.is_text() {
            return None;
        }
        let view = self.view(self.text_frame_pos(frame_type)?)?;
        match view.text() {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Unreadable {} frame: {}", view.id_str(), e);
                None
            }
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comment_frames.len()
    }

    pub fn get_comment(&self, index: usize) -> Option<String> {
        let view = self.view(*self.comment_frames.get(index)?)?;
        match view.comment_text() {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Unreadable comment frame {}: {}", index, e);
                None
            }
        }
    }

    /// Replace the value of a text frame, adding the frame if missing.
    /// An empty value deletes the frame.
    pub fn set_text(&mut self, frame_type: Mp3FrameType, value: &str) -> Result<()> {
        if !frame_type.is_text() {
            return Err(Mp3TagError::ValueError(format!(
                "{} is not a text frame",
                frame_type.frame_id_str()
            )));
        }
        if value.is_empty() {
            self.delete_text_frame(frame_type);
            return Ok(());
        }

        let pos = match self.text_frame_pos(frame_type) {
            Some(pos) => pos,
            None => {
                self.frames.push(Frame {
                    id: *frame_type.frame_id(),
                    state: FrameState::Deleted,
                });
                let pos = self.frames.len() - 1;
                self.text_frames.push(pos);
                pos
            }
        };

        let data = frames::render_text_frame(frame_type.frame_id(), value, self.version);
        self.frames[pos].state = FrameState::Replaced(data);
        Ok(())
    }

    /// Replace the comment at `index`; `index == comment_count()` adds a new
    /// comment. An empty value deletes the comment.
    pub fn set_comment(&mut self, index: usize, value: &str) -> Result<()> {
        if value.is_empty() {
            self.delete_comment_frame(index);
            return Ok(());
        }

        let count = self.comment_frames.len();
        if index > count {
            return Err(Mp3TagError::ValueError(format!(
                "comment index {} out of range (count {})",
                index, count
            )));
        }
        if index == count {
            self.frames.push(Frame {
                id: *Mp3FrameType::Comment.frame_id(),
                state: FrameState::Deleted,
            });
            self.comment_frames.push(self.frames.len() - 1);
        }

        let pos = self.comment_frames[index];
        self.frames[pos].state = FrameState::Replaced(frames::render_comment_frame(value, self.version));
        Ok(())
    }

    /// Flag a text frame for deletion. Returns false if there was none.
    pub fn delete_text_frame(&mut self, frame_type: Mp3FrameType) -> bool {
        let Some(pos) = self.text_frame_pos(frame_type) else {
            return false;
        };
        self.frames[pos].state = FrameState::Deleted;
        self.text_frames.retain(|&p| p != pos);
        true
    }

    /// Flag a comment frame for deletion. Returns false if `index` is out of range.
    pub fn delete_comment_frame(&mut self, index: usize) -> bool {
        if index >= self.comment_frames.len() {
            return false;
        }
        let pos = self.comment_frames.remove(index);
        self.frames[pos].state = FrameState::Deleted;
        true
    }

    /// Bytes one frame contributes to the output.
    fn write_bytes(&self, frame: &Frame) -> usize {
        match &frame.state {
            FrameState::Unmodified(range) => FrameView::new(&self.raw[range.clone()], self.version)
                .map_or(0, |view| view.frame_bytes()),
            FrameState::Replaced(data) => data.len(),
            FrameState::Deleted => 0,
        }
    }

    /// Size of the frame section a write would produce, excluding padding.
    pub fn total_write_bytes(&self) -> usize {
        self.frames.iter().map(|f| self.write_bytes(f)).sum()
    }

    /// Write every live frame, in order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for frame in &self.frames {
            if let Some(bytes) = frame.bytes(&self.raw) {
                writer.write_all(bytes)?;
            }
        }
        Ok(())
    }

    pub fn private_frames(&self) -> Vec<PrivateFrame> {
        self.views()
            .filter(|view| view.is_private_frame())
            .map(|view| PrivateFrame {
                owner: view.private_owner(),
                data: view.private_data().to_vec(),
            })
            .collect()
    }

    /// Frame IDs of every live frame, for diagnostics.
    pub fn frame_ids(&self) -> Vec<String> {
        self.views().map(|view| view.id_str().to_string()).collect()
    }
}
