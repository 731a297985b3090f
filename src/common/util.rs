use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::common::error::Result;

/// Open a file for read-only access.
pub fn open_ro(path: &Path) -> Result<File> {
    Ok(File::open(path)?)
}

/// Open a file for read/write access.
pub fn open_rw(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)?)
}

/// Open a file for read/write access, trying a second time if the first open fails.
/// Another process briefly holding the file (a player, an indexer) is the usual cause.
pub fn open_rw_retry(path: &Path) -> Result<File> {
    match open_rw(path) {
        Ok(file) => Ok(file),
        Err(e) => {
            log::warn!("Failed to open {} for writing ({}), retrying", path.display(), e);
            open_rw(path)
        }
    }
}

/// Read at most `len` bytes from the current position.
/// Returns fewer bytes when EOF is reached first.
pub fn read_up_to<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    // `len` may come from an untrusted size field; let the Vec grow with what is actually read
    let mut data = Vec::new();
    reader.take(len as u64).read_to_end(&mut data)?;
    Ok(data)
}

/// Read at most `len` bytes starting at absolute offset `pos`.
pub fn read_at<R: Read + Seek>(reader: &mut R, pos: u64, len: usize) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(pos))?;
    read_up_to(reader, len)
}

/// Read everything from `offset` to the end of the file.
pub fn read_trailing<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut trailing = Vec::new();
    reader.read_to_end(&mut trailing)?;
    Ok(trailing)
}
