use thiserror::Error;

#[derive(Error, Debug)]
pub enum Mp3TagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ID3 no header found")]
    ID3NoHeader,

    #[error("ID3 unsupported version: {0}")]
    ID3UnsupportedVersion(String),

    #[error("ID3 invalid header flags: {0:#04x}")]
    ID3InvalidFlags(u8),

    #[error("ID3 frame section too large: {0} bytes")]
    ID3TagTooLarge(u32),

    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(u8),

    #[error("APE error: {0}")]
    Ape(String),

    #[error("Value error: {0}")]
    ValueError(String),

    #[error("No file has been loaded")]
    NotLoaded,
}

pub type Result<T> = std::result::Result<T, Mp3TagError>;
