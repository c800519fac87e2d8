use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Frame encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Frame decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Empty frame")]
    EmptyFrame,
}
