mod byte_buffer;

pub use byte_buffer::ByteBuffer;

use thiserror::Error;

/// バッファ操作のエラー
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("address {address:#x} is out of range (length {len})")]
    OutOfRange { address: usize, len: usize },

    #[error("value {0} does not fit in a byte")]
    InvalidValue(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
