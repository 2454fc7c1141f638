//! Error type shared by the panel driver, framebuffer and image pipeline

pub use display_interface::DisplayError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Bus write, D/C or reset line failure
    #[error("transport error: {0:?}")]
    Transport(DisplayError),

    #[error("failed to drive the panel power line")]
    PowerLine,

    #[error("failed to read the busy line")]
    BusyRead,

    /// A bus or GPIO resource could not be opened or claimed
    #[error("failed to open {what}: {reason}")]
    TransportOpen { what: String, reason: String },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("could not decode image: {0}")]
    DecodeFailure(String),

    #[error("image scales down to an empty area")]
    EmptyImage,

    /// Returned only by explicit idle queries, protocol sequences carry on
    #[error("panel still busy after {polls} polls")]
    BusyTimeout { polls: u32 },

    #[error("panel is not initialized")]
    NotInitialized,

    #[error("driver has been released")]
    Closed,

    #[error("invalid dimensions {width}x{height}: both must be non-zero multiples of 8")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Error::Transport(e)
    }
}

/// `DisplayError` has no `PartialEq`, transport errors compare by variant
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (Transport(a), Transport(b)) => core::mem::discriminant(a) == core::mem::discriminant(b),
            (PowerLine, PowerLine) | (BusyRead, BusyRead) => true,
            (
                TransportOpen { what: w1, reason: r1 },
                TransportOpen { what: w2, reason: r2 },
            ) => w1 == w2 && r1 == r2,
            (
                SizeMismatch { expected: e1, actual: a1 },
                SizeMismatch { expected: e2, actual: a2 },
            ) => e1 == e2 && a1 == a2,
            (DecodeFailure(a), DecodeFailure(b)) => a == b,
            (EmptyImage, EmptyImage) => true,
            (BusyTimeout { polls: a }, BusyTimeout { polls: b }) => a == b,
            (NotInitialized, NotInitialized) | (Closed, Closed) => true,
            (
                InvalidDimensions { width: w1, height: h1 },
                InvalidDimensions { width: w2, height: h2 },
            ) => w1 == w2 && h1 == h2,
            (Config(a), Config(b)) => a == b,
            _ => false,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
