use thiserror::Error;

/// Errors raised by the font synthesis engine. Pure data: this crate knows
/// nothing about HTTP status codes, the caller (`fontleak-server`) maps
/// these onto the wire.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FontError {
    #[error("alphabet contains a character outside the printable ASCII set: {0:?}")]
    InvalidAlphabet(char),

    #[error("idx_max {idx_max} exceeds the {available} available index code points")]
    CodepointExhausted { idx_max: usize, available: usize },

    #[error("alphabet has {len} characters, the maximum supported is {max}")]
    AlphabetTooLarge { len: usize, max: usize },
}
