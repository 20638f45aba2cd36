pub mod alphabet;
pub mod css;
pub mod error;
pub mod font;

pub use alphabet::{AlphabetModel, SENTINEL_CHAR};
pub use error::FontError;
pub use font::{FontArtifact, FontBuilder, FontBuilderOptions, FontCache};
