pub mod asm;
pub mod model;

// Re-export commonly used types/functions for the binaries and tests
pub use asm::{assemble, assemble_full, AsmError, AsmErrorKind, Assembly};
pub use model::{load_raw_image, read_word, words_from_le, words_to_le, Image, Segment};
