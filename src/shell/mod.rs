//! Interactive Shell Embedding
//!
//! Everything around the parser core: the raw terminal, the line editor,
//! history, prompt, output buffer and the main key loop.

pub mod buffer;
pub mod cursor;
pub mod history;
pub mod prompt;
pub mod shell;
pub mod terminal;

pub use buffer::{Output, OutputBuffer, Word};
pub use cursor::Cursor;
pub use history::History;
pub use prompt::Prompt;
pub use shell::{decode_key, default_colors, Key, Shell};
pub use terminal::{Color, Terminal};
