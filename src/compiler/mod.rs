mod tokenizer;
mod variables;
mod compile;

pub use compile::{compile, is_identifier, FOLD_WIDTH, MAX_NESTING};
pub use tokenizer::{parse_integer, Token, Tokenizer};
pub use variables::Variables;
