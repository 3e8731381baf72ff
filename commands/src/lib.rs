pub mod completion;
pub mod error;
pub mod tokenizer;
pub mod trie;

// Re-export main types
pub use completion::{LineCompleter, COMPLETION_MAX_LEVEL};
pub use error::{ResolveError, SyntaxError, SyntaxErrorKind, TrieError};
pub use tokenizer::{tokenize, Token};
pub use trie::CommandTrie;
