use std::fmt;

/// What made an input line unparseable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A quote was opened but never closed
    UnterminatedQuote,
    /// A sub-group was opened but never closed
    UnterminatedGroup,
    /// `(` inside an already open sub-group
    NestedGroup,
    /// `)` with no open sub-group
    UnmatchedCloseParen,
}

/// Errors that can occur while tokenizing an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Kind of syntax problem
    pub kind: SyntaxErrorKind,
    /// Character offset (in the trimmed line) of the offending position
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            SyntaxErrorKind::UnterminatedQuote => "missing end-quote",
            SyntaxErrorKind::UnterminatedGroup => "missing end )",
            SyntaxErrorKind::NestedGroup => "nested parenthesis",
            SyntaxErrorKind::UnmatchedCloseParen => ") with no (",
        };
        write!(f, "{} at offset {}", what, self.offset)
    }
}

impl std::error::Error for SyntaxError {}

/// Errors that can occur while resolving a word sequence in the trie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No command matches the input
    UnknownCommand,
    /// More than one (or no unambiguous) continuation; carries the candidates
    AmbiguousCommand(Vec<String>),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownCommand => write!(f, "Unknown command"),
            ResolveError::AmbiguousCommand(candidates) => write!(
                f,
                "Incomplete command, possible subcommands: {}",
                candidates.join(", ")
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Errors that can occur while building the trie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// A strict prefix of the inserted path is already a complete command
    PrefixIsCommand(Vec<String>),
    /// The terminal word of the inserted path already has subcommands
    PathHasSubcommands(Vec<String>),
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieError::PrefixIsCommand(words) => {
                write!(f, "existing command target for {}", words.join(" "))
            }
            TrieError::PathHasSubcommands(words) => {
                write!(f, "existing subcommands under {}", words.join(" "))
            }
        }
    }
}

impl std::error::Error for TrieError {}
