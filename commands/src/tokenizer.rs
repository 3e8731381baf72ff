use crate::error::{SyntaxError, SyntaxErrorKind};

/// One parsed element of an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain word (quoting already stripped)
    Word(String),
    /// A parenthesized sub-group, one of several batched argument sets
    Group(Vec<String>),
}

impl Token {
    /// The word, when this token is not a group
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            Token::Group(_) => None,
        }
    }
}

/// Split a line into tokens, using whitespace as delimiter.
///
/// Matching `'`/`"` pairs can be used to include whitespace in a token
/// (an explicitly quoted empty token is legal). One level of matching
/// parentheses marks a sub-group, returned as a nested token; nested
/// groups are a syntax error. Leading/trailing whitespace is ignored.
pub fn tokenize(line: &str) -> Result<Vec<Token>, SyntaxError> {
    // Trailing sentinel whitespace closes a token ending at EOL.
    let chars: Vec<char> = line.trim().chars().chain(std::iter::once(' ')).collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut group: Option<Vec<String>> = None;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                let word: String = chars[start..i].iter().collect();
                emit(&mut tokens, &mut group, word);
                start = i + 1;
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                // Opening a quote begins a fresh accumulation.
                start = i + 1;
                quote = Some(c);
            }
            ' ' | '\t' | '(' | ')' => {
                if i > start {
                    let word: String = chars[start..i].iter().collect();
                    emit(&mut tokens, &mut group, word);
                }
                start = i + 1;
                if c == ')' {
                    match group.take() {
                        Some(sub) => tokens.push(Token::Group(sub)),
                        None => {
                            return Err(SyntaxError::new(
                                SyntaxErrorKind::UnmatchedCloseParen,
                                i,
                            ));
                        }
                    }
                } else if c == '(' {
                    if group.is_some() {
                        return Err(SyntaxError::new(SyntaxErrorKind::NestedGroup, i));
                    }
                    group = Some(Vec::new());
                }
            }
            _ => {}
        }
    }

    let end = chars.len() - 1;
    if quote.is_some() {
        return Err(SyntaxError::new(SyntaxErrorKind::UnterminatedQuote, end));
    }
    if group.is_some() {
        return Err(SyntaxError::new(SyntaxErrorKind::UnterminatedGroup, end));
    }
    Ok(tokens)
}

fn emit(tokens: &mut Vec<Token>, group: &mut Option<Vec<String>>, word: String) {
    match group {
        Some(sub) => sub.push(word),
        None => tokens.push(Token::Word(word)),
    }
}
