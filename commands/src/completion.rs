use tracing::debug;

use crate::tokenizer::{tokenize, Token};
use crate::trie::CommandTrie;

/// Completion is only offered for the command words themselves (the
/// first two positions); argument values are server knowledge the
/// client cannot enumerate.
pub const COMPLETION_MAX_LEVEL: usize = 2;

/// Completion hook over a [`CommandTrie`].
///
/// Given the current line text and cursor offset, yields the byte
/// offset the completion replaces from and the valid next-word
/// candidates. Line editors plug this in directly.
pub struct LineCompleter<'a> {
    trie: &'a CommandTrie,
}

impl<'a> LineCompleter<'a> {
    pub fn new(trie: &'a CommandTrie) -> Self {
        Self { trie }
    }

    pub fn complete(&self, line: &str, cursor: usize) -> (usize, Vec<String>) {
        let cursor = cursor.min(line.len());
        let replace_from = line[..cursor]
            .rfind(' ')
            .map(|p| p + 1)
            .unwrap_or(0);

        let Ok(tokens) = tokenize(line) else {
            return (replace_from, Vec::new());
        };
        let mut words: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token {
                Token::Word(word) => words.push(word),
                // Batched sub-groups carry arguments, never command words.
                Token::Group(_) => return (replace_from, Vec::new()),
            }
        }

        // The word under the cursor is the one being completed, unless
        // the line ends in whitespace and a fresh word is starting.
        let mut level = words.len();
        if !line.ends_with(char::is_whitespace) {
            level = level.saturating_sub(1);
        }
        if level >= COMPLETION_MAX_LEVEL {
            return (replace_from, Vec::new());
        }

        match self.trie.complete_at(&words, level) {
            Ok(candidates) => {
                let candidates = candidates.into_iter().map(|c| c + " ").collect();
                (replace_from, candidates)
            }
            Err(err) => {
                debug!(%err, line, "no completion");
                (replace_from, Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie() -> CommandTrie {
        let mut t = CommandTrie::new();
        for (words, target) in [
            (vec!["access", "disk"], "access_disk"),
            (vec!["access", "dns"], "access_dns"),
            (vec!["user", "info"], "user_info"),
        ] {
            let words: Vec<String> = words.into_iter().map(String::from).collect();
            t.insert(&words, target).unwrap();
        }
        t
    }

    #[test]
    fn completes_first_word() {
        let t = trie();
        let completer = LineCompleter::new(&t);
        let (from, candidates) = completer.complete("ac", 2);
        assert_eq!(from, 0);
        assert_eq!(candidates, vec!["access ".to_string()]);
    }

    #[test]
    fn completes_second_word_after_space() {
        let t = trie();
        let completer = LineCompleter::new(&t);
        let (from, candidates) = completer.complete("access d", 8);
        assert_eq!(from, 7);
        assert_eq!(candidates, vec!["disk ".to_string(), "dns ".to_string()]);
    }

    #[test]
    fn fresh_word_lists_everything_at_level() {
        let t = trie();
        let completer = LineCompleter::new(&t);
        let (_, candidates) = completer.complete("access ", 7);
        assert_eq!(candidates, vec!["disk ".to_string(), "dns ".to_string()]);
    }

    #[test]
    fn no_completion_past_command_words() {
        let t = trie();
        let completer = LineCompleter::new(&t);
        let (_, candidates) = completer.complete("access disk foo", 15);
        assert!(candidates.is_empty());
    }

    #[test]
    fn unparseable_line_gives_nothing() {
        let t = trie();
        let completer = LineCompleter::new(&t);
        let (_, candidates) = completer.complete("access 'dis", 11);
        assert!(candidates.is_empty());
    }
}
