use std::collections::BTreeMap;

use crate::error::{ResolveError, TrieError};

/// A slot in the trie holds either a complete command or further words,
/// never both.
#[derive(Debug, Clone)]
enum Node {
    /// Canonical server-side command identifier
    Leaf(String),
    /// Subsequent command words
    Branch(BTreeMap<String, Node>),
}

/// Hierarchical command-name trie.
///
/// Maps word sequences like `["access", "disk"]` to the canonical
/// server command (`"access_disk"`), and supports prefix completion and
/// unique-prefix expansion. Built once per login from the server's
/// command table and rebuilt wholesale on refresh.
#[derive(Debug, Clone, Default)]
pub struct CommandTrie {
    root: BTreeMap<String, Node>,
}

impl CommandTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `words` as a command resolving to `target`.
    ///
    /// Fails when a strict prefix of `words` is already a complete
    /// command, or when the full path already has subcommands below it.
    /// Re-inserting the same path replaces the target.
    pub fn insert(&mut self, words: &[String], target: &str) -> Result<(), TrieError> {
        let mut map = &mut self.root;
        for (i, word) in words.iter().enumerate() {
            let last = i + 1 == words.len();
            if last {
                if let Some(Node::Branch(_)) = map.get(word) {
                    return Err(TrieError::PathHasSubcommands(words.to_vec()));
                }
                map.insert(word.clone(), Node::Leaf(target.to_string()));
                return Ok(());
            }
            let node = map
                .entry(word.clone())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            match node {
                Node::Branch(children) => map = children,
                Node::Leaf(_) => {
                    return Err(TrieError::PrefixIsCommand(words[..=i].to_vec()));
                }
            }
        }
        Ok(())
    }

    /// Translate a possibly-abbreviated word sequence into its full
    /// form, level by level.
    ///
    /// At each level the input word selects the child keys it is a
    /// prefix of; an exact match wins immediately even when it is also
    /// a strict prefix of a sibling. Anything other than exactly one
    /// candidate fails, as does running out of input words before
    /// reaching a complete command. On success returns the expanded
    /// words followed by the canonical command identifier.
    pub fn resolve(&self, words: &[String]) -> Result<Vec<String>, ResolveError> {
        self.walk(words, None)
    }

    /// List the candidate continuations at exactly `level`, without
    /// resolving further. Used for interactive completion.
    pub fn complete_at(&self, words: &[String], level: usize) -> Result<Vec<String>, ResolveError> {
        self.walk(words, Some(level))
    }

    fn walk(&self, words: &[String], stop: Option<usize>) -> Result<Vec<String>, ResolveError> {
        let mut parent = &self.root;
        let mut path: Vec<String> = Vec::new();
        let mut level = 0;
        // The exact-match short-circuit applies when fully resolving and
        // when listing the first word; past that the caller wants every
        // continuation, exact sibling or not.
        let exact_wins = stop.is_none_or(|l| l == 0);

        loop {
            let input = words.get(level).map(String::as_str);
            let mut candidates: Vec<String> = Vec::new();
            for key in parent.keys() {
                match input {
                    None => candidates.push(key.clone()),
                    Some(word) if key.starts_with(word) => {
                        if key == word && exact_wins {
                            candidates.clear();
                            candidates.push(key.clone());
                            break;
                        }
                        candidates.push(key.clone());
                    }
                    Some(_) => {}
                }
            }

            if stop == Some(level) {
                return Ok(candidates);
            }
            if candidates.len() != 1 || (stop.is_none() && path.len() >= words.len()) {
                if candidates.is_empty() {
                    return Err(ResolveError::UnknownCommand);
                }
                return Err(ResolveError::AmbiguousCommand(candidates));
            }

            let word = candidates.pop().unwrap_or_default();
            match parent.get(&word) {
                Some(Node::Leaf(target)) => {
                    path.push(word);
                    return if stop.is_none() {
                        path.push(target.clone());
                        Ok(path)
                    } else {
                        // Nothing to complete below a complete command.
                        Ok(Vec::new())
                    };
                }
                Some(Node::Branch(children)) => {
                    path.push(word);
                    parent = children;
                    level += 1;
                }
                None => unreachable!("candidate key vanished from trie level"),
            }
        }
    }
}
