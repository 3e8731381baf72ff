use std::sync::{Arc, RwLock};

use commands::{CommandTrie, LineCompleter};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Line-editor helper wired to the command trie. The trie is shared
/// with the shell, which rebuilds it whenever the command table changes.
pub struct ShellHelper {
    trie: Arc<RwLock<CommandTrie>>,
}

impl ShellHelper {
    pub fn new(trie: Arc<RwLock<CommandTrie>>) -> Self {
        Self { trie }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let trie = self.trie.read().expect("trie lock poisoned");
        let (start, candidates) = LineCompleter::new(&trie).complete(line, pos);
        let pairs = candidates
            .into_iter()
            .map(|c| Pair {
                display: c.trim_end().to_string(),
                replacement: c,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}
