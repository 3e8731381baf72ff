//! The interactive read-eval loop: line editing, command resolution,
//! native commands, and file sourcing.

use std::sync::{Arc, RwLock};

use anyhow::Context as _;
use commands::{tokenize, CommandTrie, Token};
use config::Settings;
use rpc::{Console, HttpTransport, Session, Value};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use crate::completer::ShellHelper;
use crate::console::ShellConsole;
use crate::display;
use crate::prompt::{self, FillOutcome};

const CLIENT_NAME: &str = "rbofh";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

enum LineOutcome {
    Continue,
    Quit,
}

pub struct Shell {
    session: Session<HttpTransport>,
    console: Arc<ShellConsole>,
    settings: Settings,
    /// Shared with the completion helper; rebuilt when the command
    /// table changes.
    trie: Arc<RwLock<CommandTrie>>,
    table_version: u64,
}

impl Shell {
    pub fn new(
        session: Session<HttpTransport>,
        console: Arc<ShellConsole>,
        settings: Settings,
    ) -> Self {
        Self {
            session,
            console,
            settings,
            trie: Arc::new(RwLock::new(CommandTrie::new())),
            table_version: 0,
        }
    }

    /// Prompt for credentials, authenticate, and fetch the command table.
    pub async fn initial_login(&mut self, username: Option<String>) -> anyhow::Result<()> {
        let username = match username {
            Some(u) => u,
            None => self
                .console
                .read_line("Username: ")?
                .context("no username given")?,
        };
        let password = self
            .console
            .prompt_password(&format!("Password for {}:", username))?
            .context("login cancelled")?;
        self.session.login(&username, &password).await?;

        let motd = self.session.motd(CLIENT_NAME, CLIENT_VERSION).await?;
        if !motd.is_empty() {
            self.console.show_message(&motd, true);
        }
        self.session.refresh_commands().await?;
        self.sync_trie();
        self.console.show_message(
            &format!(
                "Welcome to {}, v {}, type \"help\" for help",
                CLIENT_NAME, CLIENT_VERSION
            ),
            true,
        );
        Ok(())
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut editor: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(ShellHelper::new(self.trie.clone())));

        loop {
            self.sync_trie();
            let prompt = self.settings.console_prompt.clone();
            match editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if self.console.script_active() {
                        self.console.log_command(&format!("{}{}", prompt, line));
                    }
                    match self.handle_line(&line).await {
                        Ok(LineOutcome::Quit) => break,
                        Ok(LineOutcome::Continue) => {}
                        Err(err) => self.console.show_message(&err.to_string(), true),
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    self.console
                        .show_message(&format!("Error reading input: {}", err), true);
                    break;
                }
            }
        }
        self.bye().await;
        Ok(())
    }

    async fn bye(&mut self) {
        self.console.show_message(&self.settings.exit_message.clone(), true);
        if let Err(err) = self.session.logout().await {
            debug!(%err, "logout failed");
        }
    }

    /// Rebuild the shared trie if the command table changed, e.g. after
    /// restart recovery refreshed it mid-command.
    fn sync_trie(&mut self) {
        if self.session.table_version() == self.table_version {
            return;
        }
        self.table_version = self.session.table_version();
        let mut trie = CommandTrie::new();
        for (name, spec) in self.session.commands() {
            if let Err(err) = trie.insert(&spec.words, name) {
                warn!(%err, name, "skipping command with conflicting words");
            }
        }
        // Native commands participate in completion too. "quit" and
        // "commands" are deliberately left out, as in exact-match-only
        // dispatch they would shadow server commands.
        for native in ["help", "source", "script"] {
            let _ = trie.insert(&[native.to_string()], native);
        }
        *self.trie.write().expect("trie lock poisoned") = trie;
    }

    async fn handle_line(&mut self, line: &str) -> anyhow::Result<LineOutcome> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.console
                    .show_message(&format!("Error parsing command: {}", err), true);
                return Ok(LineOutcome::Continue);
            }
        };
        if tokens.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        self.run_tokens(tokens, false).await
    }

    /// Dispatch one tokenized command line. When `sourcing`, errors are
    /// returned to the caller instead of printed, and no interactive
    /// prompting happens.
    async fn run_tokens(
        &mut self,
        tokens: Vec<Token>,
        sourcing: bool,
    ) -> anyhow::Result<LineOutcome> {
        if let Some(outcome) = self.try_native(&tokens).await? {
            return Ok(outcome);
        }

        let words: Vec<String> = tokens
            .iter()
            .map_while(|t| t.as_word().map(String::from))
            .collect();
        let resolved = {
            let trie = self.trie.read().expect("trie lock poisoned");
            trie.resolve(&words)
        };
        let path = match resolved {
            Ok(path) => path,
            Err(err) => {
                if sourcing {
                    anyhow::bail!("{}", err);
                }
                self.console.show_message(&err.to_string(), true);
                return Ok(LineOutcome::Continue);
            }
        };
        // The resolved path is the expanded command words plus the
        // canonical name; everything past the words is an argument.
        let consumed = path.len() - 1;
        let name = path.last().cloned().unwrap_or_default();
        let mut call_args: Vec<Value> = tokens[consumed..].iter().map(token_to_value).collect();
        let batched = call_args.iter().any(|a| matches!(a, Value::List(_)));

        if !sourcing {
            match prompt::fill_args(&mut self.session, &self.console, &name, call_args).await? {
                FillOutcome::Ready(filled) => call_args = filled,
                FillOutcome::Cancelled => return Ok(LineOutcome::Continue),
            }
        }

        match self.session.run_command(&name, call_args).await {
            Ok(value) => display::show_response(self.console.as_ref(), &value, batched),
            Err(err) => {
                if sourcing {
                    return Err(err.into());
                }
                self.console.show_message(&err.to_string(), true);
            }
        }
        Ok(LineOutcome::Continue)
    }

    /// Commands handled by the shell itself. Matched on the exact first
    /// word, so abbreviations always go to the server-side trie.
    async fn try_native(&mut self, tokens: &[Token]) -> anyhow::Result<Option<LineOutcome>> {
        let Some(first) = tokens.first().and_then(Token::as_word) else {
            return Ok(None);
        };
        match first {
            "quit" => Ok(Some(LineOutcome::Quit)),
            "commands" => {
                let mut names: Vec<&String> = self.session.commands().keys().collect();
                names.sort();
                for name in names {
                    let spec = &self.session.commands()[name];
                    self.console
                        .show_message(&format!("{} -> {}", name, spec.words.join(" ")), true);
                }
                Ok(Some(LineOutcome::Continue))
            }
            "help" => {
                let args: Vec<Value> = tokens[1..].iter().map(token_to_value).collect();
                let text = self.session.help(args).await?;
                self.console.show_message(&text, true);
                Ok(Some(LineOutcome::Continue))
            }
            "script" => {
                match tokens.get(1).and_then(Token::as_word) {
                    None => {
                        self.console
                            .stop_script()
                            .map_err(|e| anyhow::anyhow!(e))?;
                        self.console.show_message("Script file closed", true);
                    }
                    Some(path) => {
                        self.console
                            .start_script(path)
                            .map_err(|e| anyhow::anyhow!(e))?;
                        self.console.show_message(
                            "Script file started. Run script with no arguments to close the file",
                            true,
                        );
                    }
                }
                Ok(Some(LineOutcome::Continue))
            }
            "source" => {
                let mut stop_on_error = true;
                let mut filename = None;
                for token in &tokens[1..] {
                    match token.as_word() {
                        Some("--ignore-errors") => stop_on_error = false,
                        Some(word) => filename = Some(word.to_string()),
                        None => {}
                    }
                }
                let Some(filename) = filename else {
                    self.console
                        .show_message("Must specify a file to source", true);
                    return Ok(Some(LineOutcome::Continue));
                };
                self.source_file(&filename, stop_on_error).await?;
                Ok(Some(LineOutcome::Continue))
            }
            _ => Ok(None),
        }
    }

    /// Run commands from a file, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    async fn source_file(&mut self, filename: &str, stop_on_error: bool) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(filename)
            .map_err(|e| anyhow::anyhow!("Error reading {}: {}", filename, e))?;
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens = match tokenize(line) {
                Ok(tokens) => tokens,
                Err(err) => {
                    self.console
                        .show_message(&format!("Error parsing command: {}", err), true);
                    if stop_on_error {
                        break;
                    }
                    continue;
                }
            };
            if tokens.is_empty() {
                continue;
            }
            self.console
                .show_message(&format!("{}{}", self.settings.console_prompt, line), true);
            // Boxed to allow source files to source other files.
            match Box::pin(self.run_tokens(tokens, true)).await {
                Ok(LineOutcome::Quit) => break,
                Ok(LineOutcome::Continue) => {}
                Err(err) => {
                    self.console.show_message(&err.to_string(), true);
                    if stop_on_error {
                        self.console.show_message(
                            &format!("Sourcing of {} aborted on line {}", filename, lineno + 1),
                            true,
                        );
                        self.console.show_message(
                            "Hint: use 'source --ignore-errors <file>' to keep going",
                            true,
                        );
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

fn token_to_value(token: &Token) -> Value {
    match token {
        Token::Word(w) => Value::String(w.clone()),
        Token::Group(items) => {
            Value::List(items.iter().map(|w| Value::String(w.clone())).collect())
        }
    }
}
