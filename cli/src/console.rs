//! Terminal I/O for the shell, including the script-file tee.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use rpc::Console;

/// Console backed by stdin/stdout. When a script file is active, every
/// message shown and every prompt answered is also appended to it.
pub struct ShellConsole {
    script: Mutex<Option<File>>,
}

impl ShellConsole {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(None),
        }
    }

    pub fn script_active(&self) -> bool {
        self.script.lock().expect("script lock poisoned").is_some()
    }

    pub fn start_script(&self, path: &str) -> Result<(), String> {
        let mut script = self.script.lock().expect("script lock poisoned");
        if script.is_some() {
            return Err("Script file already active".to_string());
        }
        let file =
            File::create(path).map_err(|e| format!("Could not open script file: {}", e))?;
        *script = Some(file);
        Ok(())
    }

    pub fn stop_script(&self) -> Result<(), String> {
        let mut script = self.script.lock().expect("script lock poisoned");
        if script.take().is_none() {
            return Err("No script file active".to_string());
        }
        Ok(())
    }

    /// Record a line in the script file without printing it. Used for
    /// command lines, which the line editor has already echoed.
    pub fn log_command(&self, line: &str) {
        self.tee(line, true);
    }

    /// Prompt on stdout and read one line from stdin. `Ok(None)` on EOF.
    pub fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        self.tee(&format!("{}{}", prompt, answer), true);
        Ok(Some(answer))
    }

    fn tee(&self, msg: &str, newline: bool) {
        let mut script = self.script.lock().expect("script lock poisoned");
        if let Some(file) = script.as_mut() {
            let result = if newline {
                writeln!(file, "{}", msg)
            } else {
                write!(file, "{}", msg)
            };
            if let Err(err) = result {
                *script = None;
                println!("Error writing to script file, closing it: {}", err);
            }
        }
    }
}

impl Console for ShellConsole {
    fn show_message(&self, msg: &str, newline: bool) {
        self.tee(msg, newline);
        if newline {
            println!("{}", msg);
        } else {
            print!("{}", msg);
            let _ = io::stdout().flush();
        }
    }

    fn prompt_password(&self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(format!("{} ", prompt)) {
            Ok(password) => Ok(Some(password)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}
