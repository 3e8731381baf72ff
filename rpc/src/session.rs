//! Session-authenticated RPC client: threads the session id through
//! every call, recovers from server restarts and session expiry, and
//! translates between wire markers and application values.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command_spec::{CommandSpec, ParamSpec};
use crate::error::Error;
use crate::transport::{Transport, TransportError};
use crate::value::Value;
use crate::xml::Fault;

/// Administrative-error namespace on the wire. Faults identified inside
/// it carry a human-readable trailing message; faults outside it are
/// surfaced raw.
pub const ERROR_NAMESPACE: &str = "Cerebrum.modules.bofhd.errors.";

const RESTARTED: &str = "ServerRestartedError";
const EXPIRED: &str = "SessionExpiredError";

/// Collaborator surface the session client needs during recovery: a
/// message sink and a password prompt (`Ok(None)` when the user
/// cancels). The interactive shell provides the real one.
pub trait Console: Send + Sync {
    fn show_message(&self, msg: &str, newline: bool);
    fn prompt_password(&self, prompt: &str) -> std::io::Result<Option<String>>;
}

/// One authenticated session against the server.
///
/// Owns the session identifier and the cached command table; both are
/// replaced wholesale by `login` and `refresh_commands`. Single
/// foreground caller, one call outstanding at a time.
pub struct Session<T: Transport> {
    transport: T,
    console: Arc<dyn Console>,
    session_id: Option<String>,
    username: Option<String>,
    commands: HashMap<String, CommandSpec>,
    table_version: u64,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, console: Arc<dyn Console>) -> Self {
        Self {
            transport,
            console,
            session_id: None,
            username: None,
            commands: HashMap::new(),
            table_version: 0,
        }
    }

    /// The cached command table, keyed by canonical command name
    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    /// Bumped every time the command table is replaced; lets callers
    /// notice a refresh that happened inside restart recovery.
    pub fn table_version(&self) -> u64 {
        self.table_version
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Authenticate; stores the issued session id and the username for
    /// later re-authentication.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, Error> {
        let args = vec![username.into(), password.into()];
        let session_id = expect_string(self.call_plain("login", args).await?)?;
        debug!("login ok");
        self.session_id = Some(session_id.clone());
        self.username = Some(username.to_string());
        Ok(session_id)
    }

    /// Fetch the message of the day, identifying this client
    pub async fn motd(&self, client_name: &str, client_version: &str) -> Result<String, Error> {
        let args = vec![client_name.into(), client_version.into()];
        expect_string(self.call_plain("get_motd", args).await?)
    }

    /// Invalidate the session server-side. Callers treat failures as
    /// best-effort.
    pub async fn logout(&mut self) -> Result<String, Error> {
        let args = vec![self.session_value()?];
        let reply = expect_string(self.call_plain("logout", args).await?)?;
        self.session_id = None;
        Ok(reply)
    }

    /// Replace the cached command table in full.
    ///
    /// Deliberately on the plain call path: restart recovery calls this,
    /// and a refresh that retried itself would recurse.
    pub async fn refresh_commands(&mut self) -> Result<(), Error> {
        let args = vec![self.session_value()?];
        let reply = self.call_plain("get_commands", args).await?;
        let Value::Map(table) = reply else {
            return Err(Error::IllegalArgument(format!(
                "command table is a {}, not a map",
                reply.type_name()
            )));
        };
        let mut commands = HashMap::with_capacity(table.len());
        for (name, entry) in &table {
            commands.insert(name.clone(), CommandSpec::from_value(name, entry)?);
        }
        self.commands = commands;
        self.table_version += 1;
        debug!(commands = self.commands.len(), "command table refreshed");
        Ok(())
    }

    /// Server-side help; the session id is injected as argument zero
    pub async fn help(&mut self, mut args: Vec<Value>) -> Result<String, Error> {
        args.insert(0, self.session_value()?);
        expect_string(self.call_with_recovery("help", args, 0).await?)
    }

    /// The primary call path: run a canonical command with positional
    /// arguments, transparently recovering from a server restart or an
    /// expired session (once each).
    pub async fn run_command(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push(self.session_value()?);
        full.push(name.into());
        full.extend(args);
        self.call_with_recovery("run_command", full, 0).await
    }

    /// Ask the server for a parameter default during prompting
    pub async fn default_param(&mut self, name: &str, args: Vec<Value>) -> Result<String, Error> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push(self.session_value()?);
        full.push(name.into());
        full.extend(args);
        expect_string(self.call_with_recovery("get_default_param", full, 0).await?)
    }

    /// One step of the server-driven prompt protocol
    pub async fn prompt_func(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push(self.session_value()?);
        full.push(name.into());
        full.extend(args);
        self.call_with_recovery("call_prompt_func", full, 0).await
    }

    fn session_value(&self) -> Result<Value, Error> {
        self.session_id
            .as_deref()
            .map(Value::from)
            .ok_or_else(|| Error::IllegalArgument("no active session".into()))
    }

    /// Single round-trip, no recovery; faults are only classified.
    async fn call_plain(&self, method: &str, args: Vec<Value>) -> Result<Value, Error> {
        let args = wash_request_args(args)?;
        debug!(method, args = %self.loggable_args(method, &args), "send");
        match self.transport.call(method, &args).await {
            Ok(value) => {
                let value = wash_response(value);
                debug!(?value, "recv");
                Ok(value)
            }
            Err(TransportError::Fault(fault)) => Err(classify_fault(&fault)),
            Err(other) => Err(Error::Io(other.to_string())),
        }
    }

    /// The bounded recovery loop: at most one command-table refresh and
    /// one re-authentication per logical call. Arguments are washed
    /// once, before the loop, so a retry never re-escapes them.
    async fn call_with_recovery(
        &mut self,
        method: &str,
        args: Vec<Value>,
        session_loc: usize,
    ) -> Result<Value, Error> {
        let mut args = wash_request_args(args)?;
        let mut refreshed = false;
        let mut relogged = false;
        loop {
            debug!(method, args = %self.loggable_args(method, &args), "send");
            match self.transport.call(method, &args).await {
                Ok(value) => {
                    let value = wash_response(value);
                    debug!(?value, "recv");
                    return Ok(value);
                }
                Err(TransportError::Fault(fault)) => {
                    if !refreshed && fault_is(&fault, RESTARTED) {
                        debug!("server restarted, refreshing command table");
                        refreshed = true;
                        self.refresh_commands().await?;
                        continue;
                    }
                    if !relogged && fault_is(&fault, EXPIRED) {
                        relogged = true;
                        self.console
                            .show_message("Session expired, you must re-authenticate", true);
                        self.reauthenticate().await?;
                        args[session_loc] = self.session_value()?;
                        continue;
                    }
                    return Err(classify_fault(&fault));
                }
                Err(other) => return Err(Error::Io(other.to_string())),
            }
        }
    }

    async fn reauthenticate(&mut self) -> Result<(), Error> {
        let username = self.username.clone().ok_or_else(|| {
            Error::IllegalArgument("no known username to re-authenticate".into())
        })?;
        let prompt = format!("Password for {}:", username);
        let password = self
            .console
            .prompt_password(&prompt)
            .map_err(|e| Error::Io(e.to_string()))?
            .ok_or_else(|| Error::Remote("re-authentication cancelled".into()))?;
        self.login(&username, &password).await?;
        Ok(())
    }

    /// Call-log rendering with secrets masked: the login password, and
    /// any `run_command` argument whose parameter type marks a password.
    fn loggable_args(&self, method: &str, args: &[Value]) -> String {
        if method == "login" {
            return "[<username>, ********]".to_string();
        }
        if method == "run_command" {
            if let Some(params) = args
                .get(1)
                .and_then(Value::as_str)
                .and_then(|name| self.commands.get(name))
                .and_then(|spec| match &spec.params {
                    ParamSpec::Fixed(defs) => Some(defs),
                    _ => None,
                })
            {
                let rendered: Vec<String> = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        let masked = i >= 2
                            && params.get(i - 2).and_then(|p| p.kind.as_deref())
                                == Some("accountPassword");
                        if masked {
                            "\"********\"".to_string()
                        } else {
                            format!("{:?}", arg)
                        }
                    })
                    .collect();
                return format!("[{}]", rendered.join(", "));
            }
        }
        format!("{:?}", args)
    }
}

fn fault_is(fault: &Fault, kind: &str) -> bool {
    fault
        .message
        .strip_prefix(ERROR_NAMESPACE)
        .is_some_and(|rest| rest.starts_with(kind))
}

fn classify_fault(fault: &Fault) -> Error {
    let msg = &fault.message;
    if let Some(rest) = msg.strip_prefix(ERROR_NAMESPACE) {
        let mut human = match rest.find(':') {
            Some(pos) => rest[pos + 1..].trim_start(),
            None => rest,
        };
        if let Some(stripped) = human.strip_prefix("CerebrumError: ") {
            human = stripped;
        }
        return Error::Remote(human.to_string());
    }
    debug!(code = fault.code, "fault outside the error namespace");
    Error::Remote(msg.clone())
}

/// Escape outgoing leading colons (the wire's out-of-band marker) and
/// enforce the character whitelist, one level deep into lists.
fn wash_request_args(mut args: Vec<Value>) -> Result<Vec<Value>, Error> {
    for arg in &mut args {
        match arg {
            Value::String(s) => wash_outgoing(s)?,
            Value::List(items) => {
                for item in items {
                    if let Value::String(s) = item {
                        wash_outgoing(s)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(args)
}

fn wash_outgoing(s: &mut String) -> Result<(), Error> {
    if s.starts_with(':') {
        s.insert(0, ':');
    }
    check_safe(s)
}

/// The wire format only carries tab, LF, CR and code points >= 0x20
fn check_safe(s: &str) -> Result<(), Error> {
    for c in s.chars() {
        let code = c as u32;
        if code >= 0x20 || code == 0x9 || code == 0xa || code == 0xd {
            continue;
        }
        return Err(Error::IllegalArgument(format!(
            "You entered an illegal character: {:#x}",
            code
        )));
    }
    Ok(())
}

/// Decode the wire's colon-marker convention, recursively
fn wash_response(value: Value) -> Value {
    match value {
        Value::String(s) => wash_string(s),
        Value::List(items) => Value::List(items.into_iter().map(wash_response).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, wash_response(v)))
                .collect(),
        ),
        other => other,
    }
}

fn wash_string(s: String) -> Value {
    match s.strip_prefix(':') {
        None => Value::String(s),
        Some("None") => Value::Null,
        Some(rest) => {
            if !rest.starts_with(':') {
                // Forward-compatible extension marker; pass through
                // with the marker stripped.
                warn!(marker = rest, "unknown escape sequence in response");
            }
            Value::String(rest.to_string())
        }
    }
}

fn expect_string(value: Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::Io(format!(
            "expected a string response, got {}",
            other.type_name()
        ))),
    }
}
