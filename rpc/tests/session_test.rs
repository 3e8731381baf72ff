use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rpc::async_trait::async_trait;
use rpc::{
    Console, Error, Fault, Session, Transport, TransportError, Value, ERROR_NAMESPACE,
};

/// Transport double that replays a scripted sequence of results and
/// records every raw call it sees.
struct ScriptedTransport {
    script: Mutex<Vec<Result<Value, TransportError>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, args: &[Value]) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), args.to_vec()));
        let mut script = self.script.lock().unwrap();
        assert!(!script.is_empty(), "unscripted call to {}", method);
        script.remove(0)
    }
}

/// Console double: swallows messages, hands out a fixed password.
struct StubConsole {
    password: Option<String>,
    messages: Mutex<Vec<String>>,
}

impl StubConsole {
    fn new(password: Option<&str>) -> Self {
        Self {
            password: password.map(String::from),
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl Console for StubConsole {
    fn show_message(&self, msg: &str, _newline: bool) {
        self.messages.lock().unwrap().push(msg.to_string());
    }

    fn prompt_password(&self, _prompt: &str) -> std::io::Result<Option<String>> {
        Ok(self.password.clone())
    }
}

fn fault(message: String) -> Result<Value, TransportError> {
    Err(TransportError::Fault(Fault { code: 1, message }))
}

fn restarted() -> Result<Value, TransportError> {
    fault(format!("{}ServerRestartedError: restarted", ERROR_NAMESPACE))
}

fn expired() -> Result<Value, TransportError> {
    fault(format!("{}SessionExpiredError: expired", ERROR_NAMESPACE))
}

fn empty_table() -> Result<Value, TransportError> {
    Ok(Value::Map(HashMap::new()))
}

async fn logged_in_session(
    transport: Arc<ScriptedTransport>,
    console: Arc<StubConsole>,
) -> Session<Arc<ScriptedTransport>> {
    let mut session = Session::new(transport, console);
    session.login("admin", "hunter2").await.unwrap();
    session
}

#[tokio::test]
async fn login_stores_the_session_id() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(Value::String(
        "sess-1".into(),
    ))]));
    let console = Arc::new(StubConsole::new(None));
    let session = logged_in_session(transport.clone(), console).await;
    assert_eq!(session.session_id(), Some("sess-1"));
    assert_eq!(session.username(), Some("admin"));
    assert_eq!(transport.calls()[0].0, "login");
}

#[tokio::test]
async fn restart_refreshes_table_and_retries_once() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())), // login
        restarted(),                        // run_command, first attempt
        empty_table(),                      // get_commands during recovery
        Ok(Value::String("done".into())),   // run_command, retry
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;
    let before = session.table_version();

    let reply = session.run_command("user_info", vec!["jdoe".into()]).await;
    assert_eq!(reply.unwrap(), Value::String("done".into()));
    assert!(session.table_version() > before);

    let methods: Vec<String> = transport.calls().into_iter().map(|(m, _)| m).collect();
    assert_eq!(
        methods,
        vec!["login", "run_command", "get_commands", "run_command"]
    );
}

#[tokio::test]
async fn second_restart_is_a_hard_failure() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())), // login
        restarted(),
        empty_table(),
        restarted(), // recurs on the retry
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    let err = session
        .run_command("user_info", vec!["jdoe".into()])
        .await
        .unwrap_err();
    assert_eq!(err, Error::Remote("restarted".into()));
    // login + first attempt + refresh + one retry, nothing more
    assert_eq!(transport.calls().len(), 4);
}

#[tokio::test]
async fn expiry_relogs_in_and_substitutes_the_new_session_id() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())), // initial login
        expired(),                          // run_command, first attempt
        Ok(Value::String("sess-2".into())), // re-login
        Ok(Value::String("done".into())),   // run_command, retry
    ]));
    let console = Arc::new(StubConsole::new(Some("new-password")));
    let mut session = logged_in_session(transport.clone(), console.clone()).await;

    let reply = session.run_command("user_info", vec!["jdoe".into()]).await;
    assert_eq!(reply.unwrap(), Value::String("done".into()));
    assert_eq!(session.session_id(), Some("sess-2"));

    let calls = transport.calls();
    assert_eq!(calls[3].0, "run_command");
    assert_eq!(calls[3].1[0], Value::String("sess-2".into()));
    // Re-login reused the remembered username with the freshly
    // prompted password.
    assert_eq!(calls[2].0, "login");
    assert_eq!(calls[2].1[1], Value::String("new-password".into()));
    assert!(console
        .messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("re-authenticate")));
}

#[tokio::test]
async fn cancelled_reauthentication_aborts_the_call() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        expired(),
    ]));
    let console = Arc::new(StubConsole::new(None)); // user cancels
    let mut session = logged_in_session(transport.clone(), console).await;

    let err = session
        .run_command("user_info", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote(_)));
    assert_eq!(transport.calls().len(), 2); // no retry after cancel
}

#[tokio::test]
async fn run_command_prepends_session_and_name() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        Ok(Value::String("ok".into())),
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    session
        .run_command(
            "access_disk",
            vec!["add".into(), "user1".into(), "/home".into()],
        )
        .await
        .unwrap();
    let calls = transport.calls();
    assert_eq!(
        calls[1].1,
        vec![
            Value::String("sess-1".into()),
            Value::String("access_disk".into()),
            Value::String("add".into()),
            Value::String("user1".into()),
            Value::String("/home".into()),
        ]
    );
}

#[tokio::test]
async fn outgoing_colon_is_escaped_on_the_wire() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        Ok(Value::String("ok".into())),
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    session
        .run_command("misc_note", vec![":secret".into()])
        .await
        .unwrap();
    assert_eq!(
        transport.calls()[1].1[2],
        Value::String("::secret".into())
    );
}

#[tokio::test]
async fn responses_are_washed() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        Ok(Value::List(vec![
            Value::String(":None".into()),
            Value::String("::x".into()),
        ])),
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    let reply = session.run_command("user_info", vec![]).await.unwrap();
    assert_eq!(
        reply,
        Value::List(vec![Value::Null, Value::String(":x".into())])
    );
}

#[tokio::test]
async fn illegal_argument_never_reaches_the_wire() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(Value::String(
        "sess-1".into(),
    ))]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    let err = session
        .run_command("user_info", vec!["bad\u{7}arg".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IllegalArgument(_)));
    assert_eq!(transport.calls().len(), 1); // only the login
}

#[tokio::test]
async fn transport_errors_are_io_and_not_retried() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        Err(TransportError::Http("connection refused".into())),
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    let err = session.run_command("user_info", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn refresh_parses_the_command_table() {
    let mut entry = HashMap::new();
    entry.insert(
        "access_disk".to_string(),
        Value::List(vec![Value::List(vec!["access".into(), "disk".into()])]),
    );
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(Value::String("sess-1".into())),
        Ok(Value::Map(entry)),
    ]));
    let console = Arc::new(StubConsole::new(None));
    let mut session = logged_in_session(transport.clone(), console).await;

    session.refresh_commands().await.unwrap();
    let spec = &session.commands()["access_disk"];
    assert_eq!(spec.words, vec!["access".to_string(), "disk".to_string()]);
}
