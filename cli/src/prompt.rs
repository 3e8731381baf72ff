//! Interactive argument gathering: fills in missing command arguments,
//! either from the fixed parameter list or by running the server-driven
//! prompt protocol.

use rpc::{Console, DefaultValue, Error, ParamDef, ParamSpec, Session, Transport, Value};

use crate::console::ShellConsole;
use crate::display::render_scalar;

/// Outcome of argument gathering. `Cancelled` means the user hit EOF at
/// a prompt; the command is silently dropped.
pub enum FillOutcome {
    Ready(Vec<Value>),
    Cancelled,
}

pub async fn fill_args<T: Transport>(
    session: &mut Session<T>,
    console: &ShellConsole,
    command: &str,
    args: Vec<Value>,
) -> Result<FillOutcome, Error> {
    let Some(spec) = session.commands().get(command) else {
        return Ok(FillOutcome::Ready(args));
    };
    match spec.params.clone() {
        ParamSpec::None => Ok(FillOutcome::Ready(args)),
        ParamSpec::ServerPrompt => server_prompt_loop(session, console, command, args).await,
        ParamSpec::Fixed(params) => fixed_prompt(session, console, command, args, &params).await,
    }
}

/// Prompt for the parameters the user left off the command line.
///
/// Stops at the first optional parameter unless prompting has already
/// started; once it has, optional parameters are offered too, and an
/// empty answer to one ends the command line.
async fn fixed_prompt<T: Transport>(
    session: &mut Session<T>,
    console: &ShellConsole,
    command: &str,
    mut args: Vec<Value>,
    params: &[ParamDef],
) -> Result<FillOutcome, Error> {
    let mut prompting = false;
    let mut index = args.len();
    while index < params.len() {
        let param = &params[index];
        if param.optional && !prompting {
            break;
        }
        let default = match &param.default {
            Some(DefaultValue::Literal(s)) => Some(s.clone()),
            Some(DefaultValue::FromServer) => {
                Some(session.default_param(command, args.clone()).await?)
            }
            None => None,
        };
        prompting = true;
        let prompt_text = param.prompt.as_deref().unwrap_or("");

        if param.kind.as_deref() == Some("accountPassword") {
            let entered = console
                .prompt_password(&format!("{} >", prompt_text))
                .map_err(|e| Error::Io(e.to_string()))?;
            match entered {
                Some(password) => {
                    args.push(password.into());
                    index += 1;
                    continue;
                }
                None => return Ok(FillOutcome::Cancelled),
            }
        }

        let shown = match &default {
            Some(d) => format!("{} [{}] > ", prompt_text, d),
            None => format!("{} > ", prompt_text),
        };
        let Some(answer) = console
            .read_line(&shown)
            .map_err(|e| Error::Io(e.to_string()))?
        else {
            return Ok(FillOutcome::Cancelled);
        };

        if answer == "?" {
            show_arg_help(session, console, param.help_ref.as_deref()).await;
            continue;
        }
        if answer.is_empty() {
            if let Some(d) = default {
                args.push(d.into());
                index += 1;
                continue;
            }
            if param.optional {
                break;
            }
        }
        args.push(answer.into());
        index += 1;
    }
    Ok(FillOutcome::Ready(args))
}

/// Run the server-driven prompt protocol: ask the server what to prompt
/// for next, gather an answer, repeat until the server marks the last
/// argument.
async fn server_prompt_loop<T: Transport>(
    session: &mut Session<T>,
    console: &ShellConsole,
    command: &str,
    mut args: Vec<Value>,
) -> Result<FillOutcome, Error> {
    loop {
        let reply = session.prompt_func(command, args.clone()).await?;
        let Some(info) = reply.as_map() else {
            return Err(Error::Io(format!(
                "prompt function returned a {}, not a map",
                reply.type_name()
            )));
        };

        let prompt = info.get("prompt").and_then(Value::as_str);
        let last_arg = info.get("last_arg").is_some_and(|v| !v.is_null());
        if prompt.is_none() && last_arg {
            break;
        }

        let default = info.get("default").and_then(Value::as_str).map(String::from);
        let map_rows = info.get("map").and_then(Value::as_list);
        if let Some(rows) = map_rows {
            render_choice_map(console, rows);
        }

        let shown = match &default {
            Some(d) => format!("{} [{}] > ", prompt.unwrap_or(""), d),
            None => format!("{} > ", prompt.unwrap_or("")),
        };
        let Some(answer) = console
            .read_line(&shown)
            .map_err(|e| Error::Io(e.to_string()))?
        else {
            return Ok(FillOutcome::Cancelled);
        };

        if answer.is_empty() && default.is_none() {
            continue;
        }
        if answer == "?" {
            match info.get("help_ref").and_then(Value::as_str) {
                None => console.show_message("Sorry, no help available", true),
                Some(help_ref) => show_arg_help(session, console, Some(help_ref)).await,
            }
            continue;
        }

        if !answer.is_empty() {
            let raw = info.get("raw").is_some_and(|v| !v.is_null());
            if let (Some(rows), false) = (map_rows, raw) {
                // Answers index into the displayed choice map; row zero
                // is the header.
                let chosen = answer
                    .parse::<usize>()
                    .ok()
                    .filter(|&i| i > 0)
                    .and_then(|i| rows.get(i))
                    .and_then(Value::as_list)
                    .and_then(|row| row.get(1));
                match chosen {
                    Some(value) => args.push(value.clone()),
                    None => {
                        console.show_message("Value not in list", true);
                        continue;
                    }
                }
            } else {
                args.push(answer.into());
            }
        } else if let Some(d) = default {
            args.push(d.into());
        }

        if last_arg {
            break;
        }
    }
    Ok(FillOutcome::Ready(args))
}

async fn show_arg_help<T: Transport>(
    session: &mut Session<T>,
    console: &ShellConsole,
    help_ref: Option<&str>,
) {
    let help_ref = help_ref.unwrap_or_default();
    match session
        .help(vec!["arg_help".into(), help_ref.into()])
        .await
    {
        Ok(text) => console.show_message(&text, true),
        Err(err) => console.show_message(&err.to_string(), true),
    }
}

/// Show a numbered choice map. Each row is `[description, value]`; the
/// description's first element is a format string meant for the
/// original table renderer, so the remaining fields are shown plainly.
fn render_choice_map(console: &ShellConsole, rows: &[Value]) {
    for (i, row) in rows.iter().enumerate() {
        let Some(description) = row
            .as_list()
            .and_then(|r| r.first())
            .and_then(Value::as_list)
        else {
            continue;
        };
        let fields: Vec<String> = description.iter().skip(1).map(render_scalar).collect();
        if i == 0 {
            console.show_message(&format!(" Num {}", fields.join(" ")), true);
        } else {
            console.show_message(&format!("{:>4} {}", i, fields.join(" ")), true);
        }
    }
}
