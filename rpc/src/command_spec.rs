use crate::error::Error;
use crate::value::Value;

/// One entry of the server command table: the words a user types and
/// how the command's arguments are gathered.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Command words as typed, e.g. `["access", "disk"]`
    pub words: Vec<String>,
    pub params: ParamSpec,
}

/// How arguments are gathered for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    /// The command takes no arguments beyond what the user typed
    None,
    /// The server drives an interactive prompt protocol
    ServerPrompt,
    /// A fixed ordered parameter list
    Fixed(Vec<ParamDef>),
}

/// One parameter of a fixed-parameter command. Attributes are kept as
/// the server sent them; only the prompting layer interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamDef {
    pub optional: bool,
    pub default: Option<DefaultValue>,
    /// Human prompt text
    pub prompt: Option<String>,
    /// Semantic type tag, e.g. `accountPassword`
    pub kind: Option<String>,
    /// Token for `help arg_help`
    pub help_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Literal(String),
    /// Ask the server for the default at prompt time
    FromServer,
}

impl CommandSpec {
    /// Parse one `get_commands` table entry:
    /// `[[word, ...]]`, `[[word, ...], "prompt_func"]`, or
    /// `[[word, ...], [{param attrs}, ...]]`.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, Error> {
        let malformed = |what: &str| {
            Error::IllegalArgument(format!("malformed command definition for {}: {}", name, what))
        };

        let Value::List(parts) = value else {
            return Err(malformed("not a list"));
        };
        let words = parts
            .first()
            .and_then(Value::as_list)
            .ok_or_else(|| malformed("missing word list"))?
            .iter()
            .map(|w| {
                w.as_str()
                    .map(String::from)
                    .ok_or_else(|| malformed("non-string command word"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if words.is_empty() {
            return Err(malformed("empty word list"));
        }

        let params = match parts.get(1) {
            None | Some(Value::Null) => ParamSpec::None,
            Some(Value::String(s)) if s == "prompt_func" => ParamSpec::ServerPrompt,
            Some(Value::String(s)) => {
                return Err(malformed(&format!("bad param spec {:?}", s)));
            }
            Some(Value::List(items)) => {
                let defs = items
                    .iter()
                    .map(|item| ParamDef::from_value(item).ok_or_else(|| malformed("bad param")))
                    .collect::<Result<Vec<_>, _>>()?;
                ParamSpec::Fixed(defs)
            }
            Some(other) => {
                return Err(malformed(&format!("param spec is a {}", other.type_name())));
            }
        };

        Ok(CommandSpec { words, params })
    }
}

impl ParamDef {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let get_str = |key: &str| map.get(key).and_then(Value::as_str).map(String::from);
        let default = match map.get("default") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(DefaultValue::Literal(s.clone())),
            // A non-string marker means "ask the server at prompt time"
            Some(_) => Some(DefaultValue::FromServer),
        };
        Some(ParamDef {
            optional: map.get("optional").map(truthy).unwrap_or(false),
            default,
            prompt: get_str("prompt"),
            kind: get_str("type"),
            help_ref: get_str("help_ref"),
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i == 1,
        _ => false,
    }
}
