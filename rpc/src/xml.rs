//! XML-RPC wire codec: `methodCall` encoding and `methodResponse`
//! decoding. The session layer only sees [`Value`]s and [`Fault`]s.

use std::fmt;
use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::value::Value;

/// A remote fault carried in a `methodResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault {}: {}", self.code, self.message)
    }
}

/// Decoded `methodResponse`
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Fault(Fault),
}

/// The response envelope could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed response: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

fn bad(msg: impl fmt::Display) -> DecodeError {
    DecodeError(msg.to_string())
}

/// Encode a `methodCall` document
pub fn encode_call(method: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for arg in args {
        out.push_str("<param>");
        encode_value(&mut out, arg);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", if *b { 1 } else { 0 });
        }
        Value::Int(i) => {
            let _ = write!(out, "<int>{}</int>", i);
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::List(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Map(map) => {
            out.push_str("<struct>");
            for (key, item) in map {
                out.push_str("<member><name>");
                out.push_str(&escape(key.as_str()));
                out.push_str("</name>");
                encode_value(out, item);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `methodResponse` document into a success value or a fault
pub fn decode_response(xml: &str) -> Result<Response, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault = false;
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"fault" => in_fault = true,
                    b"value" => {
                        let value = decode_value(&mut reader)?;
                        return if in_fault {
                            fault_from_value(value).map(Response::Fault)
                        } else {
                            Ok(Response::Success(value))
                        };
                    }
                    // methodResponse, params, param
                    _ => {}
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                return Ok(Response::Success(Value::String(String::new())));
            }
            Event::Eof => return Err(bad("response carries no value")),
            _ => {}
        }
    }
}

fn fault_from_value(value: Value) -> Result<Fault, DecodeError> {
    let Value::Map(map) = value else {
        return Err(bad(format!("fault is a {}, not a struct", value.type_name())));
    };
    let code = map
        .get("faultCode")
        .and_then(Value::as_int)
        .ok_or_else(|| bad("fault without faultCode"))?;
    let message = map
        .get("faultString")
        .and_then(Value::as_str)
        .ok_or_else(|| bad("fault without faultString"))?
        .to_string();
    Ok(Fault { code, message })
}

/// Decode the contents of a `<value>` element, consuming through its
/// end tag. A bare text node is a string; `<dateTime.iso8601>` and
/// `<base64>` are kept as their raw text.
fn decode_value(reader: &mut Reader<&[u8]>) -> Result<Value, DecodeError> {
    let mut value: Option<Value> = None;
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Text(t) => {
                if value.is_none() {
                    let text = t.unescape().map_err(bad)?;
                    value = Some(Value::String(text.into_owned()));
                }
            }
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                value = Some(match name.as_slice() {
                    b"string" | b"dateTime.iso8601" | b"base64" => {
                        Value::String(read_text(reader, &name)?)
                    }
                    b"int" | b"i4" => {
                        let text = read_text(reader, &name)?;
                        Value::Int(text.trim().parse().map_err(bad)?)
                    }
                    b"boolean" => {
                        let text = read_text(reader, &name)?;
                        Value::Bool(text.trim() == "1")
                    }
                    b"double" => {
                        let text = read_text(reader, &name)?;
                        Value::Double(text.trim().parse().map_err(bad)?)
                    }
                    b"nil" => {
                        skip_to_end(reader, &name)?;
                        Value::Null
                    }
                    b"array" => decode_array(reader)?,
                    b"struct" => decode_struct(reader)?,
                    other => {
                        return Err(bad(format!(
                            "unsupported value type <{}>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                });
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"nil" => value = Some(Value::Null),
                b"string" => value = Some(Value::String(String::new())),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"value" => {
                // <value>text</value> with no type element is a string;
                // an entirely empty <value></value> is the empty string.
                return Ok(value.unwrap_or_else(|| Value::String(String::new())));
            }
            Event::Eof => return Err(bad("truncated value")),
            _ => {}
        }
    }
}

fn decode_array(reader: &mut Reader<&[u8]>) -> Result<Value, DecodeError> {
    let mut items = Vec::new();
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name.as_slice() == b"value" {
                    items.push(decode_value(reader)?);
                }
                // <data> is structural
            }
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                items.push(Value::String(String::new()));
            }
            Event::End(e) if e.name().as_ref() == b"array" => {
                return Ok(Value::List(items));
            }
            Event::Eof => return Err(bad("truncated array")),
            _ => {}
        }
    }
}

fn decode_struct(reader: &mut Reader<&[u8]>) -> Result<Value, DecodeError> {
    let mut map = std::collections::HashMap::new();
    let mut member_name: Option<String> = None;
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"name" => member_name = Some(read_text(reader, &name)?),
                    b"value" => {
                        let value = decode_value(reader)?;
                        let key = member_name
                            .take()
                            .ok_or_else(|| bad("struct member value before name"))?;
                        map.insert(key, value);
                    }
                    // <member> is structural
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"struct" => {
                return Ok(Value::Map(map));
            }
            Event::Eof => return Err(bad("truncated struct")),
            _ => {}
        }
    }
}

/// Accumulate text until the end tag `end`
fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, DecodeError> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(bad)?),
            Event::End(e) if e.name().as_ref() == end => return Ok(text),
            Event::Eof => return Err(bad("truncated element")),
            _ => {}
        }
    }
}

fn skip_to_end(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<(), DecodeError> {
    loop {
        match reader.read_event().map_err(bad)? {
            Event::End(e) if e.name().as_ref() == end => return Ok(()),
            Event::Eof => return Err(bad("truncated element")),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_call_with_escaping() {
        let body = encode_call("run_command", &["a<b".into(), "plain".into()]);
        assert!(body.contains("<methodName>run_command</methodName>"));
        assert!(body.contains("<value><string>a&lt;b</string></value>"));
        assert!(body.contains("<value><string>plain</string></value>"));
    }

    #[test]
    fn encodes_nested_list() {
        let body = encode_call("run_command", &[Value::List(vec!["x".into(), "y".into()])]);
        assert!(body.contains(
            "<array><data><value><string>x</string></value>\
             <value><string>y</string></value></data></array>"
        ));
    }

    #[test]
    fn decodes_string_response() {
        let xml = "<?xml version=\"1.0\"?><methodResponse><params><param>\
                   <value><string>ok &amp; fine</string></value>\
                   </param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Success(Value::String("ok & fine".into()))
        );
    }

    #[test]
    fn decodes_bare_text_as_string() {
        let xml = "<methodResponse><params><param>\
                   <value>session-123</value>\
                   </param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Success(Value::String("session-123".into()))
        );
    }

    #[test]
    fn decodes_struct_of_arrays() {
        let xml = "<methodResponse><params><param><value><struct>\
                   <member><name>user_info</name><value><array><data>\
                   <value><array><data>\
                   <value><string>user</string></value>\
                   <value><string>info</string></value>\
                   </data></array></value>\
                   </data></array></value></member>\
                   </struct></value></param></params></methodResponse>";
        let Response::Success(Value::Map(map)) = decode_response(xml).unwrap() else {
            panic!("expected struct response");
        };
        assert_eq!(
            map["user_info"],
            Value::List(vec![Value::List(vec!["user".into(), "info".into()])])
        );
    }

    #[test]
    fn decodes_int_and_nil() {
        let xml = "<methodResponse><params><param><value><array><data>\
                   <value><int>42</int></value>\
                   <value><i4>-7</i4></value>\
                   <value><nil/></value>\
                   </data></array></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Success(Value::List(vec![
                Value::Int(42),
                Value::Int(-7),
                Value::Null,
            ]))
        );
    }

    #[test]
    fn decodes_fault() {
        let xml = "<methodResponse><fault><value><struct>\
                   <member><name>faultCode</name><value><int>1</int></value></member>\
                   <member><name>faultString</name>\
                   <value><string>Cerebrum.modules.bofhd.errors.ServerRestartedError</string></value>\
                   </member></struct></value></fault></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Response::Fault(Fault {
                code: 1,
                message: "Cerebrum.modules.bofhd.errors.ServerRestartedError".into(),
            })
        );
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_response("<params>").is_err());
        assert!(decode_response("not xml at all").is_err());
    }
}
