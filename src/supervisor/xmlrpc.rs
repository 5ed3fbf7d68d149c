// Minimal XML-RPC codec and HTTP transport (only what the supervisord API needs)

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::header::CONTENT_TYPE;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("fault {code}: {message}")]
    Fault { code: i64, message: String },
    #[error("malformed response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Struct member lookup; `None` for missing members and non-structs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(m) => m.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Renders a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for p in params {
        out.push_str("<param>");
        write_value(&mut out, p);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, v: &Value) {
    out.push_str("<value>");
    match v {
        Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
        Value::Bool(b) => out.push_str(if *b {
            "<boolean>1</boolean>"
        } else {
            "<boolean>0</boolean>"
        }),
        Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (k, v) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(k.as_str()));
                out.push_str("</name>");
                write_value(out, v);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn tokenize(body: &str) -> Result<Vec<Token>, RpcError> {
    let mut reader = Reader::from_str(body);
    let mut tokens = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| RpcError::Parse(e.to_string()))?;
        match event {
            Event::Start(e) => tokens.push(Token::Open(
                String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            )),
            Event::End(e) => tokens.push(Token::Close(
                String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            )),
            Event::Empty(e) => tokens.push(Token::Empty(
                String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            )),
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| RpcError::Parse(e.to_string()))?;
                push_text(&mut tokens, &text);
            }
            Event::CData(c) => push_text(&mut tokens, &String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(tokens)
}

// Adjacent text runs (text + CDATA) are merged into one token.
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Text(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn skip_ws(&mut self) {
        while let Some(Token::Text(t)) = self.peek() {
            if !t.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), RpcError> {
        self.skip_ws();
        match self.bump() {
            Some(Token::Open(n)) if n == name => Ok(()),
            other => Err(RpcError::Parse(format!(
                "expected <{}>, found {:?}",
                name, other
            ))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), RpcError> {
        self.skip_ws();
        match self.bump() {
            Some(Token::Close(n)) if n == name => Ok(()),
            other => Err(RpcError::Parse(format!(
                "expected </{}>, found {:?}",
                name, other
            ))),
        }
    }

    /// Text content up to `</name>`; empty when the element has no text.
    fn text_until_close(&mut self, name: &str) -> Result<String, RpcError> {
        let text = match self.peek() {
            Some(Token::Text(t)) => {
                let t = t.clone();
                self.pos += 1;
                t
            }
            _ => String::new(),
        };
        self.expect_close(name)?;
        Ok(text)
    }

    /// Parses the body of a `<value>` whose opening tag was already consumed.
    fn value(&mut self) -> Result<Value, RpcError> {
        let leading = match self.peek() {
            Some(Token::Text(t)) => {
                let t = t.clone();
                self.pos += 1;
                Some(t)
            }
            _ => None,
        };
        match self.bump() {
            Some(Token::Close(n)) if n == "value" => Ok(Value::String(leading.unwrap_or_default())),
            Some(Token::Empty(tag)) => {
                let v = match tag.as_str() {
                    "nil" => Value::Nil,
                    "string" => Value::String(String::new()),
                    "array" => Value::Array(Vec::new()),
                    "struct" => Value::Struct(BTreeMap::new()),
                    other => {
                        return Err(RpcError::Parse(format!("empty <{}/> has no value", other)));
                    }
                };
                self.expect_close("value")?;
                Ok(v)
            }
            Some(Token::Open(tag)) => {
                let v = self.typed(&tag)?;
                self.expect_close("value")?;
                Ok(v)
            }
            other => Err(RpcError::Parse(format!("unexpected {:?} in <value>", other))),
        }
    }

    fn typed(&mut self, tag: &str) -> Result<Value, RpcError> {
        match tag {
            "int" | "i4" | "i8" => {
                let text = self.text_until_close(tag)?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| RpcError::Parse(format!("<{}>{}: {}", tag, text, e)))
            }
            "boolean" => match self.text_until_close(tag)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(RpcError::Parse(format!("invalid boolean {:?}", other))),
            },
            "double" => {
                let text = self.text_until_close(tag)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|e| RpcError::Parse(format!("<double>{}: {}", text, e)))
            }
            "string" | "dateTime.iso8601" | "base64" => {
                self.text_until_close(tag).map(Value::String)
            }
            "nil" => {
                self.expect_close("nil")?;
                Ok(Value::Nil)
            }
            "array" => {
                let mut items = Vec::new();
                self.skip_ws();
                match self.bump() {
                    Some(Token::Empty(n)) if n == "data" => {}
                    Some(Token::Open(n)) if n == "data" => loop {
                        self.skip_ws();
                        match self.bump() {
                            Some(Token::Open(n)) if n == "value" => items.push(self.value()?),
                            Some(Token::Close(n)) if n == "data" => break,
                            other => {
                                return Err(RpcError::Parse(format!(
                                    "unexpected {:?} in <data>",
                                    other
                                )));
                            }
                        }
                    },
                    other => {
                        return Err(RpcError::Parse(format!(
                            "expected <data>, found {:?}",
                            other
                        )));
                    }
                }
                self.expect_close("array")?;
                Ok(Value::Array(items))
            }
            "struct" => {
                let mut members = BTreeMap::new();
                loop {
                    self.skip_ws();
                    match self.bump() {
                        Some(Token::Open(n)) if n == "member" => {
                            self.expect_open("name")?;
                            let name = self.text_until_close("name")?;
                            self.expect_open("value")?;
                            let value = self.value()?;
                            self.expect_close("member")?;
                            members.insert(name, value);
                        }
                        Some(Token::Close(n)) if n == "struct" => break,
                        other => {
                            return Err(RpcError::Parse(format!(
                                "unexpected {:?} in <struct>",
                                other
                            )));
                        }
                    }
                }
                Ok(Value::Struct(members))
            }
            other => Err(RpcError::Parse(format!("unsupported type <{}>", other))),
        }
    }
}

/// Parses a `methodResponse`; a `<fault>` becomes `RpcError::Fault`.
pub fn decode_response(body: &str) -> Result<Value, RpcError> {
    let mut cur = Cursor {
        tokens: tokenize(body)?,
        pos: 0,
    };
    cur.expect_open("methodResponse")?;
    cur.skip_ws();
    match cur.bump() {
        Some(Token::Open(n)) if n == "params" => {
            cur.expect_open("param")?;
            cur.expect_open("value")?;
            let v = cur.value()?;
            cur.expect_close("param")?;
            cur.expect_close("params")?;
            Ok(v)
        }
        Some(Token::Open(n)) if n == "fault" => {
            cur.expect_open("value")?;
            let v = cur.value()?;
            let code = v.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
            let message = v
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Err(RpcError::Fault { code, message })
        }
        other => Err(RpcError::Parse(format!(
            "expected <params> or <fault>, found {:?}",
            other
        ))),
    }
}

/// HTTP transport for one endpoint. Basic-auth credentials are attached to every call.
pub struct XmlRpcClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl XmlRpcClient {
    /// Builds the transport only; no request is made until the first call.
    pub fn new(
        url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    #[instrument(skip(self, params), fields(url = %self.url))]
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let mut req = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(encode_call(method, params));
        if !self.username.is_empty() {
            req = req.basic_auth(&self.username, Some(&self.password));
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        decode_response(&body)
    }
}
