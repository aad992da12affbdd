// Event model - severity levels and the immutable log record

use crate::error::{LogError, Result};
use chrono::Local;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Timestamp format used for every event (millisecond precision)
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Structured context attached to an event
pub type Properties = BTreeMap<String, Value>;

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// All levels in ascending severity
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Upper-case tag written into every event
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Whether events at this level carry a full backtrace
    pub fn captures_backtrace(&self) -> bool {
        *self >= Level::Error
    }

    /// Parse a routing bound.
    ///
    /// An empty string, `*` or `Every` is the "every level" sentinel and yields `widest`,
    /// which callers pass as `Trace` for a lower bound and `Fatal` for an upper bound.
    pub fn parse_bound(s: &str, widest: Level) -> Result<Level> {
        let s = s.trim();
        if s.is_empty() || s == "*" || s.eq_ignore_ascii_case("every") {
            return Ok(widest);
        }
        s.parse()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LogError::InvalidConfig(format!("unknown level: {}", s)))
    }
}

/// A single log record.
///
/// Built once by a [`Logger`](crate::logger::Logger) (or by hand) and then shared read-only
/// between every layout it is routed to.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub level_desc: String,
    pub name: String,
    /// Template with `{}` placeholders; `None` renders `args` space-separated
    pub format: Option<String>,
    pub args: Vec<Value>,
    pub stack_trace: Option<String>,
    pub time: String,
    pub properties: Properties,
}

impl LogEvent {
    /// Create an event stamped with the current local time
    pub fn new(level: Level, name: impl Into<String>) -> Self {
        Self {
            level,
            level_desc: level.as_str().to_string(),
            name: name.into(),
            format: None,
            args: Vec::new(),
            stack_trace: None,
            time: Local::now().format(TIME_FORMAT).to_string(),
            properties: Properties::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Render the message text from the format template and arguments.
    ///
    /// Each `{}` consumes the next argument. Placeholders without an argument are kept
    /// literally and surplus arguments are appended, space-separated.
    pub fn render_message(&self) -> String {
        match &self.format {
            Some(format) => render_format(format, &self.args),
            None => self
                .args
                .iter()
                .map(display_value)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn render_format(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut rest = format;

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(&display_value(arg)),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);

    for arg in args {
        out.push(' ');
        out.push_str(&display_value(arg));
    }

    out
}

/// Strings render bare, everything else in JSON notation
pub(crate) fn display_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
