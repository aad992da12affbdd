// Serializers - turn a LogEvent into the bytes a target stores

use crate::event::{display_value, LogEvent};
use serde_json::{Map, Value};

/// Encodes events for a target.
///
/// Returning `None` drops the event for that layout only; it is not an error.
/// The event may be shared with other layouts and must not be modified.
pub trait Serializer: Send + Sync {
    fn encode(&self, event: &LogEvent) -> Option<Vec<u8>>;
}

/// Single-line text format:
/// `[LEVEL] time @Name:name @Message:message[ @StackTrace:trace][ @key:value]*`
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSerializer;

impl Serializer for PlainSerializer {
    fn encode(&self, event: &LogEvent) -> Option<Vec<u8>> {
        let message = event.render_message();
        let mut line = String::with_capacity(64 + message.len());

        line.push('[');
        line.push_str(&event.level_desc);
        line.push_str("] ");
        line.push_str(&event.time);
        line.push_str(" @Name:");
        line.push_str(&event.name);
        line.push_str(" @Message:");
        push_escaped(&mut line, &message);

        if let Some(stack_trace) = &event.stack_trace {
            line.push_str(" @StackTrace:");
            push_escaped(&mut line, stack_trace);
        }

        for (key, value) in &event.properties {
            line.push_str(" @");
            line.push_str(key);
            line.push(':');
            push_escaped(&mut line, &display_value(value));
        }

        Some(line.into_bytes())
    }
}

/// Keep one event on one physical line
fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// One JSON object per event with properties flattened next to the core fields
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode(&self, event: &LogEvent) -> Option<Vec<u8>> {
        // Local copy: the event's own properties are shared with other layouts
        let mut record: Map<String, Value> = event
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        record.insert("level".to_string(), Value::from(event.level_desc.as_str()));
        record.insert("name".to_string(), Value::from(event.name.as_str()));
        record.insert("message".to_string(), Value::from(event.render_message()));
        record.insert("time".to_string(), Value::from(event.time.as_str()));
        if let Some(stack_trace) = &event.stack_trace {
            record.insert("stack_trace".to_string(), Value::from(stack_trace.as_str()));
        }

        match serde_json::to_vec(&record) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(name = %event.name, error = %e, "JSON encoding failed, event dropped");
                None
            }
        }
    }
}
