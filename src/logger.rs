// Logger - per-name facade that stamps events and hands them to the manager

use crate::event::{Level, LogEvent, Properties};
use crate::manager::Router;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Named handle for emitting events. Cheap to clone.
///
/// Obtained from [`Manager::get_logger`](crate::manager::Manager::get_logger). Each call
/// records the caller's `file:line`, or a full backtrace from `Error` upwards.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    router: Arc<Router>,
}

macro_rules! level_methods {
    ($($level:ident, $plain:ident, $formatted:ident;)*) => {
        $(
            #[track_caller]
            pub fn $plain<I, V>(&self, args: I)
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                self.emit(Level::$level, None, collect(args), Properties::new());
            }

            #[track_caller]
            pub fn $formatted<I, V>(&self, format: &str, args: I)
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                self.emit(Level::$level, Some(format), collect(args), Properties::new());
            }
        )*
    };
}

impl Logger {
    pub(crate) fn new(name: &str, router: Arc<Router>) -> Self {
        Self {
            name: Arc::from(name),
            router,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    level_methods! {
        Trace, trace, tracef;
        Debug, debug, debugf;
        Info, info, infof;
        Warn, warn, warnf;
        Error, error, errorf;
        Fatal, fatal, fatalf;
    }

    /// Emit at an explicit level
    #[track_caller]
    pub fn log(&self, level: Level, format: Option<&str>, args: Vec<Value>) {
        self.emit(level, format, args, Properties::new());
    }

    /// Emit with structured properties attached
    #[track_caller]
    pub fn log_with_properties(
        &self,
        level: Level,
        format: Option<&str>,
        args: Vec<Value>,
        properties: Properties,
    ) {
        self.emit(level, format, args, properties);
    }

    /// Forward a prebuilt event unchanged
    pub fn write_event(&self, event: LogEvent) {
        self.router.write_event(event);
    }

    #[track_caller]
    fn emit(&self, level: Level, format: Option<&str>, args: Vec<Value>, properties: Properties) {
        let stack_trace = if level.captures_backtrace() {
            Backtrace::force_capture().to_string()
        } else {
            let caller = Location::caller();
            format!("{}:{}", caller.file(), caller.line())
        };

        let mut event = LogEvent::new(level, &*self.name)
            .with_args(args)
            .with_stack_trace(stack_trace)
            .with_properties(properties);
        if let Some(format) = format {
            event = event.with_format(format);
        }

        self.router.write_event(event);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

fn collect<I, V>(args: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    args.into_iter().map(Into::into).collect()
}
