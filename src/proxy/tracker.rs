use crate::command::DbCommand;
use crate::core::Result;
use crate::telemetry::{COMMAND_TEXT_PROPERTY, DependencyTelemetry, ExecutionKind, TelemetryClient};
use chrono::Utc;
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Run `execute` against `command` and report it as one dependency call.
///
/// With telemetry disabled the call goes straight through. Otherwise exactly
/// one record is emitted once `execute` finishes, whether it returned a
/// value, returned an error or panicked; the outcome is then handed back
/// untouched.
pub(crate) fn track_dependency<T, F>(
    telemetry: &TelemetryClient,
    command: &mut dyn DbCommand,
    kind: ExecutionKind,
    execute: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn DbCommand) -> Result<T>,
{
    if !telemetry.is_enabled() {
        return execute(command);
    }

    let start_time = Utc::now();
    let timer = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&mut *command)));
    let elapsed = timer.elapsed();
    let success = matches!(outcome, Ok(Ok(_)));

    let details = command_details(&*command, telemetry.max_details_length());
    let record = DependencyTelemetry::new(command.type_name(), kind, start_time, elapsed, success)
        .with_property(COMMAND_TEXT_PROPERTY, details);
    telemetry.track_dependency(record);

    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Command text, a blank line, then `name = value` for every parameter
pub(crate) fn command_details(command: &dyn DbCommand, max_length: Option<usize>) -> String {
    let mut details = String::with_capacity(command.command_text().len() + 2);
    details.push_str(command.command_text());
    details.push_str("\n\n");

    for parameter in command.parameters() {
        let _ = writeln!(details, "{}", parameter);
    }

    if let Some(max) = max_length {
        if let Some((cut, _)) = details.char_indices().nth(max) {
            details.truncate(cut);
        }
    }

    details
}
