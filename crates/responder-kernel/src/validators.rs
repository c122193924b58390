//! Value rules for console arguments.
//!
//! Each [`ValueRule`] inspects one raw argument value and either accepts it or
//! returns a user-facing message.  Rules are attached to an
//! [`ArgumentSpec`][crate::arguments::ArgumentSpec] and run in insertion
//! order; the first failure wins.
//!
//! Three built-in rules are provided:
//! - [`NonEmpty`] – rejects values that are blank after trimming.
//! - [`Pid`] – accepts a positive integer process id.
//! - [`TimeoutDuration`] – accepts `<positive integer><unit>` with unit one of
//!   `h`, `m` or `s`.

use std::fmt;
use std::time::Duration;

use responder_types::ParameterValue;

pub const EMPTY_MESSAGE: &str = "Argument cannot be empty";
pub const PID_MESSAGE: &str = "Argument must be a positive number representing the PID of a process";
pub const DURATION_MESSAGE: &str =
    "Argument must be a positive integer followed by a unit of time (h, m or s), for example 37m";

// ────────────────────────────────────────────────────────────────────────────
// ValueRule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single constraint on an argument value.
pub trait ValueRule: fmt::Debug + Send + Sync {
    /// Short identifier, logged when the rule rejects a value.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `value` is acceptable, or the message to show the
    /// operator.
    fn check(&self, value: &str) -> Result<(), String>;

    /// Typed form of an accepted value, when the rule implies one.
    fn to_parameter(&self, _value: &str) -> Option<ParameterValue> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmpty;

impl ValueRule for NonEmpty {
    fn name(&self) -> &str {
        "non_empty"
    }

    fn check(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err(EMPTY_MESSAGE.to_string())
        } else {
            Ok(())
        }
    }
}

/// Accepts a process id: ASCII digits only, greater than zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pid;

impl ValueRule for Pid {
    fn name(&self) -> &str {
        "pid"
    }

    fn check(&self, value: &str) -> Result<(), String> {
        parse_pid(value).map(|_| ())
    }

    fn to_parameter(&self, value: &str) -> Option<ParameterValue> {
        parse_pid(value).ok().map(ParameterValue::Number)
    }
}

/// Accepts an execution timeout such as `37m`, `2s` or `4h`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutDuration;

impl ValueRule for TimeoutDuration {
    fn name(&self) -> &str {
        "duration"
    }

    fn check(&self, value: &str) -> Result<(), String> {
        parse_duration(value).map(|_| ())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsers
// ────────────────────────────────────────────────────────────────────────────

/// Parse a positive PID.
///
/// ```
/// use responder_kernel::validators::parse_pid;
///
/// assert_eq!(parse_pid("123"), Ok(123));
/// assert!(parse_pid("0").is_err());
/// assert!(parse_pid("-5").is_err());
/// ```
pub fn parse_pid(value: &str) -> Result<u64, String> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PID_MESSAGE.to_string());
    }
    match digits.parse::<u64>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(PID_MESSAGE.to_string()),
    }
}

/// Parse `<positive integer><unit>` into a [`Duration`].
///
/// ```
/// use std::time::Duration;
/// use responder_kernel::validators::parse_duration;
///
/// assert_eq!(parse_duration("37m"), Ok(Duration::from_secs(37 * 60)));
/// assert!(parse_duration("37").is_err());
/// ```
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        return Err(DURATION_MESSAGE.to_string());
    };
    let scale: u64 = match unit {
        'h' => 3600,
        'm' => 60,
        's' => 1,
        _ => return Err(DURATION_MESSAGE.to_string()),
    };
    let amount = &value[..value.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DURATION_MESSAGE.to_string());
    }
    amount
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| n.checked_mul(scale))
        .map(Duration::from_secs)
        .ok_or_else(|| DURATION_MESSAGE.to_string())
}
