//! Argument schemas and [`validate_arguments`].
//!
//! A [`CommandTemplate`] declares one [`ArgumentSpec`] per accepted
//! `--argument`.  [`validate_arguments`] checks a [`ParsedCommand`] against
//! that schema and stops at the first problem; errors are never aggregated.
//!
//! Checks run in this order:
//!
//! 1. unknown arguments,
//! 2. the exclusive-or group (exactly one member must be present),
//! 3. per argument, in schema order: required, multiplicity, flag/value
//!    shape, then each [`ValueRule`] in turn.

use responder_types::ValidationError;
use tracing::debug;

use crate::catalog::CommandTemplate;
use crate::parser::ParsedCommand;
use crate::validators::{NonEmpty, ValueRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Present or absent, never carries a value (`--overwrite`).
    Flag,
    /// Must carry a value (`--pid 123`).
    Value,
}

/// Constraints on a single `--argument`.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub about: &'static str,
    pub kind: ArgumentKind,
    pub required: bool,
    pub allow_multiple: bool,
    /// Member of the command's exclusive-or group.
    pub exclusive_or: bool,
    pub rules: Vec<&'static dyn ValueRule>,
}

impl ArgumentSpec {
    /// An optional argument that takes a value.
    pub fn value(name: &'static str, about: &'static str) -> Self {
        Self {
            name,
            about,
            kind: ArgumentKind::Value,
            required: false,
            allow_multiple: false,
            exclusive_or: false,
            rules: Vec::new(),
        }
    }

    /// An optional valueless flag.
    pub fn flag(name: &'static str, about: &'static str) -> Self {
        Self {
            kind: ArgumentKind::Flag,
            ..Self::value(name, about)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn exclusive_or(mut self) -> Self {
        self.exclusive_or = true;
        self
    }

    pub fn rule(mut self, rule: &'static dyn ValueRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// `--pid <value>` or `--overwrite`.
    pub fn usage(&self) -> String {
        match self.kind {
            ArgumentKind::Flag => format!("--{}", self.name),
            ArgumentKind::Value => format!("--{} <value>", self.name),
        }
    }
}

/// Validate `supplied` against the argument schema of `command`.
///
/// # Example
///
/// ```
/// use responder_kernel::arguments::validate_arguments;
/// use responder_kernel::catalog::master_catalog;
/// use responder_kernel::parser::parse_command_line;
///
/// let catalog = master_catalog();
/// let kill = catalog.iter().find(|c| c.name == "kill-process").unwrap();
///
/// let ok = parse_command_line("kill-process --pid 123").unwrap();
/// assert!(validate_arguments(kill, &ok).is_ok());
///
/// let both = parse_command_line("kill-process --pid 123 --entityId abc").unwrap();
/// assert!(validate_arguments(kill, &both).is_err());
/// ```
pub fn validate_arguments(
    command: &CommandTemplate,
    supplied: &ParsedCommand,
) -> Result<(), ValidationError> {
    let name = command.name;

    if let Some(unknown) = supplied
        .args
        .iter()
        .find(|arg| command.argument(&arg.name).is_none())
    {
        return Err(ValidationError::for_argument(
            name,
            &unknown.name,
            format!("Unsupported argument: --{}", unknown.name),
        ));
    }

    check_exclusive_group(command, supplied)?;

    for spec in &command.args {
        let occurrences: Vec<_> = supplied.occurrences(spec.name).collect();
        if occurrences.is_empty() {
            if spec.required {
                return Err(ValidationError::for_argument(
                    name,
                    spec.name,
                    format!("Missing required argument: --{}", spec.name),
                ));
            }
            continue;
        }
        if occurrences.len() > 1 && !spec.allow_multiple {
            return Err(ValidationError::for_argument(
                name,
                spec.name,
                format!("Argument can only be used once: --{}", spec.name),
            ));
        }
        for occurrence in occurrences {
            match (spec.kind, occurrence.value.as_deref()) {
                (ArgumentKind::Flag, None) => {}
                (ArgumentKind::Flag, Some(_)) => {
                    return Err(ValidationError::for_argument(
                        name,
                        spec.name,
                        format!("Argument --{} does not take a value", spec.name),
                    ));
                }
                (ArgumentKind::Value, None) => {
                    return Err(ValidationError::for_argument(
                        name,
                        spec.name,
                        format!("Argument --{} must have a value", spec.name),
                    ));
                }
                (ArgumentKind::Value, Some(value)) => check_value(name, spec, value)?,
            }
        }
    }

    Ok(())
}

fn check_exclusive_group(
    command: &CommandTemplate,
    supplied: &ParsedCommand,
) -> Result<(), ValidationError> {
    let group: Vec<&ArgumentSpec> = command.args.iter().filter(|a| a.exclusive_or).collect();
    if group.is_empty() {
        return Ok(());
    }
    let present = group.iter().filter(|spec| supplied.has(spec.name)).count();
    if present == 1 {
        return Ok(());
    }
    let names = group
        .iter()
        .map(|spec| format!("--{}", spec.name))
        .collect::<Vec<_>>()
        .join(", ");
    let message = if present == 0 {
        format!("Exactly one of {names} must be provided")
    } else {
        format!("Only one of {names} may be provided")
    };
    Err(ValidationError::for_command(command.name, message))
}

fn check_value(command: &str, spec: &ArgumentSpec, value: &str) -> Result<(), ValidationError> {
    // Required values must survive trimming even without an explicit rule.
    let implicit: Option<&'static dyn ValueRule> = spec.required.then_some(&NonEmpty);
    for rule in implicit.into_iter().chain(spec.rules.iter().copied()) {
        if let Err(message) = rule.check(value) {
            debug!(
                command = command,
                argument = spec.name,
                rule = rule.name(),
                "value rule failed"
            );
            return Err(ValidationError::for_argument(
                command,
                spec.name,
                format!("Invalid argument --{}: {message}", spec.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_command_line;
    use crate::validators::{Pid, TimeoutDuration};
    use responder_types::{CapabilityTag, Permission};

    fn template(args: Vec<ArgumentSpec>) -> CommandTemplate {
        CommandTemplate {
            name: "sample",
            action: "sample",
            about: "test command",
            capability: Some(CapabilityTag::KillProcess),
            permission: Permission::KillProcess,
            feature: None,
            args,
            example: None,
        }
    }

    fn check(command: &CommandTemplate, line: &str) -> Result<(), ValidationError> {
        validate_arguments(command, &parse_command_line(line).unwrap())
    }

    fn target_template() -> CommandTemplate {
        template(vec![
            ArgumentSpec::value("pid", "process id").exclusive_or().rule(&Pid),
            ArgumentSpec::value("entityId", "entity id")
                .exclusive_or()
                .rule(&NonEmpty),
            ArgumentSpec::value("comment", "note"),
        ])
    }

    // ------------------------------------------------------------------ exclusive-or

    #[test]
    fn exclusive_or_accepts_exactly_one() {
        let cmd = target_template();
        assert!(check(&cmd, "sample --pid 123").is_ok());
        assert!(check(&cmd, "sample --entityId abc-123").is_ok());
    }

    #[test]
    fn exclusive_or_rejects_both() {
        let cmd = target_template();
        let err = check(&cmd, "sample --pid 123 --entityId abc").unwrap_err();
        assert_eq!(err.message, "Only one of --pid, --entityId may be provided");
    }

    #[test]
    fn exclusive_or_rejects_neither() {
        let cmd = target_template();
        let err = check(&cmd, "sample --comment hi").unwrap_err();
        assert_eq!(err.message, "Exactly one of --pid, --entityId must be provided");
    }

    #[test]
    fn exclusive_or_rejects_same_member_twice() {
        let cmd = target_template();
        let err = check(&cmd, "sample --pid 1 --pid 2").unwrap_err();
        assert!(err.message.contains("only be used once"));
    }

    // ------------------------------------------------------------------ required / shape

    #[test]
    fn missing_required_argument() {
        let cmd = template(vec![ArgumentSpec::value("path", "file path").required()]);
        let err = check(&cmd, "sample").unwrap_err();
        assert_eq!(err.message, "Missing required argument: --path");
        assert_eq!(err.argument.as_deref(), Some("path"));
    }

    #[test]
    fn required_value_must_be_non_blank() {
        let cmd = template(vec![ArgumentSpec::value("path", "file path").required()]);
        let err = check(&cmd, r#"sample --path "   ""#).unwrap_err();
        assert!(err.message.contains("Argument cannot be empty"));
    }

    #[test]
    fn optional_value_may_be_blank() {
        let cmd = template(vec![ArgumentSpec::value("comment", "note")]);
        assert!(check(&cmd, r#"sample --comment """#).is_ok());
    }

    #[test]
    fn unknown_argument_is_rejected_first() {
        let cmd = template(vec![ArgumentSpec::value("path", "file path").required()]);
        let err = check(&cmd, "sample --bogus").unwrap_err();
        assert_eq!(err.message, "Unsupported argument: --bogus");
    }

    #[test]
    fn flag_rejects_value() {
        let cmd = template(vec![ArgumentSpec::flag("overwrite", "replace")]);
        assert!(check(&cmd, "sample --overwrite").is_ok());
        let err = check(&cmd, "sample --overwrite yes").unwrap_err();
        assert!(err.message.contains("does not take a value"));
    }

    #[test]
    fn value_argument_requires_value() {
        let cmd = template(vec![ArgumentSpec::value("timeout", "limit")]);
        let err = check(&cmd, "sample --timeout").unwrap_err();
        assert_eq!(err.message, "Argument --timeout must have a value");
    }

    #[test]
    fn multiple_allowed_when_declared() {
        let cmd = template(vec![ArgumentSpec::value("tag", "label").multiple()]);
        assert!(check(&cmd, "sample --tag a --tag b").is_ok());
    }

    // ------------------------------------------------------------------ rules

    #[test]
    fn rule_failure_names_the_argument() {
        let cmd = template(vec![
            ArgumentSpec::value("timeout", "limit").rule(&TimeoutDuration),
        ]);
        let err = check(&cmd, "sample --timeout 37").unwrap_err();
        assert!(err.message.starts_with("Invalid argument --timeout:"));
        assert!(check(&cmd, "sample --timeout 37m").is_ok());
    }

    #[test]
    fn first_failing_argument_wins() {
        let cmd = template(vec![
            ArgumentSpec::value("pid", "process id").rule(&Pid),
            ArgumentSpec::value("timeout", "limit").rule(&TimeoutDuration),
        ]);
        // Both are invalid; the schema-order first one is reported.
        let err = check(&cmd, "sample --timeout nope --pid 0").unwrap_err();
        assert_eq!(err.argument.as_deref(), Some("pid"));
    }

    #[test]
    fn usage_renders_kind() {
        assert_eq!(ArgumentSpec::value("pid", "").usage(), "--pid <value>");
        assert_eq!(ArgumentSpec::flag("overwrite", "").usage(), "--overwrite");
    }
}
