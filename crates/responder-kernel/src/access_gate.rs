//! [`ResponseGate`] – single interception point between the console and the
//! endpoint API.
//!
//! Before a typed console line becomes an [`ActionRequest`], it must pass
//! through [`ResponseGate::submit`].  This method enforces **two independent
//! checks** in order:
//!
//! 1. **Authorization** ([`authorize`]): the endpoint must advertise the
//!    command's [`CapabilityTag`][responder_types::CapabilityTag] and the
//!    operator must hold its [`Permission`][responder_types::Permission].
//!    Both failures are reported together in one [`AuthorizationError`].
//!
//! 2. **Argument validation** ([`validate_arguments`]): the parsed arguments
//!    must satisfy the command's schema.  The first violation returns a
//!    [`ValidationError`][responder_types::ValidationError].
//!
//! Only when both checks pass is an [`ActionRequest`] produced.
//!
//! # Example
//!
//! ```
//! use responder_kernel::ResponseGate;
//! use responder_types::{CapabilitySet, ConsoleError, FeatureFlags, PermissionSet};
//!
//! let gate = ResponseGate::new(
//!     "endpoint-1",
//!     CapabilitySet::from_strings(["kill_process"]),
//!     PermissionSet::all(),
//!     FeatureFlags::default(),
//! );
//!
//! // Authorized + valid → request.
//! let request = gate.submit("kill-process --pid 123").unwrap();
//! assert_eq!(request.action, "kill-process");
//!
//! // Endpoint lacks the capability → denied.
//! assert!(matches!(
//!     gate.submit("isolate"),
//!     Err(ConsoleError::Authorization(_))
//! ));
//! ```

use responder_types::{
    ActionRequest, AuthorizationError, CapabilitySet, ConsoleError, DenialReason, FeatureFlags,
    ParameterValue, PermissionSet,
};
use tracing::{debug, info, warn};

use crate::arguments::{ArgumentKind, validate_arguments};
use crate::catalog::CommandTemplate;
use crate::parser::{ParsedCommand, parse_command_line};
use crate::registry::{CommandRegistry, build_registry};

/// Check `command` against a capability/permission snapshot.
///
/// # Errors
///
/// [`AuthorizationError`] carrying [`DenialReason::UpgradeRequired`] when the
/// capability is missing, [`DenialReason::InsufficientPrivileges`] when the
/// permission is missing, or both in that order.
pub fn authorize(
    command: &CommandTemplate,
    capabilities: &CapabilitySet,
    permissions: &PermissionSet,
) -> Result<(), AuthorizationError> {
    let mut reasons = Vec::new();
    if let Some(tag) = command.capability
        && !capabilities.supports(tag)
    {
        reasons.push(DenialReason::UpgradeRequired);
    }
    if !permissions.allows(command.permission) {
        reasons.push(DenialReason::InsufficientPrivileges);
    }
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(AuthorizationError {
            command: command.name.to_string(),
            reasons,
        })
    }
}

/// The gateway every console submission goes through for one endpoint
/// session.
pub struct ResponseGate {
    endpoint_id: String,
    capabilities: CapabilitySet,
    permissions: PermissionSet,
    registry: CommandRegistry,
}

impl ResponseGate {
    /// Build the session registry and wrap it together with its snapshot.
    pub fn new(
        endpoint_id: impl Into<String>,
        capabilities: CapabilitySet,
        permissions: PermissionSet,
        features: FeatureFlags,
    ) -> Self {
        let registry = build_registry(&capabilities, &permissions, &features);
        Self {
            endpoint_id: endpoint_id.into(),
            capabilities,
            permissions,
            registry,
        }
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Parse, authorize and validate one console line.
    ///
    /// # Errors
    ///
    /// - [`ConsoleError::Validation`] – the line does not parse, or its
    ///   arguments break the command's schema.
    /// - [`ConsoleError::UnknownCommand`] – no such command this session.
    /// - [`ConsoleError::Authorization`] – capability or permission missing.
    pub fn submit(&self, line: &str) -> Result<ActionRequest, ConsoleError> {
        let parsed = parse_command_line(line)?;
        self.dispatch(&parsed)
    }

    /// Authorize and validate an already-parsed command.
    pub fn dispatch(&self, parsed: &ParsedCommand) -> Result<ActionRequest, ConsoleError> {
        let command = self
            .registry
            .get(&parsed.name)
            .ok_or_else(|| ConsoleError::UnknownCommand(parsed.name.clone()))?;
        let template = command.template();

        if let Err(err) = authorize(template, &self.capabilities, &self.permissions) {
            warn!(
                endpoint_id = %self.endpoint_id,
                command = template.name,
                reasons = ?err.reasons,
                "response action denied"
            );
            return Err(err.into());
        }

        if let Err(err) = validate_arguments(template, parsed) {
            debug!(
                command = template.name,
                argument = ?err.argument,
                error = %err,
                "response action arguments rejected"
            );
            return Err(err.into());
        }

        let request = build_request(&self.endpoint_id, template, parsed);
        info!(
            endpoint_id = %request.endpoint_id,
            command = %request.command,
            request_id = %request.id,
            "response action accepted"
        );
        Ok(request)
    }
}

/// Turn a validated command into an [`ActionRequest`].  `--comment` is lifted
/// to the request; every other argument becomes a typed parameter.
fn build_request(
    endpoint_id: &str,
    template: &CommandTemplate,
    parsed: &ParsedCommand,
) -> ActionRequest {
    let mut request = ActionRequest::new(endpoint_id, template.name, template.action);
    request.comment = parsed.first_value("comment").map(str::to_string);

    for spec in template.args.iter().filter(|s| s.name != "comment") {
        if !parsed.has(spec.name) {
            continue;
        }
        let value = match spec.kind {
            ArgumentKind::Flag => ParameterValue::Flag(true),
            ArgumentKind::Value => {
                let values: Vec<&str> = parsed
                    .occurrences(spec.name)
                    .filter_map(|arg| arg.value.as_deref())
                    .map(str::trim)
                    .collect();
                if spec.allow_multiple {
                    ParameterValue::List(values.into_iter().map(str::to_string).collect())
                } else {
                    let Some(&raw) = values.first() else {
                        continue;
                    };
                    spec.rules
                        .iter()
                        .find_map(|rule| rule.to_parameter(raw))
                        .unwrap_or_else(|| ParameterValue::Text(raw.to_string()))
                }
            }
        };
        request.parameters.insert(parameter_key(spec.name), value);
    }
    request
}

/// `entityId` → `entity_id`.
fn parameter_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            key.push('_');
            key.push(ch.to_ascii_lowercase());
        } else {
            key.push(ch);
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ArgumentSpec;
    use crate::catalog::master_catalog;
    use responder_types::{CapabilityTag, Permission};

    fn template(name: &str) -> CommandTemplate {
        master_catalog()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap()
    }

    fn open_gate() -> ResponseGate {
        ResponseGate::new(
            "ep-1",
            CapabilitySet::all(),
            PermissionSet::all(),
            FeatureFlags::default(),
        )
    }

    // ------------------------------------------------------------------ authorize

    #[test]
    fn capability_present_permission_denied_reports_privileges_only() {
        for t in master_catalog() {
            let err = authorize(&t, &CapabilitySet::all(), &PermissionSet::none()).unwrap_err();
            assert_eq!(err.reasons, vec![DenialReason::InsufficientPrivileges], "{}", t.name);
        }
    }

    #[test]
    fn capability_absent_always_reports_upgrade() {
        for t in master_catalog() {
            for perms in [PermissionSet::all(), PermissionSet::none()] {
                let err = authorize(&t, &CapabilitySet::new(), &perms).unwrap_err();
                assert!(err.has(DenialReason::UpgradeRequired), "{}", t.name);
            }
        }
    }

    #[test]
    fn both_missing_concatenates_messages() {
        let err = authorize(
            &template("kill-process"),
            &CapabilitySet::new(),
            &PermissionSet::none(),
        )
        .unwrap_err();
        assert_eq!(
            err.reasons,
            vec![
                DenialReason::UpgradeRequired,
                DenialReason::InsufficientPrivileges
            ]
        );
        let upgrade = DenialReason::UpgradeRequired.message("kill-process");
        let privileges = DenialReason::InsufficientPrivileges.message("kill-process");
        assert_eq!(err.to_string(), format!("{upgrade} {privileges}"));
    }

    #[test]
    fn granted_and_supported_is_authorized() {
        let caps = CapabilitySet::from_strings(["isolation"]);
        let mut perms = PermissionSet::none();
        perms.grant(Permission::ReleaseHost);
        assert!(authorize(&template("release"), &caps, &perms).is_ok());
    }

    #[test]
    fn no_capability_requirement_only_checks_permission() {
        let mut t = template("isolate");
        t.capability = None;
        assert!(authorize(&t, &CapabilitySet::new(), &PermissionSet::all()).is_ok());
        let err = authorize(&t, &CapabilitySet::new(), &PermissionSet::none()).unwrap_err();
        assert_eq!(err.reasons, vec![DenialReason::InsufficientPrivileges]);
    }

    // ------------------------------------------------------------------ gate

    #[test]
    fn kill_process_by_pid_builds_numeric_parameter() {
        let request = open_gate()
            .submit(r#"kill-process --pid 123 --comment "runaway""#)
            .unwrap();
        assert_eq!(request.endpoint_id, "ep-1");
        assert_eq!(request.comment.as_deref(), Some("runaway"));
        assert_eq!(request.parameters.get("pid"), Some(&ParameterValue::Number(123)));
    }

    #[test]
    fn kill_process_by_entity_id_uses_snake_case_key() {
        let request = open_gate().submit("kill-process --entityId abc-1").unwrap();
        assert_eq!(
            request.parameters.get("entity_id"),
            Some(&ParameterValue::Text("abc-1".to_string()))
        );
    }

    #[test]
    fn kill_process_with_both_targets_is_rejected() {
        let err = open_gate()
            .submit("kill-process --pid 123 --entityId abc")
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn release_dispatches_unisolate_action() {
        let request = open_gate().submit("release").unwrap();
        assert_eq!(request.command, "release");
        assert_eq!(request.action, "unisolate");
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn upload_overwrite_flag_becomes_boolean() {
        let request = open_gate()
            .submit("upload --file fix.sh --overwrite")
            .unwrap();
        assert_eq!(request.parameters.get("overwrite"), Some(&ParameterValue::Flag(true)));
        assert_eq!(
            request.parameters.get("file"),
            Some(&ParameterValue::Text("fix.sh".to_string()))
        );
    }

    #[test]
    fn execute_timeout_is_validated() {
        let gate = open_gate();
        assert!(gate.submit(r#"execute --command "ls" --timeout 37m"#).is_ok());
        assert!(matches!(
            gate.submit(r#"execute --command "ls" --timeout 37"#),
            Err(ConsoleError::Validation(_))
        ));
    }

    #[test]
    fn authorization_runs_before_validation() {
        let gate = ResponseGate::new(
            "ep-1",
            CapabilitySet::all(),
            PermissionSet::none(),
            FeatureFlags::default(),
        );
        // Arguments are invalid too, but the denial is what gets reported.
        let err = gate.submit("kill-process --pid 0").unwrap_err();
        assert!(matches!(err, ConsoleError::Authorization(_)));
    }

    #[test]
    fn disabled_command_is_refused_with_upgrade_reason() {
        let caps: CapabilitySet = CapabilityTag::ALL
            .into_iter()
            .filter(|t| *t != CapabilityTag::GetFile)
            .collect();
        let gate = ResponseGate::new("ep-1", caps, PermissionSet::all(), FeatureFlags::default());
        match gate.submit("get-file --path /etc/passwd") {
            Err(ConsoleError::Authorization(err)) => {
                assert_eq!(err.reasons, vec![DenialReason::UpgradeRequired]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_and_feature_gated_commands_are_unknown() {
        let gate = open_gate();
        assert_eq!(
            gate.submit("reboot"),
            Err(ConsoleError::UnknownCommand("reboot".to_string()))
        );
        // Scan is off by default.
        assert!(matches!(
            gate.submit("scan --path /tmp"),
            Err(ConsoleError::UnknownCommand(_))
        ));
    }

    #[test]
    fn unparseable_line_is_a_validation_error() {
        assert!(matches!(
            open_gate().submit(""),
            Err(ConsoleError::Validation(_))
        ));
    }

    #[test]
    fn repeatable_argument_becomes_list() {
        let template = CommandTemplate {
            name: "tag-host",
            action: "tag-host",
            about: "label the host",
            capability: None,
            permission: Permission::IsolateHost,
            feature: None,
            args: vec![
                ArgumentSpec::value("tag", "label").multiple(),
                ArgumentSpec::value("comment", "note"),
            ],
            example: None,
        };
        let parsed =
            parse_command_line("tag-host --tag alpha --tag ' beta ' --comment hi").unwrap();
        assert!(validate_arguments(&template, &parsed).is_ok());

        let request = build_request("ep-1", &template, &parsed);
        assert_eq!(
            request.parameters.get("tag"),
            Some(&ParameterValue::List(vec!["alpha".to_string(), "beta".to_string()]))
        );
        assert_eq!(request.comment.as_deref(), Some("hi"));
        assert!(!request.parameters.contains_key("comment"));
    }

    #[test]
    fn parameter_key_converts_camel_case() {
        assert_eq!(parameter_key("entityId"), "entity_id");
        assert_eq!(parameter_key("pid"), "pid");
    }
}
