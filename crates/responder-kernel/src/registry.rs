//! [`CommandRegistry`] – the per-session view of the console catalog.
//!
//! [`build_registry`] takes the endpoint's [`CapabilitySet`], the operator's
//! [`PermissionSet`] and the session's [`FeatureFlags`] and annotates every
//! [`CommandTemplate`] from [`master_catalog`]:
//!
//! - a template whose feature flag is off is left out entirely;
//! - a command the operator has no permission for is **hidden** (it stays in
//!   the registry so typing it still yields a precise denial);
//! - a command whose capability the endpoint lacks is **disabled** but
//!   visible, with an upgrade-required help text.
//!
//! The registry is immutable once built.  When the snapshot changes, build a
//! new one.

use responder_types::{
    CapabilitySet, CommandDescriptor, DenialReason, FeatureFlags, PermissionSet,
};
use tracing::debug;

use crate::catalog::{CommandTemplate, master_catalog};

/// A [`CommandTemplate`] annotated for one session.
#[derive(Debug, Clone)]
pub struct Command {
    template: CommandTemplate,
    hidden: bool,
    disabled_reason: Option<String>,
}

impl Command {
    /// Annotate `template` against a capability/permission snapshot.
    pub fn annotate(
        template: CommandTemplate,
        capabilities: &CapabilitySet,
        permissions: &PermissionSet,
    ) -> Self {
        let hidden = !permissions.allows(template.permission);
        let disabled_reason = match template.capability {
            Some(tag) if !capabilities.supports(tag) => {
                Some(DenialReason::UpgradeRequired.message(template.name))
            }
            _ => None,
        };
        Self {
            template,
            hidden,
            disabled_reason,
        }
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_reason.is_some()
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    /// Rendering-layer view of this command.
    pub fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor {
            name: self.template.name.to_string(),
            about: self.template.about.to_string(),
            usage: self.template.usage(),
            example: self.template.example.map(str::to_string),
            hidden: self.hidden,
            disabled: self.is_disabled(),
            help_text: self
                .disabled_reason
                .clone()
                .unwrap_or_else(|| self.template.about.to_string()),
        }
    }
}

/// Ordered, immutable set of [`Command`]s for one session.
///
/// # Example
///
/// ```
/// use responder_kernel::registry::build_registry;
/// use responder_types::{CapabilitySet, FeatureFlags, Permission, PermissionSet};
///
/// let caps = CapabilitySet::from_strings(["isolation"]);
/// let mut perms = PermissionSet::none();
/// perms.grant(Permission::IsolateHost);
///
/// let registry = build_registry(&caps, &perms, &FeatureFlags::default());
///
/// let isolate = registry.get("isolate").unwrap();
/// assert!(!isolate.is_hidden() && !isolate.is_disabled());
///
/// // No permission → hidden.
/// assert!(registry.get("release").unwrap().is_hidden());
/// // Scan is feature-flagged off by default → absent.
/// assert!(registry.get("scan").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|cmd| cmd.name() == name)
    }

    /// Every command, hidden ones included, in catalog order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Commands a rendering layer should list.
    pub fn visible(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|cmd| !cmd.is_hidden())
    }

    pub fn descriptors(&self) -> Vec<CommandDescriptor> {
        self.commands.iter().map(Command::descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Build the session registry from the master catalog.
pub fn build_registry(
    capabilities: &CapabilitySet,
    permissions: &PermissionSet,
    features: &FeatureFlags,
) -> CommandRegistry {
    build_registry_from(master_catalog(), capabilities, permissions, features)
}

/// Build a registry from an explicit template list, keeping its order.
pub fn build_registry_from(
    templates: Vec<CommandTemplate>,
    capabilities: &CapabilitySet,
    permissions: &PermissionSet,
    features: &FeatureFlags,
) -> CommandRegistry {
    let commands: Vec<Command> = templates
        .into_iter()
        .filter(|t| t.feature.is_none_or(|f| features.is_enabled(f)))
        .map(|t| Command::annotate(t, capabilities, permissions))
        .collect();

    debug!(
        total = commands.len(),
        hidden = commands.iter().filter(|c| c.is_hidden()).count(),
        disabled = commands.iter().filter(|c| c.is_disabled()).count(),
        "command registry built"
    );

    CommandRegistry { commands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use responder_types::{CapabilityTag, Feature, Permission};

    fn all_features() -> FeatureFlags {
        FeatureFlags {
            upload_enabled: true,
            execute_enabled: true,
            scan_enabled: true,
        }
    }

    fn names(registry: &CommandRegistry) -> Vec<&'static str> {
        registry.commands().iter().map(Command::name).collect()
    }

    #[test]
    fn full_snapshot_exposes_everything() {
        let registry = build_registry(
            &CapabilitySet::all(),
            &PermissionSet::all(),
            &all_features(),
        );
        assert_eq!(registry.len(), master_catalog().len());
        assert_eq!(registry.visible().count(), registry.len());
        assert!(registry.commands().iter().all(|c| !c.is_disabled()));
    }

    #[test]
    fn registry_keeps_catalog_order() {
        let registry = build_registry(
            &CapabilitySet::all(),
            &PermissionSet::all(),
            &all_features(),
        );
        let expected: Vec<_> = master_catalog().iter().map(|t| t.name).collect();
        assert_eq!(names(&registry), expected);
    }

    #[test]
    fn build_is_deterministic() {
        let caps = CapabilitySet::from_strings(["isolation", "get_file"]);
        let perms = PermissionSet::all();
        let a = build_registry(&caps, &perms, &FeatureFlags::default()).descriptors();
        let b = build_registry(&caps, &perms, &FeatureFlags::default()).descriptors();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_capability_disables_but_keeps_visible() {
        let caps = CapabilitySet::from_strings(["isolation"]);
        let registry = build_registry(&caps, &PermissionSet::all(), &all_features());

        let kill = registry.get("kill-process").unwrap();
        assert!(kill.is_disabled());
        assert!(!kill.is_hidden());
        assert!(kill.disabled_reason().unwrap().contains("Upgrade"));

        let descriptor = kill.descriptor();
        assert!(descriptor.disabled);
        assert_eq!(descriptor.help_text, kill.disabled_reason().unwrap());
    }

    #[test]
    fn missing_permission_hides() {
        let mut perms = PermissionSet::all();
        perms.revoke(Permission::KillProcess);
        let registry = build_registry(&CapabilitySet::all(), &perms, &all_features());

        let kill = registry.get("kill-process").unwrap();
        assert!(kill.is_hidden());
        assert!(!kill.is_disabled());
        assert!(registry.visible().all(|c| c.name() != "kill-process"));
    }

    #[test]
    fn missing_both_hides() {
        let mut perms = PermissionSet::all();
        perms.revoke(Permission::SuspendProcess);
        let caps: CapabilitySet = CapabilityTag::ALL
            .into_iter()
            .filter(|t| *t != CapabilityTag::SuspendProcess)
            .collect();
        let registry = build_registry(&caps, &perms, &all_features());

        let suspend = registry.get("suspend-process").unwrap();
        assert!(suspend.is_hidden());
        assert!(suspend.is_disabled());
        assert!(suspend.descriptor().hidden);
    }

    #[test]
    fn disabled_feature_omits_command() {
        let flags = FeatureFlags {
            upload_enabled: false,
            execute_enabled: true,
            scan_enabled: false,
        };
        let registry = build_registry(&CapabilitySet::all(), &PermissionSet::all(), &flags);
        assert!(registry.get("upload").is_none());
        assert!(registry.get("scan").is_none());
        assert!(registry.get("execute").is_some());
        assert!(!flags.is_enabled(Feature::Upload));
    }

    #[test]
    fn command_without_capability_is_never_disabled() {
        let mut template = master_catalog().remove(0);
        template.capability = None;
        let cmd = Command::annotate(template, &CapabilitySet::new(), &PermissionSet::all());
        assert!(!cmd.is_disabled());
        assert_eq!(cmd.descriptor().help_text, cmd.template().about);
    }

    #[test]
    fn empty_template_list_builds_empty_registry() {
        let registry = build_registry_from(
            Vec::new(),
            &CapabilitySet::all(),
            &PermissionSet::all(),
            &FeatureFlags::default(),
        );
        assert!(registry.is_empty());
        assert!(registry.descriptors().is_empty());
    }
}
