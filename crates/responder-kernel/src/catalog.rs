//! The master list of response console commands.
//!
//! Every command the console knows is declared here as a [`CommandTemplate`]:
//! a plain record of its name, the API action it dispatches as, the endpoint
//! capability and operator permission it needs, an optional feature-flag
//! gate, and its argument schema.  [`build_registry`][crate::registry::build_registry]
//! annotates these templates for one session.
//!
//! | Command | Capability | Permission |
//! |---------|------------|------------|
//! | `isolate` | `isolation` | `IsolateHost` |
//! | `release` | `isolation` | `ReleaseHost` |
//! | `processes` | `running_processes` | `GetRunningProcesses` |
//! | `kill-process` | `kill_process` | `KillProcess` |
//! | `suspend-process` | `suspend_process` | `SuspendProcess` |
//! | `get-file` | `get_file` | `WriteFileOperations` |
//! | `execute` | `execute` | `WriteExecuteOperations` |
//! | `upload` | `upload_file` | `WriteFileOperations` |
//! | `scan` | `scan` | `WriteScanOperations` |

use responder_types::{CapabilityTag, Feature, Permission};

use crate::arguments::ArgumentSpec;
use crate::validators::{NonEmpty, Pid, TimeoutDuration};

/// Static definition of one console command.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    /// Name typed at the console.
    pub name: &'static str,
    /// Action name sent to the endpoint API.
    pub action: &'static str,
    pub about: &'static str,
    pub capability: Option<CapabilityTag>,
    pub permission: Permission,
    /// When set, the command only exists while the feature is enabled.
    pub feature: Option<Feature>,
    pub args: Vec<ArgumentSpec>,
    pub example: Option<&'static str>,
}

impl CommandTemplate {
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.args.iter().find(|spec| spec.name == name)
    }

    /// One-line usage, exclusive-or members first, then required arguments,
    /// then optional ones in brackets.
    ///
    /// ```
    /// use responder_kernel::catalog::master_catalog;
    ///
    /// let catalog = master_catalog();
    /// let kill = catalog.iter().find(|c| c.name == "kill-process").unwrap();
    /// assert_eq!(
    ///     kill.usage(),
    ///     "kill-process --pid <value> | --entityId <value> [--comment <value>]"
    /// );
    /// ```
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.to_string()];

        let group: Vec<String> = self
            .args
            .iter()
            .filter(|spec| spec.exclusive_or)
            .map(|spec| spec.usage())
            .collect();
        if !group.is_empty() {
            parts.push(group.join(" | "));
        }

        let rest = self.args.iter().filter(|spec| !spec.exclusive_or);
        let (required, optional): (Vec<_>, Vec<_>) = rest.partition(|spec| spec.required);
        parts.extend(required.iter().map(|spec| spec.usage()));
        parts.extend(optional.iter().map(|spec| format!("[{}]", spec.usage())));

        parts.join(" ")
    }
}

fn comment() -> ArgumentSpec {
    ArgumentSpec::value("comment", "A comment to go along with the action")
}

fn process_target() -> Vec<ArgumentSpec> {
    vec![
        ArgumentSpec::value("pid", "A PID representing the process").exclusive_or().rule(&Pid),
        ArgumentSpec::value("entityId", "An entity id representing the process")
            .exclusive_or()
            .rule(&NonEmpty),
        comment(),
    ]
}

/// Return every console command in display order.
pub fn master_catalog() -> Vec<CommandTemplate> {
    vec![
        CommandTemplate {
            name: "isolate",
            action: "isolate",
            about: "Isolate the host",
            capability: Some(CapabilityTag::Isolation),
            permission: Permission::IsolateHost,
            feature: None,
            args: vec![comment()],
            example: Some(r#"isolate --comment "isolate this host""#),
        },
        CommandTemplate {
            name: "release",
            action: "unisolate",
            about: "Release the host",
            capability: Some(CapabilityTag::Isolation),
            permission: Permission::ReleaseHost,
            feature: None,
            args: vec![comment()],
            example: Some(r#"release --comment "release this host""#),
        },
        CommandTemplate {
            name: "processes",
            action: "running-processes",
            about: "Show all running processes",
            capability: Some(CapabilityTag::RunningProcesses),
            permission: Permission::GetRunningProcesses,
            feature: None,
            args: vec![comment()],
            example: Some(r#"processes --comment "get the processes""#),
        },
        CommandTemplate {
            name: "kill-process",
            action: "kill-process",
            about: "Kill/terminate a process",
            capability: Some(CapabilityTag::KillProcess),
            permission: Permission::KillProcess,
            feature: None,
            args: process_target(),
            example: Some(r#"kill-process --pid 123 --comment "kill this process""#),
        },
        CommandTemplate {
            name: "suspend-process",
            action: "suspend-process",
            about: "Temporarily suspend a process",
            capability: Some(CapabilityTag::SuspendProcess),
            permission: Permission::SuspendProcess,
            feature: None,
            args: process_target(),
            example: Some(r#"suspend-process --pid 123 --comment "suspend this process""#),
        },
        CommandTemplate {
            name: "get-file",
            action: "get-file",
            about: "Retrieve a file from the host",
            capability: Some(CapabilityTag::GetFile),
            permission: Permission::WriteFileOperations,
            feature: None,
            args: vec![
                ArgumentSpec::value("path", "The full file path to be retrieved").required(),
                comment(),
            ],
            example: Some(r#"get-file --path "/full/path/to/file.txt" --comment "Possible malware""#),
        },
        CommandTemplate {
            name: "execute",
            action: "execute",
            about: "Execute a command on the host",
            capability: Some(CapabilityTag::Execute),
            permission: Permission::WriteExecuteOperations,
            feature: Some(Feature::Execute),
            args: vec![
                ArgumentSpec::value("command", "A shell command to run on the host").required(),
                ArgumentSpec::value("timeout", "Timeout for the command, e.g. 37m, 2s or 4h")
                    .rule(&TimeoutDuration),
                comment(),
            ],
            example: Some(r#"execute --command "ls -al" --timeout 2s --comment "Get list of all files""#),
        },
        CommandTemplate {
            name: "upload",
            action: "upload",
            about: "Upload a file to the host",
            capability: Some(CapabilityTag::UploadFile),
            permission: Permission::WriteFileOperations,
            feature: Some(Feature::Upload),
            args: vec![
                ArgumentSpec::value("file", "The file that will be sent to the host").required(),
                ArgumentSpec::flag("overwrite", "Overwrite the file on the host if it already exists"),
                comment(),
            ],
            example: Some(r#"upload --file script.sh --overwrite --comment "Remediation script""#),
        },
        CommandTemplate {
            name: "scan",
            action: "scan",
            about: "Scan a file or folder for malware",
            capability: Some(CapabilityTag::Scan),
            permission: Permission::WriteScanOperations,
            feature: Some(Feature::Scan),
            args: vec![
                ArgumentSpec::value("path", "The absolute path to a file or directory to be scanned")
                    .required(),
                comment(),
            ],
            example: Some(r#"scan --path "/full/path/to/folder" --comment "Scan folder for malware""#),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn command_names_are_unique() {
        let catalog = master_catalog();
        let names: HashSet<_> = catalog.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn argument_names_are_unique_per_command() {
        for cmd in master_catalog() {
            let names: HashSet<_> = cmd.args.iter().map(|a| a.name).collect();
            assert_eq!(names.len(), cmd.args.len(), "{}", cmd.name);
        }
    }

    #[test]
    fn every_command_accepts_a_comment() {
        for cmd in master_catalog() {
            assert!(cmd.argument("comment").is_some(), "{}", cmd.name);
        }
    }

    #[test]
    fn release_dispatches_as_unisolate() {
        let catalog = master_catalog();
        let release = catalog.iter().find(|c| c.name == "release").unwrap();
        assert_eq!(release.action, "unisolate");
        assert_eq!(release.capability, Some(CapabilityTag::Isolation));
    }

    #[test]
    fn process_commands_share_exclusive_group() {
        for name in ["kill-process", "suspend-process"] {
            let catalog = master_catalog();
            let cmd = catalog.iter().find(|c| c.name == name).unwrap();
            let group: Vec<_> = cmd
                .args
                .iter()
                .filter(|a| a.exclusive_or)
                .map(|a| a.name)
                .collect();
            assert_eq!(group, vec!["pid", "entityId"]);
        }
    }

    #[test]
    fn optional_commands_are_feature_gated() {
        let gated: Vec<_> = master_catalog()
            .into_iter()
            .filter_map(|c| c.feature.map(|f| (c.name, f)))
            .collect();
        assert_eq!(
            gated,
            vec![
                ("execute", Feature::Execute),
                ("upload", Feature::Upload),
                ("scan", Feature::Scan),
            ]
        );
    }

    #[test]
    fn usage_brackets_optional_arguments() {
        let catalog = master_catalog();
        let upload = catalog.iter().find(|c| c.name == "upload").unwrap();
        assert_eq!(
            upload.usage(),
            "upload --file <value> [--overwrite] [--comment <value>]"
        );
    }
}
