//! `responder-kernel` – Command Registry & Access Gate
//!
//! Decides which response console commands an operator may run against an
//! endpoint, and checks their arguments before anything is dispatched.  All
//! evaluation is synchronous and side-effect free over an immutable
//! capability/permission snapshot.
//!
//! # Modules
//!
//! - [`catalog`] – [`master_catalog`][catalog::master_catalog]: the fixed,
//!   ordered list of [`CommandTemplate`][catalog::CommandTemplate]s mapping a
//!   command name to its capability, permission, feature gate and arguments.
//! - [`registry`] – [`build_registry`][registry::build_registry]: annotates the
//!   catalog for one session, hiding commands the operator may not use and
//!   disabling commands the endpoint cannot run.
//! - [`access_gate`] – [`ResponseGate`][access_gate::ResponseGate]:
//!   the single interception point a console line passes through.  Combines
//!   [`authorize`][access_gate::authorize] and argument validation in one call
//!   and produces an [`ActionRequest`][responder_types::ActionRequest].
//! - [`arguments`] – [`validate_arguments`][arguments::validate_arguments]:
//!   required/optional, multiplicity and exclusive-or checks over an
//!   [`ArgumentSpec`][arguments::ArgumentSpec] schema.
//! - [`validators`] – [`ValueRule`][validators::ValueRule] and the built-in
//!   non-empty, PID and duration rules.
//! - [`parser`] – [`parse_command_line`][parser::parse_command_line]: splits a
//!   console line into a command name and `--argument` occurrences.

pub mod access_gate;
pub mod arguments;
pub mod catalog;
pub mod parser;
pub mod registry;
pub mod validators;

pub use access_gate::{ResponseGate, authorize};
pub use arguments::{ArgumentKind, ArgumentSpec, validate_arguments};
pub use catalog::{CommandTemplate, master_catalog};
pub use parser::{ParsedArgument, ParsedCommand, parse_command_line};
pub use registry::{Command, CommandRegistry, build_registry};
pub use validators::{NonEmpty, Pid, TimeoutDuration, ValueRule};
