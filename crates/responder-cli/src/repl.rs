//! REPL – Read-Eval-Print Loop for the response console.
//!
//! Built-in commands:
//!   help [command]  – list available commands, or show one in detail
//!   status          – endpoint id, capabilities and granted permissions
//!   descriptors     – dump the command descriptors as JSON
//!   reload          – re-read `~/.responder/config.toml` and rebuild the session
//!   quit | exit     – leave the console
//!
//! Every other line is a response action and goes through the
//! [`ResponseGate`].  Accepted actions are printed as the JSON request that
//! would be sent to the endpoint.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use responder_kernel::{CommandRegistry, ResponseGate};
use responder_types::{ActionRequest, ConsoleError, Permission};
use tracing::{info, warn};

use crate::config::{self, Config};

/// What one input line asks the console to do.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Empty,
    Help(Option<String>),
    Status,
    Descriptors,
    Reload,
    Quit,
    Submitted(Result<ActionRequest, ConsoleError>),
}

/// Build a console session from a config snapshot.
pub fn open_session(cfg: &Config) -> ResponseGate {
    for name in cfg.unknown_capabilities() {
        warn!(capability = name, "ignoring unknown capability tag");
    }
    let (capabilities, permissions, features) = cfg.snapshot();
    let gate = ResponseGate::new(cfg.endpoint_id.clone(), capabilities, permissions, features);
    info!(
        endpoint_id = %gate.endpoint_id(),
        commands = gate.registry().len(),
        visible = gate.registry().visible().count(),
        "console session opened"
    );
    gate
}

/// Classify `line` and, for response actions, run it through `gate`.
pub fn evaluate(gate: &ResponseGate, line: &str) -> Outcome {
    let line = line.trim();
    let mut words = line.split_whitespace();
    match words.next() {
        None => Outcome::Empty,
        Some("help") => Outcome::Help(words.next().map(str::to_string)),
        Some("status") => Outcome::Status,
        Some("descriptors") => Outcome::Descriptors,
        Some("reload") => Outcome::Reload,
        Some("quit") | Some("exit") => Outcome::Quit,
        Some(_) => Outcome::Submitted(gate.submit(line)),
    }
}

/// Entry point for the interactive console.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut gate: ResponseGate, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", format!("{}>", gate.endpoint_id()).bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        match evaluate(&gate, &line) {
            Outcome::Empty => continue,
            Outcome::Help(None) => print_help(gate.registry()),
            Outcome::Help(Some(name)) => print_command_help(gate.registry(), &name),
            Outcome::Status => print_status(&gate),
            Outcome::Descriptors => print_descriptors(gate.registry()),
            Outcome::Reload => {
                if let Some(next) = reload() {
                    gate = next;
                    println!("{}", "✓ Session rebuilt from config.".green());
                }
            }
            Outcome::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Outcome::Submitted(Ok(request)) => print_request(&request),
            Outcome::Submitted(Err(err)) => print_error(&err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_help(registry: &CommandRegistry) {
    println!();
    println!("{}", "Response Actions".bold().underline());
    let width = registry
        .visible()
        .map(|cmd| cmd.name().len())
        .max()
        .unwrap_or(0);
    for cmd in registry.visible() {
        let name = format!("{:width$}", cmd.name());
        if let Some(reason) = cmd.disabled_reason() {
            println!("  {}  – {}", name.dimmed(), reason.yellow());
        } else {
            println!("  {}  – {}", name.bold().cyan(), cmd.template().about);
        }
    }
    println!();
    println!("{}", "Console".bold().underline());
    println!("  {}  – show usage for one command", "help <command>".bold().cyan());
    println!("  {}          – endpoint and operator snapshot", "status".bold().cyan());
    println!("  {}     – command descriptors as JSON", "descriptors".bold().cyan());
    println!("  {}          – rebuild the session from config", "reload".bold().cyan());
    println!("  {}     – exit the console", "quit  exit".bold().cyan());
    println!();
}

fn print_command_help(registry: &CommandRegistry, name: &str) {
    let Some(cmd) = registry.visible().find(|cmd| cmd.name() == name) else {
        println!("{} '{}'", "No such command:".red(), name.yellow());
        return;
    };
    let template = cmd.template();
    println!();
    println!("{}", template.name.bold().underline());
    println!("  {}", template.about);
    if let Some(reason) = cmd.disabled_reason() {
        println!("  {}", reason.yellow());
    }
    println!();
    println!("  {} {}", "Usage:".bold(), template.usage());
    for spec in &template.args {
        let marker = if spec.required || spec.exclusive_or { "*" } else { " " };
        println!("    {} {:<22} {}", marker.red(), spec.usage(), spec.about.dimmed());
    }
    if let Some(example) = template.example {
        println!("  {} {}", "Example:".bold(), example);
    }
    println!();
}

fn print_status(gate: &ResponseGate) {
    println!("{}", "Session".bold().underline());
    println!("  Endpoint     : {}", gate.endpoint_id().yellow());
    let caps: Vec<&str> = gate.capabilities().iter().map(|t| t.as_str()).collect();
    println!("  Capabilities : {}", caps.join(", "));
    let perms = gate.permissions();
    let granted: Vec<&str> = Permission::ALL
        .into_iter()
        .filter(|p| perms.allows(*p))
        .map(|p| p.as_str())
        .collect();
    if granted.is_empty() {
        println!("  Permissions  : {}", "none".red());
    } else {
        println!("  Permissions  : {}", granted.join(", "));
    }
}

fn print_descriptors(registry: &CommandRegistry) {
    match serde_json::to_string_pretty(&registry.descriptors()) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Serialization error".red(), e),
    }
}

fn print_request(request: &ActionRequest) {
    println!("{} {}", "✓ Action accepted:".green(), request.action.bold());
    match serde_json::to_string_pretty(request) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Serialization error".red(), e),
    }
}

fn print_error(err: &ConsoleError) {
    match err {
        ConsoleError::UnknownCommand(name) => println!(
            "{} '{}'. Type {} for available commands.",
            "Unsupported command:".red(),
            name.yellow(),
            "help".bold()
        ),
        ConsoleError::Authorization(e) => println!("{} {}", "Denied:".red().bold(), e),
        ConsoleError::Validation(e) => println!("{} {}", "Invalid:".red(), e),
    }
}

fn reload() -> Option<ResponseGate> {
    match config::load() {
        Ok(Some(cfg)) => Some(open_session(&cfg)),
        Ok(None) => {
            println!(
                "{} {}",
                "No config found at".yellow(),
                config::config_path().display()
            );
            None
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            None
        }
    }
}
