//! `responder-cli` – Endpoint Response Console
//!
//! This binary is the operator-facing entry point for the response console.
//! It:
//!
//! 1. Checks for `~/.responder/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Builds a console session (command registry + access gate) from the
//!    configured capability, permission and feature snapshot.
//! 3. Drops the user into an **interactive REPL** where response actions are
//!    authorized and validated before being printed as action requests.
//! 4. Intercepts **Ctrl-C** to exit safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use responder_types::PermissionSet;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level (default "info").  RESPONDER_LOG_FORMAT=json
    // switches to newline-delimited JSON.  User-facing output stays on
    // println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("RESPONDER_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – leaving the console …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Session snapshot ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration (all permissions denied).");
            config::Config::default()
        }
    };

    let gate = repl::open_session(&cfg);
    let visible = gate.registry().visible().count();
    println!(
        "  Endpoint {} – {} of {} response action(s) available.",
        gate.endpoint_id().bold(),
        visible.to_string().green(),
        gate.registry().len()
    );
    if visible == 0 {
        println!(
            "  {}  Grant permissions under [permissions] in {}.",
            "No actions are permitted.".yellow(),
            config::config_path().display()
        );
    }

    println!();
    println!("  Type {} for a list of commands.\n", "help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(gate, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║     Responder First-Run Wizard       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up the console.\n");

    let mut cfg = config::Config::default();

    cfg.endpoint_id = prompt_line(
        &format!("  Endpoint id [{}]: ", cfg.endpoint_id),
        &cfg.endpoint_id,
    );

    let caps = prompt_line(
        "  Advertised capabilities, comma-separated [all]: ",
        "all",
    );
    if caps.trim() != "all" {
        cfg.capabilities = caps
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    let grant = prompt_line("  Grant every response permission? [y/N]: ", "n");
    if grant.eq_ignore_ascii_case("y") || grant.eq_ignore_ascii_case("yes") {
        cfg.permissions = PermissionSet::all();
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "Responder".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Endpoint Response Console");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
