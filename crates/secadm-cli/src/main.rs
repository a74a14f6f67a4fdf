//! `secadmctl`: a demonstration client for the secadm control channel.
//!
//! Every invocation builds a fresh, empty [`Registry`] and operates on it
//! in-process — there is no real kernel module or persistent daemon behind
//! this binary, so state does not survive across invocations. It exists to
//! exercise the wire protocol and ingestion pipeline end to end, the way an
//! operator's `secadmctl` talks to the kernel module in production.

mod ruleset;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secadm_core::path::StdPathResolver;
use secadm_core::{
    check_exec, check_unlink, load_ruleset, Decision, ExecDecision, HashKind, PaxFlags, RawRule,
    Registry, StdFileHasher,
};
use secadm_hooks::dispatch::dispatch;
use secadm_wire::rule_codec::encode_raw_rule;
use secadm_wire::{Command as WireCommand, CommandCode};
use tracing::{debug, info, warn};

/// Control-channel client for secadm.
#[derive(Debug, Parser)]
#[command(name = "secadmctl")]
#[command(about = "Load and inspect secadm Integriforce/PaX rulesets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a TOML ruleset into a jail's staging index, then commit it live.
    Load {
        /// Target jail id.
        #[arg(long)]
        jail: u32,
        /// Path to the TOML ruleset file.
        #[arg(long)]
        file: PathBuf,
    },
    /// Evaluate `check_exec` for a path against an already-loaded jail.
    ///
    /// Since each invocation starts from an empty registry, this is most
    /// useful combined with `--file` to load the ruleset in the same run.
    CheckExec {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        path: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Evaluate `check_unlink` for a path against an already-loaded jail.
    CheckUnlink {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        path: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Add a single PaX rule over the in-process control channel.
    AddPax {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        path: String,
        #[arg(long)]
        aslr: bool,
        #[arg(long)]
        segvguard: bool,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a rule by id over the in-process control channel.
    Del {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        rule_id: u64,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Enable or disable a rule by id over the in-process control channel.
    SetActive {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        rule_id: u64,
        #[arg(long)]
        active: bool,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Flush a jail's live rules over the in-process control channel.
    Flush {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a jail's per-kind rule counts.
    Counts {
        #[arg(long)]
        jail: u32,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn load_file(registry: &Registry, jail_id: u32, file: &PathBuf) -> Result<(), String> {
    let contents = std::fs::read_to_string(file).map_err(|e| format!("reading {file:?}: {e}"))?;
    let raws = ruleset::parse(&contents).map_err(|e| e.to_string())?;
    let jail = registry.entry(jail_id);
    let resolver = StdPathResolver;
    load_ruleset(&jail, raws, &resolver).map_err(|e| e.to_string())?;
    jail.commit_staging();
    Ok(())
}

fn run() -> Result<(), String> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Load { jail, file } => {
            let registry = Registry::new();
            load_file(&registry, jail, &file)?;
            let counts = registry.entry(jail).counts();
            info!(jail, total = counts.total, integriforce = counts.integriforce, pax = counts.pax, "ruleset loaded");
            println!(
                "jail {jail}: {} rules loaded ({} integriforce, {} pax)",
                counts.total, counts.integriforce, counts.pax
            );
            Ok(())
        }
        Command::CheckExec { jail, path, file } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            match check_exec(&registry, jail, &path, &resolver, &hasher) {
                ExecDecision::Allow { pax_flags } => {
                    debug!(jail, path, ?pax_flags, "check_exec: allow");
                    println!("allow (pax_flags = {pax_flags:?})");
                    Ok(())
                }
                ExecDecision::Deny(e) => {
                    warn!(jail, path, error = %e, "check_exec: deny");
                    Err(format!("deny: {e}"))
                }
            }
        }
        Command::CheckUnlink { jail, path, file } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            match check_unlink(&registry, jail, &path, &resolver) {
                Decision::Allow => {
                    debug!(jail, path, "check_unlink: allow");
                    println!("allow");
                    Ok(())
                }
                Decision::Deny(e) => {
                    warn!(jail, path, error = %e, "check_unlink: deny");
                    Err(format!("deny: {e}"))
                }
            }
        }
        Command::AddPax {
            jail,
            path,
            aslr,
            segvguard,
            file,
        } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            let raw = RawRule::Pax {
                path,
                flags: PaxFlags { aslr, segvguard },
            };
            let mut payload = Vec::new();
            payload.extend_from_slice(&jail.to_le_bytes());
            payload.push(0); // Destination::Live
            payload.extend_from_slice(&encode_raw_rule(&raw));
            let reply = dispatch(
                &WireCommand::new(CommandCode::AddRule, payload),
                &registry,
                &resolver,
                &hasher,
            );
            if reply.is_success() {
                let rule_id = u64::from_le_bytes(reply.payload.try_into().unwrap());
                info!(jail, rule_id, "add_rule: pax rule added");
                println!("added rule_id={rule_id}");
                Ok(())
            } else {
                warn!(jail, code = ?reply.code, "add_rule: rejected");
                Err(format!("add_rule failed: {:?}", reply.code))
            }
        }
        Command::Del { jail, rule_id, file } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            let mut payload = Vec::new();
            payload.extend_from_slice(&jail.to_le_bytes());
            payload.extend_from_slice(&rule_id.to_le_bytes());
            let reply = dispatch(
                &WireCommand::new(CommandCode::DelRule, payload),
                &registry,
                &resolver,
                &hasher,
            );
            info!(jail, rule_id, success = reply.is_success(), "del_rule");
            println!("{}", if reply.is_success() { "ok" } else { "failed" });
            Ok(())
        }
        Command::SetActive {
            jail,
            rule_id,
            active,
            file,
        } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            let code = if active {
                CommandCode::EnableRule
            } else {
                CommandCode::DisableRule
            };
            let mut payload = Vec::new();
            payload.extend_from_slice(&jail.to_le_bytes());
            payload.extend_from_slice(&rule_id.to_le_bytes());
            let reply = dispatch(&WireCommand::new(code, payload), &registry, &resolver, &hasher);
            info!(jail, rule_id, active, success = reply.is_success(), "set_active");
            println!("{}", if reply.is_success() { "ok" } else { "failed" });
            Ok(())
        }
        Command::Flush { jail, file } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            let mut payload = Vec::new();
            payload.extend_from_slice(&jail.to_le_bytes());
            let reply = dispatch(
                &WireCommand::new(CommandCode::Flush, payload),
                &registry,
                &resolver,
                &hasher,
            );
            info!(jail, success = reply.is_success(), "flush");
            println!("{}", if reply.is_success() { "ok" } else { "failed" });
            Ok(())
        }
        Command::Counts { jail, file } => {
            let registry = Registry::new();
            if let Some(file) = file {
                load_file(&registry, jail, &file)?;
            }
            let resolver = StdPathResolver;
            let hasher = StdFileHasher;
            let mut payload = Vec::new();
            payload.extend_from_slice(&jail.to_le_bytes());
            let reply = dispatch(
                &WireCommand::new(CommandCode::GetNumRules, payload),
                &registry,
                &resolver,
                &hasher,
            );
            if !reply.is_success() {
                return Err(format!("get_num_rules failed: {:?}", reply.code));
            }
            let p = &reply.payload;
            let total = u64::from_le_bytes(p[0..8].try_into().unwrap());
            let integriforce = u64::from_le_bytes(p[8..16].try_into().unwrap());
            let pax = u64::from_le_bytes(p[16..24].try_into().unwrap());
            println!("jail {jail}: total={total} integriforce={integriforce} pax={pax}");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("secadmctl: {e}");
            ExitCode::FAILURE
        }
    }
}
