//! Control-channel command dispatcher: turns a [`Command`] into calls
//! against a [`Registry`] and produces the matching [`Reply`].
//!
//! This stands in for the real ioctl handler a kernel module would expose;
//! version checking and per-command payload layout both live here rather
//! than in `secadm-wire`, which only knows about the envelope shape.

use secadm_core::jail::Destination;
use secadm_core::{
    add_rule, check_exec, check_unlink, load_ruleset, Decision, ExecDecision, FileHasher,
    PathResolver, RawRule, Registry, SecadmError,
};
use secadm_wire::rule_codec::{decode_raw_rule, decode_rule, encode_rule};
use secadm_wire::{Command, CommandCode, Reply, ReplyCode};
use tracing::warn;

fn read_u32(buf: &[u8], at: usize) -> Result<u32, SecadmError> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| SecadmError::InvalidArgument("payload truncated".to_string()))
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64, SecadmError> {
    buf.get(at..at + 8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| SecadmError::InvalidArgument("payload truncated".to_string()))
}

fn reply_for_err(err: &SecadmError) -> Reply {
    Reply::err(ReplyCode::from(err))
}

/// Dispatch `command` against `registry`, resolving paths via `resolver` and
/// hashing files via `hasher` for the commands that need either.
pub fn dispatch(
    command: &Command,
    registry: &Registry,
    resolver: &dyn PathResolver,
    hasher: &dyn FileHasher,
) -> Reply {
    if command.version != secadm_wire::envelope::PROTOCOL_VERSION {
        warn!(version = command.version, "dispatch: protocol version mismatch");
        return Reply::err(ReplyCode::InvalidArgument);
    }

    match run(command, registry, resolver, hasher) {
        Ok(reply) => reply,
        Err(e) => {
            warn!(command = ?command.command_code, error = %e, "dispatch: command failed");
            reply_for_err(&e)
        }
    }
}

fn run(
    command: &Command,
    registry: &Registry,
    resolver: &dyn PathResolver,
    hasher: &dyn FileHasher,
) -> Result<Reply, SecadmError> {
    let payload = &command.payload;

    match command.command_code {
        CommandCode::Flush => {
            let jail_id = read_u32(payload, 0)?;
            if let Some(jail) = registry.existing_entry(jail_id) {
                jail.flush_live();
            }
            Ok(Reply::ok(Vec::new()))
        }

        CommandCode::LoadRuleset => {
            let jail_id = read_u32(payload, 0)?;
            let count = read_u32(payload, 4)? as usize;
            let mut raws = Vec::with_capacity(count);
            let mut cursor = 8usize;
            for _ in 0..count {
                let len = read_u32(payload, cursor)? as usize;
                cursor += 4;
                let chunk = payload.get(cursor..cursor + len).ok_or_else(|| {
                    SecadmError::InvalidArgument("load_ruleset payload truncated".to_string())
                })?;
                raws.push(decode_raw_rule(chunk)?);
                cursor += len;
            }

            let jail = registry.entry(jail_id);
            load_ruleset(&jail, raws, resolver)?;
            jail.commit_staging();
            Ok(Reply::ok(Vec::new()))
        }

        CommandCode::AddRule => {
            let jail_id = read_u32(payload, 0)?;
            let destination = match payload.get(4) {
                Some(0) => Destination::Live,
                Some(1) => Destination::Staging,
                _ => {
                    return Err(SecadmError::InvalidArgument(
                        "unknown destination tag".to_string(),
                    ))
                }
            };
            let body = payload
                .get(5..)
                .ok_or_else(|| SecadmError::InvalidArgument("add_rule payload truncated".to_string()))?;
            let raw: RawRule = decode_raw_rule(body)?;
            let jail = registry.entry(jail_id);
            let rule_id = add_rule(&jail, raw, destination, resolver)?;
            Ok(Reply::ok(rule_id.to_le_bytes().to_vec()))
        }

        CommandCode::DelRule => {
            let jail_id = read_u32(payload, 0)?;
            let rule_id = read_u64(payload, 4)?;
            if let Some(jail) = registry.existing_entry(jail_id) {
                jail.delete_rule(rule_id);
            }
            Ok(Reply::ok(Vec::new()))
        }

        CommandCode::EnableRule | CommandCode::DisableRule => {
            let jail_id = read_u32(payload, 0)?;
            let rule_id = read_u64(payload, 4)?;
            let active = command.command_code == CommandCode::EnableRule;
            if let Some(jail) = registry.existing_entry(jail_id) {
                jail.set_active(rule_id, active);
            }
            Ok(Reply::ok(Vec::new()))
        }

        CommandCode::GetRule | CommandCode::GetRuleData => {
            let jail_id = read_u32(payload, 0)?;
            let rule_id = read_u64(payload, 4)?;
            let jail = registry
                .existing_entry(jail_id)
                .ok_or(SecadmError::NotFound)?;
            let record = jail.get_rule(rule_id).ok_or(SecadmError::NotFound)?;
            Ok(Reply::ok(encode_rule(&record)))
        }

        CommandCode::GetRulePath => {
            let jail_id = read_u32(payload, 0)?;
            let rule_id = read_u64(payload, 4)?;
            let jail = registry
                .existing_entry(jail_id)
                .ok_or(SecadmError::NotFound)?;
            let record = jail.get_rule(rule_id).ok_or(SecadmError::NotFound)?;
            let path = record.path().ok_or(SecadmError::NotFound)?;
            Ok(Reply::ok(path.as_bytes().to_vec()))
        }

        CommandCode::GetRuleHash => {
            let jail_id = read_u32(payload, 0)?;
            let rule_id = read_u64(payload, 4)?;
            let jail = registry
                .existing_entry(jail_id)
                .ok_or(SecadmError::NotFound)?;
            let record = jail.get_rule(rule_id).ok_or(SecadmError::NotFound)?;
            let (hash_kind, hash) = record.hash_kind_and_bytes().ok_or(SecadmError::NotFound)?;
            let mut out = vec![hash_kind as u8];
            out.extend_from_slice(hash);
            Ok(Reply::ok(out))
        }

        CommandCode::GetNumRules => {
            let jail_id = read_u32(payload, 0)?;
            let counts = registry
                .existing_entry(jail_id)
                .map(|jail| jail.counts())
                .unwrap_or_default();
            let mut out = Vec::with_capacity(32);
            out.extend_from_slice(&counts.total.to_le_bytes());
            out.extend_from_slice(&counts.integriforce.to_le_bytes());
            out.extend_from_slice(&counts.pax.to_le_bytes());
            out.extend_from_slice(&counts.extended.to_le_bytes());
            Ok(Reply::ok(out))
        }
    }
}

/// Decode a wire-format [`RuleRecord`] out of band, without going through
/// `dispatch` — used by callers that already hold a raw `GetRuleData` reply
/// payload and want the structured form back.
pub fn decode_rule_reply(payload: &[u8]) -> Result<secadm_core::RuleRecord, SecadmError> {
    decode_rule(payload)
}

/// Convenience wrapper over the two enforcement hooks for a caller that
/// only has a [`Command`]-shaped request (e.g. a test harness simulating a
/// process doing both a control-channel call and an exec in sequence).
pub fn exec_decision(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
    hasher: &dyn FileHasher,
) -> ExecDecision {
    check_exec(registry, jail_id, target_path, resolver, hasher)
}

/// As [`exec_decision`], for unlink.
pub fn unlink_decision(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
) -> Decision {
    check_unlink(registry, jail_id, target_path, resolver)
}
