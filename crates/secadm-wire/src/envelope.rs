//! Command/reply envelope carried over the control channel.
//!
//! ```text
//! Command: version:u32 | command_code:u32 | payload:opaque
//! Reply:   version:u32 | code:u32         | payload:opaque
//! ```
//!
//! `payload` is a command-specific blob; for rule-carrying commands it is
//! produced/consumed by [`crate::rule_codec`], for everything else it is
//! either empty or a small fixed-width value (a `rule_id`, a count).

use crate::error_code::ReplyCode;

/// Current wire protocol version. Bump this if the envelope or any
/// payload layout changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// One control-channel operation, mirroring the ioctl command set a real
/// kernel module would expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandCode {
    /// Remove every live rule in the target jail.
    Flush = 0,
    /// Replace the target jail's live ruleset with a freshly staged one.
    LoadRuleset = 1,
    /// Add a single rule to the live set (or to staging, depending on payload).
    AddRule = 2,
    /// Remove a rule by id.
    DelRule = 3,
    /// Mark a rule active.
    EnableRule = 4,
    /// Mark a rule inactive.
    DisableRule = 5,
    /// Fetch a rule's header fields (kind, jail, active).
    GetRule = 6,
    /// Fetch a rule's full kind-dependent body (hash bytes, pax flags).
    GetRuleData = 7,
    /// Fetch the path a rule was registered against.
    GetRulePath = 8,
    /// Fetch the hash bytes of an Integriforce rule.
    GetRuleHash = 9,
    /// Fetch the per-kind rule counts for a jail.
    GetNumRules = 10,
}

impl CommandCode {
    /// Parse a raw wire command code, rejecting anything unrecognized.
    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Flush,
            1 => Self::LoadRuleset,
            2 => Self::AddRule,
            3 => Self::DelRule,
            4 => Self::EnableRule,
            5 => Self::DisableRule,
            6 => Self::GetRule,
            7 => Self::GetRuleData,
            8 => Self::GetRulePath,
            9 => Self::GetRuleHash,
            10 => Self::GetNumRules,
            _ => return None,
        })
    }
}

/// A request sent down the control channel.
#[derive(Debug, Clone)]
pub struct Command {
    pub version: u32,
    pub command_code: CommandCode,
    pub payload: Vec<u8>,
}

impl Command {
    #[must_use]
    pub fn new(command_code: CommandCode, payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command_code,
            payload,
        }
    }
}

/// The response to a [`Command`].
#[derive(Debug, Clone)]
pub struct Reply {
    pub version: u32,
    pub code: ReplyCode,
    pub payload: Vec<u8>,
}

impl Reply {
    #[must_use]
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            code: ReplyCode::Success,
            payload,
        }
    }

    #[must_use]
    pub fn err(code: ReplyCode) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            code,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == ReplyCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_code_round_trips_through_raw_u32() {
        let codes = [
            CommandCode::Flush,
            CommandCode::LoadRuleset,
            CommandCode::AddRule,
            CommandCode::DelRule,
            CommandCode::EnableRule,
            CommandCode::DisableRule,
            CommandCode::GetRule,
            CommandCode::GetRuleData,
            CommandCode::GetRulePath,
            CommandCode::GetRuleHash,
            CommandCode::GetNumRules,
        ];
        for code in codes {
            assert_eq!(CommandCode::from_u32(code as u32), Some(code));
        }
        assert_eq!(CommandCode::from_u32(255), None);
    }

    #[test]
    fn ok_reply_carries_success_code() {
        let reply = Reply::ok(vec![1, 2, 3]);
        assert!(reply.is_success());
        assert_eq!(reply.payload, vec![1, 2, 3]);
    }

    #[test]
    fn err_reply_carries_no_payload() {
        let reply = Reply::err(ReplyCode::Duplicate);
        assert!(!reply.is_success());
        assert!(reply.payload.is_empty());
    }
}
