//! Control-channel wire types shared between the kernel-side hooks and the
//! userland CLI: the command/reply envelope and the rule encoding carried
//! inside their payloads.

#![deny(unsafe_code)]

pub mod envelope;
pub mod error_code;
pub mod rule_codec;

pub use envelope::{Command, CommandCode, Reply};
pub use error_code::ReplyCode;
pub use rule_codec::{decode_raw_rule, decode_rule, encode_raw_rule, encode_rule};
