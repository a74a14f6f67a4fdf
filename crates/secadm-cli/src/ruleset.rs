//! TOML ruleset file format consumed by `secadmctl load`.
//!
//! ```toml
//! [[rule]]
//! kind = "integriforce"
//! path = "/bin/ls"
//! hash_kind = "sha256"
//! hash_hex = "f1d2d2f924e986ac86fdf7b36c94bcdf32beec15"
//!
//! [[rule]]
//! kind = "pax"
//! path = "/usr/bin/example"
//! aslr = true
//! segvguard = false
//! ```

use serde::Deserialize;

use secadm_core::{HashKind, PaxFlags, RawRule};

#[derive(Debug, Deserialize)]
pub struct RulesetFile {
    #[serde(rename = "rule", default)]
    pub rules: Vec<RawRuleToml>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawRuleToml {
    Integriforce {
        path: String,
        hash_kind: HashKindToml,
        hash_hex: String,
    },
    Pax {
        path: String,
        #[serde(default)]
        aslr: bool,
        #[serde(default)]
        segvguard: bool,
    },
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HashKindToml {
    Sha1,
    Sha256,
}

impl From<HashKindToml> for HashKind {
    fn from(kind: HashKindToml) -> Self {
        match kind {
            HashKindToml::Sha1 => HashKind::Sha1,
            HashKindToml::Sha256 => HashKind::Sha256,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("failed to parse ruleset TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("rule {index} has invalid hash_hex: {reason}")]
    BadHashHex { index: usize, reason: String },
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Parse a ruleset file's contents into the ordered list of rules it
/// declares, ready for `load_ruleset`.
pub fn parse(contents: &str) -> Result<Vec<RawRule>, RulesetError> {
    let file: RulesetFile = toml::from_str(contents)?;
    file.rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| match rule {
            RawRuleToml::Integriforce {
                path,
                hash_kind,
                hash_hex,
            } => {
                let hash = decode_hex(&hash_hex).map_err(|reason| RulesetError::BadHashHex {
                    index,
                    reason,
                })?;
                Ok(RawRule::Integriforce {
                    path,
                    hash_kind: hash_kind.into(),
                    hash,
                })
            }
            RawRuleToml::Pax {
                path,
                aslr,
                segvguard,
            } => Ok(RawRule::Pax {
                path,
                flags: PaxFlags { aslr, segvguard },
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_mixed_ruleset() {
        let toml = r#"
            [[rule]]
            kind = "integriforce"
            path = "/bin/ls"
            hash_kind = "sha256"
            hash_hex = "00ff"

            [[rule]]
            kind = "pax"
            path = "/usr/bin/example"
            aslr = true
        "#;
        let rules = parse(toml).unwrap();
        assert_eq!(rules.len(), 2);
        match &rules[0] {
            RawRule::Integriforce { path, hash, .. } => {
                assert_eq!(path, "/bin/ls");
                assert_eq!(hash, &vec![0x00, 0xff]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &rules[1] {
            RawRule::Pax { path, flags } => {
                assert_eq!(path, "/usr/bin/example");
                assert!(flags.aslr);
                assert!(!flags.segvguard);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_odd_length_hex() {
        let toml = r#"
            [[rule]]
            kind = "integriforce"
            path = "/bin/ls"
            hash_kind = "sha1"
            hash_hex = "abc"
        "#;
        let err = parse(toml).unwrap_err();
        assert!(matches!(err, RulesetError::BadHashHex { .. }));
    }

    #[test]
    fn empty_ruleset_is_empty() {
        assert!(parse("").unwrap().is_empty());
    }
}
