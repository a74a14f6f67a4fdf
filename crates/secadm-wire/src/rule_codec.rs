//! Fixed-layout wire encoding for a `RuleRecord`: a fixed header followed
//! by a kind-dependent body.
//!
//! ```text
//! header:       kind_tag:u8 | rule_id:u64 | jail_id:u32 | active:u8
//! integriforce: hash_kind:u8 | path_len:u16 | path_bytes | hash_bytes | mount_len:u16 | mount_bytes | file_id:u64
//! pax:          aslr:u8 | segvguard:u8 | path_len:u16 | path_bytes | mount_len:u16 | mount_bytes | file_id:u64
//! ```
//!
//! All multi-byte integers are little-endian, matching the endianness fixed
//! by the fingerprint packing in `secadm-core::fingerprint`.

use secadm_core::{FileLocation, HashKind, PaxFlags, RawRule, RuleKind, RuleRecord, SecadmError};

const KIND_INTEGRIFORCE: u8 = 0;
const KIND_PAX: u8 = 1;
const KIND_EXTENDED: u8 = 2;

const HASH_SHA1: u8 = 0;
const HASH_SHA256: u8 = 1;

fn decode_err(what: &str) -> SecadmError {
    SecadmError::InvalidArgument(format!("malformed wire rule: {what}"))
}

/// A small cursor over an immutable byte slice, used instead of pulling in
/// a serialization crate for a handful of fixed-width reads — the wire
/// format is deliberately simple enough that hand-rolled parsing stays
/// readable, the same trade-off `frankenlibc-abi`'s hand-written `*_abi.rs`
/// modules make at the real C ABI boundary.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SecadmError> {
        if self.pos + n > self.buf.len() {
            return Err(decode_err("buffer truncated"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SecadmError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, SecadmError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, SecadmError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, SecadmError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, SecadmError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| decode_err("path/mount_point not utf-8"))
    }
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_string(buf: &mut Vec<u8>, s: &str) {
    put_u16(buf, s.len() as u16);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a full `RuleRecord` (header + kind body) to its wire form.
#[must_use]
pub fn encode_rule(record: &RuleRecord) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(match record.kind {
        RuleKind::Integriforce { .. } => KIND_INTEGRIFORCE,
        RuleKind::Pax { .. } => KIND_PAX,
        RuleKind::Extended => KIND_EXTENDED,
    });
    put_u64(&mut buf, record.rule_id);
    put_u32(&mut buf, record.jail_id);
    buf.push(u8::from(record.active));

    match &record.kind {
        RuleKind::Integriforce {
            path,
            location,
            hash_kind,
            hash,
        } => {
            buf.push(match hash_kind {
                HashKind::Sha1 => HASH_SHA1,
                HashKind::Sha256 => HASH_SHA256,
            });
            put_string(&mut buf, path);
            buf.extend_from_slice(hash);
            put_string(&mut buf, &location.mount_point);
            put_u64(&mut buf, location.file_id);
        }
        RuleKind::Pax {
            path,
            location,
            flags,
        } => {
            buf.push(u8::from(flags.aslr));
            buf.push(u8::from(flags.segvguard));
            put_string(&mut buf, path);
            put_string(&mut buf, &location.mount_point);
            put_u64(&mut buf, location.file_id);
        }
        RuleKind::Extended => {}
    }

    buf
}

/// Decode a `RuleRecord` previously produced by [`encode_rule`].
pub fn decode_rule(bytes: &[u8]) -> Result<RuleRecord, SecadmError> {
    let mut r = Reader::new(bytes);
    let kind_tag = r.u8()?;
    let rule_id = r.u64()?;
    let jail_id = r.u32()?;
    let active = r.u8()? != 0;

    let kind = match kind_tag {
        KIND_INTEGRIFORCE => {
            let hash_kind = match r.u8()? {
                HASH_SHA1 => HashKind::Sha1,
                HASH_SHA256 => HashKind::Sha256,
                _ => return Err(decode_err("unknown hash_kind tag")),
            };
            let path = r.string()?;
            let hash = r.take(hash_kind.digest_len())?.to_vec();
            let mount_point = r.string()?;
            let file_id = r.u64()?;
            RuleKind::Integriforce {
                path,
                location: FileLocation {
                    mount_point,
                    file_id,
                },
                hash_kind,
                hash,
            }
        }
        KIND_PAX => {
            let aslr = r.u8()? != 0;
            let segvguard = r.u8()? != 0;
            let path = r.string()?;
            let mount_point = r.string()?;
            let file_id = r.u64()?;
            RuleKind::Pax {
                path,
                location: FileLocation {
                    mount_point,
                    file_id,
                },
                flags: PaxFlags { aslr, segvguard },
            }
        }
        KIND_EXTENDED => RuleKind::Extended,
        _ => return Err(decode_err("unknown kind_tag")),
    };

    Ok(RuleRecord {
        rule_id,
        jail_id,
        active,
        // The fingerprint is not carried on the wire — it is derived, not
        // stored, so a decoded record must have it recomputed by the
        // caller before insertion. Callers that only need the data (the
        // `get_rule_*` accessors) never look at this field.
        fingerprint: 0,
        kind,
    })
}

/// Encode a not-yet-resolved [`RawRule`] as submitted by `add_rule`/
/// `load_ruleset` callers: no `location` field, since that is recovered
/// locally from the path before insertion.
#[must_use]
pub fn encode_raw_rule(raw: &RawRule) -> Vec<u8> {
    let mut buf = Vec::new();
    match raw {
        RawRule::Integriforce {
            path,
            hash_kind,
            hash,
        } => {
            buf.push(KIND_INTEGRIFORCE);
            buf.push(match hash_kind {
                HashKind::Sha1 => HASH_SHA1,
                HashKind::Sha256 => HASH_SHA256,
            });
            put_string(&mut buf, path);
            buf.extend_from_slice(hash);
        }
        RawRule::Pax { path, flags } => {
            buf.push(KIND_PAX);
            buf.push(u8::from(flags.aslr));
            buf.push(u8::from(flags.segvguard));
            put_string(&mut buf, path);
        }
        RawRule::Extended => {
            buf.push(KIND_EXTENDED);
        }
    }
    buf
}

/// Decode a [`RawRule`] previously produced by [`encode_raw_rule`].
pub fn decode_raw_rule(bytes: &[u8]) -> Result<RawRule, SecadmError> {
    let mut r = Reader::new(bytes);
    let kind_tag = r.u8()?;
    Ok(match kind_tag {
        KIND_INTEGRIFORCE => {
            let hash_kind = match r.u8()? {
                HASH_SHA1 => HashKind::Sha1,
                HASH_SHA256 => HashKind::Sha256,
                _ => return Err(decode_err("unknown hash_kind tag")),
            };
            let path = r.string()?;
            let hash = r.take(hash_kind.digest_len())?.to_vec();
            RawRule::Integriforce {
                path,
                hash_kind,
                hash,
            }
        }
        KIND_PAX => {
            let aslr = r.u8()? != 0;
            let segvguard = r.u8()? != 0;
            let path = r.string()?;
            RawRule::Pax {
                path,
                flags: PaxFlags { aslr, segvguard },
            }
        }
        KIND_EXTENDED => RawRule::Extended,
        _ => return Err(decode_err("unknown kind_tag")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integriforce_round_trips() {
        let record = RuleRecord {
            rule_id: 7,
            jail_id: 1,
            active: true,
            fingerprint: 0xDEAD_BEEF,
            kind: RuleKind::Integriforce {
                path: "/bin/ls".to_string(),
                location: FileLocation {
                    mount_point: "/".to_string(),
                    file_id: 42,
                },
                hash_kind: HashKind::Sha256,
                hash: vec![7u8; 32],
            },
        };
        let bytes = encode_rule(&record);
        let decoded = decode_rule(&bytes).unwrap();
        assert_eq!(decoded.rule_id, record.rule_id);
        assert_eq!(decoded.jail_id, record.jail_id);
        assert_eq!(decoded.active, record.active);
        assert_eq!(decoded.kind, record.kind);
    }

    #[test]
    fn pax_round_trips() {
        let record = RuleRecord {
            rule_id: 3,
            jail_id: 2,
            active: false,
            fingerprint: 1,
            kind: RuleKind::Pax {
                path: "/usr/bin/example".to_string(),
                location: FileLocation {
                    mount_point: "/usr".to_string(),
                    file_id: 99,
                },
                flags: PaxFlags {
                    aslr: true,
                    segvguard: false,
                },
            },
        };
        let bytes = encode_rule(&record);
        let decoded = decode_rule(&bytes).unwrap();
        assert_eq!(decoded.kind, record.kind);
        assert!(!decoded.active);
    }

    #[test]
    fn truncated_buffer_is_invalid_argument() {
        let err = decode_rule(&[KIND_PAX]).unwrap_err();
        assert!(matches!(err, SecadmError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_kind_tag_is_invalid_argument() {
        let mut buf = vec![0xFFu8];
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(1);
        let err = decode_rule(&buf).unwrap_err();
        assert!(matches!(err, SecadmError::InvalidArgument(_)));
    }

    #[test]
    fn raw_pax_rule_round_trips() {
        let raw = RawRule::Pax {
            path: "/sbin/init".to_string(),
            flags: PaxFlags {
                aslr: true,
                segvguard: false,
            },
        };
        let bytes = encode_raw_rule(&raw);
        assert_eq!(decode_raw_rule(&bytes).unwrap(), raw);
    }

    #[test]
    fn raw_integriforce_rule_round_trips() {
        let raw = RawRule::Integriforce {
            path: "/bin/sh".to_string(),
            hash_kind: HashKind::Sha1,
            hash: vec![9u8; 20],
        };
        let bytes = encode_raw_rule(&raw);
        assert_eq!(decode_raw_rule(&bytes).unwrap(), raw);
    }

    #[test]
    fn raw_extended_rule_round_trips() {
        let bytes = encode_raw_rule(&RawRule::Extended);
        assert_eq!(decode_raw_rule(&bytes).unwrap(), RawRule::Extended);
    }
}
