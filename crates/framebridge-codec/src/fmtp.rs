//! RFC 6184 `profile-level-id` encoding and format parameters.
//!
//! H.264 capability crosses the wire as a three-byte hex string
//! (profile_idc, profile_iop, level_idc) plus an implementation tag
//! naming the hardware backend. Both must round-trip bit-exactly
//! between negotiating endpoints.

use crate::level::{H264Level, H264Profile};

/// Format-parameter key for the profile/level triple.
pub const PROFILE_LEVEL_ID_KEY: &str = "profile-level-id";

/// Format-parameter key for the hardware backend tag.
pub const IMPLEMENTATION_KEY: &str = "implementation";

/// Constraint-set flag bits inside `profile_iop`.
const CONSTRAINT_SET0: u8 = 0x80;
const CONSTRAINT_SET1: u8 = 0x40;
const CONSTRAINT_SET2: u8 = 0x20;
const CONSTRAINT_SET3: u8 = 0x10;

/// A decoded `profile-level-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLevelId {
    pub profile: H264Profile,
    pub level: H264Level,
}

/// `profile_iop` byte pattern: `mask` selects the significant bits,
/// `value` the required ones.
struct IopPattern {
    profile_idc: u8,
    mask: u8,
    value: u8,
}

impl IopPattern {
    fn matches(&self, profile_idc: u8, iop: u8) -> bool {
        self.profile_idc == profile_idc && iop & self.mask == self.value
    }
}

// Recognized (profile_idc, profile_iop) combinations, per RFC 6184.
// An 'x' bit in the RFC's notation is a zero in the mask.
const PROFILE_PATTERNS: &[(IopPattern, H264Profile)] = &[
    (IopPattern { profile_idc: 0x42, mask: 0x4f, value: 0x40 }, H264Profile::ConstrainedBaseline),
    (IopPattern { profile_idc: 0x4d, mask: 0x8f, value: 0x80 }, H264Profile::ConstrainedBaseline),
    (IopPattern { profile_idc: 0x58, mask: 0xcf, value: 0xc0 }, H264Profile::ConstrainedBaseline),
    (IopPattern { profile_idc: 0x42, mask: 0x4f, value: 0x00 }, H264Profile::Baseline),
    (IopPattern { profile_idc: 0x58, mask: 0xcf, value: 0x80 }, H264Profile::Baseline),
    (IopPattern { profile_idc: 0x4d, mask: 0xaf, value: 0x00 }, H264Profile::Main),
    (IopPattern { profile_idc: 0x64, mask: 0xff, value: 0x00 }, H264Profile::High),
    (IopPattern { profile_idc: 0x64, mask: 0xff, value: 0x0c }, H264Profile::ConstrainedHigh),
];

/// Parse a six-character hex `profile-level-id`.
pub fn parse_profile_level_id(s: &str) -> Option<ProfileLevelId> {
    if s.len() != 6 {
        return None;
    }
    let raw = u32::from_str_radix(s, 16).ok()?;
    let profile_idc = (raw >> 16) as u8;
    let iop = (raw >> 8) as u8;
    let level_idc = raw as u8;

    // Level 1b is signaled as 1.1 plus constraint_set3; mask the flag
    // out before profile matching so it never confuses the patterns.
    let level = H264Level::from_idc(level_idc, iop & CONSTRAINT_SET3 != 0)?;
    let iop_for_profile = if level == H264Level::L1B {
        iop & !CONSTRAINT_SET3
    } else {
        iop
    };

    let profile = PROFILE_PATTERNS
        .iter()
        .find(|(p, _)| p.matches(profile_idc, iop_for_profile))
        .map(|(_, profile)| *profile)?;

    Some(ProfileLevelId { profile, level })
}

/// Format a `profile-level-id` as lowercase hex.
pub fn format_profile_level_id(id: ProfileLevelId) -> String {
    let (profile_idc, mut iop) = match id.profile {
        H264Profile::ConstrainedBaseline => {
            (0x42, CONSTRAINT_SET0 | CONSTRAINT_SET1 | CONSTRAINT_SET2)
        }
        H264Profile::Baseline => (0x42, 0x00),
        H264Profile::Main => (0x4d, 0x00),
        H264Profile::High => (0x64, 0x00),
        H264Profile::ConstrainedHigh => (0x64, 0x0c),
    };
    if id.level == H264Level::L1B {
        iop |= CONSTRAINT_SET3;
    }
    format!("{:02x}{:02x}{:02x}", profile_idc, iop, id.level.level_idc())
}

/// Assemble the format-parameter line advertised for a hardware
/// backend. The implementation tag must be stable across processes.
pub fn build_fmtp(id: ProfileLevelId, implementation_tag: &str) -> String {
    format!(
        "{PROFILE_LEVEL_ID_KEY}={};{IMPLEMENTATION_KEY}={implementation_tag}",
        format_profile_level_id(id)
    )
}

/// Parse a format-parameter line back into its profile/level and
/// implementation tag.
pub fn parse_fmtp(fmtp: &str) -> Option<(ProfileLevelId, Option<String>)> {
    let mut id = None;
    let mut tag = None;
    for param in fmtp.split(';') {
        let (key, value) = param.split_once('=')?;
        match key.trim() {
            PROFILE_LEVEL_ID_KEY => id = parse_profile_level_id(value.trim()),
            IMPLEMENTATION_KEY => tag = Some(value.trim().to_string()),
            _ => {}
        }
    }
    Some((id?, tag))
}
