//! Auth-File Password Obfuscation
//!
//! The scramble the iRODS reference clients apply to `~/.irods/.irodsA`.
//! It is obfuscation, not encryption: the key is the low bits of the user id
//! and one of a fixed table of sequences. The on-disk layout is
//!
//! ```text
//! '.'  h h h h h  s  p p p ...
//!      |         |  └─ scrambled password
//!      |         └─ sequence index, 'e' + n (not scrambled)
//!      └─ scrambled 5-digit timestamp (mtime & 0xffff)
//! ```
//!
//! The scramble offset advances by 3 bits per character across the header
//! and the password, so the password always starts at bit shift 15.

use thiserror::Error;

/// Offset patterns, selected by the sequence index
const SEQUENCES: [u32; 16] = [
    0xd768b678, 0xedfdaf56, 0x2420231b, 0x987098d8, 0xc1bdfeee, 0xf572341f, 0x478def3a, 0xa830d343,
    0x774dfa2a, 0x6720731e, 0x346fa320, 0x6ffdf43a, 0x7723a320, 0xdf67d02e, 0x86ad240a, 0xe76d342e,
];

/// Characters that get rotated; everything else passes through
const WHEEL: &[u8; 77] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!\"#$%&'()*+,-./";

const UID_MASK: u32 = 0xf5f;
const HEADER_LEN: usize = 5;
const PAYLOAD_START: usize = HEADER_LEN + 2;
const PAYLOAD_SHIFT: u32 = 15;

/// Auth-file decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObfuscationError {
    /// Fewer characters than the fixed header
    #[error("obfuscated secret too short ({0} characters)")]
    TooShort(usize),

    /// Sequence indicator outside the table
    #[error("invalid sequence indicator {0:?}")]
    InvalidSequence(char),
}

/// Scramble `password` the way the reference client writes `.irodsA`
///
/// `uid` salts the offsets; `mtime` (seconds since the epoch) picks the
/// sequence and fills the header.
pub fn encode(password: &str, uid: u32, mtime: i64) -> String {
    let seq_index = (mtime & 0xf) as usize;
    let seq = SEQUENCES[seq_index];
    let header = format!("{:05}", mtime & 0xffff);

    let mut out = String::with_capacity(PAYLOAD_START + password.len());
    out.push('.');

    let mut shift = 0;
    for c in header.chars() {
        out.push(rotate(c, offset(seq, shift, uid), true));
        shift = advance(shift);
    }

    out.push(char::from(b'e' + seq_index as u8));

    for c in password.chars() {
        out.push(rotate(c, offset(seq, shift, uid), true));
        shift = advance(shift);
    }

    out
}

/// Recover the password from an obfuscated auth-file string
pub fn decode(obfuscated: &str, uid: u32) -> Result<String, ObfuscationError> {
    let chars: Vec<char> = obfuscated.chars().collect();
    if chars.len() < PAYLOAD_START {
        return Err(ObfuscationError::TooShort(chars.len()));
    }

    let indicator = chars[PAYLOAD_START - 1];
    let seq = (indicator as u32)
        .checked_sub(u32::from(b'e'))
        .and_then(|i| SEQUENCES.get(i as usize))
        .copied()
        .ok_or(ObfuscationError::InvalidSequence(indicator))?;

    let mut shift = PAYLOAD_SHIFT;
    let mut decoded = String::with_capacity(chars.len() - PAYLOAD_START);
    for &c in chars[PAYLOAD_START..].iter().take_while(|&&c| c != '\0') {
        decoded.push(rotate(c, offset(seq, shift, uid), false));
        shift = advance(shift);
    }

    Ok(decoded)
}

fn offset(seq: u32, shift: u32, uid: u32) -> usize {
    (((seq >> shift) & 0x1f) + (uid & UID_MASK)) as usize
}

fn advance(shift: u32) -> u32 {
    match shift + 3 {
        s if s > 28 => 0,
        s => s,
    }
}

fn rotate(c: char, offset: usize, forward: bool) -> char {
    let Some(index) = u8::try_from(c)
        .ok()
        .and_then(|b| WHEEL.iter().position(|&w| w == b))
    else {
        return c;
    };

    let len = WHEEL.len();
    let offset = offset % len;
    let target = if forward {
        (index + offset) % len
    } else {
        (index + len - offset) % len
    };
    char::from(WHEEL[target])
}
