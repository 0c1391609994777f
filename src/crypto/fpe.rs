//! Format-preserving encryption of digit strings (FF1 over AES-256)
//!
//! Used for values such as OTP codes that must keep their length and alphabet
//! while in transit. Input is validated against the radix before the cipher
//! ever runs.

use super::keys::SymmetricKey;
use crate::{FrameError, Result};
use aes::Aes256;
use fpe::ff1::{FlexibleNumeralString, FF1};

/// Radix used for decimal digit strings
pub const DECIMAL_RADIX: u32 = 10;

/// Largest radix a digit string can express with `0-9a-z`
const MAX_STRING_RADIX: u32 = 36;

/// Smallest domain FF1 accepts (radix^len must reach this)
const MIN_DOMAIN_SIZE: u64 = 1_000_000;

/// Encrypt a digit sequence, preserving length and radix
pub fn encrypt_fpe(digits: &[u16], key: &SymmetricKey, radix: u32, tweak: &[u8]) -> Result<Vec<u16>> {
    validate_digits(digits, radix)?;
    let cipher = ff1(key, radix)?;

    let encrypted = cipher
        .encrypt(tweak, &FlexibleNumeralString::from(digits.to_vec()))
        .map_err(|_| FrameError::encryption("FF1 encryption failed"))?;

    Ok(Vec::from(encrypted))
}

/// Decrypt a digit sequence produced by [`encrypt_fpe`]
pub fn decrypt_fpe(digits: &[u16], key: &SymmetricKey, radix: u32, tweak: &[u8]) -> Result<Vec<u16>> {
    validate_digits(digits, radix)?;
    let cipher = ff1(key, radix)?;

    let decrypted = cipher
        .decrypt(tweak, &FlexibleNumeralString::from(digits.to_vec()))
        .map_err(|_| FrameError::decryption("FF1 decryption failed"))?;

    Ok(Vec::from(decrypted))
}

/// Encrypt a digit string such as `"123456"`
///
/// Characters are read as digits of `radix` (at most 36), so the output uses
/// the same alphabet as the input.
pub fn encrypt_fpe_str(input: &str, key: &SymmetricKey, radix: u32, tweak: &[u8]) -> Result<String> {
    let digits = parse_digits(input, radix)?;
    let encrypted = encrypt_fpe(&digits, key, radix, tweak)?;
    render_digits(&encrypted, radix)
}

/// Decrypt a digit string produced by [`encrypt_fpe_str`]
pub fn decrypt_fpe_str(input: &str, key: &SymmetricKey, radix: u32, tweak: &[u8]) -> Result<String> {
    let digits = parse_digits(input, radix)?;
    let decrypted = decrypt_fpe(&digits, key, radix, tweak)?;
    render_digits(&decrypted, radix)
}

/// Check radix bounds, digit range and minimum domain size
pub fn validate_digits(digits: &[u16], radix: u32) -> Result<()> {
    if !(2..=(1 << 16)).contains(&radix) {
        return Err(FrameError::validation(format!(
            "Radix must be between 2 and 65536, got {}",
            radix
        )));
    }

    if let Some((position, digit)) = digits
        .iter()
        .enumerate()
        .find(|(_, digit)| u32::from(**digit) >= radix)
    {
        return Err(FrameError::validation(format!(
            "Digit {} at position {} is not valid for radix {}",
            digit, position, radix
        )));
    }

    let mut domain: u64 = 1;
    for _ in 0..digits.len() {
        domain = domain.saturating_mul(u64::from(radix));
        if domain >= MIN_DOMAIN_SIZE {
            return Ok(());
        }
    }

    Err(FrameError::validation(format!(
        "{} digits in radix {} is below the minimum FF1 domain size",
        digits.len(),
        radix
    )))
}

fn ff1(key: &SymmetricKey, radix: u32) -> Result<FF1<Aes256>> {
    FF1::<Aes256>::new(key.as_bytes(), radix)
        .map_err(|_| FrameError::validation(format!("Unsupported radix {}", radix)))
}

fn parse_digits(input: &str, radix: u32) -> Result<Vec<u16>> {
    if !(2..=MAX_STRING_RADIX).contains(&radix) {
        return Err(FrameError::validation(format!(
            "Digit strings support radix 2 to {}, got {}",
            MAX_STRING_RADIX, radix
        )));
    }

    input
        .chars()
        .map(|c| {
            c.to_digit(radix)
                .map(|d| d as u16)
                .ok_or_else(|| FrameError::validation(format!("'{}' is not a digit in radix {}", c, radix)))
        })
        .collect()
}

fn render_digits(digits: &[u16], radix: u32) -> Result<String> {
    digits
        .iter()
        .map(|d| {
            char::from_digit(u32::from(*d), radix)
                .ok_or_else(|| FrameError::validation(format!("{} is not a digit in radix {}", d, radix)))
        })
        .collect()
}
