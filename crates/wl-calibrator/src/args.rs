//! Command argument helpers

use crate::error::{CalError, Result};
use crate::mac::MacAddr;

/// Parse a decimal or `0x` hexadecimal unsigned number that fits `T`
///
/// # Errors
///
/// Returns `CalError::Usage` naming `what` on malformed or out-of-range input.
pub fn parse_num<T: TryFrom<u64>>(arg: &str, what: &str) -> Result<T> {
    let value = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse::<u64>(),
    }
    .map_err(|_| CalError::usage(format!("Invalid {what}: {arg}")))?;

    let out_of_range = || CalError::usage(format!("{what} out of range: {arg}"));
    T::try_from(value).map_err(|_| out_of_range())
}

/// Parse a signed decimal number, or a non-negative `0x` hexadecimal one,
/// that fits `T`
///
/// # Errors
///
/// Returns `CalError::Usage` naming `what` on malformed or out-of-range input.
pub fn parse_signed<T: TryFrom<i64>>(arg: &str, what: &str) -> Result<T> {
    let out_of_range = || CalError::usage(format!("{what} out of range: {arg}"));
    let value = if arg.starts_with("0x") || arg.starts_with("0X") {
        let raw: u64 = parse_num(arg, what)?;
        i64::try_from(raw).map_err(|_| out_of_range())?
    } else {
        arg.parse::<i64>()
            .map_err(|_| CalError::usage(format!("Invalid {what}: {arg}")))?
    };
    T::try_from(value).map_err(|_| out_of_range())
}

/// Parse a `0` / `1` flag
///
/// # Errors
///
/// Returns `CalError::Usage` for anything else.
pub fn parse_flag(arg: &str, what: &str) -> Result<bool> {
    match arg {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(CalError::usage(format!("{what} must be 0 or 1, got {arg}"))),
    }
}

/// Parse a MAC address argument
///
/// # Errors
///
/// Returns `CalError::Usage` on malformed input.
pub fn parse_mac(arg: &str) -> Result<MacAddr> {
    arg.parse()
}

/// Require exactly `n` arguments
///
/// # Errors
///
/// Returns `CalError::Usage` otherwise.
pub fn expect_exact(args: &[&str], n: usize) -> Result<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(CalError::usage(format!("Expected {n} argument(s), got {}", args.len())))
    }
}

/// Require between `min` and `max` arguments
///
/// # Errors
///
/// Returns `CalError::Usage` otherwise.
pub fn expect_range(args: &[&str], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(CalError::usage(format!(
            "Expected {min}..={max} arguments, got {}",
            args.len()
        )))
    }
}
