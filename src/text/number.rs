//! Number parsing straight from bytes.
//!
//! Integers saturate to the bounds of the target type instead of failing, so an
//! oversized value in a chart reads as `MAX`/`MIN` and the digits are still consumed.

use num::PrimInt;

/// Parses an optionally signed decimal integer at the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if there is no digit.
/// A leading `-` on an unsigned type saturates to zero.
#[must_use]
pub fn parse_integer<T: PrimInt>(bytes: &[u8]) -> Option<(T, usize)> {
    let (negative, mut used) = match bytes.first() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };
    let ten = T::from(10)?;
    let mut value = T::zero();
    let mut saturated = false;
    let digits_start = used;
    while let Some(&byte) = bytes.get(used) {
        if !byte.is_ascii_digit() {
            break;
        }
        used += 1;
        if saturated {
            continue;
        }
        let Some(digit) = T::from(byte - b'0') else {
            saturated = true;
            value = if negative { T::min_value() } else { T::max_value() };
            continue;
        };
        let next = value.checked_mul(&ten).and_then(|shifted| {
            if negative {
                shifted.checked_sub(&digit)
            } else {
                shifted.checked_add(&digit)
            }
        });
        match next {
            Some(next) => value = next,
            None => {
                saturated = true;
                value = if negative { T::min_value() } else { T::max_value() };
            }
        }
    }
    (used > digits_start).then_some((value, used))
}

/// Parses a decimal number such as `-12.5` or `3e2` at the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if there is no digit.
#[must_use]
pub fn parse_float(bytes: &[u8]) -> Option<(f64, usize)> {
    let (sign, mut used) = match bytes.first() {
        Some(b'-') => (-1.0, 1),
        Some(b'+') => (1.0, 1),
        _ => (1.0, 0),
    };
    let mut value = 0.0f64;
    let mut digits = 0usize;
    while let Some(&byte) = bytes.get(used).filter(|byte| byte.is_ascii_digit()) {
        value = value * 10.0 + f64::from(byte - b'0');
        digits += 1;
        used += 1;
    }
    if bytes.get(used) == Some(&b'.') {
        used += 1;
        let mut scale = 0.1;
        while let Some(&byte) = bytes.get(used).filter(|byte| byte.is_ascii_digit()) {
            value += f64::from(byte - b'0') * scale;
            scale *= 0.1;
            digits += 1;
            used += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(used), Some(b'e' | b'E'))
        && let Some((exponent, exponent_len)) =
            bytes.get(used + 1..).and_then(parse_integer::<i32>)
    {
        value *= 10f64.powi(exponent);
        used += 1 + exponent_len;
    }
    Some((sign * value, used))
}
