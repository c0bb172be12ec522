//! Overflow-checked integer helpers used for PWM timing.
//!
//! Every division rounds to the nearest integer, halves rounding up: 3.5 and 3.75 give 4,
//! 3.25 gives 3. Times are expressed in picoseconds and frequencies in Hertz.

use thiserror::Error;

/// One second, in picoseconds.
pub const PICOSECONDS_PER_SECOND: u64 = 1_000_000_000_000;

/// An intermediate value did not fit in 64 bits, or the divisor was zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arithmetic overflow")]
pub struct Overflow;

pub type Result<T> = std::result::Result<T, Overflow>;

/// Returns `dividend / divisor` rounded to the nearest integer.
pub fn rounded_div(dividend: u64, divisor: u64) -> Result<u64> {
	if divisor == 0 {
		return Err(Overflow);
	}

	dividend
		.checked_add(divisor / 2)
		.map(|n| n / divisor)
		.ok_or(Overflow)
}

/// Returns `(left + right) / divisor` rounded to the nearest integer.
pub fn rounded_add_div(left: u64, right: u64, divisor: u64) -> Result<u64> {
	let dividend = left.checked_add(right).ok_or(Overflow)?;
	rounded_div(dividend, divisor)
}

/// Returns `(mul64 * mul32) / div64` rounded to the nearest integer.
///
/// The product is never formed as a whole: with `q = mul64 / div64` and `r = mul64 % div64`
/// the result is `q * mul32 + round(r * mul32 / div64)`, so the only overflow reported is the
/// one of a result, or a remainder product, that genuinely does not fit in 64 bits.
pub fn rounded_mul_div(mul64: u64, mul32: u32, div64: u64) -> Result<u64> {
	if div64 == 0 {
		return Err(Overflow);
	}

	let q = mul64 / div64;
	let r = mul64 % div64;

	let q_mul = q.checked_mul(mul32 as u64).ok_or(Overflow)?;
	let r_mul = r.checked_mul(mul32 as u64).ok_or(Overflow)?;

	q_mul.checked_add(rounded_div(r_mul, div64)?).ok_or(Overflow)
}

/// Same rounding as [`rounded_div`] without the overflow check.
///
/// # Panics
/// Panics on a zero divisor, and in debug builds when `dividend + divisor / 2` overflows.
/// Only use it where both operands are known to be small.
pub fn rounded_div_unchecked(dividend: u64, divisor: u64) -> u64 {
	(dividend + divisor / 2) / divisor
}

/// Frequency in Hertz of a signal with the given period in picoseconds.
pub fn period_to_frequency(period: u64) -> Result<u64> {
	rounded_div(PICOSECONDS_PER_SECOND, period)
}

/// Period in picoseconds of a signal with the given frequency in Hertz.
///
/// Not an exact inverse of [`period_to_frequency`]: both directions round.
pub fn frequency_to_period(frequency: u64) -> Result<u64> {
	rounded_div(PICOSECONDS_PER_SECOND, frequency)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rounded_div_test() {
		assert_eq!(rounded_div(7, 2), Ok(4));
		assert_eq!(rounded_div(5, 2), Ok(3));
		assert_eq!(rounded_div(15, 4), Ok(4));
		assert_eq!(rounded_div(13, 4), Ok(3));
		assert_eq!(rounded_div(14, 4), Ok(4));
		assert_eq!(rounded_div(0, 9), Ok(0));
	}

	#[test]
	fn rounded_div_overflow_test() {
		assert_eq!(rounded_div(u64::MAX, 2), Err(Overflow));
		assert_eq!(rounded_div(u64::MAX, 1), Ok(u64::MAX));
		assert_eq!(rounded_div(1, 0), Err(Overflow));
	}

	#[test]
	fn rounded_add_div_test() {
		assert_eq!(rounded_add_div(5, 2, 2), Ok(4));
		assert_eq!(rounded_add_div(10, 3, 4), Ok(3));
		assert_eq!(rounded_add_div(u64::MAX, 1, 2), Err(Overflow));
		assert_eq!(rounded_add_div(u64::MAX - 1, 1, 2), Err(Overflow));
		assert_eq!(rounded_add_div(u64::MAX - 1, 1, 1), Ok(u64::MAX));
	}

	#[test]
	fn rounded_mul_div_test() {
		assert_eq!(rounded_mul_div(10, 3, 4), Ok(8)); // 7.5
		assert_eq!(rounded_mul_div(10, 1, 3), Ok(3)); // 3.33
		assert_eq!(rounded_mul_div(100, 0, 7), Ok(0));
		assert_eq!(rounded_mul_div(250_000_000_000, 500_000_000, 1_000_000_000), Ok(125_000_000_000));
	}

	#[test]
	fn rounded_mul_div_large_operands_test() {
		// The full product needs more than 64 bits, the result does not.
		assert_eq!(rounded_mul_div(u64::MAX, u32::MAX, u32::MAX as u64), Ok(u64::MAX));
		assert_eq!(rounded_mul_div(u64::MAX, 2, 1), Err(Overflow));
		assert_eq!(rounded_mul_div(1, 1, 0), Err(Overflow));
	}

	#[test]
	fn unchecked_test() {
		assert_eq!(rounded_div_unchecked(7, 2), 4);
		assert_eq!(rounded_div_unchecked(13, 4), 3);
	}
}
