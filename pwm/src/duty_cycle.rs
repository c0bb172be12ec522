use std::fmt::{self, Display, Formatter};

use safe_math::rounded_mul_div;

use crate::error::{Error, Result};

/// Fraction of the period during which a pin is in its active state, in fixed point.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DutyCycle(u32);

impl DutyCycle {
	/// Raw value of a 100% duty cycle.
	pub const SCALE: u32 = 1_000_000_000;

	pub const ZERO: DutyCycle = DutyCycle(0);
	pub const FULL: DutyCycle = DutyCycle(Self::SCALE);

	pub fn from_raw(raw: u32) -> Result<Self> {
		if raw > Self::SCALE {
			return Err(Error::InvalidArgument(format!(
				"Duty cycle {} exceeds {}", raw, Self::SCALE)));
		}

		Ok(DutyCycle(raw))
	}

	/// Converts a fraction within `[0, 1]`, bounds included.
	pub fn from_fraction(fraction: f64) -> Result<Self> {
		if !(0. ..=1.).contains(&fraction) {
			return Err(Error::InvalidArgument(format!(
				"Duty cycle {} not within [0, 1]", fraction)));
		}

		Ok(DutyCycle((fraction * Self::SCALE as f64).round() as u32))
	}

	pub fn raw(self) -> u32 {
		self.0
	}

	pub fn as_fraction(self) -> f64 {
		self.0 as f64 / Self::SCALE as f64
	}

	/// Active time within one period, in the unit of `period`.
	pub fn pulse_width(self, period: u64) -> safe_math::Result<u64> {
		rounded_mul_div(period, self.0, Self::SCALE as u64)
	}
}

impl Display for DutyCycle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{:.4}%", self.as_fraction() * 100.)
	}
}
