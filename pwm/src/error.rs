use std::fmt::{self, Display, Formatter};

use safe_math::Overflow;
use thiserror::Error;

use crate::access::Target;

#[derive(Debug, Error)]
pub enum Error {
	/// A value outside of its documented range: period, duty cycle, polarity, path.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	#[error("Pin {pin} out of range (pin count = {pin_count})")]
	OutOfRange { pin: u32, pin_count: u32 },

	/// The operation is illegal in the current state of the resource.
	#[error("Invalid state: {0}")]
	InvalidState(&'static str),

	#[error("Access denied: {0}")]
	AccessDenied(String),

	/// The operation does not apply to the kind of target the session was opened on.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	#[error("Not supported: {0}")]
	NotSupported(String),

	#[error("Hardware backend failure: {0}")]
	BackendFailure(#[source] anyhow::Error),

	#[error(transparent)]
	Overflow(#[from] Overflow),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Every resource a soft reset failed to bring back to its defaults. The reset still went
/// through all the other resources.
#[derive(Debug)]
pub struct SoftResetError {
	pub failures: Vec<(Target, Error)>,
}

impl SoftResetError {
	pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
		self.failures.iter().map(|(target, _)| *target)
	}
}

impl Display for SoftResetError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Soft reset failed for {} resource(s)", self.failures.len())?;

		for (target, error) in &self.failures {
			write!(f, "; {}: {}", target, error)?;
		}

		Ok(())
	}
}

impl std::error::Error for SoftResetError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.failures
			.first()
			.map(|(_, error)| error as &(dyn std::error::Error + 'static))
	}
}
