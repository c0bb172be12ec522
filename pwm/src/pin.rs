use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};

use crate::backend::{Backend, DutyCycleStatus};
use crate::duty_cycle::DutyCycle;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
	ActiveHigh,
	ActiveLow,
}

impl Polarity {
	pub fn toggled(self) -> Self {
		match self {
			Polarity::ActiveHigh => Polarity::ActiveLow,
			Polarity::ActiveLow => Polarity::ActiveHigh,
		}
	}
}

impl Default for Polarity {
	fn default() -> Self {
		Polarity::ActiveHigh
	}
}

impl TryFrom<u32> for Polarity {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			0 => Ok(Polarity::ActiveHigh),
			1 => Ok(Polarity::ActiveLow),
			other => Err(Error::InvalidArgument(format!("Invalid polarity {}", other))),
		}
	}
}

impl Display for Polarity {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Polarity::ActiveHigh => write!(f, "ActiveHigh"),
			Polarity::ActiveLow => write!(f, "ActiveLow"),
		}
	}
}

/// Software view of one PWM channel.
///
/// A pin is either stopped (initially) or started. Its duty cycle is kept across start and
/// stop, and its polarity can only change while it is stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
	pub(crate) polarity: Polarity,
	pub(crate) active_duty_cycle: DutyCycle,
	pub(crate) is_started: bool,
	pub(crate) is_open_for_write: bool,
}

impl PinState {
	pub fn polarity(&self) -> Polarity {
		self.polarity
	}

	pub fn active_duty_cycle(&self) -> DutyCycle {
		self.active_duty_cycle
	}

	pub fn is_started(&self) -> bool {
		self.is_started
	}

	pub fn is_open_for_write(&self) -> bool {
		self.is_open_for_write
	}

	pub(crate) fn start<B: Backend + ?Sized>(&mut self, backend: &B, pin: u32) -> Result<()> {
		if self.is_started {
			return Ok(());
		}

		backend.set_pin_enabled(pin, true).map_err(Error::BackendFailure)?;
		self.is_started = true;

		Ok(())
	}

	/// Stopping keeps the configuration of the pin, it does not reset it.
	pub(crate) fn stop<B: Backend + ?Sized>(&mut self, backend: &B, pin: u32) -> Result<()> {
		if !self.is_started {
			return Ok(());
		}

		backend.set_pin_enabled(pin, false).map_err(Error::BackendFailure)?;
		self.is_started = false;

		Ok(())
	}

	pub(crate) fn set_polarity<B: Backend + ?Sized>(&mut self, backend: &B, pin: u32,
													polarity: Polarity) -> Result<()> {
		if self.polarity == polarity {
			return Ok(());
		}

		if self.is_started {
			error!("Changing polarity of started pin{} is illegal", pin);
			return Err(Error::InvalidState("Cannot change the polarity of a started pin"));
		}

		backend.program_polarity(pin, polarity).map_err(Error::BackendFailure)?;
		self.polarity = polarity;

		Ok(())
	}

	pub(crate) fn set_active_duty_cycle<B: Backend + ?Sized>(&mut self, backend: &B, pin: u32,
															 duty_cycle: DutyCycle) -> Result<DutyCycleStatus> {
		let status = backend.program_duty_cycle(pin, duty_cycle)
			.map_err(Error::BackendFailure)?;

		self.active_duty_cycle = duty_cycle;

		Ok(status)
	}

	/// Stops the pin and restores the default duty cycle and polarity.
	///
	/// The defaults are applied to the software state even when the backend fails, so that
	/// both do not drift further apart. The first backend error is returned.
	pub(crate) fn reset_defaults<B: Backend + ?Sized>(&mut self, backend: &B, pin: u32) -> Result<()> {
		let mut first_error = None;
		let mut record = |result: anyhow::Result<()>, what: &str| {
			if let Err(e) = result {
				error!("Resetting pin{}: {} failed: {}", pin, what, e);
				if first_error.is_none() {
					first_error = Some(Error::BackendFailure(e));
				}
			}
		};

		if self.is_started {
			record(backend.set_pin_enabled(pin, false), "stop");
		}

		if self.active_duty_cycle != DutyCycle::ZERO {
			record(backend.program_duty_cycle(pin, DutyCycle::ZERO).map(|_| ()), "duty cycle");
		}

		if self.polarity != Polarity::ActiveHigh {
			record(backend.program_polarity(pin, Polarity::ActiveHigh), "polarity");
		}

		self.is_started = false;
		self.active_duty_cycle = DutyCycle::ZERO;
		self.polarity = Polarity::ActiveHigh;

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mocks::mock_backend::{Call, MockBackend};

	#[test]
	fn start_stop_test() {
		let backend = MockBackend::new();
		let mut pin = PinState::default();

		pin.start(&backend, 2).unwrap();
		pin.start(&backend, 2).unwrap();
		assert!(pin.is_started());

		pin.stop(&backend, 2).unwrap();
		pin.stop(&backend, 2).unwrap();
		assert!(!pin.is_started());

		// The second start and stop are no-ops
		assert_eq!(backend.calls(), vec![Call::SetPinEnabled(2, true), Call::SetPinEnabled(2, false)]);
	}

	#[test]
	fn start_failure_test() {
		let backend = MockBackend::new();
		backend.fail_pin(1);

		let mut pin = PinState::default();
		assert!(matches!(pin.start(&backend, 1), Err(Error::BackendFailure(_))));
		assert!(!pin.is_started());
	}

	#[test]
	fn polarity_test() {
		let backend = MockBackend::new();
		let mut pin = PinState::default();

		pin.set_polarity(&backend, 0, Polarity::ActiveLow).unwrap();
		assert_eq!(pin.polarity(), Polarity::ActiveLow);

		pin.start(&backend, 0).unwrap();
		assert!(matches!(pin.set_polarity(&backend, 0, Polarity::ActiveHigh), Err(Error::InvalidState(_))));
		pin.set_polarity(&backend, 0, Polarity::ActiveLow).unwrap();
		assert_eq!(pin.polarity(), Polarity::ActiveLow);
	}

	#[test]
	fn duty_cycle_survives_stop_test() {
		let backend = MockBackend::new();
		let mut pin = PinState::default();
		let duty_cycle = DutyCycle::from_fraction(0.75).unwrap();

		pin.set_active_duty_cycle(&backend, 3, duty_cycle).unwrap();
		pin.start(&backend, 3).unwrap();
		pin.stop(&backend, 3).unwrap();

		assert_eq!(pin.active_duty_cycle(), duty_cycle);
	}

	#[test]
	fn reset_defaults_test() {
		let backend = MockBackend::new();
		let mut pin = PinState::default();

		pin.set_polarity(&backend, 1, Polarity::ActiveLow).unwrap();
		pin.set_active_duty_cycle(&backend, 1, DutyCycle::from_fraction(0.5).unwrap()).unwrap();
		pin.start(&backend, 1).unwrap();

		pin.reset_defaults(&backend, 1).unwrap();
		assert_eq!(pin, PinState::default());
	}

	#[test]
	fn reset_defaults_failure_test() {
		let backend = MockBackend::new();
		let mut pin = PinState::default();
		pin.start(&backend, 0).unwrap();
		pin.set_active_duty_cycle(&backend, 0, DutyCycle::FULL).unwrap();

		backend.fail_pin(0);
		assert!(matches!(pin.reset_defaults(&backend, 0), Err(Error::BackendFailure(_))));
		assert!(!pin.is_started());
		assert_eq!(pin.active_duty_cycle(), DutyCycle::ZERO);
	}

	#[test]
	fn polarity_try_from_test() {
		assert_eq!(Polarity::try_from(0).unwrap(), Polarity::ActiveHigh);
		assert_eq!(Polarity::try_from(1).unwrap(), Polarity::ActiveLow);
		assert!(matches!(Polarity::try_from(2), Err(Error::InvalidArgument(_))));
	}
}
