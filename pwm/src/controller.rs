use std::fmt::{self, Display, Formatter};

use parking_lot::Mutex;
use safe_math::period_to_frequency;

use crate::access::Target;
use crate::backend::Backend;
use crate::error::{Error, Result, SoftResetError};
use crate::pin::PinState;

/// Capabilities of a controller. Periods are in picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerInfo {
	pub pin_count: u32,
	pub minimum_period: u64,
	pub maximum_period: u64,
}

impl ControllerInfo {
	pub fn validate(&self) -> Result<()> {
		if self.pin_count == 0 {
			return Err(Error::InvalidArgument("Controller has no pins".into()));
		}

		if self.minimum_period == 0 || self.minimum_period > self.maximum_period {
			return Err(Error::InvalidArgument(format!(
				"Invalid period range [{}, {}]", self.minimum_period, self.maximum_period)));
		}

		Ok(())
	}

	pub fn contains_period(&self, period: u64) -> bool {
		(self.minimum_period..=self.maximum_period).contains(&period)
	}

	/// Lowest frequency in Hz, the one of the maximum period.
	pub fn minimum_frequency(&self) -> Result<u64> {
		Ok(period_to_frequency(self.maximum_period)?)
	}

	pub fn maximum_frequency(&self) -> Result<u64> {
		Ok(period_to_frequency(self.minimum_period)?)
	}
}

impl Display for ControllerInfo {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Pin count: {}, minimum period: {}ps ({}Hz), maximum period: {}ps ({}Hz)",
			   self.pin_count,
			   self.minimum_period,
			   hz(self.minimum_period),
			   self.maximum_period,
			   hz(self.maximum_period))
	}
}

/// Frequency for log messages, 0 when it cannot be computed.
pub(crate) fn hz(period: u64) -> u64 {
	period_to_frequency(period).unwrap_or_default()
}

/// Controller-wide part of the state, behind the controller lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
	pub(crate) desired_period: u64,
	pub(crate) actual_period: u64,
	pub(crate) is_open_for_write: bool,
}

impl ControllerState {
	fn new(period: u64) -> Self {
		Self {
			desired_period: period,
			actual_period: period,
			is_open_for_write: false,
		}
	}

	pub fn desired_period(&self) -> u64 {
		self.desired_period
	}

	pub fn actual_period(&self) -> u64 {
		self.actual_period
	}

	pub fn is_open_for_write(&self) -> bool {
		self.is_open_for_write
	}

	/// Programs a new period. Pins keep running: their duty cycles are fractions of whatever
	/// the period is.
	pub(crate) fn set_desired_period<B: Backend + ?Sized>(&mut self, info: &ControllerInfo, backend: &B,
														  desired_period: u64) -> Result<u64> {
		if !info.contains_period(desired_period) {
			info!("Desired period {}ps out of controller limits (minimum = {}ps, maximum = {}ps)",
				  desired_period, info.minimum_period, info.maximum_period);

			return Err(Error::InvalidArgument(format!(
				"Period {}ps not within [{}, {}]",
				desired_period, info.minimum_period, info.maximum_period)));
		}

		let actual_period = backend.program_period(desired_period)
			.map_err(Error::BackendFailure)?
			.unwrap_or(desired_period);

		if !info.contains_period(actual_period) {
			error!("Backend produced period {}ps for desired period {}ps", actual_period, desired_period);

			return Err(Error::BackendFailure(anyhow!(
				"Actual period {}ps out of controller limits", actual_period)));
		}

		self.desired_period = desired_period;
		self.actual_period = actual_period;

		info!("Setting new period (desired = {}ps ({}Hz), actual = {}ps ({}Hz))",
			  desired_period, hz(desired_period), actual_period, hz(actual_period));

		Ok(actual_period)
	}
}

/// A PWM controller: capabilities, controller-wide state and one state per pin, each behind
/// its own lock, on top of a hardware backend.
///
/// The value is meant to be shared, e.g. in an `Arc`, by every session of the controller.
pub struct PwmController<B: Backend> {
	pub(crate) info: ControllerInfo,
	pub(crate) default_period: u64,
	pub(crate) state: Mutex<ControllerState>,
	pub(crate) pins: Box<[Mutex<PinState>]>,
	pub(crate) backend: B,
}

impl<B: Backend> PwmController<B> {
	/// Queries the capabilities of the backend. Nothing is programmed until the first
	/// `soft_reset`.
	pub fn attach(backend: B) -> Result<Self> {
		let info = backend.controller_info().map_err(Error::BackendFailure)?;
		info.validate()?;

		let default_period = info.minimum_period;

		info!("Controller attached ({}, default period: {}ps ({}Hz))",
			  info, default_period, hz(default_period));

		Ok(Self {
			info,
			default_period,
			state: Mutex::new(ControllerState::new(default_period)),
			pins: (0..info.pin_count).map(|_| Mutex::new(PinState::default())).collect(),
			backend,
		})
	}

	pub fn info(&self) -> &ControllerInfo {
		&self.info
	}

	pub fn default_period(&self) -> u64 {
		self.default_period
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub(crate) fn pin_slot(&self, pin: u32) -> Result<&Mutex<PinState>> {
		self.pins.get(pin as usize).ok_or(Error::OutOfRange {
			pin,
			pin_count: self.info.pin_count,
		})
	}

	pub(crate) fn reset_controller_defaults(&self, state: &mut ControllerState) -> Result<u64> {
		state.set_desired_period(&self.info, &self.backend, self.default_period)
	}

	/// Brings the controller back to the default period and every pin, in order, back to its
	/// defaults. A failure does not stop the reset of the remaining resources.
	///
	/// Write ownership is left untouched: open sessions stay open.
	pub fn soft_reset(&self) -> std::result::Result<(), SoftResetError> {
		let mut failures = Vec::new();

		{
			let mut state = self.state.lock();
			if let Err(e) = self.reset_controller_defaults(&mut state) {
				error!("Resetting controller period failed: {}", e);
				failures.push((Target::Controller, e));
			}
		}

		for (pin, slot) in self.pins.iter().enumerate() {
			let pin = pin as u32;

			if let Err(e) = slot.lock().reset_defaults(&self.backend, pin) {
				failures.push((Target::Pin(pin), e));
			}
		}

		if failures.is_empty() {
			debug!("Soft reset done");
			Ok(())
		} else {
			Err(SoftResetError { failures })
		}
	}
}
