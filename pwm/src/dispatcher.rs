use safe_math::{frequency_to_period, period_to_frequency};

use crate::access::{Session, Target, TargetKind};
use crate::backend::{Backend, DutyCycleStatus};
use crate::controller::{ControllerInfo, ControllerState, PwmController};
use crate::duty_cycle::DutyCycle;
use crate::error::{Error, Result};
use crate::pin::{PinState, Polarity};

/// A request on an open session. Pin operations apply to the pin the session was opened on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
	GetControllerInfo,
	GetActualPeriod,
	/// Period in picoseconds.
	SetDesiredPeriod(u64),
	GetPolarity,
	SetPolarity(Polarity),
	GetActiveDutyCycle,
	/// Fraction of the period, within `[0, 1]`.
	SetActiveDutyCycle(f64),
	Start,
	Stop,
	IsStarted,
}

impl Operation {
	pub fn target_kind(&self) -> TargetKind {
		match self {
			Operation::GetControllerInfo
			| Operation::GetActualPeriod
			| Operation::SetDesiredPeriod(_) => TargetKind::Controller,
			_ => TargetKind::Pin,
		}
	}

	pub fn requires_write(&self) -> bool {
		match self {
			Operation::SetDesiredPeriod(_)
			| Operation::SetPolarity(_)
			| Operation::SetActiveDutyCycle(_)
			| Operation::Start
			| Operation::Stop => true,
			_ => false,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Operation::GetControllerInfo => "GetControllerInfo",
			Operation::GetActualPeriod => "GetActualPeriod",
			Operation::SetDesiredPeriod(_) => "SetDesiredPeriod",
			Operation::GetPolarity => "GetPolarity",
			Operation::SetPolarity(_) => "SetPolarity",
			Operation::GetActiveDutyCycle => "GetActiveDutyCycle",
			Operation::SetActiveDutyCycle(_) => "SetActiveDutyCycle",
			Operation::Start => "Start",
			Operation::Stop => "Stop",
			Operation::IsStarted => "IsStarted",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
	ControllerInfo(ControllerInfo),
	/// Actual period in picoseconds.
	Period(u64),
	Polarity(Polarity),
	ActiveDutyCycle(f64),
	DutyCycleStatus(DutyCycleStatus),
	IsStarted(bool),
	Done,
}

impl<B: Backend> PwmController<B> {
	fn check_request(&self, session: &Session, operation: &Operation) -> Result<()> {
		trace!("{} on {}", operation.name(), session.target());

		if session.target().kind() != operation.target_kind() {
			warn!("{} is not a valid request for {}", operation.name(), session.target());
			return Err(Error::InvalidRequest(format!(
				"{} cannot be requested on {}", operation.name(), session.target())));
		}

		if operation.requires_write() && !session.is_open_for_write() {
			warn!("{} on {} requires write access", operation.name(), session.target());
			return Err(Error::AccessDenied(format!(
				"{} requires {} to be open for write", operation.name(), session.target())));
		}

		Ok(())
	}

	fn controller_request<T, F>(&self, session: &Session, operation: Operation, f: F) -> Result<T>
		where F: FnOnce(&mut ControllerState) -> Result<T> {
		self.check_request(session, &operation)?;

		let mut state = self.state.lock();
		f(&mut state)
	}

	fn pin_request<T, F>(&self, session: &Session, operation: Operation, f: F) -> Result<T>
		where F: FnOnce(&mut PinState, u32) -> Result<T> {
		self.check_request(session, &operation)?;

		let pin = match session.target() {
			Target::Pin(pin) => pin,
			Target::Controller => return Err(Error::InvalidRequest(operation.name().into())),
		};

		let mut state = self.pin_slot(pin)?.lock();
		f(&mut state, pin)
	}

	pub fn controller_info(&self, session: &Session) -> Result<ControllerInfo> {
		let info = self.info;
		self.controller_request(session, Operation::GetControllerInfo, |_| Ok(info))
	}

	/// Period in picoseconds actually produced by the backend.
	pub fn actual_period(&self, session: &Session) -> Result<u64> {
		self.controller_request(session, Operation::GetActualPeriod, |state| Ok(state.actual_period))
	}

	/// Returns the actual period, which may differ from the desired one by the granularity of
	/// the backend.
	pub fn set_desired_period(&self, session: &Session, period: u64) -> Result<u64> {
		self.controller_request(session, Operation::SetDesiredPeriod(period), |state| {
			state.set_desired_period(&self.info, &self.backend, period)
		})
	}

	pub fn actual_frequency(&self, session: &Session) -> Result<u64> {
		Ok(period_to_frequency(self.actual_period(session)?)?)
	}

	/// Frequency in Hz. Returns the actual frequency.
	pub fn set_desired_frequency(&self, session: &Session, frequency: u64) -> Result<u64> {
		if frequency == 0 {
			return Err(Error::InvalidArgument("Frequency must be positive".into()));
		}

		let period = frequency_to_period(frequency)?;
		Ok(period_to_frequency(self.set_desired_period(session, period)?)?)
	}

	pub fn polarity(&self, session: &Session) -> Result<Polarity> {
		self.pin_request(session, Operation::GetPolarity, |state, _| Ok(state.polarity))
	}

	pub fn set_polarity(&self, session: &Session, polarity: Polarity) -> Result<()> {
		self.pin_request(session, Operation::SetPolarity(polarity), |state, pin| {
			state.set_polarity(&self.backend, pin, polarity)
		})
	}

	pub fn active_duty_cycle(&self, session: &Session) -> Result<f64> {
		self.pin_request(session, Operation::GetActiveDutyCycle, |state, _| {
			Ok(state.active_duty_cycle.as_fraction())
		})
	}

	/// `Pending` is a success: the backend accepted the value and applies it later.
	pub fn set_active_duty_cycle(&self, session: &Session, fraction: f64) -> Result<DutyCycleStatus> {
		self.pin_request(session, Operation::SetActiveDutyCycle(fraction), |state, pin| {
			let duty_cycle = DutyCycle::from_fraction(fraction)?;
			let status = state.set_active_duty_cycle(&self.backend, pin, duty_cycle)?;

			debug!("Pin{} duty cycle set to {} ({:?})", pin, duty_cycle, status);

			Ok(status)
		})
	}

	pub fn start(&self, session: &Session) -> Result<()> {
		self.pin_request(session, Operation::Start, |state, pin| state.start(&self.backend, pin))
	}

	pub fn stop(&self, session: &Session) -> Result<()> {
		self.pin_request(session, Operation::Stop, |state, pin| state.stop(&self.backend, pin))
	}

	pub fn is_started(&self, session: &Session) -> Result<bool> {
		self.pin_request(session, Operation::IsStarted, |state, _| Ok(state.is_started))
	}

	/// Single entry point for transports forwarding raw requests.
	pub fn execute(&self, session: &Session, operation: Operation) -> Result<Response> {
		Ok(match operation {
			Operation::GetControllerInfo => Response::ControllerInfo(self.controller_info(session)?),
			Operation::GetActualPeriod => Response::Period(self.actual_period(session)?),
			Operation::SetDesiredPeriod(period) => Response::Period(self.set_desired_period(session, period)?),
			Operation::GetPolarity => Response::Polarity(self.polarity(session)?),
			Operation::SetPolarity(polarity) => {
				self.set_polarity(session, polarity)?;
				Response::Done
			}
			Operation::GetActiveDutyCycle => Response::ActiveDutyCycle(self.active_duty_cycle(session)?),
			Operation::SetActiveDutyCycle(fraction) => {
				Response::DutyCycleStatus(self.set_active_duty_cycle(session, fraction)?)
			}
			Operation::Start => {
				self.start(session)?;
				Response::Done
			}
			Operation::Stop => {
				self.stop(session)?;
				Response::Done
			}
			Operation::IsStarted => Response::IsStarted(self.is_started(session)?),
		})
	}
}
