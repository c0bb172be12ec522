// This file is only compiled during tests

use parking_lot::Mutex;

use crate::backend::{Backend, DutyCycleStatus};
use crate::controller::ControllerInfo;
use crate::duty_cycle::DutyCycle;
use crate::pin::Polarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
	ProgramPeriod(u64),
	ProgramDutyCycle(u32, DutyCycle),
	ProgramPolarity(u32, Polarity),
	SetPinEnabled(u32, bool),
}

/// Records every call and fails on demand.
pub struct MockBackend {
	calls: Mutex<Vec<Call>>,
	failing_pin: Mutex<Option<u32>>,
	failing_period: Mutex<bool>,
	period_granularity: Mutex<Option<u64>>,
	duty_cycle_status: Mutex<DutyCycleStatus>,
}

impl MockBackend {
	pub fn new() -> Self {
		MockBackend {
			calls: Mutex::new(Vec::new()),
			failing_pin: Mutex::new(None),
			failing_period: Mutex::new(false),
			period_granularity: Mutex::new(None),
			duty_cycle_status: Mutex::new(DutyCycleStatus::Applied),
		}
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn clear_calls(&self) {
		self.calls.lock().clear();
	}

	/// Every call for `pin` fails from now on.
	pub fn fail_pin(&self, pin: u32) {
		*self.failing_pin.lock() = Some(pin);
	}

	pub fn fail_period(&self, fail: bool) {
		*self.failing_period.lock() = fail;
	}

	/// Actual periods are the desired ones rounded down to a multiple of `granularity`.
	pub fn set_period_granularity(&self, granularity: u64) {
		*self.period_granularity.lock() = Some(granularity);
	}

	pub fn set_duty_cycle_status(&self, status: DutyCycleStatus) {
		*self.duty_cycle_status.lock() = status;
	}

	fn record(&self, call: Call, pin: Option<u32>) -> anyhow::Result<()> {
		self.calls.lock().push(call);

		match pin {
			Some(pin) if *self.failing_pin.lock() == Some(pin) => Err(anyhow!("Mock failure on pin{}", pin)),
			_ => Ok(()),
		}
	}
}

impl Backend for MockBackend {
	fn controller_info(&self) -> anyhow::Result<ControllerInfo> {
		Ok(ControllerInfo {
			pin_count: 4,
			minimum_period: 62_500_000,
			maximum_period: 250_000_000_000,
		})
	}

	fn program_period(&self, period: u64) -> anyhow::Result<Option<u64>> {
		self.record(Call::ProgramPeriod(period), None)?;

		if *self.failing_period.lock() {
			return Err(anyhow!("Mock period failure"));
		}

		Ok(self.period_granularity.lock().map(|granularity| period / granularity * granularity))
	}

	fn program_duty_cycle(&self, pin: u32, duty_cycle: DutyCycle) -> anyhow::Result<DutyCycleStatus> {
		self.record(Call::ProgramDutyCycle(pin, duty_cycle), Some(pin))?;
		Ok(*self.duty_cycle_status.lock())
	}

	fn program_polarity(&self, pin: u32, polarity: Polarity) -> anyhow::Result<()> {
		self.record(Call::ProgramPolarity(pin, polarity), Some(pin))
	}

	fn set_pin_enabled(&self, pin: u32, enabled: bool) -> anyhow::Result<()> {
		self.record(Call::SetPinEnabled(pin, enabled), Some(pin))
	}
}
