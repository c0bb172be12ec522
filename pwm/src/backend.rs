use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::controller::ControllerInfo;
use crate::duty_cycle::DutyCycle;
use crate::pin::Polarity;

/// How a backend completed a duty cycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyCycleStatus {
	/// The new duty cycle is in effect.
	Applied,
	/// The sample was queued, e.g. in a hardware FIFO, and takes effect later.
	Pending,
}

/// Hardware side of a PWM controller.
///
/// Calls are made while the lock of the affected resource is held, so implementations must
/// complete in bounded time, reporting failure or a pending duty cycle rather than blocking.
pub trait Backend: Send + Sync {
	/// Queried once, when the controller is attached.
	fn controller_info(&self) -> anyhow::Result<ControllerInfo>;

	/// Programs the period shared by every pin. Returns the period actually produced, or
	/// `None` when it is exactly the requested one.
	fn program_period(&self, period: u64) -> anyhow::Result<Option<u64>>;

	fn program_duty_cycle(&self, pin: u32, duty_cycle: DutyCycle) -> anyhow::Result<DutyCycleStatus>;

	fn program_polarity(&self, pin: u32, polarity: Polarity) -> anyhow::Result<()>;

	fn set_pin_enabled(&self, pin: u32, enabled: bool) -> anyhow::Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
	fn controller_info(&self) -> anyhow::Result<ControllerInfo> {
		(**self).controller_info()
	}

	fn program_period(&self, period: u64) -> anyhow::Result<Option<u64>> {
		(**self).program_period(period)
	}

	fn program_duty_cycle(&self, pin: u32, duty_cycle: DutyCycle) -> anyhow::Result<DutyCycleStatus> {
		(**self).program_duty_cycle(pin, duty_cycle)
	}

	fn program_polarity(&self, pin: u32, polarity: Polarity) -> anyhow::Result<()> {
		(**self).program_polarity(pin, polarity)
	}

	fn set_pin_enabled(&self, pin: u32, enabled: bool) -> anyhow::Result<()> {
		(**self).set_pin_enabled(pin, enabled)
	}
}

pub const VIRTUAL_PIN_COUNT: u32 = 4;

/// 16 kHz
pub const VIRTUAL_MINIMUM_PERIOD: u64 = 62_500_000;

/// 4 Hz
pub const VIRTUAL_MAXIMUM_PERIOD: u64 = 250_000_000_000;

/// Last values programmed into a virtual channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PinRegisters {
	pub duty_cycle: DutyCycle,
	pub polarity: Polarity,
	pub enabled: bool,
}

/// A controller without hardware: every value is accepted as is and only remembered.
pub struct VirtualBackend {
	info: ControllerInfo,
	sample_fifo: bool,
	period: AtomicU64,
	pins: Vec<Mutex<PinRegisters>>,
}

impl VirtualBackend {
	pub fn new() -> Self {
		Self::with_info(ControllerInfo {
			pin_count: VIRTUAL_PIN_COUNT,
			minimum_period: VIRTUAL_MINIMUM_PERIOD,
			maximum_period: VIRTUAL_MAXIMUM_PERIOD,
		})
	}

	pub fn with_info(info: ControllerInfo) -> Self {
		Self {
			info,
			sample_fifo: false,
			period: AtomicU64::new(0),
			pins: (0..info.pin_count).map(|_| Mutex::new(PinRegisters::default())).collect(),
		}
	}

	/// Duty cycle changes go through a sample FIFO and are reported as pending.
	pub fn with_sample_fifo(mut self, sample_fifo: bool) -> Self {
		self.sample_fifo = sample_fifo;
		self
	}

	/// Last programmed period, 0 before the first one.
	pub fn period(&self) -> u64 {
		self.period.load(Ordering::SeqCst)
	}

	pub fn registers(&self, pin: u32) -> Option<PinRegisters> {
		self.pins.get(pin as usize).map(|registers| *registers.lock())
	}

	fn pin(&self, pin: u32) -> anyhow::Result<&Mutex<PinRegisters>> {
		self.pins
			.get(pin as usize)
			.ok_or_else(|| anyhow!("Virtual controller has no pin {}", pin))
	}
}

impl Default for VirtualBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl Backend for VirtualBackend {
	fn controller_info(&self) -> anyhow::Result<ControllerInfo> {
		Ok(self.info)
	}

	fn program_period(&self, period: u64) -> anyhow::Result<Option<u64>> {
		self.period.store(period, Ordering::SeqCst);
		Ok(None)
	}

	fn program_duty_cycle(&self, pin: u32, duty_cycle: DutyCycle) -> anyhow::Result<DutyCycleStatus> {
		self.pin(pin)?.lock().duty_cycle = duty_cycle;

		if self.sample_fifo {
			Ok(DutyCycleStatus::Pending)
		} else {
			Ok(DutyCycleStatus::Applied)
		}
	}

	fn program_polarity(&self, pin: u32, polarity: Polarity) -> anyhow::Result<()> {
		self.pin(pin)?.lock().polarity = polarity;
		Ok(())
	}

	fn set_pin_enabled(&self, pin: u32, enabled: bool) -> anyhow::Result<()> {
		self.pin(pin)?.lock().enabled = enabled;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn virtual_backend_test() {
		let backend = VirtualBackend::new();
		assert_eq!(backend.program_period(1_000_000_000).unwrap(), None);
		assert_eq!(backend.period(), 1_000_000_000);

		let duty_cycle = DutyCycle::from_fraction(0.2).unwrap();
		assert_eq!(backend.program_duty_cycle(3, duty_cycle).unwrap(), DutyCycleStatus::Applied);
		backend.program_polarity(3, Polarity::ActiveLow).unwrap();
		backend.set_pin_enabled(3, true).unwrap();

		assert_eq!(backend.registers(3), Some(PinRegisters {
			duty_cycle,
			polarity: Polarity::ActiveLow,
			enabled: true,
		}));

		assert!(backend.set_pin_enabled(4, true).is_err());
		assert_eq!(backend.registers(4), None);
	}

	#[test]
	fn sample_fifo_test() {
		let backend = VirtualBackend::new().with_sample_fifo(true);
		assert_eq!(backend.program_duty_cycle(0, DutyCycle::FULL).unwrap(), DutyCycleStatus::Pending);
	}

	#[test]
	fn boxed_backend_test() {
		let backend: Box<dyn Backend> = Box::new(VirtualBackend::new());
		assert_eq!(backend.controller_info().unwrap().pin_count, VIRTUAL_PIN_COUNT);
	}
}
