// Adapted from libraries `rppal` by Rene van der Meer and `sysfs-pwm` by the Rust Embedded team

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use safe_math::{rounded_div, Overflow};

use crate::backend::{Backend, DutyCycleStatus};
use crate::controller::ControllerInfo;
use crate::duty_cycle::DutyCycle;
use crate::pin::Polarity;

pub const SYSFS_PWM_PATH: &'static str = "/sys/class/pwm";

const PICOSECONDS_PER_NANOSECOND: u64 = 1_000;

#[derive(Debug)]
pub struct PwmChip {
	path: PathBuf,
}

impl PwmChip {
	pub fn new<P: AsRef<Path>>(root: P, number: u32) -> io::Result<PwmChip> {
		let path = root.as_ref().join(format!("pwmchip{}", number));
		fs::metadata(&path)?;

		Ok(PwmChip { path })
	}

	pub fn count(&self) -> anyhow::Result<u32> {
		let npwm = fs::read_to_string(self.path.join("npwm"))?;
		Ok(npwm.trim().parse()?)
	}
}

#[derive(Debug)]
struct Channel {
	chip_path: PathBuf,
	number: u32,
}

impl Channel {
	fn path(&self) -> PathBuf {
		self.chip_path.join(format!("pwm{}", self.number))
	}

	fn export(&self) -> io::Result<()> {
		// Exporting a PWM channel takes a significant time, that is also unpredictable.
		let path = self.path();
		if !path.exists() {
			File::create(self.chip_path.join("export"))?
				.write_fmt(format_args!("{}", self.number))?;

			const MAX_RETRY: usize = 25;
			const EXPORT_DELAY: Duration = Duration::from_millis(30);
			for _ in 0..MAX_RETRY {
				if path.exists() {
					break;
				}
				std::thread::sleep(EXPORT_DELAY);
			}
		}

		fs::metadata(path).map(|_| ())
	}

	fn unexport(&self) -> io::Result<()> {
		// Only unexport if the channel is actually exported
		if self.path().exists() {
			File::create(self.chip_path.join("unexport"))?
				.write_fmt(format_args!("{}", self.number))?;
		}

		Ok(())
	}

	fn write_attribute<T: Display>(&self, attribute: &str, value: T) -> io::Result<()> {
		File::create(self.path().join(attribute))?
			.write_fmt(format_args!("{}", value))
	}

	/// Period currently set in the kernel, in nanoseconds. 0 when it cannot be read.
	fn period(&self) -> u64 {
		fs::read_to_string(self.path().join("period"))
			.ok()
			.and_then(|period| period.trim().parse().ok())
			.unwrap_or(0)
	}
}

struct Registers {
	period_ns: u64,
	duty_cycles: Vec<DutyCycle>,
}

/// Backend forwarding to the Linux sysfs PWM interface of one chip.
///
/// The kernel expresses times in nanoseconds, so the actual period is the desired one rounded
/// to the nearest nanosecond. The duty cycle written to sysfs is a pulse width: it is
/// recomputed for every channel when the period changes.
pub struct SysfsBackend {
	info: ControllerInfo,
	channels: Vec<Channel>,
	registers: Mutex<Registers>,
}

impl SysfsBackend {
	/// Exports every channel of `pwmchip<chip>` under `root`, usually [`SYSFS_PWM_PATH`].
	pub fn new<P: AsRef<Path>>(root: P, chip: u32, minimum_period: u64, maximum_period: u64) -> anyhow::Result<Self> {
		let chip = PwmChip::new(root, chip)?;
		let pin_count = chip.count()?;

		let channels = (0..pin_count)
			.map(|number| Channel { chip_path: chip.path.clone(), number })
			.collect::<Vec<_>>();

		for channel in &channels {
			channel.export()
				.map_err(|e| anyhow!("Exporting {} failed: {}", channel.path().display(), e))?;
		}

		info!("Exported {} channel(s) of {}", pin_count, chip.path.display());

		Ok(Self {
			info: ControllerInfo {
				pin_count,
				minimum_period,
				maximum_period,
			},
			channels,
			registers: Mutex::new(Registers {
				period_ns: 0,
				duty_cycles: vec![DutyCycle::ZERO; pin_count as usize],
			}),
		})
	}

	fn channel(&self, pin: u32) -> anyhow::Result<&Channel> {
		self.channels
			.get(pin as usize)
			.ok_or_else(|| anyhow!("Sysfs chip has no channel {}", pin))
	}
}

impl Backend for SysfsBackend {
	fn controller_info(&self) -> anyhow::Result<ControllerInfo> {
		Ok(self.info)
	}

	fn program_period(&self, period: u64) -> anyhow::Result<Option<u64>> {
		let period_ns = rounded_div(period, PICOSECONDS_PER_NANOSECOND)?;
		let actual_period = period_ns.checked_mul(PICOSECONDS_PER_NANOSECOND).ok_or(Overflow)?;

		let mut registers = self.registers.lock();

		// The kernel rejects any pulse width longer than the period
		for (channel, duty_cycle) in self.channels.iter().zip(registers.duty_cycles.iter()) {
			let pulse_width = duty_cycle.pulse_width(period_ns)?;

			if period_ns < channel.period() {
				channel.write_attribute("duty_cycle", pulse_width)?;
				channel.write_attribute("period", period_ns)?;
			} else {
				channel.write_attribute("period", period_ns)?;
				channel.write_attribute("duty_cycle", pulse_width)?;
			}
		}

		registers.period_ns = period_ns;

		Ok(Some(actual_period))
	}

	fn program_duty_cycle(&self, pin: u32, duty_cycle: DutyCycle) -> anyhow::Result<DutyCycleStatus> {
		let channel = self.channel(pin)?;
		let mut registers = self.registers.lock();

		channel.write_attribute("duty_cycle", duty_cycle.pulse_width(registers.period_ns)?)?;
		registers.duty_cycles[pin as usize] = duty_cycle;

		Ok(DutyCycleStatus::Applied)
	}

	fn program_polarity(&self, pin: u32, polarity: Polarity) -> anyhow::Result<()> {
		let polarity = match polarity {
			Polarity::ActiveHigh => "normal",
			Polarity::ActiveLow => "inversed",
		};

		Ok(self.channel(pin)?.write_attribute("polarity", polarity)?)
	}

	fn set_pin_enabled(&self, pin: u32, enabled: bool) -> anyhow::Result<()> {
		Ok(self.channel(pin)?.write_attribute("enable", enabled as u8)?)
	}
}

impl Drop for SysfsBackend {
	fn drop(&mut self) {
		for channel in &self.channels {
			if let Err(e) = channel.unexport() {
				warn!("Unexporting {} failed: {}", channel.path().display(), e);
			}
		}
	}
}
