use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use serde::{Serialize, Deserialize};

use pwm::backend::{VIRTUAL_MAXIMUM_PERIOD, VIRTUAL_MINIMUM_PERIOD, VIRTUAL_PIN_COUNT};
use pwm::controller::ControllerInfo;
use pwm::sysfs::SysfsBackend;
use pwm::{Backend, VirtualBackend};

pub const DEFAULT_CONFIG_PATH: &'static str = "pwm_tool.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
	Virtual {
		pin_count: u32,
		minimum_period: u64,
		maximum_period: u64,
		sample_fifo: bool,
	},
	Sysfs {
		root: String,
		chip: u32,
		minimum_period: u64,
		maximum_period: u64,
	},
}

impl BackendConfig {
	pub fn build(&self) -> anyhow::Result<Box<dyn Backend>> {
		let backend: Box<dyn Backend> = match self {
			BackendConfig::Virtual { pin_count, minimum_period, maximum_period, sample_fifo } => {
				let info = ControllerInfo {
					pin_count: *pin_count,
					minimum_period: *minimum_period,
					maximum_period: *maximum_period,
				};

				Box::new(VirtualBackend::with_info(info).with_sample_fifo(*sample_fifo))
			}
			BackendConfig::Sysfs { root, chip, minimum_period, maximum_period } => {
				Box::new(SysfsBackend::new(root, *chip, *minimum_period, *maximum_period)?)
			}
		};

		Ok(backend)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
	pub log_level_filter: String,
	pub log_echo: bool,
	pub log_directory: String,
	pub backend: BackendConfig,
}

pub trait TryIntoLevelFilter {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()>;
}

impl TryIntoLevelFilter for String {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()> {
		Ok(match self.as_str() {
			"none" => LevelFilter::Off,
			"error" => LevelFilter::Error,
			"warn" => LevelFilter::Warn,
			"info" => LevelFilter::Info,
			"debug" => LevelFilter::Debug,
			"all" => LevelFilter::Trace,
			_ => return Err(()),
		})
	}
}

impl Default for ToolConfig {
	fn default() -> Self {
		ToolConfig {
			log_level_filter: String::from("info"),
			log_echo: false,
			log_directory: String::from("logs"),
			backend: BackendConfig::Virtual {
				pin_count: VIRTUAL_PIN_COUNT,
				minimum_period: VIRTUAL_MINIMUM_PERIOD,
				maximum_period: VIRTUAL_MAXIMUM_PERIOD,
				sample_fifo: false,
			},
		}
	}
}

/// Reads the configuration at `path`, or the default one if there is no such file.
pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<ToolConfig> {
	let config_file = match File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ToolConfig::default()),
		Err(e) => return Err(e.into()),
	};

	let config: ToolConfig = serde_json::from_reader(config_file)?;

	Ok(config)
}

pub fn save<P: AsRef<Path>>(path: P, config: &ToolConfig) -> anyhow::Result<()> {
	let mut config_file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(path)?;

	write!(config_file, "{}", serde_json::to_string_pretty(config)?)?;

	Ok(())
}
