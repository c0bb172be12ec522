#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use std::io;

use black_box::BlackBox;
use pwm::PwmController;

use crate::config::{ToolConfig, TryIntoLevelFilter};
use crate::shell::Shell;

mod config;
mod shell;

fn main() -> anyhow::Result<()> {
	// Command line arguments
	const CONFIG_ARG: &'static str = "config";
	const INFO_ARG: &'static str = "info";
	const SAVE_CONFIG_ARG: &'static str = "save-config";

	let args = clap::Command::new("PWM tool")
		.version(env!("CARGO_PKG_VERSION"))
		.author("Vincent Leporcher <vincent.leporcher@telecom-paris.fr>")
		.about("Command line PWM testing utility")
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.value_name("FILE")
			.default_value(config::DEFAULT_CONFIG_PATH)
			.help("Configuration file, defaults are used if it does not exist"))
		.arg(clap::Arg::new(INFO_ARG)
			.long("info")
			.action(clap::ArgAction::SetTrue)
			.help("Print controller information and exit"))
		.arg(clap::Arg::new(SAVE_CONFIG_ARG)
			.long("save-config")
			.action(clap::ArgAction::SetTrue)
			.help("Write the effective configuration back to the configuration file"))
		.get_matches();

	// Configuration
	let config_path = args
		.get_one::<String>(CONFIG_ARG)
		.map(String::as_str)
		.unwrap_or(config::DEFAULT_CONFIG_PATH);

	let config = config::read(config_path)?;

	if args.get_flag(SAVE_CONFIG_ARG) {
		config::save(config_path, &config)?;
	}

	// Log
	let level_filter = config.log_level_filter
		.try_into_level_filter()
		.map_err(|_| anyhow!("Failed to parse log level filter"))?;

	let black_box = BlackBox::new(&config.log_directory, config.log_echo)?
		.spawn(level_filter)
		.map_err(|e| anyhow!("Failed to install logger: {}", e))?;

	info!("PWM tool {}", env!("CARGO_PKG_VERSION"));

	let result = run(&config, args.get_flag(INFO_ARG));
	if let Err(e) = &result {
		error!("{:#}", e);
	}

	black_box::stop(black_box);

	result
}

fn run(config: &ToolConfig, info_only: bool) -> anyhow::Result<()> {
	let controller = PwmController::attach(config.backend.build()?)?;

	if info_only {
		let info = controller.info();
		println!("{}", info);
		println!("Frequency range: {} Hz to {} Hz", info.minimum_frequency()?, info.maximum_frequency()?);
		return Ok(());
	}

	controller.soft_reset()?;

	let stdin = io::stdin();
	Shell::new(&controller)?.run(stdin.lock(), io::stdout())
}
