use std::io::{BufRead, Write};

use pwm::{Access, Backend, Error, PwmController, Session, Target};

const HELP: &'static str = "Commands:
 > freq <hz>                          Set controller frequency (Hz)
 > open <pin>                         Open pin
 > start                              Start PWM
 > stop                               Stop PWM
 > dutycycle <percentage>             Set duty cycle percentage
 > polarity                           Toggle polarity
 > info                               Display controller information
 > help                               Display this help message
 > quit                               Quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
	Frequency(u64),
	Open(u32),
	Start,
	Stop,
	/// Percentage, between 0 and 100.
	DutyCycle(f64),
	TogglePolarity,
	Info,
	Help,
	Quit,
}

fn argument<'a>(words: &mut impl Iterator<Item = &'a str>, usage: &str) -> pwm::Result<&'a str> {
	words
		.next()
		.ok_or_else(|| Error::InvalidArgument(format!("Expecting an argument, e.g. {}", usage)))
}

/// Parses one line of input. Blank lines are no command.
pub fn parse(line: &str) -> pwm::Result<Option<Command>> {
	let mut words = line.split_whitespace();

	let command = match words.next() {
		Some(command) => command,
		None => return Ok(None),
	};

	let command = match command {
		"q" | "quit" => Command::Quit,
		"h" | "help" => Command::Help,
		"open" => {
			let pin = argument(&mut words, "open 0")?;
			Command::Open(pin.parse()
				.map_err(|_| Error::InvalidArgument(format!("Expecting a pin number, got \"{}\"", pin)))?)
		}
		"freq" => {
			let frequency = argument(&mut words, "freq 1000")?;
			Command::Frequency(frequency.parse()
				.map_err(|_| Error::InvalidArgument(format!("Expecting a frequency in Hz, got \"{}\"", frequency)))?)
		}
		"dutycycle" => {
			let percentage = argument(&mut words, "dutycycle 50")?;
			Command::DutyCycle(percentage.parse()
				.map_err(|_| Error::InvalidArgument(format!("Expecting a percentage, got \"{}\"", percentage)))?)
		}
		"start" => Command::Start,
		"stop" => Command::Stop,
		"polarity" => Command::TogglePolarity,
		"info" => Command::Info,
		other => return Err(Error::NotSupported(format!(
			"Unrecognized command \"{}\", type 'help' for command usage", other))),
	};

	if let Some(extra) = words.next() {
		return Err(Error::InvalidArgument(format!("Unexpected argument \"{}\"", extra)));
	}

	Ok(Some(command))
}

/// Interactive session on a controller: the controller is open for write for the lifetime of
/// the shell, and at most one pin at a time.
pub struct Shell<'a, B: Backend> {
	controller: &'a PwmController<B>,
	controller_session: Session,
	pin_session: Option<Session>,
}

impl<'a, B: Backend> Shell<'a, B> {
	pub fn new(controller: &'a PwmController<B>) -> pwm::Result<Self> {
		Ok(Shell {
			controller,
			controller_session: controller.open(Target::Controller, Access::read_write())?,
			pin_session: None,
		})
	}

	fn pin_session(&self) -> anyhow::Result<&Session> {
		self.pin_session
			.as_ref()
			.ok_or_else(|| anyhow!("No open pin, use `open <pin>` first"))
	}

	pub fn execute<W: Write>(&mut self, command: Command, output: &mut W) -> anyhow::Result<()> {
		let controller = self.controller;

		match command {
			Command::Frequency(frequency) => {
				let actual = controller.set_desired_frequency(&self.controller_session, frequency)?;
				writeln!(output, "Frequency is now {} Hz ({} ps)",
						 actual, controller.actual_period(&self.controller_session)?)?;
			}
			Command::Open(pin) => {
				// Closing puts the previous pin back to its defaults
				if let Some(previous) = self.pin_session.take() {
					controller.close(previous)?;
				}

				self.pin_session = Some(controller.open(Target::Pin(pin), Access::read_write())?);
				writeln!(output, "Opened pin {}", pin)?;
			}
			Command::Start => controller.start(self.pin_session()?)?,
			Command::Stop => controller.stop(self.pin_session()?)?,
			Command::DutyCycle(percentage) => {
				let status = controller.set_active_duty_cycle(self.pin_session()?, percentage / 100.)?;
				writeln!(output, "Duty cycle is now {}% ({:?})", percentage, status)?;
			}
			Command::TogglePolarity => {
				let session = self.pin_session()?;
				let polarity = controller.polarity(session)?.toggled();

				controller.set_polarity(session, polarity)?;
				writeln!(output, "Polarity is now {}", polarity)?;
			}
			Command::Info => {
				let info = controller.controller_info(&self.controller_session)?;

				writeln!(output, " ActualFrequency: {}", controller.actual_frequency(&self.controller_session)?)?;
				writeln!(output, "    MaxFrequency: {}", info.maximum_frequency()?)?;
				writeln!(output, "    MinFrequency: {}", info.minimum_frequency()?)?;
				writeln!(output, "        PinCount: {}", info.pin_count)?;

				if let Some(session) = &self.pin_session {
					writeln!(output, "  Pin {}", session.target())?;
					writeln!(output, "                 IsStarted: {}", controller.is_started(session)?)?;
					writeln!(output, "                  Polarity: {}", controller.polarity(session)?)?;
					writeln!(output, " ActiveDutyCyclePercentage: {}", controller.active_duty_cycle(session)? * 100.)?;
				}
			}
			Command::Help => writeln!(output, "{}", HELP)?,
			Command::Quit => {}
		}

		Ok(())
	}

	/// Reads commands until `quit` or the end of `input`, then closes every session.
	pub fn run<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> anyhow::Result<()> {
		writeln!(output, "Type 'help' for a list of commands")?;
		write!(output, "> ")?;
		output.flush()?;

		for line in input.lines() {
			let result = match parse(&line?) {
				Ok(Some(Command::Quit)) => break,
				Ok(Some(command)) => self.execute(command, &mut output),
				Ok(None) => Ok(()),
				Err(e) => Err(e.into()),
			};

			if let Err(e) = result {
				warn!("Command failed: {}", e);
				writeln!(output, "Error: {}", e)?;
			}

			write!(output, "> ")?;
			output.flush()?;
		}

		self.close()
	}

	pub fn close(self) -> anyhow::Result<()> {
		let pin_result = match self.pin_session {
			Some(session) => self.controller.close(session),
			None => Ok(()),
		};

		self.controller.close(self.controller_session)?;
		Ok(pin_result?)
	}
}
