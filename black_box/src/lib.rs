#[macro_use]
extern crate lazy_static;

use chrono::{DateTime, Datelike, Local, Timelike};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{self, File, OpenOptions},
	io::{self, Write},
	path::Path,
	thread,
	thread::JoinHandle,
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	Flush,
	Stop,
}

/// Writes log records to a file, and optionally to stdout, from a dedicated thread.
pub struct BlackBox {
	file: File,
	echo: bool,
	buffer: VecDeque<String>,
}

/// Name of a log file created at `now`.
pub fn log_file_name(now: &DateTime<Local>) -> String {
	format!(
		"pwm_{}-{}-{}_{}-{}-{}.log",
		now.hour(),
		now.minute(),
		now.second(),
		now.day(),
		now.month(),
		now.year()
	)
}

impl BlackBox {
	/// Creates a new log file in `directory`, creating the directory if needed.
	pub fn new<P: AsRef<Path>>(directory: P, echo: bool) -> io::Result<Self> {
		fs::create_dir_all(&directory)?;

		let path = directory.as_ref().join(log_file_name(&Local::now()));

		Ok(BlackBox {
			file: OpenOptions::new()
				.write(true)
				.create(true)
				.truncate(true)
				.open(path)?,
			echo,
			buffer: VecDeque::<String>::new(),
		})
	}

	fn try_flush(&mut self) {
		if let Err(e) = self.flush() {
			self.buffer
				.push_back(format!("Failed to flush black box: {}", e));
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		while let Some(message) = self.buffer.pop_front() {
			if self.echo {
				println!("{}", message);
			}
			writeln!(self.file, "{}", message)?;
		}
		self.file.flush()
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);
		const MAX_BUFFER_LEN: usize = 8;

		loop {
			match BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
				Ok(Message::Log(content)) => self.buffer.push_back(content),
				Ok(Message::Flush) | Err(RecvTimeoutError::Timeout) => self.try_flush(),
				Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
			}

			if self.buffer.len() > MAX_BUFFER_LEN {
				self.try_flush();
			}
		}

		if !self.buffer.is_empty() {
			self.try_flush();
		}
	}

	/// Installs the process logger and starts the writer thread. Fails if a logger is
	/// already installed.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)
			.map(|()| log::set_max_level(level_filter))?;

		Ok(thread::spawn(move || self.receive_loop()))
	}
}

/// Stops the writer thread once every record sent so far is written.
pub fn stop(handle: JoinHandle<()>) {
	BLACK_BOX_CHANNEL.0.send(Message::Stop).unwrap_or_default();
	handle.join().unwrap_or_default();
}

/// Errors also carry where they were logged from.
pub fn format_record(elapsed: Duration, record: &Record) -> String {
	if record.metadata().level() == Level::Error {
		format!(
			"[{:.3}][{:?}][{}] {} ({}:{})",
			elapsed.as_secs_f32(),
			record.level(),
			record.module_path().unwrap_or("unknown"),
			record.args(),
			record.file().unwrap_or("unknown"),
			record.line().unwrap_or(0)
		)
	} else {
		format!(
			"[{:.3}][{:?}][{}] {}",
			elapsed.as_secs_f32(),
			record.level(),
			record.module_path().unwrap_or("unknown"),
			record.args(),
		)
	}
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl Log for BlackBoxLogger {
	fn enabled(&self, _: &Metadata) -> bool {
		true
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			let formatted = format_record(self.start_instant.elapsed(), record);
			BLACK_BOX_CHANNEL.0.send(Message::Log(formatted)).unwrap_or_default();
		}
	}

	fn flush(&self) {
		BLACK_BOX_CHANNEL.0.send(Message::Flush).unwrap_or_default();
	}
}
