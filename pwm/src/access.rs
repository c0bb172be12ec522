use std::fmt::{self, Display, Formatter};

use crate::backend::Backend;
use crate::controller::PwmController;
use crate::error::{Error, Result};

/// What a session is opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
	Controller,
	Pin(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
	Controller,
	Pin,
}

impl Target {
	/// Resolves an open path relative to the controller: an empty path is the controller
	/// itself, a decimal number (optionally behind one `\` or `/`) is a pin.
	pub fn parse(path: &str, pin_count: u32) -> Result<Target> {
		let name = path
			.strip_prefix('\\')
			.or_else(|| path.strip_prefix('/'))
			.unwrap_or(path);

		if name.is_empty() {
			return Ok(Target::Controller);
		}

		if !name.bytes().all(|b| b.is_ascii_digit()) {
			return Err(Error::InvalidArgument(format!("Invalid pin path \"{}\"", path)));
		}

		let pin = name
			.parse::<u32>()
			.map_err(|_| Error::InvalidArgument(format!("Invalid pin path \"{}\"", path)))?;

		if pin >= pin_count {
			info!("Requested pin number out of bounds (pin = {})", pin);
			return Err(Error::OutOfRange { pin, pin_count });
		}

		Ok(Target::Pin(pin))
	}

	pub fn kind(&self) -> TargetKind {
		match self {
			Target::Controller => TargetKind::Controller,
			Target::Pin(_) => TargetKind::Pin,
		}
	}
}

impl Display for Target {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Target::Controller => write!(f, "controller"),
			Target::Pin(pin) => write!(f, "pin{}", pin),
		}
	}
}

/// Access shared with other sessions. Only exclusive access is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
	None,
	Read,
	Write,
	ReadWrite,
}

/// Access requested when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
	pub write: bool,
	pub share: ShareMode,
}

impl Access {
	pub fn read_only() -> Self {
		Self { write: false, share: ShareMode::None }
	}

	pub fn read_write() -> Self {
		Self { write: true, share: ShareMode::None }
	}
}

/// One open of the controller or of a pin.
///
/// Sessions are created by [`PwmController::open`] and consumed by [`PwmController::close`].
#[derive(Debug)]
pub struct Session {
	target: Target,
	is_open_for_write: bool,
}

impl Session {
	pub fn target(&self) -> Target {
		self.target
	}

	pub fn is_open_for_write(&self) -> bool {
		self.is_open_for_write
	}
}

fn acquire_write(is_open_for_write: &mut bool, target: Target) -> Result<()> {
	if *is_open_for_write {
		error!("{} access denied", target);
		return Err(Error::AccessDenied(format!("{} is already open for write", target)));
	}

	*is_open_for_write = true;

	Ok(())
}

impl<B: Backend> PwmController<B> {
	/// Opens a session. Any number of read-only sessions can be open on a resource, but at
	/// most one session with write access.
	pub fn open(&self, target: Target, access: Access) -> Result<Session> {
		if access.share != ShareMode::None {
			info!("Requested share access {:?} is not supported", access.share);
			return Err(Error::AccessDenied(format!("Share mode {:?} is not supported", access.share)));
		}

		match target {
			Target::Pin(pin) => {
				let mut state = self.pin_slot(pin)?.lock();

				if access.write {
					acquire_write(&mut state.is_open_for_write, target)?;
				}

				info!("Pin{} opened (is_open_for_write = {})", pin, state.is_open_for_write);
			}
			Target::Controller => {
				let mut state = self.state.lock();

				if access.write {
					acquire_write(&mut state.is_open_for_write, target)?;
				}

				info!("Controller opened (is_open_for_write = {})", state.is_open_for_write);
			}
		}

		Ok(Session {
			target,
			is_open_for_write: access.write,
		})
	}

	pub fn open_path(&self, path: &str, access: Access) -> Result<Session> {
		self.open(Target::parse(path, self.info.pin_count)?, access)
	}

	/// Closes a session. When it had write access, the resource is reset to its defaults
	/// and released. Ownership is released even if the reset fails, the error being
	/// returned afterwards.
	pub fn close(&self, session: Session) -> Result<()> {
		let mut result = Ok(());

		match session.target {
			Target::Pin(pin) => {
				let mut state = self.pin_slot(pin)?.lock();

				if session.is_open_for_write {
					result = state.reset_defaults(&self.backend, pin);
					if let Err(e) = &result {
						error!("Resetting pin{} defaults failed: {}", pin, e);
					}

					debug_assert!(state.is_open_for_write);
					state.is_open_for_write = false;
				}

				trace!("Pin{} closed (is_open_for_write = {})", pin, state.is_open_for_write);
			}
			Target::Controller => {
				let mut state = self.state.lock();

				if session.is_open_for_write {
					result = self.reset_controller_defaults(&mut state).map(|_| ());
					if let Err(e) = &result {
						error!("Resetting controller defaults failed: {}", e);
					}

					debug_assert!(state.is_open_for_write);
					state.is_open_for_write = false;
				}

				trace!("Controller closed (is_open_for_write = {})", state.is_open_for_write);
			}
		}

		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mocks::mock_backend::MockBackend;

	fn controller() -> PwmController<MockBackend> {
		PwmController::attach(MockBackend::new()).unwrap()
	}

	#[test]
	fn parse_test() {
		assert_eq!(Target::parse("", 4).unwrap(), Target::Controller);
		assert_eq!(Target::parse("\\", 4).unwrap(), Target::Controller);
		assert_eq!(Target::parse("0", 4).unwrap(), Target::Pin(0));
		assert_eq!(Target::parse("\\3", 4).unwrap(), Target::Pin(3));
		assert_eq!(Target::parse("/2", 4).unwrap(), Target::Pin(2));
		assert_eq!(Target::parse("007", 8).unwrap(), Target::Pin(7));
	}

	#[test]
	fn parse_invalid_test() {
		assert!(matches!(Target::parse("4", 4), Err(Error::OutOfRange { pin: 4, pin_count: 4 })));
		assert!(matches!(Target::parse("99999999999", 4), Err(Error::InvalidArgument(_))));

		for path in ["pin1", "-1", "+1", "1 ", "\\\\1", "1/"].iter() {
			assert!(matches!(Target::parse(path, 4), Err(Error::InvalidArgument(_))), "{}", path);
		}
	}

	#[test]
	fn exclusive_write_test() {
		let controller = controller();

		let writer = controller.open(Target::Pin(1), Access::read_write()).unwrap();
		assert!(matches!(controller.open(Target::Pin(1), Access::read_write()), Err(Error::AccessDenied(_))));

		// Other pins and the controller are independent
		let other = controller.open(Target::Pin(2), Access::read_write()).unwrap();
		let controller_writer = controller.open(Target::Controller, Access::read_write()).unwrap();
		assert!(matches!(controller.open(Target::Controller, Access::read_write()), Err(Error::AccessDenied(_))));

		controller.close(writer).unwrap();
		let writer = controller.open(Target::Pin(1), Access::read_write()).unwrap();

		for session in vec![writer, other, controller_writer] {
			controller.close(session).unwrap();
		}
	}

	#[test]
	fn read_only_sessions_test() {
		let controller = controller();

		let readers = (0..8)
			.map(|_| controller.open(Target::Pin(0), Access::read_only()).unwrap())
			.collect::<Vec<_>>();
		let writer = controller.open(Target::Pin(0), Access::read_write()).unwrap();

		for reader in readers {
			controller.close(reader).unwrap();
		}

		// Closing the readers did not release the writer
		assert!(controller.pins[0].lock().is_open_for_write());
		controller.close(writer).unwrap();
		assert!(!controller.pins[0].lock().is_open_for_write());
	}

	#[test]
	fn share_mode_test() {
		let controller = controller();

		for &share in [ShareMode::Read, ShareMode::Write, ShareMode::ReadWrite].iter() {
			let access = Access { write: false, share };
			assert!(matches!(controller.open(Target::Controller, access), Err(Error::AccessDenied(_))));
		}
	}

	#[test]
	fn open_out_of_range_test() {
		let controller = controller();
		assert!(matches!(controller.open(Target::Pin(4), Access::read_only()), Err(Error::OutOfRange { .. })));
		assert!(matches!(controller.open_path("\\9", Access::read_only()), Err(Error::OutOfRange { .. })));
	}

	#[test]
	fn close_resets_controller_test() {
		let controller = controller();
		let session = controller.open_path("", Access::read_write()).unwrap();

		controller.state.lock().set_desired_period(&controller.info, &controller.backend, 1_000_000_000).unwrap();
		controller.close(session).unwrap();

		assert_eq!(controller.state.lock().desired_period(), controller.default_period());
		assert!(!controller.state.lock().is_open_for_write());
	}

	#[test]
	fn close_read_only_does_not_reset_test() {
		let controller = controller();
		let writer = controller.open(Target::Controller, Access::read_write()).unwrap();
		let reader = controller.open(Target::Controller, Access::read_only()).unwrap();

		controller.state.lock().set_desired_period(&controller.info, &controller.backend, 1_000_000_000).unwrap();
		controller.close(reader).unwrap();

		assert_eq!(controller.state.lock().desired_period(), 1_000_000_000);
		controller.close(writer).unwrap();
	}

	#[test]
	fn close_releases_on_reset_failure_test() {
		let controller = controller();
		let session = controller.open(Target::Pin(3), Access::read_write()).unwrap();
		controller.pins[3].lock().start(&controller.backend, 3).unwrap();

		controller.backend.fail_pin(3);
		assert!(matches!(controller.close(session), Err(Error::BackendFailure(_))));

		let state = *controller.pins[3].lock();
		assert!(!state.is_open_for_write());
		assert!(!state.is_started());
	}
}
