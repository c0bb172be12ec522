//! Core of a PWM controller: a controller-wide period shared by a fixed set of pins, each with
//! its own polarity, duty cycle and run state, programmed through a hardware [`Backend`].
//!
//! Clients open [`Session`]s on the controller or on a single pin. Any number of sessions may
//! read, but each resource has at most one writer, and closing a writing session puts the
//! resource back to its defaults.

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod access;
pub mod backend;
pub mod controller;
pub mod dispatcher;
pub mod duty_cycle;
pub mod error;
pub mod pin;
pub mod sysfs;

#[cfg(test)]
pub(crate) mod mocks;

pub use access::{Access, Session, ShareMode, Target, TargetKind};
pub use backend::{Backend, DutyCycleStatus, VirtualBackend};
pub use controller::{ControllerInfo, PwmController};
pub use dispatcher::{Operation, Response};
pub use duty_cycle::DutyCycle;
pub use error::{Error, Result, SoftResetError};
pub use pin::{PinState, Polarity};
