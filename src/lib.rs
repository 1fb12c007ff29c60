//! Two-node keypad door lock.
//!
//! Architecture:
//! - Front-end node (`front_end`): keypad capture and LCD feedback, relays
//!   candidate credentials over the serial link
//! - Back-end node (`back_end`): stores the reference credential, decides,
//!   drives the door motor and the alarm
//!
//! Both nodes run single-threaded busy-wait loops. The only state shared with
//! interrupt context is each node's `tick::ElapsedSeconds` counter.

#![cfg_attr(not(test), no_std)]

pub mod actuator;
pub mod back_end;
pub mod config;
pub mod credential;
pub mod front_end;
pub mod keypad;
pub mod lcd;
pub mod link;
pub mod lockout;
pub mod sequencer;
pub mod storage;
pub mod tick;

#[cfg(feature = "esp32")]
pub mod board;

pub use config::{Config, PASS_LEN};
pub use credential::Credential;
