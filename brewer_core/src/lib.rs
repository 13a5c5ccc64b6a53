#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Brew order execution (hardware-agnostic).
//!
//! This crate drives a brewing controller board through a mash plan. All
//! device interaction goes through `brewer_traits::LineReader` and
//! `brewer_traits::LineWriter`.
//!
//! ## Architecture
//!
//! - **Protocol**: command encoding and status decoding over a closed code
//!   vocabulary (`protocol` module)
//! - **Status**: the device's last reported state (`status` module)
//! - **History**: bounded ring of recent status snapshots (`history` module)
//! - **Order log**: one append-only JSON-lines file per order (`order_log`)
//! - **Controller**: the order state machine (`OrderController`)
//! - **Monitor**: the background thread polling the device (`monitor`)
//!
//! ## Concurrency
//!
//! `OrderController` is a cloneable handle. Control operations and the
//! monitor serialize on one mutex; status queries take a read lock and copy
//! out, so they never observe a half-applied update.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod history;
pub mod hw_error;
pub mod mocks;
pub mod monitor;
pub mod order;
pub mod order_log;
pub mod protocol;
pub mod runner;
pub mod status;
pub mod util;

pub use builder::ControllerBuilder;
pub use config::ControllerSettings;
pub use controller::{Cursor, OrderController, OrderSnapshot, Phase, Transition};
pub use error::{BrewError, DecodeError, LinkError, OrderError, Result};
pub use history::HistoryRing;
pub use monitor::Monitor;
pub use order::{BrewOrder, MashStep};
pub use order_log::OrderLog;
pub use protocol::{CodeVocabulary, Command, decode_status_line};
pub use runner::{RunReport, run_order};
pub use status::{DeviceStatus, StatusCode};
