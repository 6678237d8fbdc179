// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shipwright daemon library
//!
//! Configuration, logging setup and the trigger server behind `swd`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod trigger;

pub use lifecycle::{Config, LifecycleError};
pub use trigger::{router, ExecutorDispatcher, JobDispatcher, TriggerRequest};
