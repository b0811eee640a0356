// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod log;
pub mod settings;
pub mod stats;

pub use log::{LogRecord, NewLogEntry};
pub use settings::{LiveConsoleSettings, RetentionSettings};
pub use stats::{LogStats, UserLogCount};
