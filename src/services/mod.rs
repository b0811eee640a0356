// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod query;
pub mod retention;

pub use query::{paginate, LogFilter, PageRequest, Pagination};
pub use retention::RetentionSweeper;
