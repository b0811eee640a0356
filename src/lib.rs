// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LogTrail: collect application logs and serve them to an operator dashboard.
//!
//! This crate provides the backend API that ingests log records from client
//! SDKs, stores them in Firestore, and answers the dashboard's filtering,
//! pagination, live console and statistics queries.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
}
