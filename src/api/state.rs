// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::config::Config;
use crate::manager::WgManager;
use crate::metrics::MetricsRegistry;

/// Shared application state
pub struct AppState<C, S> {
    pub config: Config,
    pub metrics: MetricsRegistry,
    pub manager: Arc<WgManager<C, S>>,
}
