// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

pub mod clocks;
pub mod config;
pub mod hse;
pub mod hsi;
pub mod phclk;
pub mod pll;

pub use crate::clocks::clocks::{get_bus1_frequency, get_bus2_frequency, ClockStage, Clocks};
pub use crate::clocks::config::ClockConfig;
