// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Peripheral implementations for the STM32F1xx MCU family.
//!
//! Covers the reset and clock control block (RCC) and the flash interface timing needed to
//! take the chip from its 8MHz reset clock to a 72MHz PLL clock tree and to gate the
//! peripherals used by the firmware.
//!
//! STM32F103: <https://www.st.com/en/microcontrollers-microprocessors/stm32f103.html>

#![no_std]

pub mod chip_specs;
pub mod clocks;
pub mod errorcode;
pub mod flash;
pub mod mmio;
pub mod rcc;

#[cfg(test)]
mod testing;

pub use crate::clocks::{get_bus1_frequency, get_bus2_frequency};
pub use crate::errorcode::ErrorCode;
