// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Clock-related limits of the STM32F1 chips

use crate::clocks::config::ClockConfig;
use crate::rcc::{APBPrescaler, PllMul, PllSource};

/// PLL-related constants for a specific chip
pub trait PllConstants {
    /// PLL minimum output frequency in MHz
    const MIN_FREQ_MHZ: usize = 16;
    /// PLL maximum output frequency in MHz
    const MAX_FREQ_MHZ: usize = 72;
}

/// Generic clock constants for a specific chip
pub trait SystemClockConstants {
    /// Maximum allowed APB1 frequency in MHz
    const APB1_FREQUENCY_LIMIT_MHZ: usize = 36;
    /// Maximum allowed APB2 frequency in MHz
    const APB2_FREQUENCY_LIMIT_MHZ: usize = 72;
    /// Maximum allowed system clock frequency in MHz
    const SYS_CLOCK_FREQUENCY_LIMIT_MHZ: usize = 72;
}

/// Clock limits and boot clock tree of a specific chip
pub trait ChipSpecs: SystemClockConstants + PllConstants {
    /// Whether the chip has the full-speed USB device peripheral
    const HAS_USB: bool;
    /// Clock tree set up by `Clocks::initialize_clocks`
    const DEFAULT_CLOCK_CONFIG: ClockConfig;
}

/// STM32F103 performance line: 72MHz, USB
pub enum Stm32f103Specs {}

impl PllConstants for Stm32f103Specs {}

impl SystemClockConstants for Stm32f103Specs {}

impl ChipSpecs for Stm32f103Specs {
    const HAS_USB: bool = true;
    const DEFAULT_CLOCK_CONFIG: ClockConfig = ClockConfig::DEFAULT;
}

/// STM32F101 access line: 36MHz, no USB
pub enum Stm32f101Specs {}

impl PllConstants for Stm32f101Specs {
    const MAX_FREQ_MHZ: usize = 36;
}

impl SystemClockConstants for Stm32f101Specs {
    const APB2_FREQUENCY_LIMIT_MHZ: usize = 36;
    const SYS_CLOCK_FREQUENCY_LIMIT_MHZ: usize = 36;
}

impl ChipSpecs for Stm32f101Specs {
    const HAS_USB: bool = false;
    // 8MHz crystal / 2 x 9
    const DEFAULT_CLOCK_CONFIG: ClockConfig = ClockConfig {
        pll_source: PllSource::HseDiv2,
        pll_mul: PllMul::Mul9,
        apb1_prescaler: APBPrescaler::DivideBy1,
        usb: false,
        ..ClockConfig::DEFAULT
    };
}

const _: () = assert!(Stm32f103Specs::DEFAULT_CLOCK_CONFIG
    .check::<Stm32f103Specs>()
    .is_ok());
const _: () = assert!(Stm32f101Specs::DEFAULT_CLOCK_CONFIG
    .check::<Stm32f101Specs>()
    .is_ok());
