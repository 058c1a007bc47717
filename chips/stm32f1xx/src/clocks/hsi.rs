// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! HSI (high-speed internal) clock.
//!
//! The chip boots from HSI and it stays on after the switch to the PLL, so this driver only
//! reports its state.

use crate::mmio::RegisterBus;
use crate::rcc::Rcc;

/// HSI frequency in MHz
pub const HSI_FREQUENCY_MHZ: usize = 8;

pub struct Hsi<'a, B: RegisterBus> {
    rcc: &'a Rcc<'a, B>,
}

impl<'a, B: RegisterBus> Hsi<'a, B> {
    pub(in crate::clocks) const fn new(rcc: &'a Rcc<'a, B>) -> Self {
        Self { rcc }
    }

    pub fn is_enabled(&self) -> bool {
        self.rcc.is_enabled_hsi_clock()
    }

    pub fn is_ready(&self) -> bool {
        self.rcc.is_ready_hsi_clock()
    }

    pub fn get_trim(&self) -> u32 {
        self.rcc.get_hsi_trim()
    }

    /// Frequency of the HSI clock, or `None` if it is not running.
    pub fn get_frequency_mhz(&self) -> Option<usize> {
        if self.is_enabled() {
            Some(HSI_FREQUENCY_MHZ)
        } else {
            None
        }
    }
}
