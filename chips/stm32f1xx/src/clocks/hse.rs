// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! HSE (high-speed external) clock.
//!
//! HSE is started together with the PLL during clock bring-up. Its frequency is a property of
//! the board and cannot be read from the hardware, so it is recorded when the clock is started.

use core::cell::Cell;

use crate::mmio::RegisterBus;
use crate::rcc::{HseMode, Rcc};

pub struct Hse<'a, B: RegisterBus> {
    rcc: &'a Rcc<'a, B>,
    hse_frequency_mhz: Cell<Option<usize>>,
}

impl<'a, B: RegisterBus> Hse<'a, B> {
    pub(in crate::clocks) const fn new(rcc: &'a Rcc<'a, B>) -> Self {
        Self {
            rcc,
            hse_frequency_mhz: Cell::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.rcc.is_enabled_hse_clock()
    }

    pub fn is_ready(&self) -> bool {
        self.rcc.is_ready_hse_clock()
    }

    pub fn get_mode(&self) -> HseMode {
        if self.rcc.is_enabled_hse_clock_bypass() {
            HseMode::BYPASS
        } else {
            HseMode::CRYSTAL
        }
    }

    /// Frequency of the HSE clock.
    ///
    /// Returns `None` if the clock is off or its frequency was never recorded.
    pub fn get_frequency_mhz(&self) -> Option<usize> {
        if self.is_enabled() {
            self.hse_frequency_mhz.get()
        } else {
            None
        }
    }

    pub(in crate::clocks) fn set_frequency_mhz(&self, frequency: usize) {
        self.hse_frequency_mhz.set(Some(frequency));
    }
}
