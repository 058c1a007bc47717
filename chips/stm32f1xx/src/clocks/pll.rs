// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Main phase-locked loop (PLL) clock.
//!
//! The PLL multiplies the HSI/2 or HSE clock up to the system clock frequency. It is configured
//! and started as part of clock bring-up ([crate::clocks::Clocks::initialize_clocks]); this
//! driver waits for it to lock and reports its state.
//!
//! # Usage
//!
//! ```rust,ignore
//! let pll = &clocks.pll;
//!
//! // Block until the PLL output is stable
//! let polls = pll.wait_for_lock();
//!
//! // Or give up after a number of polls
//! match pll.try_wait_for_lock(10_000) {
//!     Ok(polls) => { /* locked */ }
//!     Err(ErrorCode::BUSY) => { /* not locked yet */ }
//!     Err(_) => unreachable!(),
//! }
//! ```

use core::cell::Cell;

use crate::errorcode::ErrorCode;
use crate::mmio::RegisterBus;
use crate::rcc::{PllMul, PllSource, Rcc};

pub struct Pll<'a, B: RegisterBus> {
    rcc: &'a Rcc<'a, B>,
    frequency_mhz: Cell<Option<usize>>,
}

impl<'a, B: RegisterBus> Pll<'a, B> {
    pub(in crate::clocks) const fn new(rcc: &'a Rcc<'a, B>) -> Self {
        Self {
            rcc,
            frequency_mhz: Cell::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.rcc.is_enabled_pll_clock()
    }

    pub fn is_locked(&self) -> bool {
        self.rcc.is_locked_pll_clock()
    }

    /// Busy-wait until the PLL reports lock.
    ///
    /// There is no timeout: with a missing or dead crystal this never returns. Returns the
    /// number of times the ready flag was read.
    pub fn wait_for_lock(&self) -> usize {
        let mut polls = 1;
        while !self.is_locked() {
            polls += 1;
            core::hint::spin_loop();
        }
        polls
    }

    /// Like [Pll::wait_for_lock], but reads the ready flag at most `max_polls` times.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::BUSY]\): the PLL did not lock within `max_polls` reads.
    pub fn try_wait_for_lock(&self, max_polls: usize) -> Result<usize, ErrorCode> {
        for polls in 1..=max_polls {
            if self.is_locked() {
                return Ok(polls);
            }
            core::hint::spin_loop();
        }
        Err(ErrorCode::BUSY)
    }

    pub fn get_source(&self) -> PllSource {
        self.rcc.get_pll_clocks_source()
    }

    pub fn get_multiplier(&self) -> PllMul {
        self.rcc.get_pll_clock_multiplier()
    }

    /// Output frequency of the PLL, or `None` while the PLL is off.
    pub fn get_frequency_mhz(&self) -> Option<usize> {
        if self.is_enabled() {
            self.frequency_mhz.get()
        } else {
            None
        }
    }

    /// Output frequency computed from the PLL configuration register and the frequency of the
    /// entry clock, before any predivider.
    pub fn get_frequency_mhz_no_cache(&self, source_frequency_mhz: usize) -> Option<usize> {
        if !self.is_enabled() {
            return None;
        }
        let input = match self.get_source() {
            PllSource::Hse => source_frequency_mhz,
            PllSource::HsiDiv2 | PllSource::HseDiv2 => source_frequency_mhz / 2,
        };
        Some(input * self.get_multiplier().factor())
    }

    pub(in crate::clocks) fn set_frequency_mhz(&self, frequency: usize) {
        self.frequency_mhz.set(Some(frequency));
    }
}
