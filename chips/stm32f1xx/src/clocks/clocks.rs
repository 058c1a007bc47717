// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! STM32F1xx clock driver
//!
//! Brings the chip from its reset clock (8MHz HSI) to the PLL clock tree and gates the
//! peripherals used by the firmware. For the HSI, HSE and PLL views, check their own
//! documentation.
//!
//! Bring-up runs in a fixed order:
//!
//! 1. program the PLL (source, multiplier) while the system clock is still HSI, then start HSE
//!    and the PLL with one store to the clock control register
//! 2. busy-wait for the PLL to lock
//! 3. raise the flash wait states and turn on the prefetch buffer
//! 4. switch the system clock to the PLL and set the ADC prescaler
//! 5. gate on the clocks of the boot peripherals
//!
//! # Limitations
//!
//! - [ ] Precision of 1MHz
//! - [ ] The clock tree cannot be changed once it is running
//! - [ ] No clock security system
//!
//! # Usage
//!
//! ```rust,ignore
//! use stm32f1xx::chip_specs::Stm32f103Specs;
//! use stm32f1xx::clocks::Clocks;
//! use stm32f1xx::flash::Flash;
//! use stm32f1xx::mmio::Mmio;
//! use stm32f1xx::rcc::Rcc;
//!
//! let bus = Mmio::take().unwrap();
//! let rcc = Rcc::new(&bus);
//! let flash = Flash::new(&bus);
//! let clocks: Clocks<_, Stm32f103Specs> = Clocks::new(&rcc, &flash);
//!
//! clocks.initialize_clocks();
//! rcc.release_usb_reset();
//! ```
//!
//! ## Retrieve the bus frequencies
//!
//! The frequencies of the reference clock tree are compile-time constants:
//!
//! ```rust,ignore
//! const UART_CLOCK_HZ: usize = stm32f1xx::get_bus2_frequency();
//! ```
//!
//! The frequencies the hardware currently runs at are read back from the RCC registers:
//!
//! ```rust,ignore
//! let apb1_frequency = clocks.get_apb1_frequency_mhz();
//! debug!("Current APB1 frequency is {}MHz", apb1_frequency);
//! ```

use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use log::{debug, info, warn};

use crate::chip_specs::ChipSpecs as ChipSpecsTrait;
use crate::clocks::config::ClockConfig;
use crate::clocks::hse::Hse;
use crate::clocks::hsi::{Hsi, HSI_FREQUENCY_MHZ};
use crate::clocks::phclk::{
    ClockInterface, PeripheralClock, PeripheralClockType, BOOT_PERIPHERALS, PCLK1,
};
use crate::clocks::pll::Pll;
use crate::errorcode::ErrorCode;
use crate::flash::{Flash, FlashLatency};
use crate::mmio::RegisterBus;
use crate::rcc::{ADCPrescaler, AHBPrescaler, APBPrescaler, PllSource, Rcc, SysClockSource};

/// APB1 ("bus 1") frequency in Hz of the default clock tree
pub const fn get_bus1_frequency() -> usize {
    ClockConfig::DEFAULT.apb1_frequency_mhz() * 1_000_000
}

/// APB2 ("bus 2") frequency in Hz of the default clock tree
pub const fn get_bus2_frequency() -> usize {
    ClockConfig::DEFAULT.apb2_frequency_mhz() * 1_000_000
}

/// Progress of the clock bring-up. Stages only move forward.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ClockStage {
    /// Running from HSI, nothing configured yet
    Reset,
    /// PLL programmed and started, waiting for lock
    OscillatorsStarting,
    MultiplierLocked,
    MemoryTimingSet,
    ClockSwitched,
    PeripheralsEnabled,
}

/// Main struct for configuring on-board clocks.
pub struct Clocks<'a, B: RegisterBus, ChipSpecs> {
    rcc: &'a Rcc<'a, B>,
    flash: &'a Flash<'a, B>,
    /// High speed internal clock
    pub hsi: Hsi<'a, B>,
    /// High speed external clock
    pub hse: Hse<'a, B>,
    /// Main phase loop-lock clock
    pub pll: Pll<'a, B>,
    stage: Cell<ClockStage>,
    _chip_specs: PhantomData<ChipSpecs>,
}

impl<'a, B: RegisterBus, ChipSpecs: ChipSpecsTrait> Clocks<'a, B, ChipSpecs> {
    /// Create the clock driver.
    ///
    /// The default clock tree of `ChipSpecs` is checked against its limits when this is
    /// compiled. A chip whose default tree is out of range does not build:
    ///
    /// ```compile_fail
    /// use stm32f1xx::chip_specs::{ChipSpecs, PllConstants, SystemClockConstants};
    /// use stm32f1xx::clocks::{ClockConfig, Clocks};
    /// use stm32f1xx::flash::Flash;
    /// use stm32f1xx::mmio::{RegisterAddress, RegisterBus};
    /// use stm32f1xx::rcc::{PllMul, Rcc};
    ///
    /// struct NullBus;
    ///
    /// impl RegisterBus for NullBus {
    ///     fn read(&self, _address: RegisterAddress) -> u32 {
    ///         0
    ///     }
    ///
    ///     fn write(&self, _address: RegisterAddress, _value: u32) {}
    /// }
    ///
    /// enum Overclocked {}
    ///
    /// impl PllConstants for Overclocked {}
    ///
    /// impl SystemClockConstants for Overclocked {}
    ///
    /// impl ChipSpecs for Overclocked {
    ///     const HAS_USB: bool = true;
    ///     // 8MHz x 10 = 80MHz
    ///     const DEFAULT_CLOCK_CONFIG: ClockConfig = ClockConfig {
    ///         pll_mul: PllMul::Mul10,
    ///         ..ClockConfig::DEFAULT
    ///     };
    /// }
    ///
    /// let bus = NullBus;
    /// let rcc = Rcc::new(&bus);
    /// let flash = Flash::new(&bus);
    /// let clocks: Clocks<_, Overclocked> = Clocks::new(&rcc, &flash);
    /// clocks.initialize_clocks();
    /// ```
    pub fn new(rcc: &'a Rcc<'a, B>, flash: &'a Flash<'a, B>) -> Self {
        const {
            assert!(
                ChipSpecs::DEFAULT_CLOCK_CONFIG
                    .check::<ChipSpecs>()
                    .is_ok(),
                "default clock tree exceeds the limits of the chip"
            )
        };

        Self {
            rcc,
            flash,
            hsi: Hsi::new(rcc),
            hse: Hse::new(rcc),
            pll: Pll::new(rcc),
            stage: Cell::new(ClockStage::Reset),
            _chip_specs: PhantomData,
        }
    }

    /// Bring the clocks up with the default clock tree of the chip.
    ///
    /// Blocks until the PLL locks; if the oscillator never starts, this never returns. The
    /// flash wait states are stored without reading them back. Must be called once, early in
    /// boot, before any peripheral is used. Further calls log a warning and leave the running
    /// clock tree alone.
    pub fn initialize_clocks(&self) {
        if self.stage.get() != ClockStage::Reset {
            warn!("clocks already initialized, ignoring");
            return;
        }

        let config = &ChipSpecs::DEFAULT_CLOCK_CONFIG;
        self.start_pll(config);
        let latency = self
            .flash
            .write_memory_timing(config.sys_clock_frequency_mhz());
        self.memory_timing_set(latency);
        self.run_from_pll(config);
    }

    /// Bring the clocks up with a custom clock tree.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::ALREADY]\): the clocks have already been initialized
    /// + [Err]\([ErrorCode::INVAL]\) or [Err]\([ErrorCode::SIZE]\): `config` is not valid for
    /// this chip, see [ClockConfig::check]. Nothing is written in this case.
    /// + [Err]\([ErrorCode::BUSY]\): the flash did not accept the new wait states. The PLL is
    /// running but the system clock is left on HSI.
    pub fn initialize_clocks_with(&self, config: &ClockConfig) -> Result<(), ErrorCode> {
        if self.stage.get() != ClockStage::Reset {
            return Err(ErrorCode::ALREADY);
        }
        config.check::<ChipSpecs>()?;

        self.start_pll(config);
        let latency = self
            .flash
            .set_memory_timing(config.sys_clock_frequency_mhz())?;
        self.memory_timing_set(latency);
        self.run_from_pll(config);
        Ok(())
    }

    fn run_from_pll(&self, config: &ClockConfig) {
        self.switch_sys_clock_to_pll(config);
        self.enable_boot_peripheral_clocks(config);

        info!(
            "clocks up: SYSCLK {}MHz, APB1 {}MHz, APB2 {}MHz",
            config.sys_clock_frequency_mhz(),
            config.apb1_frequency_mhz(),
            config.apb2_frequency_mhz()
        );
    }

    fn advance(&self, stage: ClockStage) {
        debug!("clock stage {:?} -> {:?}", self.stage.get(), stage);
        self.stage.set(stage);
    }

    fn start_pll(&self, config: &ClockConfig) {
        // The PLL configuration can only change while the PLL is off, and the system clock must
        // not leave HSI before the PLL has locked.
        self.rcc
            .write_clock_configuration(config, SysClockSource::HSI, ADCPrescaler::DivideBy2);
        let hse = if config.uses_hse() {
            Some(config.hse_mode)
        } else {
            None
        };
        self.rcc.start_pll_clock(hse);
        self.advance(ClockStage::OscillatorsStarting);

        let polls = self.pll.wait_for_lock();
        compiler_fence(Ordering::SeqCst);
        debug!("PLL locked after {} polls", polls);

        if config.uses_hse() {
            self.hse.set_frequency_mhz(config.hse_frequency_mhz);
        }
        self.pll.set_frequency_mhz(config.pll_frequency_mhz());
        self.advance(ClockStage::MultiplierLocked);
    }

    fn memory_timing_set(&self, latency: FlashLatency) {
        debug!("flash latency {:?}, prefetch on", latency);
        self.advance(ClockStage::MemoryTimingSet);
    }

    fn switch_sys_clock_to_pll(&self, config: &ClockConfig) {
        self.rcc
            .write_clock_configuration(config, SysClockSource::PLL, config.adc_prescaler());
        self.advance(ClockStage::ClockSwitched);
    }

    fn enable_boot_peripheral_clocks(&self, config: &ClockConfig) {
        for clock in BOOT_PERIPHERALS {
            if clock == PeripheralClockType::APB1(PCLK1::USB) && !config.usb {
                continue;
            }
            PeripheralClock::new(clock, self.rcc).enable();
        }
        self.advance(ClockStage::PeripheralsEnabled);
    }

    pub fn get_stage(&self) -> ClockStage {
        self.stage.get()
    }

    /// Get the current system clock source
    pub fn get_sys_clock_source(&self) -> SysClockSource {
        self.rcc.get_sys_clock_source()
    }

    /// Get the current system clock frequency in MHz
    ///
    /// Returns 0 if the frequency of the active source is unknown.
    pub fn get_sys_clock_frequency_mhz(&self) -> usize {
        match self.get_sys_clock_source() {
            SysClockSource::HSI => HSI_FREQUENCY_MHZ,
            SysClockSource::HSE => self.hse.get_frequency_mhz().unwrap_or(0),
            SysClockSource::PLL => self.pll.get_frequency_mhz().unwrap_or(0),
        }
    }

    /// Get the current system clock frequency in MHz from RCC registers instead of the cached
    /// PLL frequency.
    pub fn get_sys_clock_frequency_mhz_no_cache(&self) -> usize {
        match self.get_sys_clock_source() {
            SysClockSource::HSI => HSI_FREQUENCY_MHZ,
            SysClockSource::HSE => self.hse.get_frequency_mhz().unwrap_or(0),
            SysClockSource::PLL => {
                let source_frequency = match self.pll.get_source() {
                    PllSource::HsiDiv2 => Some(HSI_FREQUENCY_MHZ),
                    PllSource::Hse | PllSource::HseDiv2 => self.hse.get_frequency_mhz(),
                };
                source_frequency
                    .and_then(|frequency| self.pll.get_frequency_mhz_no_cache(frequency))
                    .unwrap_or(0)
            }
        }
    }

    pub fn get_ahb_prescaler(&self) -> AHBPrescaler {
        self.rcc.get_ahb_prescaler()
    }

    pub fn get_ahb_frequency_mhz(&self) -> usize {
        let ahb_divider: usize = self.get_ahb_prescaler().into();
        self.get_sys_clock_frequency_mhz() / ahb_divider
    }

    pub fn get_apb1_prescaler(&self) -> APBPrescaler {
        self.rcc.get_apb1_prescaler()
    }

    pub fn get_apb1_frequency_mhz(&self) -> usize {
        let divider: usize = self.get_apb1_prescaler().into();
        self.get_ahb_frequency_mhz() / divider
    }

    pub fn get_apb2_prescaler(&self) -> APBPrescaler {
        self.rcc.get_apb2_prescaler()
    }

    pub fn get_apb2_frequency_mhz(&self) -> usize {
        let divider: usize = self.get_apb2_prescaler().into();
        self.get_ahb_frequency_mhz() / divider
    }

    pub fn get_adc_prescaler(&self) -> ADCPrescaler {
        self.rcc.get_adc_prescaler()
    }

    pub fn get_adc_frequency_mhz(&self) -> usize {
        let divider: usize = self.get_adc_prescaler().into();
        self.get_apb2_frequency_mhz() / divider
    }

    /// Get the USB clock frequency in MHz, or `None` while the PLL is off.
    pub fn get_usb_frequency_mhz(&self) -> Option<usize> {
        self.pll
            .get_frequency_mhz()
            .map(|frequency| self.rcc.get_usb_prescaler().apply(frequency))
    }
}
