// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Clock tree configuration.
//!
//! A [ClockConfig] describes the clock tree the chip runs on once the PLL has locked. All
//! derived frequencies are `const fn`, so a configuration can be checked against the limits of
//! a chip at compile time:
//!
//! ```rust,ignore
//! const CONFIG: ClockConfig = ClockConfig {
//!     pll_mul: PllMul::Mul6,
//!     usb_prescaler: USBPrescaler::DivideBy1,
//!     ..ClockConfig::DEFAULT
//! };
//! const _: () = assert!(CONFIG.check::<Stm32f103Specs>().is_ok());
//! ```

use crate::chip_specs::ChipSpecs;
use crate::clocks::hsi::HSI_FREQUENCY_MHZ;
use crate::errorcode::ErrorCode;
use crate::flash::FlashLatency;
use crate::rcc::{
    ADCPrescaler, AHBPrescaler, APBPrescaler, HseMode, PllMul, PllSource, USBPrescaler,
};

/// Lowest supported HSE crystal or external clock frequency in MHz
pub const HSE_MIN_FREQUENCY_MHZ: usize = 4;
/// Highest supported HSE crystal or external clock frequency in MHz
pub const HSE_MAX_FREQUENCY_MHZ: usize = 16;
/// Maximum ADC clock frequency in MHz
pub const ADC_FREQUENCY_LIMIT_MHZ: usize = 14;
/// Frequency the USB peripheral must be clocked at
pub const USB_FREQUENCY_MHZ: usize = 48;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ClockConfig {
    /// Frequency of the crystal or external clock on OSC_IN
    pub hse_frequency_mhz: usize,
    pub hse_mode: HseMode,
    pub pll_source: PllSource,
    pub pll_mul: PllMul,
    pub ahb_prescaler: AHBPrescaler,
    pub apb1_prescaler: APBPrescaler,
    pub apb2_prescaler: APBPrescaler,
    pub usb_prescaler: USBPrescaler,
    /// Gate the USB peripheral clock on during bring-up
    pub usb: bool,
}

impl ClockConfig {
    /// 8MHz crystal, PLL x9 = 72MHz system clock, 36MHz APB1, 72MHz APB2, 12MHz ADC and 48MHz
    /// USB.
    pub const DEFAULT: Self = Self {
        hse_frequency_mhz: 8,
        hse_mode: HseMode::CRYSTAL,
        pll_source: PllSource::Hse,
        pll_mul: PllMul::Mul9,
        ahb_prescaler: AHBPrescaler::DivideBy1,
        apb1_prescaler: APBPrescaler::DivideBy2,
        apb2_prescaler: APBPrescaler::DivideBy1,
        usb_prescaler: USBPrescaler::DivideBy1_5,
        usb: true,
    };

    pub const fn uses_hse(&self) -> bool {
        !matches!(self.pll_source, PllSource::HsiDiv2)
    }

    /// Frequency entering the PLL
    pub const fn pll_input_frequency_mhz(&self) -> usize {
        match self.pll_source {
            PllSource::HsiDiv2 => HSI_FREQUENCY_MHZ / 2,
            PllSource::Hse => self.hse_frequency_mhz,
            PllSource::HseDiv2 => self.hse_frequency_mhz / 2,
        }
    }

    pub const fn pll_frequency_mhz(&self) -> usize {
        self.pll_input_frequency_mhz() * self.pll_mul.factor()
    }

    /// The system clock runs from the PLL once the clocks are initialized.
    pub const fn sys_clock_frequency_mhz(&self) -> usize {
        self.pll_frequency_mhz()
    }

    pub const fn ahb_frequency_mhz(&self) -> usize {
        self.sys_clock_frequency_mhz() / self.ahb_prescaler.divider()
    }

    pub const fn apb1_frequency_mhz(&self) -> usize {
        self.ahb_frequency_mhz() / self.apb1_prescaler.divider()
    }

    pub const fn apb2_frequency_mhz(&self) -> usize {
        self.ahb_frequency_mhz() / self.apb2_prescaler.divider()
    }

    pub const fn adc_prescaler(&self) -> ADCPrescaler {
        ADCPrescaler::for_apb2_frequency(self.apb2_frequency_mhz(), ADC_FREQUENCY_LIMIT_MHZ)
    }

    pub const fn adc_frequency_mhz(&self) -> usize {
        self.apb2_frequency_mhz() / self.adc_prescaler().divider()
    }

    pub const fn usb_frequency_mhz(&self) -> usize {
        self.usb_prescaler.apply(self.pll_frequency_mhz())
    }

    pub const fn flash_latency(&self) -> FlashLatency {
        FlashLatency::for_frequency(self.sys_clock_frequency_mhz())
    }

    /// Check the configuration against the limits of chip `S`.
    ///
    /// # Errors
    ///
    /// + [Err]\([ErrorCode::INVAL]\): the HSE frequency is out of range or cannot be halved
    /// exactly, the PLL output is below its minimum, or USB is requested on a chip without it or
    /// with a USB clock other than 48MHz.
    /// + [Err]\([ErrorCode::SIZE]\): the PLL output or a bus clock exceeds what chip `S`
    /// allows.
    pub const fn check<S: ChipSpecs>(&self) -> Result<(), ErrorCode> {
        if self.uses_hse() {
            if self.hse_frequency_mhz < HSE_MIN_FREQUENCY_MHZ
                || self.hse_frequency_mhz > HSE_MAX_FREQUENCY_MHZ
            {
                return Err(ErrorCode::INVAL);
            }
            if matches!(self.pll_source, PllSource::HseDiv2) && self.hse_frequency_mhz % 2 != 0 {
                return Err(ErrorCode::INVAL);
            }
        }

        let pll_frequency_mhz = self.pll_frequency_mhz();
        if pll_frequency_mhz < S::MIN_FREQ_MHZ {
            return Err(ErrorCode::INVAL);
        }
        if pll_frequency_mhz > S::MAX_FREQ_MHZ
            || self.sys_clock_frequency_mhz() > S::SYS_CLOCK_FREQUENCY_LIMIT_MHZ
        {
            return Err(ErrorCode::SIZE);
        }

        if self.apb1_frequency_mhz() > S::APB1_FREQUENCY_LIMIT_MHZ
            || self.apb2_frequency_mhz() > S::APB2_FREQUENCY_LIMIT_MHZ
            || self.adc_frequency_mhz() > ADC_FREQUENCY_LIMIT_MHZ
        {
            return Err(ErrorCode::SIZE);
        }

        if self.usb {
            if !S::HAS_USB {
                return Err(ErrorCode::INVAL);
            }
            let exact = match self.usb_prescaler {
                USBPrescaler::DivideBy1_5 => pll_frequency_mhz * 2 % 3 == 0,
                USBPrescaler::DivideBy1 => true,
            };
            if !exact || self.usb_frequency_mhz() != USB_FREQUENCY_MHZ {
                return Err(ErrorCode::INVAL);
            }
        }

        Ok(())
    }
}

const _: () = assert!(ClockConfig::DEFAULT.sys_clock_frequency_mhz() == 72);
const _: () = assert!(ClockConfig::DEFAULT.apb1_frequency_mhz() == 36);
const _: () = assert!(ClockConfig::DEFAULT.apb2_frequency_mhz() == 72);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip_specs::{Stm32f101Specs, Stm32f103Specs};

    #[test]
    fn default_tree() {
        let config = ClockConfig::DEFAULT;

        assert_eq!(config.pll_input_frequency_mhz(), 8);
        assert_eq!(config.sys_clock_frequency_mhz(), 72);
        assert_eq!(config.ahb_frequency_mhz(), 72);
        assert_eq!(config.apb1_frequency_mhz(), 36);
        assert_eq!(config.apb2_frequency_mhz(), 72);
        assert_eq!(config.adc_prescaler(), ADCPrescaler::DivideBy6);
        assert_eq!(config.adc_frequency_mhz(), 12);
        assert_eq!(config.usb_frequency_mhz(), 48);
        assert_eq!(config.flash_latency(), FlashLatency::Latency2);
        assert_eq!(config.check::<Stm32f103Specs>(), Ok(()));
    }

    #[test]
    fn multiplier_past_72mhz_is_rejected() {
        let config = ClockConfig {
            pll_mul: PllMul::Mul10,
            ..ClockConfig::DEFAULT
        };

        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::SIZE));
    }

    #[test]
    fn undivided_apb1_at_72mhz_is_rejected() {
        let config = ClockConfig {
            apb1_prescaler: APBPrescaler::DivideBy1,
            ..ClockConfig::DEFAULT
        };

        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::SIZE));
    }

    #[test]
    fn usb_needs_48mhz() {
        // 64MHz / 1.5 is not an integer
        let config = ClockConfig {
            pll_mul: PllMul::Mul8,
            ..ClockConfig::DEFAULT
        };
        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::INVAL));

        let config = ClockConfig {
            usb: false,
            ..config
        };
        assert_eq!(config.check::<Stm32f103Specs>(), Ok(()));

        // 8MHz x 6 = 48MHz used as is
        let config = ClockConfig {
            pll_mul: PllMul::Mul6,
            usb_prescaler: USBPrescaler::DivideBy1,
            ..ClockConfig::DEFAULT
        };
        assert_eq!(config.usb_frequency_mhz(), 48);
        assert_eq!(config.check::<Stm32f103Specs>(), Ok(()));
    }

    #[test]
    fn hse_frequency_range() {
        let config = ClockConfig {
            hse_frequency_mhz: 20,
            ..ClockConfig::DEFAULT
        };
        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::INVAL));

        let config = ClockConfig {
            hse_frequency_mhz: 5,
            pll_source: PllSource::HseDiv2,
            ..ClockConfig::DEFAULT
        };
        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::INVAL));

        // HSE frequency is irrelevant when the PLL runs from HSI
        let config = ClockConfig {
            hse_frequency_mhz: 0,
            pll_source: PllSource::HsiDiv2,
            usb: false,
            ..ClockConfig::DEFAULT
        };
        assert_eq!(config.sys_clock_frequency_mhz(), 36);
        assert_eq!(config.check::<Stm32f103Specs>(), Ok(()));
    }

    #[test]
    fn pll_output_below_minimum() {
        let config = ClockConfig {
            pll_source: PllSource::HsiDiv2,
            pll_mul: PllMul::Mul2,
            usb: false,
            ..ClockConfig::DEFAULT
        };

        assert_eq!(config.check::<Stm32f103Specs>(), Err(ErrorCode::INVAL));
    }

    #[test]
    fn access_line_limits() {
        assert_eq!(
            ClockConfig::DEFAULT.check::<Stm32f101Specs>(),
            Err(ErrorCode::SIZE)
        );

        let config = Stm32f101Specs::DEFAULT_CLOCK_CONFIG;
        assert_eq!(config.sys_clock_frequency_mhz(), 36);
        assert_eq!(config.apb1_frequency_mhz(), 36);
        assert_eq!(config.adc_prescaler(), ADCPrescaler::DivideBy4);
        assert_eq!(config.flash_latency(), FlashLatency::Latency1);
        assert_eq!(config.check::<Stm32f101Specs>(), Ok(()));

        let config = ClockConfig { usb: true, ..config };
        assert_eq!(config.check::<Stm32f101Specs>(), Err(ErrorCode::INVAL));
    }
}
