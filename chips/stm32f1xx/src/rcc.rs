// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Reset and clock control (RCC) of the STM32F1 family.
//!
//! Low-level access to the RCC registers. Higher level clock management lives in
//! [crate::clocks]; peripheral drivers use [crate::clocks::phclk::PeripheralClock].
//!
//! The clock control register (CR) and the clock configuration register (CFGR) are only ever
//! written with a full word. A read-modify-write of CR does not reliably start the PLL on this
//! family, so the driver composes the whole register value and stores it at once. The
//! peripheral enable and reset registers are updated with read-modify-write.

use tock_registers::fields::{Field, FieldValue};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::clocks::config::ClockConfig;
use crate::mmio::{BusRegister, RegisterAddress, RegisterBus};

const RCC_BASE: usize = 0x4002_1000;

pub(crate) const RCC_CR: RegisterAddress = RegisterAddress::new(RCC_BASE);
pub(crate) const RCC_CFGR: RegisterAddress = RegisterAddress::new(RCC_BASE + 0x04);
pub(crate) const RCC_APB1RSTR: RegisterAddress = RegisterAddress::new(RCC_BASE + 0x10);
pub(crate) const RCC_AHBENR: RegisterAddress = RegisterAddress::new(RCC_BASE + 0x14);
pub(crate) const RCC_APB2ENR: RegisterAddress = RegisterAddress::new(RCC_BASE + 0x18);
pub(crate) const RCC_APB1ENR: RegisterAddress = RegisterAddress::new(RCC_BASE + 0x1C);

/// Factory trim of the internal 8MHz oscillator, restored whenever CR is written.
pub(crate) const HSI_DEFAULT_TRIM: u32 = 16;

register_bitfields![u32,
    pub CR [
        /// PLL clock ready flag
        PLLRDY OFFSET(25) NUMBITS(1) [],
        /// PLL enable
        PLLON OFFSET(24) NUMBITS(1) [],
        /// Clock security system enable
        CSSON OFFSET(19) NUMBITS(1) [],
        /// External high-speed clock bypass
        HSEBYP OFFSET(18) NUMBITS(1) [],
        /// External high-speed clock ready flag
        HSERDY OFFSET(17) NUMBITS(1) [],
        /// HSE clock enable
        HSEON OFFSET(16) NUMBITS(1) [],
        /// Internal high-speed clock calibration
        HSICAL OFFSET(8) NUMBITS(8) [],
        /// Internal high-speed clock trimming
        HSITRIM OFFSET(3) NUMBITS(5) [],
        /// Internal high-speed clock ready flag
        HSIRDY OFFSET(1) NUMBITS(1) [],
        /// Internal high-speed clock enable
        HSION OFFSET(0) NUMBITS(1) []
    ],
    pub CFGR [
        /// Microcontroller clock output
        MCO OFFSET(24) NUMBITS(3) [],
        /// USB prescaler
        USBPRE OFFSET(22) NUMBITS(1) [],
        /// PLL multiplication factor
        PLLMUL OFFSET(18) NUMBITS(4) [],
        /// HSE divider for PLL entry
        PLLXTPRE OFFSET(17) NUMBITS(1) [],
        /// PLL entry clock source
        PLLSRC OFFSET(16) NUMBITS(1) [],
        /// ADC prescaler
        ADCPRE OFFSET(14) NUMBITS(2) [],
        /// APB high-speed prescaler (APB2)
        PPRE2 OFFSET(11) NUMBITS(3) [],
        /// APB low-speed prescaler (APB1)
        PPRE1 OFFSET(8) NUMBITS(3) [],
        /// AHB prescaler
        HPRE OFFSET(4) NUMBITS(4) [],
        /// System clock switch status
        SWS OFFSET(2) NUMBITS(2) [],
        /// System clock switch
        SW OFFSET(0) NUMBITS(2) []
    ],
    pub APB1RSTR [
        /// USB reset
        USBRST OFFSET(23) NUMBITS(1) [],
        /// I2C2 reset
        I2C2RST OFFSET(22) NUMBITS(1) [],
        /// I2C1 reset
        I2C1RST OFFSET(21) NUMBITS(1) [],
        /// USART3 reset
        USART3RST OFFSET(18) NUMBITS(1) [],
        /// USART2 reset
        USART2RST OFFSET(17) NUMBITS(1) [],
        /// SPI2 reset
        SPI2RST OFFSET(14) NUMBITS(1) [],
        /// TIM4 timer reset
        TIM4RST OFFSET(2) NUMBITS(1) [],
        /// TIM3 timer reset
        TIM3RST OFFSET(1) NUMBITS(1) [],
        /// TIM2 timer reset
        TIM2RST OFFSET(0) NUMBITS(1) []
    ],
    pub AHBENR [
        /// CRC clock enable
        CRCEN OFFSET(6) NUMBITS(1) [],
        /// FLITF clock enable
        FLITFEN OFFSET(4) NUMBITS(1) [],
        /// SRAM interface clock enable
        SRAMEN OFFSET(2) NUMBITS(1) [],
        /// DMA1 clock enable
        DMA1EN OFFSET(0) NUMBITS(1) []
    ],
    pub APB2ENR [
        /// USART1 clock enable
        USART1EN OFFSET(14) NUMBITS(1) [],
        /// SPI1 clock enable
        SPI1EN OFFSET(12) NUMBITS(1) [],
        /// TIM1 timer clock enable
        TIM1EN OFFSET(11) NUMBITS(1) [],
        /// ADC2 interface clock enable
        ADC2EN OFFSET(10) NUMBITS(1) [],
        /// ADC1 interface clock enable
        ADC1EN OFFSET(9) NUMBITS(1) [],
        /// I/O port D clock enable
        IOPDEN OFFSET(5) NUMBITS(1) [],
        /// I/O port C clock enable
        IOPCEN OFFSET(4) NUMBITS(1) [],
        /// I/O port B clock enable
        IOPBEN OFFSET(3) NUMBITS(1) [],
        /// I/O port A clock enable
        IOPAEN OFFSET(2) NUMBITS(1) [],
        /// Alternate function I/O clock enable
        AFIOEN OFFSET(0) NUMBITS(1) []
    ],
    pub APB1ENR [
        /// USB clock enable
        USBEN OFFSET(23) NUMBITS(1) [],
        /// I2C2 clock enable
        I2C2EN OFFSET(22) NUMBITS(1) [],
        /// I2C1 clock enable
        I2C1EN OFFSET(21) NUMBITS(1) [],
        /// USART3 clock enable
        USART3EN OFFSET(18) NUMBITS(1) [],
        /// USART2 clock enable
        USART2EN OFFSET(17) NUMBITS(1) [],
        /// SPI2 clock enable
        SPI2EN OFFSET(14) NUMBITS(1) [],
        /// TIM4 timer clock enable
        TIM4EN OFFSET(2) NUMBITS(1) [],
        /// TIM3 timer clock enable
        TIM3EN OFFSET(1) NUMBITS(1) [],
        /// TIM2 timer clock enable
        TIM2EN OFFSET(0) NUMBITS(1) []
    ]
];

pub struct Rcc<'a, B: RegisterBus> {
    bus: &'a B,
}

impl<'a, B: RegisterBus> Rcc<'a, B> {
    pub const fn new(bus: &'a B) -> Self {
        Self { bus }
    }

    fn cr(&self) -> BusRegister<'a, B, CR::Register> {
        BusRegister::new(self.bus, RCC_CR)
    }

    fn cfgr(&self) -> BusRegister<'a, B, CFGR::Register> {
        BusRegister::new(self.bus, RCC_CFGR)
    }

    fn apb1rstr(&self) -> BusRegister<'a, B, APB1RSTR::Register> {
        BusRegister::new(self.bus, RCC_APB1RSTR)
    }

    fn ahbenr(&self) -> BusRegister<'a, B, AHBENR::Register> {
        BusRegister::new(self.bus, RCC_AHBENR)
    }

    fn apb2enr(&self) -> BusRegister<'a, B, APB2ENR::Register> {
        BusRegister::new(self.bus, RCC_APB2ENR)
    }

    fn apb1enr(&self) -> BusRegister<'a, B, APB1ENR::Register> {
        BusRegister::new(self.bus, RCC_APB1ENR)
    }

    /* Clock control */

    // Store the clock control word that keeps HSI running, optionally starts HSE and turns the
    // PLL on. This is a single full-word store; it must never become a read-modify-write.
    pub(crate) fn start_pll_clock(&self, hse: Option<HseMode>) {
        let hsi = CR::HSION::SET + CR::HSITRIM.val(HSI_DEFAULT_TRIM);
        match hse {
            None => self.cr().write(hsi + CR::PLLON::SET),
            Some(HseMode::CRYSTAL) => {
                self.cr().write(hsi + CR::HSEON::SET + CR::PLLON::SET);
            }
            Some(HseMode::BYPASS) => {
                // HSEBYP can only be written while HSE is off
                self.cr().write(hsi + CR::HSEBYP::SET);
                self.cr()
                    .write(hsi + CR::HSEBYP::SET + CR::HSEON::SET + CR::PLLON::SET);
            }
        }
    }

    pub(crate) fn is_enabled_hsi_clock(&self) -> bool {
        self.cr().is_set(CR::HSION)
    }

    pub(crate) fn is_ready_hsi_clock(&self) -> bool {
        self.cr().is_set(CR::HSIRDY)
    }

    pub(crate) fn get_hsi_trim(&self) -> u32 {
        self.cr().read(CR::HSITRIM)
    }

    pub(crate) fn is_enabled_hse_clock(&self) -> bool {
        self.cr().is_set(CR::HSEON)
    }

    pub(crate) fn is_enabled_hse_clock_bypass(&self) -> bool {
        self.cr().is_set(CR::HSEBYP)
    }

    pub(crate) fn is_ready_hse_clock(&self) -> bool {
        self.cr().is_set(CR::HSERDY)
    }

    pub(crate) fn is_enabled_pll_clock(&self) -> bool {
        self.cr().is_set(CR::PLLON)
    }

    pub(crate) fn is_locked_pll_clock(&self) -> bool {
        self.cr().is_set(CR::PLLRDY)
    }

    /* Clock configuration */

    // Store the full clock configuration word for `config` with the given system clock source
    // and ADC prescaler. The PLL source and multiplier may only change while the PLL is off.
    pub(crate) fn write_clock_configuration(
        &self,
        config: &ClockConfig,
        source: SysClockSource,
        adc_prescaler: ADCPrescaler,
    ) {
        self.cfgr().write(
            CFGR::SW.val(source as u32)
                + CFGR::HPRE.val(config.ahb_prescaler as u32)
                + CFGR::PPRE1.val(config.apb1_prescaler as u32)
                + CFGR::PPRE2.val(config.apb2_prescaler as u32)
                + CFGR::ADCPRE.val(adc_prescaler as u32)
                + pll_source_field(config.pll_source)
                + CFGR::PLLMUL.val(config.pll_mul as u32)
                + CFGR::USBPRE.val(config.usb_prescaler as u32),
        );
    }

    // Get the current system clock source
    pub(crate) fn get_sys_clock_source(&self) -> SysClockSource {
        match self.cfgr().read(CFGR::SWS) {
            0b00 => SysClockSource::HSI,
            0b01 => SysClockSource::HSE,
            // 0b11 is not allowed
            _ => SysClockSource::PLL,
        }
    }

    pub(crate) fn get_pll_clocks_source(&self) -> PllSource {
        let cfgr = self.cfgr();
        match (cfgr.is_set(CFGR::PLLSRC), cfgr.is_set(CFGR::PLLXTPRE)) {
            (false, _) => PllSource::HsiDiv2,
            (true, false) => PllSource::Hse,
            (true, true) => PllSource::HseDiv2,
        }
    }

    pub(crate) fn get_pll_clock_multiplier(&self) -> PllMul {
        PllMul::from_bits(self.cfgr().read(CFGR::PLLMUL))
    }

    pub(crate) fn get_ahb_prescaler(&self) -> AHBPrescaler {
        match self.cfgr().read(CFGR::HPRE) {
            0b1000 => AHBPrescaler::DivideBy2,
            0b1001 => AHBPrescaler::DivideBy4,
            0b1010 => AHBPrescaler::DivideBy8,
            0b1011 => AHBPrescaler::DivideBy16,
            0b1100 => AHBPrescaler::DivideBy64,
            0b1101 => AHBPrescaler::DivideBy128,
            0b1110 => AHBPrescaler::DivideBy256,
            0b1111 => AHBPrescaler::DivideBy512,
            _ => AHBPrescaler::DivideBy1,
        }
    }

    pub(crate) fn get_apb1_prescaler(&self) -> APBPrescaler {
        APBPrescaler::from_bits(self.cfgr().read(CFGR::PPRE1))
    }

    pub(crate) fn get_apb2_prescaler(&self) -> APBPrescaler {
        APBPrescaler::from_bits(self.cfgr().read(CFGR::PPRE2))
    }

    pub(crate) fn get_adc_prescaler(&self) -> ADCPrescaler {
        match self.cfgr().read(CFGR::ADCPRE) {
            0b00 => ADCPrescaler::DivideBy2,
            0b01 => ADCPrescaler::DivideBy4,
            0b10 => ADCPrescaler::DivideBy6,
            _ => ADCPrescaler::DivideBy8,
        }
    }

    pub(crate) fn get_usb_prescaler(&self) -> USBPrescaler {
        if self.cfgr().is_set(CFGR::USBPRE) {
            USBPrescaler::DivideBy1
        } else {
            USBPrescaler::DivideBy1_5
        }
    }

    /* Peripheral clock gating */

    pub(crate) fn is_enabled_ahb_clock(&self, field: Field<u32, AHBENR::Register>) -> bool {
        self.ahbenr().is_set(field)
    }

    pub(crate) fn enable_ahb_clock(&self, field: Field<u32, AHBENR::Register>) {
        self.ahbenr().modify(field.val(1));
    }

    pub(crate) fn disable_ahb_clock(&self, field: Field<u32, AHBENR::Register>) {
        self.ahbenr().modify(field.val(0));
    }

    pub(crate) fn is_enabled_apb1_clock(&self, field: Field<u32, APB1ENR::Register>) -> bool {
        self.apb1enr().is_set(field)
    }

    pub(crate) fn enable_apb1_clock(&self, field: Field<u32, APB1ENR::Register>) {
        self.apb1enr().modify(field.val(1));
    }

    pub(crate) fn disable_apb1_clock(&self, field: Field<u32, APB1ENR::Register>) {
        self.apb1enr().modify(field.val(0));
    }

    pub(crate) fn is_enabled_apb2_clock(&self, field: Field<u32, APB2ENR::Register>) -> bool {
        self.apb2enr().is_set(field)
    }

    pub(crate) fn enable_apb2_clock(&self, field: Field<u32, APB2ENR::Register>) {
        self.apb2enr().modify(field.val(1));
    }

    pub(crate) fn disable_apb2_clock(&self, field: Field<u32, APB2ENR::Register>) {
        self.apb2enr().modify(field.val(0));
    }

    /* USB reset */

    /// Take the USB peripheral out of reset.
    ///
    /// Clears only the USB bit of the APB1 reset register and leaves every other bit as it is.
    /// Calling it again, or before the clocks are initialized, is harmless.
    pub fn release_usb_reset(&self) {
        self.apb1rstr().modify(APB1RSTR::USBRST::CLEAR);
    }

    /// Hold the USB peripheral in reset.
    pub fn hold_usb_reset(&self) {
        self.apb1rstr().modify(APB1RSTR::USBRST::SET);
    }

    pub fn is_usb_in_reset(&self) -> bool {
        self.apb1rstr().is_set(APB1RSTR::USBRST)
    }
}

fn pll_source_field(source: PllSource) -> FieldValue<u32, CFGR::Register> {
    match source {
        PllSource::HsiDiv2 => CFGR::PLLSRC::CLEAR + CFGR::PLLXTPRE::CLEAR,
        PllSource::Hse => CFGR::PLLSRC::SET + CFGR::PLLXTPRE::CLEAR,
        PllSource::HseDiv2 => CFGR::PLLSRC::SET + CFGR::PLLXTPRE::SET,
    }
}

/// Clock sources for the CPU
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SysClockSource {
    HSI = 0b00,
    HSE = 0b01,
    PLL = 0b10,
}

/// PLL entry clock
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PllSource {
    /// Internal oscillator divided by two
    HsiDiv2,
    /// External oscillator
    Hse,
    /// External oscillator divided by two
    HseDiv2,
}

/// PLL multiplication factor, encoded as in CFGR.PLLMUL
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PllMul {
    Mul2 = 0b0000,
    Mul3 = 0b0001,
    Mul4 = 0b0010,
    Mul5 = 0b0011,
    Mul6 = 0b0100,
    Mul7 = 0b0101,
    Mul8 = 0b0110,
    Mul9 = 0b0111,
    Mul10 = 0b1000,
    Mul11 = 0b1001,
    Mul12 = 0b1010,
    Mul13 = 0b1011,
    Mul14 = 0b1100,
    Mul15 = 0b1101,
    Mul16 = 0b1110,
}

impl PllMul {
    pub const fn factor(self) -> usize {
        self as usize + 2
    }

    const fn from_bits(bits: u32) -> Self {
        match bits {
            0b0000 => PllMul::Mul2,
            0b0001 => PllMul::Mul3,
            0b0010 => PllMul::Mul4,
            0b0011 => PllMul::Mul5,
            0b0100 => PllMul::Mul6,
            0b0101 => PllMul::Mul7,
            0b0110 => PllMul::Mul8,
            0b0111 => PllMul::Mul9,
            0b1000 => PllMul::Mul10,
            0b1001 => PllMul::Mul11,
            0b1010 => PllMul::Mul12,
            0b1011 => PllMul::Mul13,
            0b1100 => PllMul::Mul14,
            0b1101 => PllMul::Mul15,
            // 0b1110 and 0b1111 both multiply by 16
            _ => PllMul::Mul16,
        }
    }
}

impl From<PllMul> for usize {
    fn from(item: PllMul) -> usize {
        item.factor()
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AHBPrescaler {
    DivideBy1 = 0b0000,
    DivideBy2 = 0b1000,
    DivideBy4 = 0b1001,
    DivideBy8 = 0b1010,
    DivideBy16 = 0b1011,
    DivideBy64 = 0b1100,
    DivideBy128 = 0b1101,
    DivideBy256 = 0b1110,
    DivideBy512 = 0b1111,
}

impl AHBPrescaler {
    pub const fn divider(self) -> usize {
        match self {
            AHBPrescaler::DivideBy1 => 1,
            AHBPrescaler::DivideBy2 => 2,
            AHBPrescaler::DivideBy4 => 4,
            AHBPrescaler::DivideBy8 => 8,
            AHBPrescaler::DivideBy16 => 16,
            AHBPrescaler::DivideBy64 => 64,
            AHBPrescaler::DivideBy128 => 128,
            AHBPrescaler::DivideBy256 => 256,
            AHBPrescaler::DivideBy512 => 512,
        }
    }
}

impl From<AHBPrescaler> for usize {
    fn from(item: AHBPrescaler) -> usize {
        item.divider()
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum APBPrescaler {
    DivideBy1 = 0b000, // No division
    DivideBy2 = 0b100,
    DivideBy4 = 0b101,
    DivideBy8 = 0b110,
    DivideBy16 = 0b111,
}

impl APBPrescaler {
    pub const fn divider(self) -> usize {
        match self {
            APBPrescaler::DivideBy1 => 1,
            APBPrescaler::DivideBy2 => 2,
            APBPrescaler::DivideBy4 => 4,
            APBPrescaler::DivideBy8 => 8,
            APBPrescaler::DivideBy16 => 16,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        match bits {
            0b100 => APBPrescaler::DivideBy2,
            0b101 => APBPrescaler::DivideBy4,
            0b110 => APBPrescaler::DivideBy8,
            0b111 => APBPrescaler::DivideBy16,
            _ => APBPrescaler::DivideBy1, // 0b0xx means no division
        }
    }
}

impl From<APBPrescaler> for usize {
    fn from(item: APBPrescaler) -> Self {
        item.divider()
    }
}

/// Divider between PCLK2 and the ADC clock
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ADCPrescaler {
    DivideBy2 = 0b00,
    DivideBy4 = 0b01,
    DivideBy6 = 0b10,
    DivideBy8 = 0b11,
}

impl ADCPrescaler {
    pub const fn divider(self) -> usize {
        match self {
            ADCPrescaler::DivideBy2 => 2,
            ADCPrescaler::DivideBy4 => 4,
            ADCPrescaler::DivideBy6 => 6,
            ADCPrescaler::DivideBy8 => 8,
        }
    }

    /// The smallest divider that keeps the ADC clock at or below `limit_mhz`.
    ///
    /// Falls back to the largest divider when none of them is enough.
    pub const fn for_apb2_frequency(apb2_frequency_mhz: usize, limit_mhz: usize) -> Self {
        if apb2_frequency_mhz <= 2 * limit_mhz {
            ADCPrescaler::DivideBy2
        } else if apb2_frequency_mhz <= 4 * limit_mhz {
            ADCPrescaler::DivideBy4
        } else if apb2_frequency_mhz <= 6 * limit_mhz {
            ADCPrescaler::DivideBy6
        } else {
            ADCPrescaler::DivideBy8
        }
    }
}

impl From<ADCPrescaler> for usize {
    fn from(item: ADCPrescaler) -> Self {
        item.divider()
    }
}

/// Divider between the PLL output and the 48MHz USB clock
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum USBPrescaler {
    /// PLL output divided by 1.5
    DivideBy1_5 = 0,
    /// PLL output used as is
    DivideBy1 = 1,
}

impl USBPrescaler {
    /// USB clock frequency for the given PLL output frequency.
    pub const fn apply(self, pll_frequency_mhz: usize) -> usize {
        match self {
            USBPrescaler::DivideBy1_5 => pll_frequency_mhz * 2 / 3,
            USBPrescaler::DivideBy1 => pll_frequency_mhz,
        }
    }
}

/// HSE Mode
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HseMode {
    BYPASS,
    CRYSTAL,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, FakeBus};

    extern crate std;
    use std::vec::Vec;

    #[test]
    fn pll_multiplier_encoding() {
        assert_eq!(PllMul::Mul9 as u32, 0b0111);
        assert_eq!(PllMul::Mul9.factor(), 9);
        assert_eq!(PllMul::Mul2.factor(), 2);
        assert_eq!(PllMul::Mul16.factor(), 16);
        assert_eq!(PllMul::from_bits(0b0111), PllMul::Mul9);
        assert_eq!(PllMul::from_bits(0b1111), PllMul::Mul16);
        assert_eq!(usize::from(PllMul::Mul10), 10);
    }

    #[test]
    fn adc_prescaler_is_smallest_within_limit() {
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(72, 14),
            ADCPrescaler::DivideBy6
        );
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(56, 14),
            ADCPrescaler::DivideBy4
        );
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(36, 14),
            ADCPrescaler::DivideBy4
        );
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(28, 14),
            ADCPrescaler::DivideBy2
        );
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(8, 14),
            ADCPrescaler::DivideBy2
        );
        assert_eq!(
            ADCPrescaler::for_apb2_frequency(200, 14),
            ADCPrescaler::DivideBy8
        );
    }

    #[test]
    fn usb_prescaler() {
        assert_eq!(USBPrescaler::DivideBy1_5.apply(72), 48);
        assert_eq!(USBPrescaler::DivideBy1.apply(48), 48);
    }

    #[test]
    fn prescalers_decode_from_configuration_register() {
        let bus = FakeBus::new();
        // PLLMUL x9, HSE entry, ADC /6, APB1 /2, AHB /1, APB2 /1, SW = PLL
        bus.preset(RCC_CFGR, 0x001D_840A);
        let rcc = Rcc::new(&bus);

        assert_eq!(rcc.get_sys_clock_source(), SysClockSource::PLL);
        assert_eq!(rcc.get_pll_clocks_source(), PllSource::Hse);
        assert_eq!(rcc.get_pll_clock_multiplier(), PllMul::Mul9);
        assert_eq!(rcc.get_ahb_prescaler(), AHBPrescaler::DivideBy1);
        assert_eq!(rcc.get_apb1_prescaler(), APBPrescaler::DivideBy2);
        assert_eq!(rcc.get_apb2_prescaler(), APBPrescaler::DivideBy1);
        assert_eq!(rcc.get_adc_prescaler(), ADCPrescaler::DivideBy6);
        assert_eq!(rcc.get_usb_prescaler(), USBPrescaler::DivideBy1_5);
    }

    #[test]
    fn start_pll_clock_is_a_single_full_store() {
        let bus = FakeBus::new();
        let rcc = Rcc::new(&bus);

        rcc.start_pll_clock(Some(HseMode::CRYSTAL));

        assert_eq!(bus.trace(), [Access::Write(RCC_CR.get(), 0x0101_0081)]);
    }

    #[test]
    fn start_pll_clock_from_hsi_leaves_hse_off() {
        let bus = FakeBus::new();
        let rcc = Rcc::new(&bus);

        rcc.start_pll_clock(None);

        assert_eq!(bus.writes_to(RCC_CR), [0x0100_0081]);
        assert!(!rcc.is_enabled_hse_clock());
        assert!(rcc.is_enabled_hsi_clock());
        assert!(rcc.is_ready_hsi_clock());
        assert_eq!(rcc.get_hsi_trim(), HSI_DEFAULT_TRIM);
    }

    #[test]
    fn start_pll_clock_with_bypass_sets_bypass_before_hse() {
        let bus = FakeBus::new();
        let rcc = Rcc::new(&bus);

        rcc.start_pll_clock(Some(HseMode::BYPASS));

        assert_eq!(bus.writes_to(RCC_CR), [0x0004_0081, 0x0105_0081]);
        assert!(rcc.is_enabled_hse_clock_bypass());
        assert!(rcc.is_ready_hse_clock());
    }

    #[test]
    fn enabling_one_peripheral_preserves_other_bits() {
        let bus = FakeBus::new();
        bus.preset(RCC_APB2ENR, 0x0000_0201);
        let rcc = Rcc::new(&bus);

        rcc.enable_apb2_clock(APB2ENR::USART1EN);
        assert_eq!(bus.value(RCC_APB2ENR), 0x0000_4201);

        rcc.disable_apb2_clock(APB2ENR::ADC1EN);
        assert_eq!(bus.value(RCC_APB2ENR), 0x0000_4001);
        assert!(rcc.is_enabled_apb2_clock(APB2ENR::AFIOEN));
        assert!(!rcc.is_enabled_apb2_clock(APB2ENR::ADC1EN));
    }

    #[test]
    fn ahb_and_apb1_gating() {
        let bus = FakeBus::new();
        let rcc = Rcc::new(&bus);

        rcc.enable_ahb_clock(AHBENR::DMA1EN);
        // SRAM and FLITF are on out of reset
        assert_eq!(bus.value(RCC_AHBENR), 0x0000_0015);

        rcc.enable_apb1_clock(APB1ENR::TIM2EN);
        rcc.enable_apb1_clock(APB1ENR::USBEN);
        assert_eq!(bus.value(RCC_APB1ENR), 0x0080_0001);
        rcc.disable_apb1_clock(APB1ENR::TIM2EN);
        assert!(!rcc.is_enabled_apb1_clock(APB1ENR::TIM2EN));
        assert!(rcc.is_enabled_apb1_clock(APB1ENR::USBEN));
        rcc.disable_ahb_clock(AHBENR::DMA1EN);
        assert!(!rcc.is_enabled_ahb_clock(AHBENR::DMA1EN));
    }

    #[test]
    fn release_usb_reset_clears_only_the_usb_bit() {
        let bus = FakeBus::new();
        bus.preset(RCC_APB1RSTR, 0x0086_0001);
        let rcc = Rcc::new(&bus);

        assert!(rcc.is_usb_in_reset());
        rcc.release_usb_reset();
        assert_eq!(bus.value(RCC_APB1RSTR), 0x0006_0001);
        assert!(!rcc.is_usb_in_reset());

        // Idempotent
        rcc.release_usb_reset();
        assert_eq!(bus.value(RCC_APB1RSTR), 0x0006_0001);

        rcc.hold_usb_reset();
        assert_eq!(bus.value(RCC_APB1RSTR), 0x0086_0001);
    }

    #[test]
    fn release_usb_reset_before_clock_bring_up() {
        let bus = FakeBus::new();
        let rcc = Rcc::new(&bus);

        rcc.release_usb_reset();

        assert_eq!(bus.value(RCC_APB1RSTR), 0);
        let touched: Vec<usize> = bus
            .trace()
            .iter()
            .map(|access| match access {
                Access::Read(address, _) | Access::Write(address, _) => *address,
            })
            .collect();
        assert!(touched.iter().all(|address| *address == RCC_APB1RSTR.get()));
    }
}
