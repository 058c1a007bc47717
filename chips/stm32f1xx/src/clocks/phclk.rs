// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

use tock_registers::fields::Field;

use crate::chip_specs::ChipSpecs;
use crate::clocks::Clocks;
use crate::mmio::RegisterBus;
use crate::rcc::{APBPrescaler, Rcc, AHBENR, APB1ENR, APB2ENR};

/// Clock gate of a single peripheral
pub trait ClockInterface {
    fn is_enabled(&self) -> bool;
    fn enable(&self);
    fn disable(&self);
}

pub struct PeripheralClock<'a, B: RegisterBus> {
    pub clock: PeripheralClockType,
    rcc: &'a Rcc<'a, B>,
}

/// Bus + Clock name for the peripherals
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PeripheralClockType {
    AHB(HCLK),
    APB1(PCLK1),
    APB2(PCLK2),
}

/// Peripherals clocked by HCLK
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HCLK {
    DMA1,
    CRC,
}

/// Peripherals clocked by PCLK1
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PCLK1 {
    TIM2,
    TIM3,
    TIM4,
    SPI2,
    USART2,
    USART3,
    I2C1,
    I2C2,
    USB,
}

/// Peripherals clocked by PCLK2
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PCLK2 {
    AFIO,
    GPIOA,
    GPIOB,
    GPIOC,
    GPIOD,
    ADC1,
    ADC2,
    TIM1,
    SPI1,
    USART1,
}

/// Peripherals whose clocks are turned on at the end of clock bring-up, in this order.
pub const BOOT_PERIPHERALS: [PeripheralClockType; 8] = [
    PeripheralClockType::APB2(PCLK2::GPIOA),
    PeripheralClockType::APB2(PCLK2::GPIOB),
    PeripheralClockType::APB2(PCLK2::GPIOC),
    PeripheralClockType::APB2(PCLK2::USART1),
    PeripheralClockType::APB2(PCLK2::ADC1),
    PeripheralClockType::APB2(PCLK2::ADC2),
    PeripheralClockType::APB1(PCLK1::TIM2),
    PeripheralClockType::APB1(PCLK1::USB),
];

impl HCLK {
    fn enable_field(self) -> Field<u32, AHBENR::Register> {
        match self {
            HCLK::DMA1 => AHBENR::DMA1EN,
            HCLK::CRC => AHBENR::CRCEN,
        }
    }
}

impl PCLK1 {
    fn enable_field(self) -> Field<u32, APB1ENR::Register> {
        match self {
            PCLK1::TIM2 => APB1ENR::TIM2EN,
            PCLK1::TIM3 => APB1ENR::TIM3EN,
            PCLK1::TIM4 => APB1ENR::TIM4EN,
            PCLK1::SPI2 => APB1ENR::SPI2EN,
            PCLK1::USART2 => APB1ENR::USART2EN,
            PCLK1::USART3 => APB1ENR::USART3EN,
            PCLK1::I2C1 => APB1ENR::I2C1EN,
            PCLK1::I2C2 => APB1ENR::I2C2EN,
            PCLK1::USB => APB1ENR::USBEN,
        }
    }
}

impl PCLK2 {
    fn enable_field(self) -> Field<u32, APB2ENR::Register> {
        match self {
            PCLK2::AFIO => APB2ENR::AFIOEN,
            PCLK2::GPIOA => APB2ENR::IOPAEN,
            PCLK2::GPIOB => APB2ENR::IOPBEN,
            PCLK2::GPIOC => APB2ENR::IOPCEN,
            PCLK2::GPIOD => APB2ENR::IOPDEN,
            PCLK2::ADC1 => APB2ENR::ADC1EN,
            PCLK2::ADC2 => APB2ENR::ADC2EN,
            PCLK2::TIM1 => APB2ENR::TIM1EN,
            PCLK2::SPI1 => APB2ENR::SPI1EN,
            PCLK2::USART1 => APB2ENR::USART1EN,
        }
    }
}

impl<'a, B: RegisterBus> PeripheralClock<'a, B> {
    pub const fn new(clock: PeripheralClockType, rcc: &'a Rcc<'a, B>) -> Self {
        Self { clock, rcc }
    }

    /// Frequency of the clock feeding the peripheral, in MHz.
    pub fn get_frequency_mhz<S: ChipSpecs>(&self, clocks: &Clocks<'a, B, S>) -> usize {
        // Reference Manual RM0008 section 7.2
        // If the APBx prescaler is 1, TIMxCLK = PCLKx, otherwise TIMxCLK = 2x PCLKx.
        fn tim_freq(hclk_freq: usize, prescaler: APBPrescaler) -> usize {
            match prescaler {
                APBPrescaler::DivideBy1 => hclk_freq,
                _ => hclk_freq / usize::from(prescaler) * 2,
            }
        }

        let hclk_freq = clocks.get_ahb_frequency_mhz();
        match self.clock {
            PeripheralClockType::AHB(_) => hclk_freq,
            PeripheralClockType::APB1(v) => {
                let prescaler = self.rcc.get_apb1_prescaler();
                match v {
                    PCLK1::TIM2 | PCLK1::TIM3 | PCLK1::TIM4 => tim_freq(hclk_freq, prescaler),
                    PCLK1::USB => clocks.get_usb_frequency_mhz().unwrap_or(0),
                    _ => hclk_freq / usize::from(prescaler),
                }
            }
            PeripheralClockType::APB2(v) => {
                let prescaler = self.rcc.get_apb2_prescaler();
                match v {
                    PCLK2::TIM1 => tim_freq(hclk_freq, prescaler),
                    PCLK2::ADC1 | PCLK2::ADC2 => {
                        hclk_freq
                            / usize::from(prescaler)
                            / usize::from(self.rcc.get_adc_prescaler())
                    }
                    _ => hclk_freq / usize::from(prescaler),
                }
            }
        }
    }
}

impl<B: RegisterBus> ClockInterface for PeripheralClock<'_, B> {
    fn is_enabled(&self) -> bool {
        match self.clock {
            PeripheralClockType::AHB(v) => self.rcc.is_enabled_ahb_clock(v.enable_field()),
            PeripheralClockType::APB1(v) => self.rcc.is_enabled_apb1_clock(v.enable_field()),
            PeripheralClockType::APB2(v) => self.rcc.is_enabled_apb2_clock(v.enable_field()),
        }
    }

    fn enable(&self) {
        match self.clock {
            PeripheralClockType::AHB(v) => self.rcc.enable_ahb_clock(v.enable_field()),
            PeripheralClockType::APB1(v) => self.rcc.enable_apb1_clock(v.enable_field()),
            PeripheralClockType::APB2(v) => self.rcc.enable_apb2_clock(v.enable_field()),
        }
    }

    fn disable(&self) {
        match self.clock {
            PeripheralClockType::AHB(v) => self.rcc.disable_ahb_clock(v.enable_field()),
            PeripheralClockType::APB1(v) => self.rcc.disable_apb1_clock(v.enable_field()),
            PeripheralClockType::APB2(v) => self.rcc.disable_apb2_clock(v.enable_field()),
        }
    }
}
