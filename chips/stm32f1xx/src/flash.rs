// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Flash memory interface timing.
//!
//! Only the access control register is driven here: wait states, the prefetch buffer and
//! half-cycle access. Programming and erasing the flash are not supported.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::errorcode::ErrorCode;
use crate::mmio::{BusRegister, RegisterAddress, RegisterBus};

const FLASH_BASE: usize = 0x4002_2000;

pub(crate) const FLASH_ACR: RegisterAddress = RegisterAddress::new(FLASH_BASE);

/// Highest system clock frequency at which half-cycle flash access may be used.
pub const HALF_CYCLE_ACCESS_LIMIT_MHZ: usize = 8;

register_bitfields![u32,
    pub ACR [
        /// Prefetch buffer status
        PRFTBS OFFSET(5) NUMBITS(1) [],
        /// Prefetch buffer enable
        PRFTBE OFFSET(4) NUMBITS(1) [],
        /// Flash half cycle access enable
        HLFCYA OFFSET(3) NUMBITS(1) [],
        /// Latency
        LATENCY OFFSET(0) NUMBITS(3) []
    ]
];

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum FlashLatency {
    /// SYSCLK up to 24MHz
    Latency0,
    /// SYSCLK up to 48MHz
    Latency1,
    /// SYSCLK up to 72MHz
    Latency2,
}

impl FlashLatency {
    /// Wait states the flash needs at the given system clock frequency.
    pub const fn for_frequency(frequency_mhz: usize) -> Self {
        if frequency_mhz <= 24 {
            FlashLatency::Latency0
        } else if frequency_mhz <= 48 {
            FlashLatency::Latency1
        } else {
            FlashLatency::Latency2
        }
    }
}

impl TryFrom<usize> for FlashLatency {
    type Error = &'static str;

    fn try_from(item: usize) -> Result<Self, Self::Error> {
        match item {
            0 => Ok(FlashLatency::Latency0),
            1 => Ok(FlashLatency::Latency1),
            2 => Ok(FlashLatency::Latency2),
            _ => Err("Error value for FlashLatency::try_from"),
        }
    }
}

pub struct Flash<'a, B: RegisterBus> {
    bus: &'a B,
}

impl<'a, B: RegisterBus> Flash<'a, B> {
    pub const fn new(bus: &'a B) -> Self {
        Self { bus }
    }

    fn acr(&self) -> BusRegister<'a, B, ACR::Register> {
        BusRegister::new(self.bus, FLASH_ACR)
    }

    /// Current number of wait states, or an error if LATENCY holds a reserved value.
    pub fn get_latency(&self) -> Result<FlashLatency, &'static str> {
        FlashLatency::try_from(self.acr().read(ACR::LATENCY) as usize)
    }

    pub fn is_enabled_prefetch_buffer(&self) -> bool {
        self.acr().is_set(ACR::PRFTBS)
    }

    pub fn is_enabled_half_cycle_access(&self) -> bool {
        self.acr().is_set(ACR::HLFCYA)
    }

    // These methods are public(crate) because the wait states have to be raised before the
    // system clock switches to a faster source.
    //
    // The whole register is written: wait states for `sys_clock_frequency_mhz`, prefetch buffer
    // on, half-cycle access off.
    pub(crate) fn write_memory_timing(&self, sys_clock_frequency_mhz: usize) -> FlashLatency {
        let flash_latency = FlashLatency::for_frequency(sys_clock_frequency_mhz);
        self.acr()
            .write(ACR::LATENCY.val(flash_latency as u32) + ACR::PRFTBE::SET);
        flash_latency
    }

    // Same store as `write_memory_timing`, then wait for the new latency to read back.
    pub(crate) fn set_memory_timing(
        &self,
        sys_clock_frequency_mhz: usize,
    ) -> Result<FlashLatency, ErrorCode> {
        let flash_latency = self.write_memory_timing(sys_clock_frequency_mhz);

        for _ in 0..16 {
            if self.get_latency() == Ok(flash_latency) {
                return Ok(flash_latency);
            }
        }

        Err(ErrorCode::BUSY)
    }

    /// Enable half-cycle flash access.
    ///
    /// Only allowed while the system clock runs at 8MHz or less.
    pub fn enable_half_cycle_access(&self, sys_clock_frequency_mhz: usize) -> Result<(), ErrorCode> {
        if sys_clock_frequency_mhz > HALF_CYCLE_ACCESS_LIMIT_MHZ {
            return Err(ErrorCode::FAIL);
        }
        self.acr().modify(ACR::HLFCYA::SET);
        Ok(())
    }

    pub fn disable_half_cycle_access(&self) {
        self.acr().modify(ACR::HLFCYA::CLEAR);
    }
}
