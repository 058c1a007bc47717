// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Register bus shared by the RCC and FLASH drivers.
//!
//! Drivers never dereference peripheral addresses themselves. Every access goes through a
//! [RegisterBus], which is the memory-mapped [Mmio] bus on the target and a simulated register
//! block in host tests. A [BusRegister] gives one register of the bus the usual
//! `tock_registers` interface (`read`, `is_set`, `write`, `modify`), so driver code reads the
//! same as with `ReadWrite` registers laid out by `register_structs!`.
//!
//! # Usage
//!
//! The bus must be taken exactly once, before interrupts are enabled:
//!
//! ```rust,ignore
//! let bus = stm32f1xx::mmio::Mmio::take().unwrap();
//! let rcc = stm32f1xx::rcc::Rcc::new(&bus);
//! ```

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::RegisterLongName;

/// Address of a 32-bit control register.
///
/// Only this crate can name register addresses, which keeps safe code from reaching arbitrary
/// memory through [Mmio].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegisterAddress(usize);

impl RegisterAddress {
    pub(crate) const fn new(address: usize) -> Self {
        Self(address)
    }

    /// Physical address of the register.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Whole-word access to a block of 32-bit control registers.
pub trait RegisterBus {
    /// Read the full register at `address`.
    fn read(&self, address: RegisterAddress) -> u32;

    /// Store `value` as the full content of the register at `address`.
    fn write(&self, address: RegisterAddress, value: u32);
}

static MMIO_TAKEN: AtomicBool = AtomicBool::new(false);

/// The memory-mapped register bus of the chip.
///
/// There is a single physical register space, so at most one `Mmio` handle exists.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Take the memory-mapped bus.
    ///
    /// Returns `None` if the bus has already been handed out.
    pub fn take() -> Option<Self> {
        if MMIO_TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { _private: () })
        }
    }

    /// Create the bus handle without checking whether it was already taken.
    ///
    /// # Safety
    ///
    /// Must be called before any interrupt handler or other execution context can access the
    /// RCC or FLASH registers, and the returned handle must be the only one in use.
    pub unsafe fn steal() -> Self {
        MMIO_TAKEN.store(true, Ordering::Release);
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read(&self, address: RegisterAddress) -> u32 {
        // SAFETY: register addresses are only created inside this crate and all of them point
        // at word-aligned RCC or FLASH registers, which are always mapped.
        unsafe { core::ptr::read_volatile(address.get() as *const u32) }
    }

    #[inline]
    fn write(&self, address: RegisterAddress, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(address.get() as *mut u32, value) }
    }
}

/// One register of a [RegisterBus], typed with its bitfield layout `R`.
pub struct BusRegister<'a, B: RegisterBus + ?Sized, R: RegisterLongName> {
    bus: &'a B,
    address: RegisterAddress,
    _register: PhantomData<R>,
}

impl<'a, B: RegisterBus + ?Sized, R: RegisterLongName> BusRegister<'a, B, R> {
    pub(crate) const fn new(bus: &'a B, address: RegisterAddress) -> Self {
        Self {
            bus,
            address,
            _register: PhantomData,
        }
    }
}

impl<B: RegisterBus + ?Sized, R: RegisterLongName> Readable for BusRegister<'_, B, R> {
    type T = u32;
    type R = R;

    #[inline]
    fn get(&self) -> u32 {
        self.bus.read(self.address)
    }
}

impl<B: RegisterBus + ?Sized, R: RegisterLongName> Writeable for BusRegister<'_, B, R> {
    type T = u32;
    type R = R;

    #[inline]
    fn set(&self, value: u32) {
        self.bus.write(self.address, value);
    }
}
