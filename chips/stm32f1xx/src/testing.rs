// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Simulated RCC and FLASH register block for host tests.
//!
//! [FakeBus] keeps the reset values of the registers the drivers touch, emulates the hardware
//! status bits the drivers poll and records every access in order.

extern crate std;

use core::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use tock_registers::LocalRegisterCopy;

use crate::flash::{ACR, FLASH_ACR};
use crate::mmio::{RegisterAddress, RegisterBus};
use crate::rcc::{CFGR, CR, RCC_AHBENR, RCC_CFGR, RCC_CR};

/// One register access: address and the full word read or written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

pub(crate) struct FakeBus {
    registers: RefCell<BTreeMap<usize, u32>>,
    trace: RefCell<Vec<Access>>,
    /// PLLRDY reads as set from this poll of CR on, counted while PLLON is set
    pll_lock_after: Cell<usize>,
    pll_polls: Cell<usize>,
    /// Stores to FLASH_ACR are traced but not applied
    flash_writes_ignored: Cell<bool>,
}

impl FakeBus {
    pub(crate) fn new() -> Self {
        let mut registers = BTreeMap::new();
        // HSION, HSIRDY, HSITRIM = 16
        registers.insert(RCC_CR.get(), 0x0000_0083);
        registers.insert(RCC_CFGR.get(), 0x0000_0000);
        // SRAM and FLITF clocks
        registers.insert(RCC_AHBENR.get(), 0x0000_0014);
        // Prefetch buffer enabled
        registers.insert(FLASH_ACR.get(), 0x0000_0030);

        Self {
            registers: RefCell::new(registers),
            trace: RefCell::new(Vec::new()),
            pll_lock_after: Cell::new(1),
            pll_polls: Cell::new(0),
            flash_writes_ignored: Cell::new(false),
        }
    }

    /// Make the PLL report lock only on the `polls`-th read of CR after it was started.
    pub(crate) fn with_pll_lock_after(self, polls: usize) -> Self {
        self.pll_lock_after.set(polls);
        self
    }

    /// Make the flash interface drop every store to its access control register.
    pub(crate) fn with_flash_writes_ignored(self) -> Self {
        self.flash_writes_ignored.set(true);
        self
    }

    /// Set a register without recording an access.
    pub(crate) fn preset(&self, address: RegisterAddress, value: u32) {
        self.registers.borrow_mut().insert(address.get(), value);
    }

    /// Current content of a register, without recording an access.
    pub(crate) fn value(&self, address: RegisterAddress) -> u32 {
        self.stored(address)
    }

    pub(crate) fn trace(&self) -> Vec<Access> {
        self.trace.borrow().clone()
    }

    /// Values written to `address`, in order.
    pub(crate) fn writes_to(&self, address: RegisterAddress) -> Vec<u32> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|access| match *access {
                Access::Write(written, value) if written == address.get() => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of CR reads made while the PLL was on.
    pub(crate) fn pll_polls(&self) -> usize {
        self.pll_polls.get()
    }

    fn stored(&self, address: RegisterAddress) -> u32 {
        self.registers
            .borrow()
            .get(&address.get())
            .copied()
            .unwrap_or(0)
    }

    fn clock_control_status(&self, value: u32) -> u32 {
        let mut cr: LocalRegisterCopy<u32, CR::Register> = LocalRegisterCopy::new(value);
        let hsi_on = cr.is_set(CR::HSION);
        cr.modify(CR::HSIRDY.val(hsi_on as u32));
        let hse_on = cr.is_set(CR::HSEON);
        cr.modify(CR::HSERDY.val(hse_on as u32));
        if cr.is_set(CR::PLLON) {
            let polls = self.pll_polls.get().saturating_add(1);
            self.pll_polls.set(polls);
            cr.modify(CR::PLLRDY.val((polls >= self.pll_lock_after.get()) as u32));
        } else {
            cr.modify(CR::PLLRDY::CLEAR);
        }
        cr.get()
    }
}

impl RegisterBus for FakeBus {
    fn read(&self, address: RegisterAddress) -> u32 {
        let mut value = self.stored(address);
        if address == RCC_CR {
            value = self.clock_control_status(value);
            self.preset(address, value);
        }
        self.trace.borrow_mut().push(Access::Read(address.get(), value));
        value
    }

    fn write(&self, address: RegisterAddress, value: u32) {
        self.trace.borrow_mut().push(Access::Write(address.get(), value));

        let stored = match address {
            RCC_CR => {
                let mut cr: LocalRegisterCopy<u32, CR::Register> = LocalRegisterCopy::new(value);
                // Ready flags are read-only
                cr.modify(CR::HSIRDY::CLEAR + CR::HSERDY::CLEAR + CR::PLLRDY::CLEAR);
                if !cr.is_set(CR::PLLON) {
                    self.pll_polls.set(0);
                }
                cr.get()
            }
            RCC_CFGR => {
                // The switch takes effect immediately
                let mut cfgr: LocalRegisterCopy<u32, CFGR::Register> =
                    LocalRegisterCopy::new(value);
                let sw = cfgr.read(CFGR::SW);
                cfgr.modify(CFGR::SWS.val(sw));
                cfgr.get()
            }
            FLASH_ACR if self.flash_writes_ignored.get() => self.stored(address),
            FLASH_ACR => {
                let mut acr: LocalRegisterCopy<u32, ACR::Register> = LocalRegisterCopy::new(value);
                let prefetch = acr.is_set(ACR::PRFTBE);
                acr.modify(ACR::PRFTBS.val(prefetch as u32));
                acr.get()
            }
            _ => value,
        };
        self.preset(address, stored);
    }
}
