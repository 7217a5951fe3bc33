// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Microcontroller debug unit (DBGMCU)
//!
//! Identifies the die and keeps the debug connection alive in low-power
//! modes. The same block is visible to the core at `DBGMCU_BASE` and to an
//! external debugger on the APB-D at `DBGMCU_DEBUG_BASE`.

use core::fmt::Write;

use regmap::address::register_ptr;
use regmap::registers::interfaces::{ReadWriteable, Readable};
use regmap::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use regmap::StaticRef;

use crate::memory_map;

register_structs! {
    pub DbgmcuRegisters {
        (0x00 => pub idcode: ReadOnly<u32, IDCODE::Register>),
        (0x04 => pub cr: ReadWrite<u32, CR::Register>),
        (0x08 => _reserved0),
        /// APB3 peripheral freeze register
        (0x34 => pub apb3fz1: ReadWrite<u32, APB3FZ::Register>),
        (0x38 => _reserved1),
        (0x3C => pub apb1lfz1: ReadWrite<u32, APB1LFZ::Register>),
        (0x40 => _reserved2),
        (0x44 => pub apb1hfz1: ReadWrite<u32, APB1HFZ::Register>),
        (0x48 => _reserved3),
        (0x4C => pub apb2fz1: ReadWrite<u32, APB2FZ::Register>),
        (0x50 => _reserved4),
        (0x54 => pub apb4fz1: ReadWrite<u32, APB4FZ::Register>),
        (0x58 => @END),
    }
}

register_bitfields![u32,
    pub IDCODE [
        DEV_ID OFFSET(0) NUMBITS(12) [],
        REV_ID OFFSET(16) NUMBITS(16) []
    ],
    pub CR [
        DBGSLEEP_D1 OFFSET(0) NUMBITS(1) [],
        DBGSTOP_D1 OFFSET(1) NUMBITS(1) [],
        DBGSTBY_D1 OFFSET(2) NUMBITS(1) [],
        DBGSLEEP_D2 OFFSET(3) NUMBITS(1) [],
        DBGSTOP_D2 OFFSET(4) NUMBITS(1) [],
        DBGSTBY_D2 OFFSET(5) NUMBITS(1) [],
        DBGSTOP_D3 OFFSET(7) NUMBITS(1) [],
        DBGSTBY_D3 OFFSET(8) NUMBITS(1) [],
        /// Trace port clock enable
        TRACECLKEN OFFSET(20) NUMBITS(1) [],
        /// D1 debug clock enable
        D1DBGCKEN OFFSET(21) NUMBITS(1) [],
        /// D3 debug clock enable
        D3DBGCKEN OFFSET(22) NUMBITS(1) [],
        /// External trigger output enable
        TRGOEN OFFSET(28) NUMBITS(1) []
    ],
    pub APB3FZ [
        WWDG1 OFFSET(6) NUMBITS(1) []
    ],
    pub APB1LFZ [
        TIM2 OFFSET(0) NUMBITS(1) [],
        TIM3 OFFSET(1) NUMBITS(1) [],
        TIM4 OFFSET(2) NUMBITS(1) [],
        TIM5 OFFSET(3) NUMBITS(1) [],
        TIM6 OFFSET(4) NUMBITS(1) [],
        TIM7 OFFSET(5) NUMBITS(1) [],
        TIM12 OFFSET(6) NUMBITS(1) [],
        TIM13 OFFSET(7) NUMBITS(1) [],
        TIM14 OFFSET(8) NUMBITS(1) [],
        LPTIM1 OFFSET(9) NUMBITS(1) [],
        I2C1 OFFSET(21) NUMBITS(1) [],
        I2C2 OFFSET(22) NUMBITS(1) [],
        I2C3 OFFSET(23) NUMBITS(1) []
    ],
    pub APB1HFZ [
        FDCAN OFFSET(8) NUMBITS(1) []
    ],
    pub APB2FZ [
        TIM1 OFFSET(0) NUMBITS(1) [],
        TIM8 OFFSET(1) NUMBITS(1) [],
        TIM15 OFFSET(16) NUMBITS(1) [],
        TIM16 OFFSET(17) NUMBITS(1) [],
        TIM17 OFFSET(18) NUMBITS(1) [],
        HRTIM OFFSET(29) NUMBITS(1) []
    ],
    pub APB4FZ [
        I2C4 OFFSET(7) NUMBITS(1) [],
        LPTIM2 OFFSET(9) NUMBITS(1) [],
        LPTIM3 OFFSET(10) NUMBITS(1) [],
        LPTIM4 OFFSET(11) NUMBITS(1) [],
        LPTIM5 OFFSET(12) NUMBITS(1) [],
        RTC OFFSET(16) NUMBITS(1) [],
        IWDG1 OFFSET(18) NUMBITS(1) []
    ]
];

pub const DBGMCU_BASE: StaticRef<DbgmcuRegisters> =
    unsafe { register_ptr(memory_map::DBGMCU_BASE) };

/// Silicon revisions, the REV_ID field of IDCODE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    Y = 0x1003,
    X = 0x2001,
    V = 0x2003,
}

impl Revision {
    pub fn from_rev_id(rev_id: u32) -> Option<Revision> {
        match rev_id {
            0x1003 => Some(Revision::Y),
            0x2001 => Some(Revision::X),
            0x2003 => Some(Revision::V),
            _ => None,
        }
    }
}

/// Peripherals whose counters can be stopped while the core is halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezePeripheral {
    Wwdg1,
    Iwdg1,
    Rtc,
    Tim1,
    Tim2,
    Tim3,
    Tim4,
    Tim5,
    Lptim1,
    I2c1,
    I2c4,
}

pub struct Dbgmcu {
    registers: StaticRef<DbgmcuRegisters>,
}

impl Dbgmcu {
    pub const fn new(registers: StaticRef<DbgmcuRegisters>) -> Dbgmcu {
        Dbgmcu { registers }
    }

    pub fn device_id(&self) -> u32 {
        self.registers.idcode.read(IDCODE::DEV_ID)
    }

    pub fn revision(&self) -> Option<Revision> {
        Revision::from_rev_id(self.registers.idcode.read(IDCODE::REV_ID))
    }

    /// Keep the debug clocks running in Sleep, Stop and Standby of every
    /// domain, so the debugger stays attached across low-power entry.
    pub fn enable_debug_in_low_power(&self, enable: bool) {
        let v = enable as u32;
        self.registers.cr.modify(
            CR::DBGSLEEP_D1.val(v)
                + CR::DBGSTOP_D1.val(v)
                + CR::DBGSTBY_D1.val(v)
                + CR::DBGSLEEP_D2.val(v)
                + CR::DBGSTOP_D2.val(v)
                + CR::DBGSTBY_D2.val(v)
                + CR::DBGSTOP_D3.val(v)
                + CR::DBGSTBY_D3.val(v)
                + CR::D1DBGCKEN.val(v)
                + CR::D3DBGCKEN.val(v),
        );
    }

    pub fn enable_trace_clock(&self) {
        self.registers
            .cr
            .modify(CR::TRACECLKEN::SET + CR::D1DBGCKEN::SET + CR::D3DBGCKEN::SET);
    }

    pub fn is_trace_clock_enabled(&self) -> bool {
        self.registers.cr.is_set(CR::TRACECLKEN)
    }

    pub fn freeze(&self, peripheral: FreezePeripheral, frozen: bool) {
        let v = frozen as u32;
        let r = &self.registers;
        match peripheral {
            FreezePeripheral::Wwdg1 => r.apb3fz1.modify(APB3FZ::WWDG1.val(v)),
            FreezePeripheral::Iwdg1 => r.apb4fz1.modify(APB4FZ::IWDG1.val(v)),
            FreezePeripheral::Rtc => r.apb4fz1.modify(APB4FZ::RTC.val(v)),
            FreezePeripheral::I2c4 => r.apb4fz1.modify(APB4FZ::I2C4.val(v)),
            FreezePeripheral::Tim1 => r.apb2fz1.modify(APB2FZ::TIM1.val(v)),
            FreezePeripheral::Tim2 => r.apb1lfz1.modify(APB1LFZ::TIM2.val(v)),
            FreezePeripheral::Tim3 => r.apb1lfz1.modify(APB1LFZ::TIM3.val(v)),
            FreezePeripheral::Tim4 => r.apb1lfz1.modify(APB1LFZ::TIM4.val(v)),
            FreezePeripheral::Tim5 => r.apb1lfz1.modify(APB1LFZ::TIM5.val(v)),
            FreezePeripheral::Lptim1 => r.apb1lfz1.modify(APB1LFZ::LPTIM1.val(v)),
            FreezePeripheral::I2c1 => r.apb1lfz1.modify(APB1LFZ::I2C1.val(v)),
        }
    }

    pub fn print_state(&self, writer: &mut dyn Write) {
        let _ = writer.write_fmt(format_args!(
            "DBGMCU: dev_id {:#05x} rev {:?}\r\n cr {:#010x}\r\n",
            self.device_id(),
            self.revision(),
            self.registers.cr.get(),
        ));
    }
}
