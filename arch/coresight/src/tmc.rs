// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Trace Memory Controller (TMC)
//!
//! The same programmers' model serves as an Embedded Trace Buffer (ETB),
//! an Embedded Trace FIFO (ETF) or an Embedded Trace Router (ETR), as
//! reported by `DEVID.CONFIGTYPE`. On STM32H7 the TMC is a 4 KiB ETF.

use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, LocalRegisterCopy};
use regmap::registers::{ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};

register_structs! {
    pub TmcRegisters {
        (0x000 => _reserved0),
        /// RAM Size Register, in 32-bit words
        (0x004 => pub rsz: ReadOnly<u32>),
        (0x008 => _reserved1),
        /// Status Register
        (0x00C => pub sts: ReadOnly<u32, STS::Register>),
        /// RAM Read Data Register
        (0x010 => pub rrd: ReadOnly<u32>),
        /// RAM Read Pointer Register
        (0x014 => pub rrp: ReadWrite<u32>),
        /// RAM Write Pointer Register
        (0x018 => pub rwp: ReadWrite<u32>),
        /// Trigger Counter Register
        (0x01C => pub trg: ReadWrite<u32>),
        /// Control Register
        (0x020 => pub ctl: ReadWrite<u32, CTL::Register>),
        /// RAM Write Data Register
        (0x024 => pub rwd: ReadWrite<u32>),
        (0x028 => pub mode: ReadWrite<u32, MODE::Register>),
        /// Latched Buffer Fill Level
        (0x02C => pub lbuflevel: ReadOnly<u32>),
        /// Current Buffer Fill Level
        (0x030 => pub cbuflevel: ReadOnly<u32>),
        /// Buffer Level Water Mark
        (0x034 => pub bufwm: ReadWrite<u32>),
        /// RAM Read/Write Pointer High Registers
        (0x038 => pub rrphi: ReadWrite<u32>),
        (0x03C => pub rwphi: ReadWrite<u32>),
        (0x040 => _reserved2),
        /// AXI Control Register (ETR)
        (0x110 => pub axictl: ReadWrite<u32>),
        (0x114 => _reserved3),
        /// Data Buffer Address Low/High Registers (ETR)
        (0x118 => pub dbalo: ReadWrite<u32>),
        (0x11C => pub dbahi: ReadWrite<u32>),
        (0x120 => _reserved4),
        /// Formatter and Flush Status Register
        (0x300 => pub ffsr: ReadOnly<u32, FFSR::Register>),
        /// Formatter and Flush Control Register
        (0x304 => pub ffcr: ReadWrite<u32, FFCR::Register>),
        /// Periodic Synchronization Counter Register
        (0x308 => pub pscr: ReadWrite<u32>),
        (0x30C => _reserved5),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub STS [
        FULL OFFSET(0) NUMBITS(1) [],
        TRIGGERED OFFSET(1) NUMBITS(1) [],
        TMCREADY OFFSET(2) NUMBITS(1) [],
        FTEMPTY OFFSET(3) NUMBITS(1) [],
        EMPTY OFFSET(4) NUMBITS(1) [],
        MEMERR OFFSET(5) NUMBITS(1) []
    ],
    pub CTL [
        TRACECAPTEN OFFSET(0) NUMBITS(1) []
    ],
    pub MODE [
        MODE OFFSET(0) NUMBITS(2) [
            CircularBuffer = 0,
            SoftwareFifo = 1,
            HardwareFifo = 2
        ]
    ],
    pub FFSR [
        FLINPROG OFFSET(0) NUMBITS(1) [],
        FTSTOPPED OFFSET(1) NUMBITS(1) []
    ],
    pub FFCR [
        ENFT OFFSET(0) NUMBITS(1) [],
        /// Embed triggers in the formatted stream
        ENTI OFFSET(1) NUMBITS(1) [],
        FONFLIN OFFSET(4) NUMBITS(1) [],
        FONTRIGEVT OFFSET(5) NUMBITS(1) [],
        /// Manual flush, self clearing
        FLUSHMAN OFFSET(6) NUMBITS(1) [],
        TRIGONTRIGIN OFFSET(8) NUMBITS(1) [],
        TRIGONTRIGEVT OFFSET(9) NUMBITS(1) [],
        TRIGONFL OFFSET(10) NUMBITS(1) [],
        STOPONFL OFFSET(12) NUMBITS(1) [],
        STOPONTRIGEVT OFFSET(13) NUMBITS(1) []
    ],
    pub DEVID [
        ATBINPORTCOUNT OFFSET(0) NUMBITS(5) [],
        CLKSCHEME OFFSET(5) NUMBITS(1) [],
        CONFIGTYPE OFFSET(6) NUMBITS(2) [
            Etb = 0,
            Etr = 1,
            Etf = 2
        ],
        /// log2 of the ATB data width in units of 32 bits, plus one
        MEMWIDTH OFFSET(8) NUMBITS(3) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Configuration {
    Etb,
    Etr,
    Etf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Trace is captured into the buffer, overwriting the oldest data.
    CircularBuffer,
    /// Trace is read out by software through RRD.
    SoftwareFifo,
    /// Trace is passed on to the ATB master port.
    HardwareFifo,
}

pub struct Tmc {
    registers: StaticRef<TmcRegisters>,
}

impl Tmc {
    pub const fn new(registers: StaticRef<TmcRegisters>) -> Tmc {
        Tmc { registers }
    }

    /// `None` for the reserved CONFIGTYPE value.
    pub fn configuration(&self) -> Option<Configuration> {
        let devid =
            LocalRegisterCopy::<u32, DEVID::Register>::new(self.registers.management.devid.get());
        match devid.read_as_enum(DEVID::CONFIGTYPE) {
            Some(DEVID::CONFIGTYPE::Value::Etb) => Some(Configuration::Etb),
            Some(DEVID::CONFIGTYPE::Value::Etr) => Some(Configuration::Etr),
            Some(DEVID::CONFIGTYPE::Value::Etf) => Some(Configuration::Etf),
            None => None,
        }
    }

    pub fn buffer_size_bytes(&self) -> u32 {
        self.registers.rsz.get().wrapping_mul(4)
    }

    pub fn is_ready(&self) -> bool {
        self.registers.sts.is_set(STS::TMCREADY)
    }

    /// Start capture in `mode`. `BUSY` if capture is already running.
    pub fn start(&self, mode: Mode) -> Result<(), ErrorCode> {
        if self.registers.ctl.is_set(CTL::TRACECAPTEN) {
            return Err(ErrorCode::BUSY);
        }
        self.registers.management.lar.set(LAR_KEY);
        self.registers.mode.write(match mode {
            Mode::CircularBuffer => MODE::MODE::CircularBuffer,
            Mode::SoftwareFifo => MODE::MODE::SoftwareFifo,
            Mode::HardwareFifo => MODE::MODE::HardwareFifo,
        });
        self.registers.ffcr.write(
            FFCR::ENFT::SET + FFCR::ENTI::SET + FFCR::TRIGONTRIGIN::SET + FFCR::STOPONFL::SET,
        );
        self.registers.ctl.write(CTL::TRACECAPTEN::SET);
        Ok(())
    }

    /// Flush, wait until the formatter stops and the TMC is ready, then
    /// disable capture. The formatter stops on flush completion because
    /// `start` sets STOPONFL.
    pub fn stop(&self) -> Result<(), ErrorCode> {
        self.registers.ffcr.modify(FFCR::FLUSHMAN::SET);
        poll_until(|| self.registers.ffsr.is_set(FFSR::FTSTOPPED) && self.is_ready())?;
        self.registers.ctl.write(CTL::TRACECAPTEN::CLEAR);
        Ok(())
    }

    /// Next word of captured trace; `None` once the buffer is drained.
    pub fn read_word(&self) -> Option<u32> {
        match self.registers.rrd.get() {
            0xFFFF_FFFF => None,
            word => Some(word),
        }
    }

    pub fn fill_level(&self) -> u32 {
        self.registers.cbuflevel.get()
    }
}
