// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Data Watchpoint and Trace unit (DWT)
//!
//! Profiling counters, PC sampling and the address/data comparators used
//! for watchpoints. `DEMCR.TRCENA` must be set before any of it runs.
//!
//! <https://developer.arm.com/documentation/ddi0403/latest>

use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::ComponentRegisters;

/// Comparators provided by the Cortex-M7 DWT.
pub const MAX_COMPARATORS: usize = 4;

register_structs! {
    pub DwtComparator {
        (0x0 => pub comp: ReadWrite<u32>),
        (0x4 => pub mask: ReadWrite<u32, MASK::Register>),
        (0x8 => pub function: ReadWrite<u32, FUNCTION::Register>),
        (0xC => _reserved0),
        (0x10 => @END),
    }
}

register_structs! {
    pub DwtRegisters {
        (0x000 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        /// Cycle Count Register
        (0x004 => pub cyccnt: ReadWrite<u32>),
        /// CPI Count Register
        (0x008 => pub cpicnt: ReadWrite<u32, COUNT8::Register>),
        /// Exception Overhead Count Register
        (0x00C => pub exccnt: ReadWrite<u32, COUNT8::Register>),
        /// Sleep Count Register
        (0x010 => pub sleepcnt: ReadWrite<u32, COUNT8::Register>),
        /// LSU Count Register
        (0x014 => pub lsucnt: ReadWrite<u32, COUNT8::Register>),
        /// Folded-instruction Count Register
        (0x018 => pub foldcnt: ReadWrite<u32, COUNT8::Register>),
        /// Program Counter Sample Register
        (0x01C => pub pcsr: ReadOnly<u32>),
        (0x020 => pub comparators: [DwtComparator; 4]),
        (0x060 => _reserved0),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub CTRL [
        CYCCNTENA OFFSET(0) NUMBITS(1) [],
        POSTPRESET OFFSET(1) NUMBITS(4) [],
        POSTINIT OFFSET(5) NUMBITS(4) [],
        /// Tap CYCCNT bit 10 instead of bit 6 for the POSTCNT timer
        CYCTAP OFFSET(9) NUMBITS(1) [],
        SYNCTAP OFFSET(10) NUMBITS(2) [
            Disabled = 0,
            Bit24 = 1,
            Bit26 = 2,
            Bit28 = 3
        ],
        PCSAMPLENA OFFSET(12) NUMBITS(1) [],
        EXCTRCENA OFFSET(16) NUMBITS(1) [],
        CPIEVTENA OFFSET(17) NUMBITS(1) [],
        EXCEVTENA OFFSET(18) NUMBITS(1) [],
        SLEEPEVTENA OFFSET(19) NUMBITS(1) [],
        LSUEVTENA OFFSET(20) NUMBITS(1) [],
        FOLDEVTENA OFFSET(21) NUMBITS(1) [],
        CYCEVTENA OFFSET(22) NUMBITS(1) [],
        NOPRFCNT OFFSET(24) NUMBITS(1) [],
        NOCYCCNT OFFSET(25) NUMBITS(1) [],
        NOEXTTRIG OFFSET(26) NUMBITS(1) [],
        NOTRCPKT OFFSET(27) NUMBITS(1) [],
        NUMCOMP OFFSET(28) NUMBITS(4) []
    ],
    pub COUNT8 [
        COUNT OFFSET(0) NUMBITS(8) []
    ],
    pub MASK [
        /// Number of low address bits ignored by the comparator
        MASK OFFSET(0) NUMBITS(5) []
    ],
    pub FUNCTION [
        FUNCTION OFFSET(0) NUMBITS(4) [
            Disabled = 0b0000,
            PcMatch = 0b0100,
            DataRead = 0b0101,
            DataWrite = 0b0110,
            DataReadWrite = 0b0111
        ],
        EMITRANGE OFFSET(5) NUMBITS(1) [],
        CYCMATCH OFFSET(7) NUMBITS(1) [],
        DATAVMATCH OFFSET(8) NUMBITS(1) [],
        LNK1ENA OFFSET(9) NUMBITS(1) [],
        DATAVSIZE OFFSET(10) NUMBITS(2) [
            Byte = 0,
            Halfword = 1,
            Word = 2
        ],
        DATAVADDR0 OFFSET(12) NUMBITS(4) [],
        DATAVADDR1 OFFSET(16) NUMBITS(4) [],
        /// Set on a match, cleared on read
        MATCHED OFFSET(24) NUMBITS(1) []
    ]
];

/// What a comparator watches for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchpointKind {
    /// Instruction fetch from the address, halting the core
    Pc,
    Read,
    Write,
    ReadWrite,
}

pub struct Dwt {
    registers: StaticRef<DwtRegisters>,
}

impl Dwt {
    pub const fn new(registers: StaticRef<DwtRegisters>) -> Dwt {
        Dwt { registers }
    }

    pub fn num_comparators(&self) -> usize {
        self.registers.ctrl.read(CTRL::NUMCOMP) as usize
    }

    pub fn has_cycle_counter(&self) -> bool {
        !self.registers.ctrl.is_set(CTRL::NOCYCCNT)
    }

    /// `NOSUPPORT` when the unit has no cycle counter.
    pub fn enable_cycle_counter(&self) -> Result<(), ErrorCode> {
        if !self.has_cycle_counter() {
            return Err(ErrorCode::NOSUPPORT);
        }
        self.registers.ctrl.modify(CTRL::CYCCNTENA::SET);
        Ok(())
    }

    pub fn disable_cycle_counter(&self) {
        self.registers.ctrl.modify(CTRL::CYCCNTENA::CLEAR);
    }

    pub fn cycle_count(&self) -> u32 {
        self.registers.cyccnt.get()
    }

    pub fn reset_cycle_count(&self) {
        self.registers.cyccnt.set(0);
    }

    /// Periodic PC sample packets, one per `(preset + 1) * 64` cycles.
    pub fn enable_pc_sampling(&self, preset: u32) -> Result<(), ErrorCode> {
        if preset > 0xF {
            return Err(ErrorCode::INVAL);
        }
        self.registers.ctrl.modify(
            CTRL::POSTINIT.val(preset)
                + CTRL::POSTPRESET.val(preset)
                + CTRL::CYCTAP::CLEAR
                + CTRL::PCSAMPLENA::SET,
        );
        Ok(())
    }

    /// Trace packets on exception entry and exit.
    pub fn set_exception_trace(&self, enabled: bool) {
        self.registers
            .ctrl
            .modify(CTRL::EXCTRCENA.val(enabled as u32));
    }

    fn comparator(&self, n: usize) -> Result<&DwtComparator, ErrorCode> {
        if n >= self.num_comparators().min(MAX_COMPARATORS) {
            return Err(ErrorCode::INVAL);
        }
        Ok(&self.registers.comparators[n])
    }

    /// Watch the `2^mask_bits`-aligned range containing `address`.
    pub fn set_watchpoint(
        &self,
        n: usize,
        address: u32,
        mask_bits: u32,
        kind: WatchpointKind,
    ) -> Result<(), ErrorCode> {
        if mask_bits > 31 {
            return Err(ErrorCode::INVAL);
        }
        let comparator = self.comparator(n)?;
        let function = match kind {
            WatchpointKind::Pc => FUNCTION::FUNCTION::PcMatch,
            WatchpointKind::Read => FUNCTION::FUNCTION::DataRead,
            WatchpointKind::Write => FUNCTION::FUNCTION::DataWrite,
            WatchpointKind::ReadWrite => FUNCTION::FUNCTION::DataReadWrite,
        };
        comparator.function.write(FUNCTION::FUNCTION::Disabled);
        comparator.comp.set(address);
        comparator.mask.write(MASK::MASK.val(mask_bits));
        comparator.function.write(function);
        Ok(())
    }

    pub fn clear_watchpoint(&self, n: usize) -> Result<(), ErrorCode> {
        self.comparator(n)?
            .function
            .write(FUNCTION::FUNCTION::Disabled);
        Ok(())
    }

    /// Whether comparator `n` matched since the last call.
    pub fn watchpoint_hit(&self, n: usize) -> Result<bool, ErrorCode> {
        Ok(self.comparator(n)?.function.is_set(FUNCTION::MATCHED))
    }

    pub fn pc_sample(&self) -> u32 {
        self.registers.pcsr.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};
    use regmap::emulation::RegisterFile;
    use regmap::field_specs;
    use regmap::layout::check_register;
    use std::boxed::Box;

    fn dwt(numcomp: u32) -> (&'static RegisterFile<1024>, Dwt) {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        file.set_word(0x000, numcomp << 28);
        (file, Dwt::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<DwtComparator>(), 0x10);
        assert_eq!(size_of::<DwtRegisters>(), 0x1000);
        assert_eq!(offset_of!(DwtRegisters, pcsr), 0x01C);
        assert_eq!(offset_of!(DwtRegisters, comparators), 0x020);
        assert_eq!(offset_of!(DwtComparator, function), 0x8);
        assert_eq!(
            check_register(&field_specs!(CTRL[
                CYCCNTENA,
                POSTPRESET,
                POSTINIT,
                CYCTAP,
                SYNCTAP,
                PCSAMPLENA,
                EXCTRCENA,
                CPIEVTENA,
                EXCEVTENA,
                SLEEPEVTENA,
                LSUEVTENA,
                FOLDEVTENA,
                CYCEVTENA,
                NOPRFCNT,
                NOCYCCNT,
                NOEXTTRIG,
                NOTRCPKT,
                NUMCOMP
            ])),
            Ok(())
        );
        assert_eq!(
            check_register(&field_specs!(FUNCTION[
                FUNCTION, EMITRANGE, CYCMATCH, DATAVMATCH, LNK1ENA, DATAVSIZE, DATAVADDR0,
                DATAVADDR1, MATCHED
            ])),
            Ok(())
        );
    }

    #[test]
    fn cycle_counter() {
        let (file, dwt) = dwt(4);
        assert_eq!(dwt.enable_cycle_counter(), Ok(()));
        assert_eq!(file.word(0x000), 0x4000_0001);
        file.set_word(0x004, 1234);
        assert_eq!(dwt.cycle_count(), 1234);
        dwt.reset_cycle_count();
        assert_eq!(dwt.cycle_count(), 0);
        dwt.disable_cycle_counter();
        assert_eq!(file.word(0x000), 0x4000_0000);
    }

    #[test]
    fn missing_cycle_counter() {
        let (file, dwt) = dwt(4);
        file.set_word(0x000, (4 << 28) | (1 << 25));
        assert_eq!(dwt.enable_cycle_counter(), Err(ErrorCode::NOSUPPORT));
    }

    #[test]
    fn pc_sampling() {
        let (file, dwt) = dwt(4);
        assert_eq!(dwt.enable_pc_sampling(3), Ok(()));
        assert_eq!(file.word(0x000), 0x4000_1066);
        assert_eq!(dwt.enable_pc_sampling(16), Err(ErrorCode::INVAL));
    }

    #[test]
    fn watchpoints() {
        let (file, dwt) = dwt(2);
        assert_eq!(dwt.num_comparators(), 2);
        assert_eq!(
            dwt.set_watchpoint(1, 0x2000_0100, 2, WatchpointKind::Write),
            Ok(())
        );
        assert_eq!(file.word(0x030), 0x2000_0100);
        assert_eq!(file.word(0x034), 2);
        assert_eq!(file.word(0x038), 0b0110);

        assert_eq!(
            dwt.set_watchpoint(2, 0, 0, WatchpointKind::Read),
            Err(ErrorCode::INVAL)
        );
        assert_eq!(
            dwt.set_watchpoint(0, 0, 32, WatchpointKind::Read),
            Err(ErrorCode::INVAL)
        );

        assert_eq!(dwt.watchpoint_hit(1), Ok(false));
        file.set_word(0x038, (1 << 24) | 0b0110);
        assert_eq!(dwt.watchpoint_hit(1), Ok(true));

        assert_eq!(dwt.clear_watchpoint(1), Ok(()));
        assert_eq!(file.word(0x038), 0);
    }
}
