// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Flash Patch and Breakpoint unit (FPB)
//!
//! The comparator encoding depends on `CTRL.REV`. Revision 1 (Cortex-M3/M4)
//! matches a word in the code region and selects the halfword through
//! REPLACE; revision 2 (Cortex-M7) holds a full breakpoint address.

use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{
    register_bitfields, register_structs, LocalRegisterCopy, ReadOnly, ReadWrite,
};
use regmap::{ErrorCode, StaticRef};

use crate::component::ComponentRegisters;

pub const MAX_COMPARATORS: usize = 8;

register_structs! {
    pub FpbRegisters {
        (0x000 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x004 => pub remap: ReadOnly<u32, REMAP::Register>),
        (0x008 => pub comp: [ReadWrite<u32>; 8]),
        (0x028 => _reserved0),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub CTRL [
        ENABLE OFFSET(0) NUMBITS(1) [],
        /// Must be written as 1 for a write to CTRL to take effect
        KEY OFFSET(1) NUMBITS(1) [],
        NUM_CODE1 OFFSET(4) NUMBITS(4) [],
        NUM_LIT OFFSET(8) NUMBITS(4) [],
        NUM_CODE2 OFFSET(12) NUMBITS(3) [],
        REV OFFSET(28) NUMBITS(4) [
            V1 = 0,
            V2 = 1
        ]
    ],
    pub REMAP [
        /// Bits [28:5] of the remap table base in SRAM
        REMAP OFFSET(5) NUMBITS(24) [],
        /// Remapping supported
        RMPSPT OFFSET(29) NUMBITS(1) []
    ],
    pub COMP_V1 [
        ENABLE OFFSET(0) NUMBITS(1) [],
        COMP OFFSET(2) NUMBITS(27) [],
        REPLACE OFFSET(30) NUMBITS(2) [
            Remap = 0,
            Lower = 1,
            Upper = 2,
            Both = 3
        ]
    ],
    pub COMP_V2 [
        BE OFFSET(0) NUMBITS(1) [],
        BPADDR OFFSET(1) NUMBITS(31) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    V1,
    V2,
}

/// Comparator word that breaks on the instruction at `address`.
///
/// `INVAL` for odd addresses and, for revision 1, addresses outside the
/// code region.
pub fn comparator_value(revision: Revision, address: u32) -> Result<u32, ErrorCode> {
    if address & 1 != 0 {
        return Err(ErrorCode::INVAL);
    }
    match revision {
        Revision::V1 => {
            if address >= 0x2000_0000 {
                return Err(ErrorCode::INVAL);
            }
            let replace = if address & 2 == 0 {
                COMP_V1::REPLACE::Lower
            } else {
                COMP_V1::REPLACE::Upper
            };
            let mut value = LocalRegisterCopy::<u32, COMP_V1::Register>::new(0);
            value.modify(COMP_V1::ENABLE::SET + COMP_V1::COMP.val(address >> 2) + replace);
            Ok(value.get())
        }
        Revision::V2 => Ok(address | 1),
    }
}

pub struct Fpb {
    registers: StaticRef<FpbRegisters>,
}

impl Fpb {
    pub const fn new(registers: StaticRef<FpbRegisters>) -> Fpb {
        Fpb { registers }
    }

    /// `None` for a revision this driver does not know.
    pub fn revision(&self) -> Option<Revision> {
        match self.registers.ctrl.read_as_enum(CTRL::REV) {
            Some(CTRL::REV::Value::V1) => Some(Revision::V1),
            Some(CTRL::REV::Value::V2) => Some(Revision::V2),
            None => None,
        }
    }

    pub fn num_code_comparators(&self) -> usize {
        let ctrl = self.registers.ctrl.extract();
        ((ctrl.read(CTRL::NUM_CODE2) << 4) | ctrl.read(CTRL::NUM_CODE1)) as usize
    }

    pub fn num_literal_comparators(&self) -> usize {
        self.registers.ctrl.read(CTRL::NUM_LIT) as usize
    }

    pub fn enable(&self) {
        self.registers
            .ctrl
            .modify(CTRL::KEY::SET + CTRL::ENABLE::SET);
    }

    pub fn disable(&self) {
        self.registers
            .ctrl
            .modify(CTRL::KEY::SET + CTRL::ENABLE::CLEAR);
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.ctrl.is_set(CTRL::ENABLE)
    }

    fn comparator(&self, n: usize) -> Result<&ReadWrite<u32>, ErrorCode> {
        if n >= self.num_code_comparators().min(MAX_COMPARATORS) {
            return Err(ErrorCode::INVAL);
        }
        Ok(&self.registers.comp[n])
    }

    /// `NOSUPPORT` if the revision is unknown.
    pub fn set_breakpoint(&self, n: usize, address: u32) -> Result<(), ErrorCode> {
        let comparator = self.comparator(n)?;
        let revision = self.revision().ok_or(ErrorCode::NOSUPPORT)?;
        comparator.set(comparator_value(revision, address)?);
        Ok(())
    }

    pub fn clear_breakpoint(&self, n: usize) -> Result<(), ErrorCode> {
        self.comparator(n)?.set(0);
        Ok(())
    }

    /// Address the breakpoint in comparator `n` triggers on, if enabled.
    pub fn breakpoint(&self, n: usize) -> Result<Option<u32>, ErrorCode> {
        let word = self.comparator(n)?.get();
        match self.revision().ok_or(ErrorCode::NOSUPPORT)? {
            Revision::V1 => {
                let comp = LocalRegisterCopy::<u32, COMP_V1::Register>::new(word);
                if !comp.is_set(COMP_V1::ENABLE) {
                    return Ok(None);
                }
                let base = comp.read(COMP_V1::COMP) << 2;
                match comp.read_as_enum(COMP_V1::REPLACE) {
                    Some(COMP_V1::REPLACE::Value::Upper) => Ok(Some(base | 2)),
                    _ => Ok(Some(base)),
                }
            }
            Revision::V2 => {
                let comp = LocalRegisterCopy::<u32, COMP_V2::Register>::new(word);
                if !comp.is_set(COMP_V2::BE) {
                    return Ok(None);
                }
                Ok(Some(comp.read(COMP_V2::BPADDR) << 1))
            }
        }
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

    fn fpb(ctrl: u32) -> (&'static RegisterFile<1024>, Fpb) {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        file.set_word(0x000, ctrl);
        (file, Fpb::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<FpbRegisters>(), 0x1000);
        assert_eq!(offset_of!(FpbRegisters, comp), 0x008);
        assert_eq!(
            check_register(&field_specs!(CTRL[ENABLE, KEY, NUM_CODE1, NUM_LIT, NUM_CODE2, REV])),
            Ok(())
        );
        assert_eq!(check_register(&field_specs!(COMP_V1[ENABLE, COMP, REPLACE])), Ok(()));
        assert_eq!(check_register(&field_specs!(COMP_V2[BE, BPADDR])), Ok(()));
    }

    #[test]
    fn v1_encoding() {
        assert_eq!(comparator_value(Revision::V1, 0x0800_0100), Ok(0x4800_0101));
        assert_eq!(comparator_value(Revision::V1, 0x0800_0102), Ok(0x8800_0101));
        assert_eq!(
            comparator_value(Revision::V1, 0x2000_0000),
            Err(ErrorCode::INVAL)
        );
        assert_eq!(comparator_value(Revision::V1, 0x0800_0101), Err(ErrorCode::INVAL));
    }

    #[test]
    fn v2_encoding() {
        assert_eq!(comparator_value(Revision::V2, 0x2400_0102), Ok(0x2400_0103));
        assert_eq!(comparator_value(Revision::V2, 0x0000_0003), Err(ErrorCode::INVAL));
    }

    #[test]
    fn counts() {
        // Cortex-M7: REV 1, 8 code and 0 literal comparators.
        let (_, m7) = fpb(0x1000_0080);
        assert_eq!(m7.revision(), Some(Revision::V2));
        assert_eq!(m7.num_code_comparators(), 8);
        assert_eq!(m7.num_literal_comparators(), 0);

        let (_, v1) = fpb(0x0000_1260);
        assert_eq!(v1.revision(), Some(Revision::V1));
        assert_eq!(v1.num_code_comparators(), 0x16);
        assert_eq!(v1.num_literal_comparators(), 2);
    }

    #[test]
    fn enable_sets_key() {
        let (file, fpb) = fpb(0x1000_0080);
        fpb.enable();
        assert_eq!(file.word(0x000), 0x1000_0083);
        assert!(fpb.is_enabled());
        fpb.disable();
        assert_eq!(file.word(0x000), 0x1000_0082);
    }

    #[test]
    fn breakpoints() {
        let (file, fpb) = fpb(0x1000_0080);
        assert_eq!(fpb.set_breakpoint(3, 0x0800_1234), Ok(()));
        assert_eq!(file.word(0x014), 0x0800_1235);
        assert_eq!(fpb.breakpoint(3), Ok(Some(0x0800_1234)));
        assert_eq!(fpb.clear_breakpoint(3), Ok(()));
        assert_eq!(fpb.breakpoint(3), Ok(None));
        assert_eq!(fpb.set_breakpoint(8, 0x0800_0000), Err(ErrorCode::INVAL));
    }

    #[test]
    fn v1_breakpoint_round_trip() {
        let (_file, fpb) = fpb(0x0000_0060);
        assert_eq!(fpb.set_breakpoint(0, 0x0000_0402), Ok(()));
        assert_eq!(fpb.breakpoint(0), Ok(Some(0x0000_0402)));
    }

    #[test]
    fn unknown_revision() {
        let (_file, fpb) = fpb(0x3000_0080);
        assert_eq!(fpb.revision(), None);
        assert_eq!(fpb.set_breakpoint(0, 0x0800_0000), Err(ErrorCode::NOSUPPORT));
    }
}
