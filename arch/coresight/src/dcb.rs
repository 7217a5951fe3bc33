// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Cortex-M Debug Control Block (DCB)
//!
//! <https://developer.arm.com/documentation/ddi0403/latest>
//!
//! Implementation matches `ARM DDI 0403E.e`

use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadWrite, WriteOnly};
use regmap::{ErrorCode, StaticRef};

/// Key that must accompany every write to DHCSR.
pub const DBGKEY: u32 = 0xA05F;

register_structs! {
    pub DcbRegisters {
        /// Debug Halting Control and Status Register
        (0x00 => pub dhcsr: ReadWrite<u32, DHCSR::Register>),

        /// Debug Core Register Selector Register
        (0x04 => pub dcrsr: WriteOnly<u32, DCRSR::Register>),

        /// Debug Core Register Data Register
        (0x08 => pub dcrdr: ReadWrite<u32>),

        /// Debug Exception and Monitor Control Register
        (0x0C => pub demcr: ReadWrite<u32, DEMCR::Register>),

        (0x10 => @END),
    }
}

register_bitfields![u32,
    pub DHCSR [
        /// Halting debug enabled. Set by the debugger only.
        C_DEBUGEN OFFSET(0) NUMBITS(1) [],
        C_HALT OFFSET(1) NUMBITS(1) [],
        C_STEP OFFSET(2) NUMBITS(1) [],
        C_MASKINTS OFFSET(3) NUMBITS(1) [],
        C_SNAPSTALL OFFSET(5) NUMBITS(1) [],

        /// Handshake for DCRSR transfers, 1 once the transfer completed.
        ///
        /// RO.
        S_REGRDY OFFSET(16) NUMBITS(1) [],
        /// RO.
        S_HALT OFFSET(17) NUMBITS(1) [],
        /// RO.
        S_SLEEP OFFSET(18) NUMBITS(1) [],
        /// Locked up in an unrecoverable exception.
        ///
        /// RO.
        S_LOCKUP OFFSET(19) NUMBITS(1) [],
        /// Cleared on read.
        S_RETIRE_ST OFFSET(24) NUMBITS(1) [],
        /// Cleared on read.
        S_RESET_ST OFFSET(25) NUMBITS(1) [],

        /// Write-only key sharing bits with the status flags above.
        DBGKEY OFFSET(16) NUMBITS(16) []
    ],
    pub DCRSR [
        /// Core register selector
        REGSEL OFFSET(0) NUMBITS(7) [],
        /// 1 for a write, 0 for a read
        REGWNR OFFSET(16) NUMBITS(1) []
    ],
    pub DEMCR [
        /// Vector catches
        VC_CORERESET OFFSET(0) NUMBITS(1) [],
        VC_MMERR OFFSET(4) NUMBITS(1) [],
        VC_NOCPERR OFFSET(5) NUMBITS(1) [],
        VC_CHKERR OFFSET(6) NUMBITS(1) [],
        VC_STATERR OFFSET(7) NUMBITS(1) [],
        VC_BUSERR OFFSET(8) NUMBITS(1) [],
        VC_INTERR OFFSET(9) NUMBITS(1) [],
        VC_HARDERR OFFSET(10) NUMBITS(1) [],

        /// Write 1 to enable DebugMonitor exception.
        MON_EN OFFSET(16) NUMBITS(1) [],
        /// Write 0 to clear the pending state of the DebugMonitor exception.
        MON_PEND OFFSET(17) NUMBITS(1) [],
        MON_STEP OFFSET(18) NUMBITS(1) [],
        /// Monitor software defined semaphore.
        MON_REQ OFFSET(19) NUMBITS(1) [],

        /// Write 1 to globally enable all DWT and ITM features.
        TRCENA OFFSET(24) NUMBITS(1) []
    ]
];

/// Highest REGSEL value naming a core register (the FP registers).
const MAX_REGSEL: u32 = 0x5F;

pub struct Dcb {
    registers: StaticRef<DcbRegisters>,
}

impl Dcb {
    pub const fn new(registers: StaticRef<DcbRegisters>) -> Dcb {
        Dcb { registers }
    }

    /// Enable the trace units (`DWT`, `ITM`, `ETM`, `TPIU`).
    ///
    /// This has to be enabled before using any feature of those units.
    pub fn enable_debug_and_trace(&self) {
        self.registers.demcr.modify(DEMCR::TRCENA::SET);
    }

    pub fn disable_debug_and_trace(&self) {
        self.registers.demcr.modify(DEMCR::TRCENA::CLEAR);
    }

    pub fn trace_enabled(&self) -> bool {
        self.registers.demcr.is_set(DEMCR::TRCENA)
    }

    /// Whether a debugger has enabled halting debug.
    pub fn is_debugger_attached(&self) -> bool {
        self.registers.dhcsr.is_set(DHCSR::C_DEBUGEN)
    }

    pub fn is_halted(&self) -> bool {
        self.registers.dhcsr.is_set(DHCSR::S_HALT)
    }

    fn write_control(&self, halt: bool, step: bool) {
        self.registers.dhcsr.write(
            DHCSR::DBGKEY.val(DBGKEY)
                + DHCSR::C_DEBUGEN::SET
                + DHCSR::C_HALT.val(halt as u32)
                + DHCSR::C_STEP.val(step as u32),
        );
    }

    /// Request a halt. Only effective while halting debug is enabled.
    pub fn halt(&self) {
        self.write_control(true, false);
    }

    pub fn resume(&self) {
        self.write_control(false, false);
    }

    /// Execute one instruction from the halted state.
    pub fn step(&self) {
        self.write_control(false, true);
    }

    /// Read core register `regsel` while halted.
    pub fn read_core_register(&self, regsel: u32) -> Result<u32, ErrorCode> {
        if regsel > MAX_REGSEL {
            return Err(ErrorCode::INVAL);
        }
        self.registers
            .dcrsr
            .write(DCRSR::REGSEL.val(regsel) + DCRSR::REGWNR::CLEAR);
        poll_until(|| self.registers.dhcsr.is_set(DHCSR::S_REGRDY))?;
        Ok(self.registers.dcrdr.get())
    }

    /// Write core register `regsel` while halted.
    pub fn write_core_register(&self, regsel: u32, value: u32) -> Result<(), ErrorCode> {
        if regsel > MAX_REGSEL {
            return Err(ErrorCode::INVAL);
        }
        self.registers.dcrdr.set(value);
        self.registers
            .dcrsr
            .write(DCRSR::REGSEL.val(regsel) + DCRSR::REGWNR::SET);
        poll_until(|| self.registers.dhcsr.is_set(DHCSR::S_REGRDY))
    }

    /// Halt on the next reset.
    pub fn set_reset_vector_catch(&self, enabled: bool) {
        self.registers
            .demcr
            .modify(DEMCR::VC_CORERESET.val(enabled as u32));
    }

    /// Halt on HardFault and the other fault vector catches.
    pub fn set_fault_vector_catch(&self, enabled: bool) {
        let v = enabled as u32;
        self.registers.demcr.modify(
            DEMCR::VC_MMERR.val(v)
                + DEMCR::VC_NOCPERR.val(v)
                + DEMCR::VC_CHKERR.val(v)
                + DEMCR::VC_STATERR.val(v)
                + DEMCR::VC_BUSERR.val(v)
                + DEMCR::VC_INTERR.val(v)
                + DEMCR::VC_HARDERR.val(v),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;
    use regmap::emulation::RegisterFile;
    use regmap::field_specs;
    use regmap::layout::{check_register, check_register_with_aliases};
    use std::boxed::Box;

    fn dcb() -> (&'static RegisterFile<4>, Dcb) {
        let file: &'static RegisterFile<4> = Box::leak(Box::new(RegisterFile::new()));
        (file, Dcb::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(offset_of!(DcbRegisters, dcrsr), 0x04);
        assert_eq!(offset_of!(DcbRegisters, demcr), 0x0C);

        let status = ["S_REGRDY", "S_HALT", "S_SLEEP", "S_LOCKUP", "S_RETIRE_ST", "S_RESET_ST"];
        let aliases: std::vec::Vec<(&str, &str)> =
            status.iter().map(|s| ("DBGKEY", *s)).collect();
        assert_eq!(
            check_register_with_aliases(
                &field_specs!(DHCSR[
                    C_DEBUGEN,
                    C_HALT,
                    C_STEP,
                    C_MASKINTS,
                    C_SNAPSTALL,
                    S_REGRDY,
                    S_HALT,
                    S_SLEEP,
                    S_LOCKUP,
                    S_RETIRE_ST,
                    S_RESET_ST,
                    DBGKEY
                ]),
                &aliases
            ),
            Ok(())
        );
        assert_eq!(
            check_register(&field_specs!(DEMCR[
                VC_CORERESET,
                VC_MMERR,
                VC_NOCPERR,
                VC_CHKERR,
                VC_STATERR,
                VC_BUSERR,
                VC_INTERR,
                VC_HARDERR,
                MON_EN,
                MON_PEND,
                MON_STEP,
                MON_REQ,
                TRCENA
            ])),
            Ok(())
        );
    }

    #[test]
    fn trace_enable_toggles_trcena_only() {
        let (file, dcb) = dcb();
        file.set_word(0x0C, 1 << 16);
        dcb.enable_debug_and_trace();
        assert_eq!(file.word(0x0C), (1 << 24) | (1 << 16));
        assert!(dcb.trace_enabled());
        dcb.disable_debug_and_trace();
        assert_eq!(file.word(0x0C), 1 << 16);
    }

    #[test]
    fn halt_writes_key() {
        let (file, dcb) = dcb();
        dcb.halt();
        assert_eq!(file.word(0x00), 0xA05F_0003);
        dcb.step();
        assert_eq!(file.word(0x00), 0xA05F_0005);
    }

    #[test]
    fn debugger_detection() {
        let (file, dcb) = dcb();
        assert!(!dcb.is_debugger_attached());
        file.set_word(0x00, 0x0003_0001);
        assert!(dcb.is_debugger_attached());
        assert!(dcb.is_halted());
    }

    #[test]
    fn core_register_transfer() {
        let (file, dcb) = dcb();
        file.set_word(0x00, 1 << 16);
        file.set_word(0x08, 0x2000_1000);
        assert_eq!(dcb.read_core_register(13), Ok(0x2000_1000));
        assert_eq!(file.word(0x04), 13);

        assert_eq!(dcb.write_core_register(15, 0x0800_0101), Ok(()));
        assert_eq!(file.word(0x04), (1 << 16) | 15);
        assert_eq!(file.word(0x08), 0x0800_0101);

        assert_eq!(dcb.read_core_register(0x60), Err(ErrorCode::INVAL));
    }

    #[test]
    fn core_register_timeout() {
        let (_file, dcb) = dcb();
        assert_eq!(dcb.read_core_register(0), Err(ErrorCode::BUSY));
    }

    #[test]
    fn vector_catch() {
        let (file, dcb) = dcb();
        dcb.set_reset_vector_catch(true);
        dcb.set_fault_vector_catch(true);
        assert_eq!(file.word(0x0C), 0x7F1);
        dcb.set_fault_vector_catch(false);
        assert_eq!(file.word(0x0C), 0x1);
    }
}
