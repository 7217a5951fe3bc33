// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! System configuration controller (SYSCFG)
//!
//! Besides EXTI routing and the I/O compensation cell, SYSCFG holds the
//! VOS0 overdrive switch and read-only copies of the user option bytes
//! (UR0..UR17).

use regmap::address::register_ptr;
use regmap::registers::interfaces::{ReadWriteable, Readable};
use regmap::registers::{register_bitfields, register_structs, Field, ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::memory_map;

register_structs! {
    pub SyscfgRegisters {
        (0x000 => _reserved0),
        /// Peripheral mode configuration register
        (0x004 => pub pmcr: ReadWrite<u32, PMCR::Register>),
        /// External interrupt configuration registers 1..4
        (0x008 => pub exticr: [ReadWrite<u32, EXTICR::Register>; 4]),
        (0x018 => _reserved1),
        /// Compensation cell control/status register
        (0x020 => pub cccsr: ReadWrite<u32, CCCSR::Register>),
        /// Compensation cell value register
        (0x024 => pub ccvr: ReadOnly<u32, CCVR::Register>),
        /// Compensation cell code register
        (0x028 => pub cccr: ReadWrite<u32, CCVR::Register>),
        /// Power control register
        (0x02C => pub pwrcr: ReadWrite<u32, PWRCR::Register>),
        (0x030 => _reserved2),
        /// Package register
        (0x124 => pub pkgr: ReadOnly<u32, PKGR::Register>),
        (0x128 => _reserved3),
        (0x300 => pub ur0: ReadOnly<u32, UR0::Register>),
        (0x304 => pub ur1: ReadOnly<u32>),
        (0x308 => pub ur2: ReadOnly<u32, UR2::Register>),
        (0x30C => pub ur3: ReadOnly<u32, UR3::Register>),
        /// UR4..UR17: protected, secure and write-protected area option
        /// bytes
        (0x310 => pub ur4_17: [ReadOnly<u32>; 14]),
        (0x348 => @END),
    }
}

register_bitfields![u32,
    pub PMCR [
        /// Fast-mode Plus drive capability for I2C1..I2C4
        I2C1FMP OFFSET(0) NUMBITS(1) [],
        I2C2FMP OFFSET(1) NUMBITS(1) [],
        I2C3FMP OFFSET(2) NUMBITS(1) [],
        I2C4FMP OFFSET(3) NUMBITS(1) [],
        PB6FMP OFFSET(4) NUMBITS(1) [],
        PB7FMP OFFSET(5) NUMBITS(1) [],
        PB8FMP OFFSET(6) NUMBITS(1) [],
        PB9FMP OFFSET(7) NUMBITS(1) [],
        /// Booster enable
        BOOSTE OFFSET(8) NUMBITS(1) [],
        BOOSTVDDSEL OFFSET(9) NUMBITS(1) [],
        /// Ethernet PHY interface selection
        EPIS OFFSET(21) NUMBITS(3) [
            Mii = 0,
            Rmii = 4
        ],
        /// Analog switch open on PA0, PA1, PC2, PC3
        PA0SO OFFSET(24) NUMBITS(1) [],
        PA1SO OFFSET(25) NUMBITS(1) [],
        PC2SO OFFSET(26) NUMBITS(1) [],
        PC3SO OFFSET(27) NUMBITS(1) []
    ],
    /// Four EXTI lines per register, one port index per line
    pub EXTICR [
        EXTI0 OFFSET(0) NUMBITS(4) [],
        EXTI1 OFFSET(4) NUMBITS(4) [],
        EXTI2 OFFSET(8) NUMBITS(4) [],
        EXTI3 OFFSET(12) NUMBITS(4) []
    ],
    pub CCCSR [
        /// Enable
        EN OFFSET(0) NUMBITS(1) [],
        /// Code selection: 0 = from the cell, 1 = from CCCR
        CS OFFSET(1) NUMBITS(1) [],
        READY OFFSET(8) NUMBITS(1) [],
        /// High-speed at low-voltage
        HSLV OFFSET(16) NUMBITS(1) []
    ],
    pub CCVR [
        /// NMOS compensation value
        NCV OFFSET(0) NUMBITS(4) [],
        /// PMOS compensation value
        PCV OFFSET(4) NUMBITS(4) []
    ],
    pub PWRCR [
        /// Overdrive enable, selects VOS0 while VOS1 is programmed
        ODEN OFFSET(0) NUMBITS(1) []
    ],
    pub PKGR [
        PKG OFFSET(0) NUMBITS(4) []
    ],
    pub UR0 [
        /// Bank swap
        BKS OFFSET(0) NUMBITS(1) [],
        /// Readout protection level
        RDP OFFSET(16) NUMBITS(8) []
    ],
    pub UR2 [
        /// Brown-out reset high level
        BORH OFFSET(0) NUMBITS(2) [],
        /// Boot address 0, bits [31:16] of the address
        BOOT_ADD0 OFFSET(16) NUMBITS(16) []
    ],
    pub UR3 [
        /// Boot address 1, bits [31:16] of the address
        BOOT_ADD1 OFFSET(16) NUMBITS(16) []
    ]
];

pub const SYSCFG_BASE: StaticRef<SyscfgRegisters> =
    unsafe { register_ptr(memory_map::SYSCFG_BASE) };

const EXTI_FIELDS: [Field<u32, EXTICR::Register>; 4] =
    [EXTICR::EXTI0, EXTICR::EXTI1, EXTICR::EXTI2, EXTICR::EXTI3];

pub const NUM_EXTI_LINES: usize = 16;

/// GPIO port feeding an EXTI line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpioPort {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
    G = 6,
    H = 7,
    I = 8,
    J = 9,
    K = 10,
}

impl GpioPort {
    const ALL: [GpioPort; 11] = [
        GpioPort::A,
        GpioPort::B,
        GpioPort::C,
        GpioPort::D,
        GpioPort::E,
        GpioPort::F,
        GpioPort::G,
        GpioPort::H,
        GpioPort::I,
        GpioPort::J,
        GpioPort::K,
    ];

    pub fn from_index(index: u32) -> Option<GpioPort> {
        GpioPort::ALL.get(index as usize).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Package {
    Lqfp100,
    Tqfp144,
    /// TQFP176 or UFBGA176
    Package176,
    /// LQFP208 or TFBGA240
    Package208,
}

pub struct Syscfg {
    registers: StaticRef<SyscfgRegisters>,
}

impl Syscfg {
    pub const fn new(registers: StaticRef<SyscfgRegisters>) -> Syscfg {
        Syscfg { registers }
    }

    /// Route pin `line` of `port` to EXTI line `line`.
    pub fn set_exti_source(&self, line: usize, port: GpioPort) -> Result<(), ErrorCode> {
        if line >= NUM_EXTI_LINES {
            return Err(ErrorCode::INVAL);
        }
        self.registers.exticr[line / 4].modify(EXTI_FIELDS[line % 4].val(port as u32));
        Ok(())
    }

    /// `Ok(None)` if the register holds a port this part does not have.
    pub fn exti_source(&self, line: usize) -> Result<Option<GpioPort>, ErrorCode> {
        if line >= NUM_EXTI_LINES {
            return Err(ErrorCode::INVAL);
        }
        Ok(GpioPort::from_index(
            self.registers.exticr[line / 4].read(EXTI_FIELDS[line % 4]),
        ))
    }

    /// Turn on the I/O compensation cell. Needs the SYSCFG clock and CSI.
    pub fn enable_compensation_cell(&self) {
        self.registers.cccsr.modify(CCCSR::EN::SET);
    }

    pub fn compensation_ready(&self) -> bool {
        self.registers.cccsr.is_set(CCCSR::READY)
    }

    pub fn enable_overdrive(&self) {
        self.registers.pwrcr.modify(PWRCR::ODEN::SET);
    }

    pub fn is_overdrive_enabled(&self) -> bool {
        self.registers.pwrcr.is_set(PWRCR::ODEN)
    }

    pub fn package(&self) -> Option<Package> {
        match self.registers.pkgr.read(PKGR::PKG) {
            0b0000 => Some(Package::Lqfp100),
            0b0010 => Some(Package::Tqfp144),
            0b0101 => Some(Package::Package176),
            0b1000 => Some(Package::Package208),
            _ => None,
        }
    }

    /// Boot addresses selected by BOOT = 0 and BOOT = 1.
    pub fn boot_addresses(&self) -> (u32, u32) {
        (
            self.registers.ur2.read(UR2::BOOT_ADD0) << 16,
            self.registers.ur3.read(UR3::BOOT_ADD1) << 16,
        )
    }

    pub fn bank_swap(&self) -> bool {
        self.registers.ur0.is_set(UR0::BKS)
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

    fn syscfg() -> (&'static RegisterFile<256>, Syscfg) {
        let file: &'static RegisterFile<256> = Box::leak(Box::new(RegisterFile::new()));
        (file, Syscfg::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<SyscfgRegisters>(), 0x348);
        assert_eq!(offset_of!(SyscfgRegisters, exticr), 0x008);
        assert_eq!(offset_of!(SyscfgRegisters, cccsr), 0x020);
        assert_eq!(offset_of!(SyscfgRegisters, pwrcr), 0x02C);
        assert_eq!(offset_of!(SyscfgRegisters, pkgr), 0x124);
        assert_eq!(offset_of!(SyscfgRegisters, ur0), 0x300);
        assert_eq!(offset_of!(SyscfgRegisters, ur3), 0x30C);
        assert_eq!(
            check_register(&field_specs!(PMCR[
                I2C1FMP, I2C2FMP, I2C3FMP, I2C4FMP, PB6FMP, PB7FMP, PB8FMP, PB9FMP, BOOSTE,
                BOOSTVDDSEL, EPIS, PA0SO, PA1SO, PC2SO, PC3SO
            ])),
            Ok(())
        );
        assert_eq!(SYSCFG_BASE.address(), 0x5800_0400);
    }

    #[test]
    fn exti_routing() {
        let (file, syscfg) = syscfg();
        assert_eq!(syscfg.set_exti_source(0, GpioPort::C), Ok(()));
        assert_eq!(syscfg.set_exti_source(13, GpioPort::K), Ok(()));
        assert_eq!(syscfg.set_exti_source(7, GpioPort::B), Ok(()));
        assert_eq!(file.word(0x008), 2);
        assert_eq!(file.word(0x00C), 1 << 12);
        assert_eq!(file.word(0x014), 10 << 4);
        assert_eq!(syscfg.exti_source(13), Ok(Some(GpioPort::K)));
        assert_eq!(syscfg.exti_source(1), Ok(Some(GpioPort::A)));
        assert_eq!(syscfg.set_exti_source(16, GpioPort::A), Err(ErrorCode::INVAL));

        file.set_word(0x008, 0xF);
        assert_eq!(syscfg.exti_source(0), Ok(None));
    }

    #[test]
    fn compensation_and_overdrive() {
        let (file, syscfg) = syscfg();
        syscfg.enable_compensation_cell();
        assert_eq!(file.word(0x020), 1);
        assert!(!syscfg.compensation_ready());
        file.set_word(0x020, 1 | (1 << 8));
        assert!(syscfg.compensation_ready());

        syscfg.enable_overdrive();
        assert_eq!(file.word(0x02C), 1);
        assert!(syscfg.is_overdrive_enabled());
    }

    #[test]
    fn option_byte_copies() {
        let (file, syscfg) = syscfg();
        file.set_word(0x124, 0b1000);
        file.set_word(0x308, 0x0800_0000 | 0b11);
        file.set_word(0x30C, 0x1FF0_0000);
        file.set_word(0x300, 1);
        assert_eq!(syscfg.package(), Some(Package::Package208));
        assert_eq!(syscfg.boot_addresses(), (0x0800_0000, 0x1FF0_0000));
        assert!(syscfg.bank_swap());
    }
}
