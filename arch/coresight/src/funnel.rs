// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! ATB trace funnel (CSTF)
//!
//! Merges up to eight ATB slave ports into one master port.

use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, Field, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};

pub const NUM_PORTS: usize = 8;

register_structs! {
    pub FunnelRegisters {
        (0x000 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x004 => pub priority: ReadWrite<u32, PRIORITY::Register>),
        (0x008 => _reserved0),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub CTRL [
        /// One enable bit per slave port
        ENS OFFSET(0) NUMBITS(8) [],
        /// Hold time, in cycles minus one
        HT OFFSET(8) NUMBITS(4) []
    ],
    pub PRIORITY [
        PRIPORT0 OFFSET(0) NUMBITS(3) [],
        PRIPORT1 OFFSET(3) NUMBITS(3) [],
        PRIPORT2 OFFSET(6) NUMBITS(3) [],
        PRIPORT3 OFFSET(9) NUMBITS(3) [],
        PRIPORT4 OFFSET(12) NUMBITS(3) [],
        PRIPORT5 OFFSET(15) NUMBITS(3) [],
        PRIPORT6 OFFSET(18) NUMBITS(3) [],
        PRIPORT7 OFFSET(21) NUMBITS(3) []
    ]
];

const PRIORITY_FIELDS: [Field<u32, PRIORITY::Register>; NUM_PORTS] = [
    PRIORITY::PRIPORT0,
    PRIORITY::PRIPORT1,
    PRIORITY::PRIPORT2,
    PRIORITY::PRIPORT3,
    PRIORITY::PRIPORT4,
    PRIORITY::PRIPORT5,
    PRIORITY::PRIPORT6,
    PRIORITY::PRIPORT7,
];

pub struct Funnel {
    registers: StaticRef<FunnelRegisters>,
}

impl Funnel {
    pub const fn new(registers: StaticRef<FunnelRegisters>) -> Funnel {
        Funnel { registers }
    }

    /// Enable exactly the ports set in `mask`.
    pub fn enable_ports(&self, mask: u8) {
        self.registers.management.lar.set(LAR_KEY);
        self.registers.ctrl.modify(CTRL::ENS.val(mask as u32));
    }

    pub fn enabled_ports(&self) -> u8 {
        self.registers.ctrl.read(CTRL::ENS) as u8
    }

    /// Lower values win arbitration.
    pub fn set_priority(&self, port: usize, priority: u32) -> Result<(), ErrorCode> {
        if port >= NUM_PORTS || priority > 7 {
            return Err(ErrorCode::INVAL);
        }
        self.registers
            .priority
            .modify(PRIORITY_FIELDS[port].val(priority));
        Ok(())
    }

    pub fn priority(&self, port: usize) -> Result<u32, ErrorCode> {
        if port >= NUM_PORTS {
            return Err(ErrorCode::INVAL);
        }
        Ok(self.registers.priority.read(PRIORITY_FIELDS[port]))
    }

    /// Cycles a port keeps the output before arbitration, 1..=15.
    pub fn set_hold_time(&self, cycles: u32) -> Result<(), ErrorCode> {
        if cycles == 0 || cycles > 15 {
            return Err(ErrorCode::INVAL);
        }
        self.registers.ctrl.modify(CTRL::HT.val(cycles - 1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;
    use regmap::emulation::RegisterFile;
    use regmap::field_specs;
    use regmap::layout::check_register;
    use std::boxed::Box;

    fn funnel() -> (&'static RegisterFile<1024>, Funnel) {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        (file, Funnel::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<FunnelRegisters>(), 0x1000);
        assert_eq!(
            check_register(&field_specs!(PRIORITY[
                PRIPORT0, PRIPORT1, PRIPORT2, PRIPORT3, PRIPORT4, PRIPORT5, PRIPORT6, PRIPORT7
            ])),
            Ok(())
        );
        for (port, field) in PRIORITY_FIELDS.iter().enumerate() {
            assert_eq!(field.shift, 3 * port);
        }
    }

    #[test]
    fn ports_and_hold_time() {
        let (file, funnel) = funnel();
        file.set_word(0x000, 0x300);
        funnel.enable_ports(0b11);
        assert_eq!(file.word(0x000), 0x303);
        assert_eq!(file.word(0xFB0), LAR_KEY);
        assert_eq!(funnel.enabled_ports(), 0b11);
        assert_eq!(funnel.set_hold_time(1), Ok(()));
        assert_eq!(file.word(0x000), 0x003);
        assert_eq!(funnel.set_hold_time(16), Err(ErrorCode::INVAL));
    }

    #[test]
    fn priorities() {
        let (file, funnel) = funnel();
        assert_eq!(funnel.set_priority(2, 5), Ok(()));
        assert_eq!(funnel.set_priority(7, 1), Ok(()));
        assert_eq!(file.word(0x004), (5 << 6) | (1 << 21));
        assert_eq!(funnel.priority(2), Ok(5));
        assert_eq!(funnel.set_priority(8, 0), Err(ErrorCode::INVAL));
        assert_eq!(funnel.set_priority(0, 8), Err(ErrorCode::INVAL));

        funnel.registers.priority.set(0);
        assert_eq!(funnel.priority(2), Ok(0));
    }
}
