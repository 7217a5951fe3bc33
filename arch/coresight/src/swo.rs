// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Serial-wire output block.
//!
//! A reduced TPIU with only the single-wire port, used by STM32H7 parts
//! behind the serial-wire trace funnel.

use regmap::registers::interfaces::{Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};
use crate::tpiu::{swo_prescaler, SwoProtocol};

register_structs! {
    pub SwoRegisters {
        (0x000 => _reserved0),
        /// Clock Output Divider Register
        (0x010 => pub codr: ReadWrite<u32, CODR::Register>),
        (0x014 => _reserved1),
        /// Selected Pin Protocol Register
        (0x0F0 => pub sppr: ReadWrite<u32, SPPR::Register>),
        (0x0F4 => _reserved2),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub CODR [
        PRESCALER OFFSET(0) NUMBITS(13) []
    ],
    pub SPPR [
        PPROT OFFSET(0) NUMBITS(2) [
            Manchester = 1,
            Nrz = 2
        ]
    ]
];

pub struct Swo {
    registers: StaticRef<SwoRegisters>,
}

impl Swo {
    pub const fn new(registers: StaticRef<SwoRegisters>) -> Swo {
        Swo { registers }
    }

    /// Program the output divider and line encoding.
    pub fn configure(
        &self,
        trace_clock_hz: u32,
        baud_hz: u32,
        protocol: SwoProtocol,
    ) -> Result<(), ErrorCode> {
        let prescaler = swo_prescaler(trace_clock_hz, baud_hz)?;
        self.registers.management.lar.set(LAR_KEY);
        self.registers.codr.write(CODR::PRESCALER.val(prescaler));
        self.registers
            .sppr
            .write(SPPR::PPROT.val(protocol.txmode()));
        Ok(())
    }

    /// `None` when the protocol field holds a reserved value.
    pub fn protocol(&self) -> Option<SwoProtocol> {
        match self.registers.sppr.read_as_enum(SPPR::PPROT) {
            Some(SPPR::PPROT::Value::Manchester) => Some(SwoProtocol::Manchester),
            Some(SPPR::PPROT::Value::Nrz) => Some(SwoProtocol::Nrz),
            None => None,
        }
    }

    /// Output baud rate for the given trace clock.
    pub fn baud_rate(&self, trace_clock_hz: u32) -> u32 {
        trace_clock_hz / (self.registers.codr.read(CODR::PRESCALER) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};
    use regmap::emulation::RegisterFile;
    use std::boxed::Box;

    #[test]
    fn layout() {
        assert_eq!(size_of::<SwoRegisters>(), 0x1000);
        assert_eq!(offset_of!(SwoRegisters, codr), 0x010);
        assert_eq!(offset_of!(SwoRegisters, sppr), 0x0F0);
    }

    #[test]
    fn configure() {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        let swo = Swo::new(file.static_ref());
        assert_eq!(
            swo.configure(200_000_000, 2_000_000, SwoProtocol::Nrz),
            Ok(())
        );
        assert_eq!(file.word(0xFB0), LAR_KEY);
        assert_eq!(file.word(0x010), 99);
        assert_eq!(file.word(0x0F0), 2);
        assert_eq!(swo.protocol(), Some(SwoProtocol::Nrz));
        assert_eq!(swo.baud_rate(200_000_000), 2_000_000);

        assert_eq!(
            swo.configure(200_000_000, 0, SwoProtocol::Manchester),
            Err(ErrorCode::INVAL)
        );
        file.set_word(0x0F0, 0);
        assert_eq!(swo.protocol(), None);
    }
}
