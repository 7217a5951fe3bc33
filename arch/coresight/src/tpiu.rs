// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Trace Port Interface Unit (TPIU)
//!
//! Drains the formatted ATB stream either to the parallel trace port or,
//! unformatted, to the single-wire output in Manchester or NRZ (UART)
//! encoding.

use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, LocalRegisterCopy};
use regmap::registers::{ReadOnly, ReadWrite, WriteOnly};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};

register_structs! {
    pub TpiuRegisters {
        /// Supported Parallel Port Size Register, bit n for width n + 1
        (0x000 => pub sspsr: ReadOnly<u32>),
        /// Current Parallel Port Size Register
        (0x004 => pub cspsr: ReadWrite<u32>),
        (0x008 => _reserved0),
        /// Asynchronous Clock Prescaler Register
        (0x010 => pub acpr: ReadWrite<u32, ACPR::Register>),
        (0x014 => _reserved1),
        /// Selected Pin Protocol Register
        (0x0F0 => pub sppr: ReadWrite<u32, SPPR::Register>),
        (0x0F4 => _reserved2),
        /// Formatter and Flush Status Register
        (0x300 => pub ffsr: ReadOnly<u32, FFSR::Register>),
        /// Formatter and Flush Control Register
        (0x304 => pub ffcr: ReadWrite<u32, FFCR::Register>),
        /// Formatter Synchronization Counter Register
        (0x308 => pub fscr: ReadWrite<u32>),
        (0x30C => _reserved3),
        /// Trigger Counter Value Register
        (0xEE8 => pub trigger: ReadWrite<u32>),
        /// Integration registers
        (0xEEC => pub itfttd0: ReadOnly<u32>),
        (0xEF0 => pub itatbctr2: WriteOnly<u32>),
        (0xEF4 => _reserved4),
        (0xEF8 => pub itatbctr0: ReadOnly<u32>),
        (0xEFC => pub itfttd1: ReadOnly<u32>),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub ACPR [
        PRESCALER OFFSET(0) NUMBITS(13) []
    ],
    pub SPPR [
        TXMODE OFFSET(0) NUMBITS(2) [
            Parallel = 0,
            Manchester = 1,
            Nrz = 2
        ]
    ],
    pub FFSR [
        /// Flush in progress
        FLINPROG OFFSET(0) NUMBITS(1) [],
        /// Formatter stopped
        FTSTOPPED OFFSET(1) NUMBITS(1) [],
        /// Trace clock not present
        TCPRESENT OFFSET(2) NUMBITS(1) [],
        /// Formatter cannot be stopped
        FTNONSTOP OFFSET(3) NUMBITS(1) []
    ],
    pub FFCR [
        /// Continuous formatting
        ENFTC OFFSET(0) NUMBITS(1) [],
        ENFCONT OFFSET(1) NUMBITS(1) [],
        FONFLIN OFFSET(4) NUMBITS(1) [],
        FONTRIG OFFSET(5) NUMBITS(1) [],
        /// Manual flush, self clearing
        FONMAN OFFSET(6) NUMBITS(1) [],
        TRIGIN OFFSET(8) NUMBITS(1) [],
        TRIGEVT OFFSET(9) NUMBITS(1) [],
        TRIGFL OFFSET(10) NUMBITS(1) [],
        STOPFL OFFSET(12) NUMBITS(1) [],
        STOPTRIG OFFSET(13) NUMBITS(1) []
    ],
    pub DEVID [
        MUXNUM OFFSET(0) NUMBITS(5) [],
        ASYNCLKIN OFFSET(5) NUMBITS(1) [],
        FIFOSZ OFFSET(6) NUMBITS(3) [],
        PTINVALID OFFSET(9) NUMBITS(1) [],
        MANCVALID OFFSET(10) NUMBITS(1) [],
        NRZVALID OFFSET(11) NUMBITS(1) []
    ]
];

/// Largest value ACPR can hold.
pub const MAX_PRESCALER: u32 = 0x1FFF;

/// Encoding used on the single-wire output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwoProtocol {
    Manchester,
    /// Non-return-to-zero, UART framing
    Nrz,
}

impl SwoProtocol {
    pub(crate) fn txmode(self) -> u32 {
        match self {
            SwoProtocol::Manchester => 1,
            SwoProtocol::Nrz => 2,
        }
    }
}

/// Prescaler that divides `trace_clock_hz` down to `baud_hz`.
///
/// `INVAL` for a zero rate or a baud rate above the trace clock, `SIZE`
/// when the divider does not fit the 13-bit prescaler.
pub fn swo_prescaler(trace_clock_hz: u32, baud_hz: u32) -> Result<u32, ErrorCode> {
    if trace_clock_hz == 0 || baud_hz == 0 || baud_hz > trace_clock_hz {
        return Err(ErrorCode::INVAL);
    }
    let prescaler = trace_clock_hz / baud_hz - 1;
    if prescaler > MAX_PRESCALER {
        return Err(ErrorCode::SIZE);
    }
    Ok(prescaler)
}

/// Decoded DEVID of a TPIU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TpiuCapabilities {
    pub fifo_bytes: u32,
    pub parallel: bool,
    pub manchester: bool,
    pub nrz: bool,
    pub async_clock: bool,
}

impl TpiuCapabilities {
    pub fn decode(devid: u32) -> TpiuCapabilities {
        let devid = LocalRegisterCopy::<u32, DEVID::Register>::new(devid);
        TpiuCapabilities {
            fifo_bytes: 1 << devid.read(DEVID::FIFOSZ),
            // PTINVALID reads 1 when there is no parallel port.
            parallel: !devid.is_set(DEVID::PTINVALID),
            manchester: devid.is_set(DEVID::MANCVALID),
            nrz: devid.is_set(DEVID::NRZVALID),
            async_clock: devid.is_set(DEVID::ASYNCLKIN),
        }
    }
}

pub struct Tpiu {
    registers: StaticRef<TpiuRegisters>,
}

impl Tpiu {
    pub const fn new(registers: StaticRef<TpiuRegisters>) -> Tpiu {
        Tpiu { registers }
    }

    pub fn capabilities(&self) -> TpiuCapabilities {
        TpiuCapabilities::decode(self.registers.management.devid.get())
    }

    /// Select the single-wire output at `baud_hz`, formatter bypassed.
    pub fn configure_swo(
        &self,
        trace_clock_hz: u32,
        baud_hz: u32,
        protocol: SwoProtocol,
    ) -> Result<(), ErrorCode> {
        let prescaler = swo_prescaler(trace_clock_hz, baud_hz)?;
        self.registers.management.lar.set(LAR_KEY);
        self.registers.cspsr.set(1);
        self.registers.acpr.write(ACPR::PRESCALER.val(prescaler));
        self.registers
            .sppr
            .write(SPPR::TXMODE.val(protocol.txmode()));
        self.registers.ffcr.write(FFCR::TRIGIN::SET);
        Ok(())
    }

    /// Select the parallel trace port with `port_width` data pins and
    /// continuous formatting.
    pub fn configure_parallel(&self, port_width: u32) -> Result<(), ErrorCode> {
        if port_width == 0 || port_width > 32 {
            return Err(ErrorCode::INVAL);
        }
        let bit = 1 << (port_width - 1);
        if self.registers.sspsr.get() & bit == 0 {
            return Err(ErrorCode::NOSUPPORT);
        }
        self.registers.management.lar.set(LAR_KEY);
        self.registers.cspsr.set(bit);
        self.registers.sppr.write(SPPR::TXMODE::Parallel);
        self.registers
            .ffcr
            .write(FFCR::ENFTC::SET + FFCR::ENFCONT::SET + FFCR::TRIGIN::SET);
        Ok(())
    }

    /// Enable or bypass continuous formatting.
    pub fn set_formatter(&self, enabled: bool) {
        self.registers
            .ffcr
            .modify(FFCR::ENFCONT.val(enabled as u32) + FFCR::ENFTC.val(enabled as u32));
    }

    /// Flush the formatter and wait for it to complete.
    pub fn flush(&self) -> Result<(), ErrorCode> {
        self.registers.ffcr.modify(FFCR::FONMAN::SET);
        poll_until(|| !self.registers.ffcr.is_set(FFCR::FONMAN))
    }

    pub fn formatter_stopped(&self) -> bool {
        self.registers.ffsr.is_set(FFSR::FTSTOPPED)
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

    fn tpiu() -> (&'static RegisterFile<1024>, Tpiu) {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        (file, Tpiu::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<TpiuRegisters>(), 0x1000);
        assert_eq!(offset_of!(TpiuRegisters, acpr), 0x010);
        assert_eq!(offset_of!(TpiuRegisters, sppr), 0x0F0);
        assert_eq!(offset_of!(TpiuRegisters, ffcr), 0x304);
        assert_eq!(offset_of!(TpiuRegisters, trigger), 0xEE8);
        assert_eq!(offset_of!(TpiuRegisters, itfttd1), 0xEFC);
        assert_eq!(
            check_register(&field_specs!(FFCR[
                ENFTC, ENFCONT, FONFLIN, FONTRIG, FONMAN, TRIGIN, TRIGEVT, TRIGFL, STOPFL,
                STOPTRIG
            ])),
            Ok(())
        );
        assert_eq!(
            check_register(&field_specs!(DEVID[
                MUXNUM, ASYNCLKIN, FIFOSZ, PTINVALID, MANCVALID, NRZVALID
            ])),
            Ok(())
        );
    }

    #[test]
    fn prescaler() {
        assert_eq!(swo_prescaler(64_000_000, 2_000_000), Ok(31));
        assert_eq!(swo_prescaler(2_000_000, 2_000_000), Ok(0));
        assert_eq!(swo_prescaler(400_000_000, 50_000), Ok(7999));
        assert_eq!(swo_prescaler(480_000_000, 9_600), Err(ErrorCode::SIZE));
        assert_eq!(swo_prescaler(0, 9_600), Err(ErrorCode::INVAL));
        assert_eq!(swo_prescaler(1_000_000, 0), Err(ErrorCode::INVAL));
        assert_eq!(swo_prescaler(1_000_000, 2_000_000), Err(ErrorCode::INVAL));
    }

    #[test]
    fn swo_mode() {
        let (file, tpiu) = tpiu();
        assert_eq!(
            tpiu.configure_swo(64_000_000, 2_000_000, SwoProtocol::Nrz),
            Ok(())
        );
        assert_eq!(file.word(0xFB0), LAR_KEY);
        assert_eq!(file.word(0x004), 1);
        assert_eq!(file.word(0x010), 31);
        assert_eq!(file.word(0x0F0), 2);
        assert_eq!(file.word(0x304), 0x100);
    }

    #[test]
    fn parallel_mode() {
        let (file, tpiu) = tpiu();
        file.set_word(0x000, 0b1011);
        assert_eq!(tpiu.configure_parallel(4), Ok(()));
        assert_eq!(file.word(0x004), 0b1000);
        assert_eq!(file.word(0x0F0), 0);
        assert_eq!(file.word(0x304), 0x103);
        assert_eq!(tpiu.configure_parallel(3), Err(ErrorCode::NOSUPPORT));
        assert_eq!(tpiu.configure_parallel(0), Err(ErrorCode::INVAL));
        assert_eq!(tpiu.configure_parallel(33), Err(ErrorCode::INVAL));
    }

    #[test]
    fn formatter() {
        let (file, tpiu) = tpiu();
        file.set_word(0x304, 0x100);
        tpiu.set_formatter(true);
        assert_eq!(file.word(0x304), 0x103);
        tpiu.set_formatter(false);
        assert_eq!(file.word(0x304), 0x100);
        // The emulated FONMAN never self-clears.
        assert_eq!(tpiu.flush(), Err(ErrorCode::BUSY));
    }

    #[test]
    fn capabilities() {
        let caps = TpiuCapabilities::decode(0x0000_0EA0);
        assert_eq!(
            caps,
            TpiuCapabilities {
                fifo_bytes: 4,
                parallel: false,
                manchester: true,
                nrz: true,
                async_clock: true,
            }
        );
    }
}
