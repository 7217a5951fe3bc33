// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Instrumentation Trace Macrocell (ITM)
//!
//! Software writes to one of 256 stimulus ports produce instrumentation
//! packets on the trace bus. A port only emits packets when its bit in TER
//! is set and the ITM is enabled through TCR.
//!
//! <https://developer.arm.com/documentation/ddi0403/latest>

use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};

pub const NUM_PORTS: usize = 256;

register_structs! {
    pub ItmRegisters {
        /// Stimulus Port Registers
        (0x000 => pub stim: [ReadWrite<u32, STIM::Register>; 256]),
        (0x400 => _reserved0),
        /// Trace Enable Registers, one bit per port
        (0xE00 => pub ter: [ReadWrite<u32>; 8]),
        (0xE20 => _reserved1),
        /// Trace Privilege Register
        (0xE40 => pub tpr: ReadWrite<u32, TPR::Register>),
        (0xE44 => _reserved2),
        /// Trace Control Register
        (0xE80 => pub tcr: ReadWrite<u32, TCR::Register>),
        (0xE84 => _reserved3),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub STIM [
        /// Read: the port can accept a write
        FIFOREADY OFFSET(0) NUMBITS(1) []
    ],
    pub TPR [
        /// One bit per group of eight ports; set bits restrict the group to
        /// privileged code.
        PRIVMASK OFFSET(0) NUMBITS(32) []
    ],
    pub TCR [
        ITMENA OFFSET(0) NUMBITS(1) [],
        /// Local timestamps
        TSENA OFFSET(1) NUMBITS(1) [],
        /// Synchronization packets
        SYNCENA OFFSET(2) NUMBITS(1) [],
        /// Forward DWT packets
        TXENA OFFSET(3) NUMBITS(1) [],
        /// Asynchronous clocking of timestamps from the TPIU
        SWOENA OFFSET(4) NUMBITS(1) [],
        TSPRESCALE OFFSET(8) NUMBITS(2) [
            Div1 = 0,
            Div4 = 1,
            Div16 = 2,
            Div64 = 3
        ],
        /// Global timestamp frequency
        GTSFREQ OFFSET(10) NUMBITS(2) [
            Disabled = 0,
            Every128Cycles = 1,
            Every8192Cycles = 2,
            EveryPacket = 3
        ],
        TRACEBUSID OFFSET(16) NUMBITS(7) [],
        BUSY OFFSET(23) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampPrescaler {
    Div1,
    Div4,
    Div16,
    Div64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalTimestamps {
    Disabled,
    Every128Cycles,
    Every8192Cycles,
    EveryPacket,
}

/// TCR settings applied by [`Itm::enable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItmConfig {
    /// ATB ID, 1..=0x6F.
    pub trace_bus_id: u8,
    /// `None` disables local timestamps.
    pub local_timestamps: Option<TimestampPrescaler>,
    pub global_timestamps: GlobalTimestamps,
    pub sync_packets: bool,
    /// Forward packets from the DWT.
    pub forward_dwt: bool,
    /// Clock timestamps from the asynchronous SWO clock.
    pub swo_clock: bool,
}

impl Default for ItmConfig {
    fn default() -> Self {
        ItmConfig {
            trace_bus_id: 1,
            local_timestamps: None,
            global_timestamps: GlobalTimestamps::Disabled,
            sync_packets: true,
            forward_dwt: false,
            swo_clock: true,
        }
    }
}

pub struct Itm {
    registers: StaticRef<ItmRegisters>,
}

impl Itm {
    pub const fn new(registers: StaticRef<ItmRegisters>) -> Itm {
        Itm { registers }
    }

    /// Unlock the ITM and program TCR. `INVAL` for a trace bus ID outside
    /// 1..=0x6F.
    pub fn enable(&self, config: &ItmConfig) -> Result<(), ErrorCode> {
        if config.trace_bus_id == 0 || config.trace_bus_id > 0x6F {
            return Err(ErrorCode::INVAL);
        }
        self.registers.management.lar.set(LAR_KEY);

        let prescale = match config.local_timestamps.unwrap_or(TimestampPrescaler::Div1) {
            TimestampPrescaler::Div1 => TCR::TSPRESCALE::Div1,
            TimestampPrescaler::Div4 => TCR::TSPRESCALE::Div4,
            TimestampPrescaler::Div16 => TCR::TSPRESCALE::Div16,
            TimestampPrescaler::Div64 => TCR::TSPRESCALE::Div64,
        };
        let gtsfreq = match config.global_timestamps {
            GlobalTimestamps::Disabled => TCR::GTSFREQ::Disabled,
            GlobalTimestamps::Every128Cycles => TCR::GTSFREQ::Every128Cycles,
            GlobalTimestamps::Every8192Cycles => TCR::GTSFREQ::Every8192Cycles,
            GlobalTimestamps::EveryPacket => TCR::GTSFREQ::EveryPacket,
        };

        self.registers.tcr.write(
            TCR::ITMENA::SET
                + TCR::TSENA.val(config.local_timestamps.is_some() as u32)
                + TCR::SYNCENA.val(config.sync_packets as u32)
                + TCR::TXENA.val(config.forward_dwt as u32)
                + TCR::SWOENA.val(config.swo_clock as u32)
                + prescale
                + gtsfreq
                + TCR::TRACEBUSID.val(config.trace_bus_id as u32),
        );
        Ok(())
    }

    /// Stop the ITM and wait until it has drained.
    pub fn disable(&self) -> Result<(), ErrorCode> {
        self.registers.tcr.modify(TCR::ITMENA::CLEAR);
        poll_until(|| !self.is_busy())
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.tcr.is_set(TCR::ITMENA)
    }

    /// Whether the ITM is still emitting packets.
    pub fn is_busy(&self) -> bool {
        self.registers.tcr.is_set(TCR::BUSY)
    }

    fn port_bit(port: usize) -> Result<(usize, u32), ErrorCode> {
        if port >= NUM_PORTS {
            return Err(ErrorCode::INVAL);
        }
        Ok((port / 32, 1 << (port % 32)))
    }

    pub fn enable_port(&self, port: usize) -> Result<(), ErrorCode> {
        let (index, bit) = Self::port_bit(port)?;
        let ter = &self.registers.ter[index];
        ter.set(ter.get() | bit);
        Ok(())
    }

    pub fn disable_port(&self, port: usize) -> Result<(), ErrorCode> {
        let (index, bit) = Self::port_bit(port)?;
        let ter = &self.registers.ter[index];
        ter.set(ter.get() & !bit);
        Ok(())
    }

    pub fn is_port_enabled(&self, port: usize) -> Result<bool, ErrorCode> {
        let (index, bit) = Self::port_bit(port)?;
        Ok(self.registers.ter[index].get() & bit != 0)
    }

    /// Restrict ports `8 * group .. 8 * group + 8` to privileged code.
    pub fn set_privileged(&self, group: usize, privileged: bool) -> Result<(), ErrorCode> {
        if group >= 32 {
            return Err(ErrorCode::INVAL);
        }
        let mask = self.registers.tpr.read(TPR::PRIVMASK);
        let mask = if privileged {
            mask | (1 << group)
        } else {
            mask & !(1 << group)
        };
        self.registers.tpr.write(TPR::PRIVMASK.val(mask));
        Ok(())
    }

    /// Check the port is enabled and wait until its FIFO has room.
    /// `OFF` if the ITM or the port is disabled.
    fn ready_port(&self, port: usize) -> Result<*mut u32, ErrorCode> {
        if !self.is_port_enabled(port)? || !self.is_enabled() {
            return Err(ErrorCode::OFF);
        }
        let stim = &self.registers.stim[port];
        poll_until(|| stim.is_set(STIM::FIFOREADY))?;
        Ok(stim as *const ReadWrite<u32, STIM::Register> as *mut u32)
    }

    pub fn write_u32(&self, port: usize, value: u32) -> Result<(), ErrorCode> {
        self.ready_port(port)?;
        self.registers.stim[port].set(value);
        Ok(())
    }

    /// Halfword write, emitting a 2-byte packet.
    pub fn write_u16(&self, port: usize, value: u16) -> Result<(), ErrorCode> {
        let stim = self.ready_port(port)?;
        // SAFETY: `stim` points at a stimulus register inside the block,
        // which accepts narrow writes at its base address.
        unsafe { core::ptr::write_volatile(stim as *mut u16, value) };
        Ok(())
    }

    /// Byte write, emitting a 1-byte packet.
    pub fn write_u8(&self, port: usize, value: u8) -> Result<(), ErrorCode> {
        let stim = self.ready_port(port)?;
        // SAFETY: as for `write_u16`.
        unsafe { core::ptr::write_volatile(stim as *mut u8, value) };
        Ok(())
    }

    /// Send `bytes` on `port`, packing whole words where possible.
    pub fn write_all(&self, port: usize, bytes: &[u8]) -> Result<(), ErrorCode> {
        let mut chunks = bytes.chunks_exact(4);
        for chunk in &mut chunks {
            self.write_u32(port, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))?;
        }
        for byte in chunks.remainder() {
            self.write_u8(port, *byte)?;
        }
        Ok(())
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

    fn itm() -> (&'static RegisterFile<1024>, Itm) {
        let file: &'static RegisterFile<1024> = Box::leak(Box::new(RegisterFile::new()));
        (file, Itm::new(file.static_ref()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<ItmRegisters>(), 0x1000);
        assert_eq!(offset_of!(ItmRegisters, ter), 0xE00);
        assert_eq!(offset_of!(ItmRegisters, tpr), 0xE40);
        assert_eq!(offset_of!(ItmRegisters, tcr), 0xE80);
        assert_eq!(offset_of!(ItmRegisters, management), 0xF00);
        assert_eq!(
            check_register(&field_specs!(TCR[
                ITMENA, TSENA, SYNCENA, TXENA, SWOENA, TSPRESCALE, GTSFREQ, TRACEBUSID, BUSY
            ])),
            Ok(())
        );
    }

    #[test]
    fn enable_programs_tcr() {
        let (file, itm) = itm();
        let config = ItmConfig {
            trace_bus_id: 1,
            local_timestamps: Some(TimestampPrescaler::Div16),
            global_timestamps: GlobalTimestamps::Every8192Cycles,
            sync_packets: true,
            forward_dwt: true,
            swo_clock: true,
        };
        assert_eq!(itm.enable(&config), Ok(()));
        assert_eq!(file.word(0xFB0), LAR_KEY);
        assert_eq!(file.word(0xE80), 0x0001_0A1F);
    }

    #[test]
    fn enable_rejects_reserved_bus_id() {
        let (_file, itm) = itm();
        let config = ItmConfig {
            trace_bus_id: 0x70,
            ..ItmConfig::default()
        };
        assert_eq!(itm.enable(&config), Err(ErrorCode::INVAL));
    }

    #[test]
    fn ports() {
        let (file, itm) = itm();
        assert_eq!(itm.enable_port(0), Ok(()));
        assert_eq!(itm.enable_port(33), Ok(()));
        assert_eq!(itm.enable_port(255), Ok(()));
        assert_eq!(file.word(0xE00), 1);
        assert_eq!(file.word(0xE04), 2);
        assert_eq!(file.word(0xE1C), 0x8000_0000);
        assert_eq!(itm.disable_port(0), Ok(()));
        assert_eq!(file.word(0xE00), 0);
        assert_eq!(itm.enable_port(256), Err(ErrorCode::INVAL));
        assert_eq!(itm.is_port_enabled(33), Ok(true));
    }

    #[test]
    fn privilege_groups() {
        let (file, itm) = itm();
        assert_eq!(itm.set_privileged(3, true), Ok(()));
        assert_eq!(file.word(0xE40), 0b1000);
        assert_eq!(itm.set_privileged(32, true), Err(ErrorCode::INVAL));
    }

    #[test]
    fn writes_need_enabled_port() {
        let (file, itm) = itm();
        assert_eq!(itm.enable(&ItmConfig::default()), Ok(()));
        assert_eq!(itm.write_u32(2, 7), Err(ErrorCode::OFF));

        assert_eq!(itm.enable_port(2), Ok(()));
        file.set_word(0x008, 1);
        assert_eq!(itm.write_u32(2, 0xDEAD_BEEF), Ok(()));
        assert_eq!(file.word(0x008), 0xDEAD_BEEF);
    }

    #[test]
    fn narrow_writes_touch_low_bytes() {
        let (file, itm) = itm();
        assert_eq!(itm.enable(&ItmConfig::default()), Ok(()));
        assert_eq!(itm.enable_port(0), Ok(()));
        file.set_word(0x000, 0xFFFF_FF01);
        assert_eq!(itm.write_u8(0, 0x41), Ok(()));
        assert_eq!(file.word(0x000) & 0xFF, 0x41);
        assert_eq!(itm.write_u16(0, 0x4343), Ok(()));
        assert_eq!(file.word(0x000) & 0xFFFF, 0x4343);
    }

    #[test]
    fn write_all_packs_words() {
        let (file, itm) = itm();
        assert_eq!(itm.enable(&ItmConfig::default()), Ok(()));
        assert_eq!(itm.enable_port(0), Ok(()));
        file.set_word(0x000, 1);
        assert_eq!(itm.write_all(0, b"abcd"), Ok(()));
        assert_eq!(file.word(0x000), u32::from_le_bytes(*b"abcd"));
    }

    #[test]
    fn disable_waits_for_idle() {
        let (file, itm) = itm();
        assert_eq!(itm.enable(&ItmConfig::default()), Ok(()));
        assert!(itm.is_enabled());
        assert_eq!(itm.disable(), Ok(()));
        assert!(!itm.is_enabled());

        file.set_word(0xE80, 1 << 23);
        assert_eq!(itm.disable(), Err(ErrorCode::BUSY));
    }
}
