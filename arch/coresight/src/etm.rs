// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Embedded Trace Macrocell, ETMv4 programmers' model (Cortex-M7 ETM).
//!
//! The trace unit may only be reprogrammed while it is idle: clear
//! `TRCPRGCTLR.EN`, wait for `TRCSTATR.IDLE`, write the configuration, then
//! set `EN` again.
//!
//! <https://developer.arm.com/documentation/ihi0064/latest>

use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::component::{ComponentRegisters, LAR_KEY};

register_structs! {
    pub EtmRegisters {
        (0x000 => _reserved0),
        /// Programming Control Register
        (0x004 => pub prgctlr: ReadWrite<u32, PRGCTLR::Register>),
        /// PE Select Control Register
        (0x008 => pub procselr: ReadWrite<u32>),
        /// Status Register
        (0x00C => pub statr: ReadOnly<u32, STATR::Register>),
        /// Trace Configuration Register
        (0x010 => pub configr: ReadWrite<u32, CONFIGR::Register>),
        (0x014 => _reserved1),
        /// Auxiliary Control Register
        (0x018 => pub auxctlr: ReadWrite<u32>),
        (0x01C => _reserved2),
        /// Event Control 0 and 1 Registers
        (0x020 => pub eventctl0r: ReadWrite<u32>),
        (0x024 => pub eventctl1r: ReadWrite<u32>),
        (0x028 => _reserved3),
        /// Stall Control Register
        (0x02C => pub stallctlr: ReadWrite<u32, STALLCTLR::Register>),
        /// Global Timestamp Control Register
        (0x030 => pub tsctlr: ReadWrite<u32, EVENT::Register>),
        /// Synchronization Period Register
        (0x034 => pub syncpr: ReadWrite<u32, SYNCPR::Register>),
        /// Cycle Count Control Register
        (0x038 => pub ccctlr: ReadWrite<u32, CCCTLR::Register>),
        /// Branch Broadcast Control Register
        (0x03C => pub bbctlr: ReadWrite<u32, BBCTLR::Register>),
        /// Trace ID Register
        (0x040 => pub traceidr: ReadWrite<u32, TRACEIDR::Register>),
        (0x044 => _reserved4),
        /// ViewInst Main Control Register
        (0x080 => pub victlr: ReadWrite<u32, VICTLR::Register>),
        /// ViewInst Include/Exclude Control Register
        (0x084 => pub viiectlr: ReadWrite<u32>),
        /// ViewInst Start/Stop Control Register
        (0x088 => pub vissctlr: ReadWrite<u32>),
        (0x08C => _reserved5),
        /// Counter Reload Value Registers
        (0x140 => pub cntrldvr: [ReadWrite<u32>; 2]),
        (0x148 => _reserved6),
        /// ID Registers 8-13
        (0x180 => pub idr8_13: [ReadOnly<u32>; 6]),
        (0x198 => _reserved7),
        /// Implementation Specific Register 0
        (0x1C0 => pub imspec0: ReadWrite<u32>),
        (0x1C4 => _reserved8),
        /// ID Registers 0-7
        (0x1E0 => pub idr0_7: [ReadOnly<u32>; 8]),
        (0x200 => _reserved9),
        /// Resource Selection Control Registers 2-31
        (0x208 => pub rsctlr: [ReadWrite<u32>; 30]),
        (0x280 => pub ssccr0: ReadWrite<u32>),
        (0x284 => _reserved10),
        (0x2A0 => pub sscsr0: ReadWrite<u32>),
        (0x2A4 => _reserved11),
        (0x2C0 => pub sspcicr0: ReadWrite<u32>),
        (0x2C4 => _reserved12),
        /// Power Down Control Register
        (0x310 => pub pdcr: ReadWrite<u32, PDCR::Register>),
        /// Power Down Status Register
        (0x314 => pub pdsr: ReadOnly<u32, PDSR::Register>),
        (0x318 => _reserved13),
        /// Address Comparator Value Registers, 64 bits each
        (0x400 => pub acvr: [ReadWrite<u32>; 16]),
        (0x440 => _reserved14),
        /// Address Comparator Access Type Registers, 64 bits each
        (0x480 => pub acatr: [ReadWrite<u32>; 16]),
        (0x4C0 => _reserved15),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub PRGCTLR [
        EN OFFSET(0) NUMBITS(1) []
    ],
    pub STATR [
        IDLE OFFSET(0) NUMBITS(1) [],
        /// Programmers' model is stable
        PMSTABLE OFFSET(1) NUMBITS(1) []
    ],
    pub CONFIGR [
        /// Branch broadcast
        BB OFFSET(3) NUMBITS(1) [],
        /// Cycle counting in instruction trace
        CCI OFFSET(4) NUMBITS(1) [],
        /// Conditional instruction tracing
        COND OFFSET(8) NUMBITS(3) [],
        /// Global timestamps
        TS OFFSET(11) NUMBITS(1) [],
        /// Return stack
        RS OFFSET(12) NUMBITS(1) []
    ],
    pub STALLCTLR [
        LEVEL OFFSET(2) NUMBITS(2) [],
        /// Stall the processor when the FIFO crosses LEVEL
        ISTALL OFFSET(8) NUMBITS(1) []
    ],
    pub EVENT [
        /// Resource selector, see TRCRSCTLRn
        EVENT OFFSET(0) NUMBITS(8) []
    ],
    pub SYNCPR [
        /// log2 of the number of bytes between synchronization requests
        PERIOD OFFSET(0) NUMBITS(5) []
    ],
    pub CCCTLR [
        THRESHOLD OFFSET(0) NUMBITS(12) []
    ],
    pub BBCTLR [
        RANGE OFFSET(0) NUMBITS(8) [],
        /// 1 to include, 0 to exclude the ranges
        MODE OFFSET(8) NUMBITS(1) []
    ],
    pub TRACEIDR [
        TRACEID OFFSET(0) NUMBITS(7) []
    ],
    pub VICTLR [
        EVENT OFFSET(0) NUMBITS(8) [],
        /// Start/stop logic is in the started state
        SSSTATUS OFFSET(9) NUMBITS(1) [],
        /// Trace the reset exception
        TRCRESET OFFSET(10) NUMBITS(1) [],
        /// Trace system error exceptions
        TRCERR OFFSET(11) NUMBITS(1) [],
        /// Exception levels with instruction tracing disabled
        EXLEVEL_S OFFSET(16) NUMBITS(4) []
    ],
    pub PDCR [
        /// Keep the trace unit powered
        PU OFFSET(3) NUMBITS(1) []
    ],
    pub PDSR [
        POWER OFFSET(0) NUMBITS(1) [],
        /// Trace unit state was lost since the last read
        STICKYPD OFFSET(1) NUMBITS(1) []
    ]
];

/// TRCCONFIGR options applied by [`Etm::enable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EtmOptions {
    pub branch_broadcast: bool,
    /// Cycle counts with this threshold; `None` disables cycle counting.
    pub cycle_count_threshold: Option<u16>,
    pub timestamps: bool,
    pub return_stack: bool,
    /// Stall the core instead of overflowing.
    pub stall: bool,
}

/// Resource selector 1 is hardwired TRUE.
const ALWAYS_TRUE: u32 = 1;

pub struct Etm {
    registers: StaticRef<EtmRegisters>,
}

impl Etm {
    pub const fn new(registers: StaticRef<EtmRegisters>) -> Etm {
        Etm { registers }
    }

    pub fn is_idle(&self) -> bool {
        self.registers.statr.is_set(STATR::IDLE)
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.prgctlr.is_set(PRGCTLR::EN)
    }

    /// Stop tracing and wait for the trace unit to drain.
    pub fn disable(&self) -> Result<(), ErrorCode> {
        self.registers.prgctlr.write(PRGCTLR::EN::CLEAR);
        poll_until(|| self.is_idle())
    }

    /// Configure tracing of all instructions and start it.
    ///
    /// `INVAL` for a trace ID outside 1..=0x6F or a cycle count threshold
    /// that does not fit TRCCCCTLR.
    pub fn enable(&self, trace_id: u8, options: &EtmOptions) -> Result<(), ErrorCode> {
        if trace_id == 0 || trace_id > 0x6F {
            return Err(ErrorCode::INVAL);
        }
        if let Some(threshold) = options.cycle_count_threshold {
            if threshold == 0 || threshold > 0xFFF {
                return Err(ErrorCode::INVAL);
            }
        }

        self.registers.management.lar.set(LAR_KEY);
        self.registers.pdcr.modify(PDCR::PU::SET);
        self.disable()?;

        self.registers.configr.write(
            CONFIGR::BB.val(options.branch_broadcast as u32)
                + CONFIGR::CCI.val(options.cycle_count_threshold.is_some() as u32)
                + CONFIGR::TS.val(options.timestamps as u32)
                + CONFIGR::RS.val(options.return_stack as u32),
        );
        self.registers.eventctl0r.set(0);
        self.registers.eventctl1r.set(0);
        self.registers.stallctlr.write(
            STALLCTLR::ISTALL.val(options.stall as u32) + STALLCTLR::LEVEL.val(options.stall as u32),
        );
        self.registers.tsctlr.write(EVENT::EVENT::CLEAR);
        self.registers.syncpr.write(SYNCPR::PERIOD.val(0xC));
        if let Some(threshold) = options.cycle_count_threshold {
            self.registers
                .ccctlr
                .write(CCCTLR::THRESHOLD.val(threshold as u32));
        }
        self.registers.bbctlr.write(BBCTLR::MODE::CLEAR);
        self.registers
            .traceidr
            .write(TRACEIDR::TRACEID.val(trace_id as u32));
        self.registers
            .victlr
            .write(VICTLR::EVENT.val(ALWAYS_TRUE) + VICTLR::SSSTATUS::SET);
        self.registers.viiectlr.set(0);
        self.registers.vissctlr.set(0);

        self.registers.prgctlr.write(PRGCTLR::EN::SET);
        Ok(())
    }

    pub fn trace_id(&self) -> u8 {
        self.registers.traceidr.read(TRACEIDR::TRACEID) as u8
    }

    /// TRCIDR0..TRCIDR13 in order.
    pub fn id_registers(&self) -> [u32; 14] {
        let mut ids = [0; 14];
        for (i, idr) in self.registers.idr0_7.iter().enumerate() {
            ids[i] = idr.get();
        }
        for (i, idr) in self.registers.idr8_13.iter().enumerate() {
            ids[8 + i] = idr.get();
        }
        ids
    }

    /// Whether register state was lost to a power down since last checked.
    pub fn lost_state(&self) -> bool {
        self.registers.pdsr.is_set(PDSR::STICKYPD)
    }
}
