// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Cross Trigger Interface (CTI)
//!
//! Trigger inputs are mapped onto channels through CTIINEN, channels onto
//! trigger outputs through CTIOUTEN. Channels are shared with the other
//! CTIs of the system through the Cross Trigger Matrix.

use regmap::registers::interfaces::{Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, LocalRegisterCopy};
use regmap::registers::{ReadOnly, ReadWrite, WriteOnly};
use regmap::{ErrorCode, StaticRef};

use crate::component::ComponentRegisters;

pub const NUM_TRIGGERS: usize = 8;
pub const NUM_CHANNELS: usize = 4;

register_structs! {
    pub CtiRegisters {
        (0x000 => pub control: ReadWrite<u32, CONTROL::Register>),
        (0x004 => _reserved0),
        /// Trigger acknowledge, one bit per output trigger
        (0x010 => pub intack: WriteOnly<u32>),
        /// Application trigger set/clear/pulse
        (0x014 => pub appset: ReadWrite<u32, CHANNELS::Register>),
        (0x018 => pub appclear: WriteOnly<u32, CHANNELS::Register>),
        (0x01C => pub apppulse: WriteOnly<u32, CHANNELS::Register>),
        /// Trigger to channel enable, one per input trigger
        (0x020 => pub inen: [ReadWrite<u32, CHANNELS::Register>; 8]),
        (0x040 => _reserved1),
        /// Channel to trigger enable, one per output trigger
        (0x0A0 => pub outen: [ReadWrite<u32, CHANNELS::Register>; 8]),
        (0x0C0 => _reserved2),
        (0x130 => pub triginstatus: ReadOnly<u32>),
        (0x134 => pub trigoutstatus: ReadOnly<u32>),
        (0x138 => pub chinstatus: ReadOnly<u32, CHANNELS::Register>),
        (0x13C => pub choutstatus: ReadOnly<u32, CHANNELS::Register>),
        /// Channels propagated to the Cross Trigger Matrix
        (0x140 => pub gate: ReadWrite<u32, CHANNELS::Register>),
        (0x144 => pub asicctl: ReadWrite<u32>),
        (0x148 => _reserved3),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub CONTROL [
        GLBEN OFFSET(0) NUMBITS(1) []
    ],
    pub CHANNELS [
        CH0 OFFSET(0) NUMBITS(1) [],
        CH1 OFFSET(1) NUMBITS(1) [],
        CH2 OFFSET(2) NUMBITS(1) [],
        CH3 OFFSET(3) NUMBITS(1) []
    ],
    pub DEVID [
        EXTMUXNUM OFFSET(0) NUMBITS(5) [],
        NUMTRIG OFFSET(8) NUMBITS(8) [],
        NUMCH OFFSET(16) NUMBITS(4) []
    ]
];

fn check(trigger: usize, channel: usize) -> Result<(), ErrorCode> {
    if trigger >= NUM_TRIGGERS || channel >= NUM_CHANNELS {
        return Err(ErrorCode::INVAL);
    }
    Ok(())
}

pub struct Cti {
    registers: StaticRef<CtiRegisters>,
}

impl Cti {
    pub const fn new(registers: StaticRef<CtiRegisters>) -> Cti {
        Cti { registers }
    }

    pub fn enable(&self) {
        self.registers.control.write(CONTROL::GLBEN::SET);
    }

    pub fn disable(&self) {
        self.registers.control.write(CONTROL::GLBEN::CLEAR);
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.control.is_set(CONTROL::GLBEN)
    }

    /// (triggers, channels) reported by DEVID.
    pub fn dimensions(&self) -> (usize, usize) {
        let devid =
            LocalRegisterCopy::<u32, DEVID::Register>::new(self.registers.management.devid.get());
        (
            devid.read(DEVID::NUMTRIG) as usize,
            devid.read(DEVID::NUMCH) as usize,
        )
    }

    /// Route input `trigger` onto `channel`.
    pub fn connect_input(&self, trigger: usize, channel: usize) -> Result<(), ErrorCode> {
        check(trigger, channel)?;
        let inen = &self.registers.inen[trigger];
        inen.set(inen.get() | (1 << channel));
        Ok(())
    }

    pub fn disconnect_input(&self, trigger: usize, channel: usize) -> Result<(), ErrorCode> {
        check(trigger, channel)?;
        let inen = &self.registers.inen[trigger];
        inen.set(inen.get() & !(1 << channel));
        Ok(())
    }

    /// Route `channel` onto output `trigger`.
    pub fn connect_output(&self, trigger: usize, channel: usize) -> Result<(), ErrorCode> {
        check(trigger, channel)?;
        let outen = &self.registers.outen[trigger];
        outen.set(outen.get() | (1 << channel));
        Ok(())
    }

    pub fn disconnect_output(&self, trigger: usize, channel: usize) -> Result<(), ErrorCode> {
        check(trigger, channel)?;
        let outen = &self.registers.outen[trigger];
        outen.set(outen.get() & !(1 << channel));
        Ok(())
    }

    /// Raise an event on `channel` for one cycle.
    pub fn pulse_channel(&self, channel: usize) -> Result<(), ErrorCode> {
        check(0, channel)?;
        self.registers.apppulse.set(1 << channel);
        Ok(())
    }

    pub fn set_channel(&self, channel: usize) -> Result<(), ErrorCode> {
        check(0, channel)?;
        self.registers.appset.set(1 << channel);
        Ok(())
    }

    pub fn clear_channel(&self, channel: usize) -> Result<(), ErrorCode> {
        check(0, channel)?;
        self.registers.appclear.set(1 << channel);
        Ok(())
    }

    /// Deassert output `trigger` after it has been serviced.
    pub fn acknowledge(&self, trigger: usize) -> Result<(), ErrorCode> {
        check(trigger, 0)?;
        self.registers.intack.set(1 << trigger);
        Ok(())
    }

    /// Whether channel events cross the matrix; `mask` has one bit per channel.
    pub fn set_gate(&self, mask: u32) {
        self.registers.gate.set(mask & 0xF);
    }

    pub fn active_input_triggers(&self) -> u32 {
        self.registers.triginstatus.get()
    }

    pub fn active_output_channels(&self) -> u32 {
        self.registers.choutstatus.get()
    }
}
