// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Power control (PWR)

use regmap::address::register_ptr;
use regmap::poll::poll_until;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::memory_map;
use crate::syscfg::Syscfg;

register_structs! {
    /// Power control
    pub PwrRegisters {
        /// Control register 1
        (0x00 => pub cr1: ReadWrite<u32, CR1::Register>),
        /// Control status register 1
        (0x04 => pub csr1: ReadOnly<u32, CSR1::Register>),
        /// Control register 2
        (0x08 => pub cr2: ReadWrite<u32, CR2::Register>),
        /// Control register 3
        (0x0C => pub cr3: ReadWrite<u32, CR3::Register>),
        /// CPU control register
        (0x10 => pub cpucr: ReadWrite<u32, CPUCR::Register>),
        (0x14 => _reserved0),
        /// D3 domain control register
        (0x18 => pub d3cr: ReadWrite<u32, D3CR::Register>),
        (0x1C => _reserved1),
        /// Wakeup clear register
        (0x20 => pub wkupcr: ReadWrite<u32, WKUPCR::Register>),
        /// Wakeup flag register
        (0x24 => pub wkupfr: ReadOnly<u32, WKUPFR::Register>),
        /// Wakeup enable and polarity register
        (0x28 => pub wkupepr: ReadWrite<u32, WKUPEPR::Register>),
        (0x2C => @END),
    }
}

register_bitfields![u32,
    pub CR1 [
        /// Low-power deepsleep with SVOS3
        LPDS OFFSET(0) NUMBITS(1) [],
        /// Programmable voltage detector enable
        PVDE OFFSET(4) NUMBITS(1) [],
        /// Programmable voltage detector level selection
        PLS OFFSET(5) NUMBITS(3) [],
        /// Disable backup domain write protection
        DBP OFFSET(8) NUMBITS(1) [],
        /// Flash low-power mode in DStop mode
        FLPS OFFSET(9) NUMBITS(1) [],
        /// System Stop mode voltage scaling selection
        SVOS OFFSET(14) NUMBITS(2) [
            Scale5 = 1,
            Scale4 = 2,
            Scale3 = 3
        ],
        /// Peripheral voltage monitor on VDDA enable
        AVDEN OFFSET(16) NUMBITS(1) [],
        /// Analog voltage detector level selection
        ALS OFFSET(17) NUMBITS(2) []
    ],
    pub CSR1 [
        /// Programmable voltage detect output
        PVDO OFFSET(4) NUMBITS(1) [],
        /// Voltage levels ready bit for currently used VOS and SDLEVEL
        ACTVOSRDY OFFSET(13) NUMBITS(1) [],
        /// VOS currently applied for VCORE voltage scaling selection
        ACTVOS OFFSET(14) NUMBITS(2) [],
        /// Analog voltage detector output on VDDA
        AVDO OFFSET(16) NUMBITS(1) []
    ],
    pub CR2 [
        /// Backup regulator enable
        BREN OFFSET(0) NUMBITS(1) [],
        /// VBAT and temperature monitoring enable
        MONEN OFFSET(4) NUMBITS(1) [],
        /// Backup regulator ready
        BRRDY OFFSET(16) NUMBITS(1) [],
        VBATL OFFSET(20) NUMBITS(1) [],
        VBATH OFFSET(21) NUMBITS(1) [],
        TEMPL OFFSET(22) NUMBITS(1) [],
        TEMPH OFFSET(23) NUMBITS(1) []
    ],
    pub CR3 [
        /// Power management unit bypass
        BYPASS OFFSET(0) NUMBITS(1) [],
        /// Low drop-out regulator enable
        LDOEN OFFSET(1) NUMBITS(1) [],
        /// Supply configuration update enable
        SCUEN OFFSET(2) NUMBITS(1) [],
        /// VBAT charging enable
        VBE OFFSET(8) NUMBITS(1) [],
        /// VBAT charging resistor selection
        VBRS OFFSET(9) NUMBITS(1) [],
        /// VDD33USB voltage level detector enable
        USB33DEN OFFSET(24) NUMBITS(1) [],
        /// USB regulator enable
        USBREGEN OFFSET(25) NUMBITS(1) [],
        /// USB supply ready
        USB33RDY OFFSET(26) NUMBITS(1) []
    ],
    pub CPUCR [
        PDDS_D1 OFFSET(0) NUMBITS(1) [],
        PDDS_D2 OFFSET(1) NUMBITS(1) [],
        PDDS_D3 OFFSET(2) NUMBITS(1) [],
        /// Stop flag
        STOPF OFFSET(5) NUMBITS(1) [],
        /// System standby flag
        SBF OFFSET(6) NUMBITS(1) [],
        SBF_D1 OFFSET(7) NUMBITS(1) [],
        SBF_D2 OFFSET(8) NUMBITS(1) [],
        /// Clear standby and stop flags
        CSSF OFFSET(9) NUMBITS(1) [],
        /// Keep system D3 domain in Run mode regardless of the CPU
        RUN_D3 OFFSET(11) NUMBITS(1) []
    ],
    pub D3CR [
        VOSRDY OFFSET(13) NUMBITS(1) [],
        /// Voltage scaling selection according to performance
        VOS OFFSET(14) NUMBITS(2) [
            Scale3 = 0b01,
            Scale2 = 0b10,
            Scale1 = 0b11
        ]
    ],
    pub WKUPCR [
        /// Clear wakeup pin flags
        WKUPC OFFSET(0) NUMBITS(6) []
    ],
    pub WKUPFR [
        WKUPF1 OFFSET(0) NUMBITS(1) [],
        WKUPF2 OFFSET(1) NUMBITS(1) [],
        WKUPF3 OFFSET(2) NUMBITS(1) [],
        WKUPF4 OFFSET(3) NUMBITS(1) [],
        WKUPF5 OFFSET(4) NUMBITS(1) [],
        WKUPF6 OFFSET(5) NUMBITS(1) []
    ],
    pub WKUPEPR [
        /// Enable wakeup pins
        WKUPEN OFFSET(0) NUMBITS(6) [],
        /// Wakeup pins polarity, 1 = falling edge
        WKUPP OFFSET(8) NUMBITS(6) [],
        WKUPPUPD1 OFFSET(16) NUMBITS(2) [],
        WKUPPUPD2 OFFSET(18) NUMBITS(2) [],
        WKUPPUPD3 OFFSET(20) NUMBITS(2) [],
        WKUPPUPD4 OFFSET(22) NUMBITS(2) [],
        WKUPPUPD5 OFFSET(24) NUMBITS(2) [],
        WKUPPUPD6 OFFSET(26) NUMBITS(2) []
    ]
];

pub const PWR_BASE: StaticRef<PwrRegisters> = unsafe { register_ptr(memory_map::PWR_BASE) };

/// Number of wakeup pins.
pub const WAKEUP_PINS: usize = 6;

/// Core voltage scaling level. VOS0 is VOS1 with the SYSCFG overdrive
/// enabled and is required for the highest clock frequencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoltageScale {
    VOS0,
    VOS1,
    VOS2,
    VOS3,
}

/// How VCORE is supplied. Parts without an SMPS only offer these two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupplyConfig {
    /// Internal LDO regulator
    Ldo,
    /// External VCORE, regulator bypassed
    Bypass,
}

pub struct Pwr {
    registers: StaticRef<PwrRegisters>,
}

impl Pwr {
    pub const fn new(registers: StaticRef<PwrRegisters>) -> Pwr {
        Pwr { registers }
    }

    pub fn supply(&self) -> Option<SupplyConfig> {
        let ldo = self.registers.cr3.is_set(CR3::LDOEN);
        let bypass = self.registers.cr3.is_set(CR3::BYPASS);
        match (ldo, bypass) {
            (true, false) => Some(SupplyConfig::Ldo),
            (false, true) => Some(SupplyConfig::Bypass),
            _ => None,
        }
    }

    /// Select the VCORE supply and wait for the voltage to settle.
    ///
    /// The supply configuration can be written once after power-on, which
    /// clears SCUEN. Asking for a different supply afterwards returns
    /// `ALREADY`.
    pub fn configure_supply(&self, supply: SupplyConfig) -> Result<(), ErrorCode> {
        if !self.registers.cr3.is_set(CR3::SCUEN) {
            return if self.supply() == Some(supply) {
                Ok(())
            } else {
                Err(ErrorCode::ALREADY)
            };
        }
        self.registers.cr3.modify(match supply {
            SupplyConfig::Ldo => CR3::LDOEN::SET + CR3::BYPASS::CLEAR,
            SupplyConfig::Bypass => CR3::LDOEN::CLEAR + CR3::BYPASS::SET,
        });
        poll_until(|| self.registers.csr1.is_set(CSR1::ACTVOSRDY))
    }

    /// VOS1..VOS3 as programmed in D3CR. The overdrive that turns VOS1 into
    /// VOS0 lives in SYSCFG, see [`Pwr::voltage_scale_with_overdrive`].
    pub fn voltage_scale(&self) -> Option<VoltageScale> {
        match self.registers.d3cr.read_as_enum(D3CR::VOS) {
            Some(D3CR::VOS::Value::Scale1) => Some(VoltageScale::VOS1),
            Some(D3CR::VOS::Value::Scale2) => Some(VoltageScale::VOS2),
            Some(D3CR::VOS::Value::Scale3) => Some(VoltageScale::VOS3),
            None => None,
        }
    }

    pub fn voltage_scale_with_overdrive(&self, syscfg: &Syscfg) -> Option<VoltageScale> {
        match self.voltage_scale() {
            Some(VoltageScale::VOS1) if syscfg.is_overdrive_enabled() => Some(VoltageScale::VOS0),
            scale => scale,
        }
    }

    pub fn is_voltage_ready(&self) -> bool {
        self.registers.d3cr.is_set(D3CR::VOSRDY)
    }

    /// Program VOS1..VOS3 and wait for VOSRDY. Use [`Pwr::enter_vos0`] for
    /// VOS0.
    pub fn set_voltage_scale(&self, scale: VoltageScale) -> Result<(), ErrorCode> {
        let vos = match scale {
            VoltageScale::VOS0 => return Err(ErrorCode::INVAL),
            VoltageScale::VOS1 => D3CR::VOS::Scale1,
            VoltageScale::VOS2 => D3CR::VOS::Scale2,
            VoltageScale::VOS3 => D3CR::VOS::Scale3,
        };
        self.registers.d3cr.modify(vos);
        poll_until(|| self.is_voltage_ready())
    }

    /// Move to VOS1, then enable the overdrive and wait for the voltage to
    /// settle again.
    pub fn enter_vos0(&self, syscfg: &Syscfg) -> Result<(), ErrorCode> {
        self.set_voltage_scale(VoltageScale::VOS1)?;
        syscfg.enable_overdrive();
        poll_until(|| self.is_voltage_ready())
    }

    /// Allow writes to the RTC and backup domain registers (RCC BDCR
    /// included).
    pub fn enable_backup_domain_access(&self) {
        self.registers.cr1.modify(CR1::DBP::SET);
    }

    pub fn disable_backup_domain_access(&self) {
        self.registers.cr1.modify(CR1::DBP::CLEAR);
    }

    pub fn is_backup_domain_writable(&self) -> bool {
        self.registers.cr1.is_set(CR1::DBP)
    }

    /// Enable the USB regulator and voltage detector, then wait for the
    /// USB supply.
    pub fn enable_usb_supply(&self) -> Result<(), ErrorCode> {
        self.registers
            .cr3
            .modify(CR3::USBREGEN::SET + CR3::USB33DEN::SET);
        poll_until(|| self.registers.cr3.is_set(CR3::USB33RDY))
    }

    /// Wakeup pin flags, bit `n` for pin `n + 1`.
    pub fn wakeup_flags(&self) -> u32 {
        self.registers.wkupfr.get()
    }

    pub fn clear_wakeup_flags(&self, pins: u32) {
        self.registers.wkupcr.write(WKUPCR::WKUPC.val(pins));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscfg::SyscfgRegisters;
    use core::mem::{offset_of, size_of};
    use regmap::emulation::RegisterFile;
    use regmap::field_specs;
    use regmap::layout::check_register;
    use std::boxed::Box;

    fn pwr() -> (&'static RegisterFile<16>, Pwr) {
        let file: &'static RegisterFile<16> = Box::leak(Box::new(RegisterFile::new()));
        (file, Pwr::new(file.static_ref()))
    }

    fn syscfg() -> (&'static RegisterFile<256>, Syscfg) {
        let file: &'static RegisterFile<256> = Box::leak(Box::new(RegisterFile::new()));
        (file, Syscfg::new(file.static_ref::<SyscfgRegisters>()))
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<PwrRegisters>(), 0x2C);
        assert_eq!(offset_of!(PwrRegisters, cpucr), 0x10);
        assert_eq!(offset_of!(PwrRegisters, d3cr), 0x18);
        assert_eq!(offset_of!(PwrRegisters, wkupepr), 0x28);
        assert_eq!(
            check_register(&field_specs!(CR1[LPDS, PVDE, PLS, DBP, FLPS, SVOS, AVDEN, ALS])),
            Ok(())
        );
        assert_eq!(
            check_register(&field_specs!(WKUPEPR[
                WKUPEN, WKUPP, WKUPPUPD1, WKUPPUPD2, WKUPPUPD3, WKUPPUPD4, WKUPPUPD5, WKUPPUPD6
            ])),
            Ok(())
        );
        assert_eq!(PWR_BASE.address(), 0x5802_4800);
    }

    #[test]
    fn supply_is_write_once() {
        let (file, pwr) = pwr();
        file.set_word(0x0C, 0b110);
        file.set_word(0x04, 1 << 13);
        assert_eq!(pwr.supply(), Some(SupplyConfig::Ldo));
        assert_eq!(pwr.configure_supply(SupplyConfig::Bypass), Ok(()));
        assert_eq!(file.word(0x0C), 0b101);

        // SCUEN cleared by hardware after the first write
        file.set_word(0x0C, 0b001);
        assert_eq!(pwr.configure_supply(SupplyConfig::Bypass), Ok(()));
        assert_eq!(pwr.configure_supply(SupplyConfig::Ldo), Err(ErrorCode::ALREADY));
    }

    #[test]
    fn voltage_scaling() {
        let (file, pwr) = pwr();
        let (_sfile, syscfg) = syscfg();
        assert_eq!(pwr.voltage_scale(), None);
        assert_eq!(pwr.set_voltage_scale(VoltageScale::VOS2), Err(ErrorCode::BUSY));
        assert_eq!(pwr.voltage_scale(), Some(VoltageScale::VOS2));

        file.set_word(0x18, 1 << 13);
        assert_eq!(pwr.set_voltage_scale(VoltageScale::VOS3), Ok(()));
        assert_eq!(file.word(0x18), (0b01 << 14) | (1 << 13));
        assert_eq!(pwr.set_voltage_scale(VoltageScale::VOS0), Err(ErrorCode::INVAL));

        assert_eq!(pwr.enter_vos0(&syscfg), Ok(()));
        assert_eq!(pwr.voltage_scale(), Some(VoltageScale::VOS1));
        assert_eq!(
            pwr.voltage_scale_with_overdrive(&syscfg),
            Some(VoltageScale::VOS0)
        );
    }

    #[test]
    fn backup_domain_and_wakeup() {
        let (file, pwr) = pwr();
        pwr.enable_backup_domain_access();
        assert_eq!(file.word(0x00), 1 << 8);
        assert!(pwr.is_backup_domain_writable());
        pwr.disable_backup_domain_access();
        assert_eq!(file.word(0x00), 0);

        file.set_word(0x24, 0b10_0001);
        assert_eq!(pwr.wakeup_flags(), 0b10_0001);
        pwr.clear_wakeup_flags(0b10_0001);
        assert_eq!(file.word(0x20), 0b10_0001);
    }

    #[test]
    fn usb_supply_waits_for_ready() {
        let (file, pwr) = pwr();
        assert_eq!(pwr.enable_usb_supply(), Err(ErrorCode::BUSY));
        assert_eq!(file.word(0x0C), (1 << 24) | (1 << 25));
        file.set_word(0x0C, file.word(0x0C) | (1 << 26));
        assert_eq!(pwr.enable_usb_supply(), Ok(()));
    }
}
