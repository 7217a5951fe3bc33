// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Embedded flash interface (FLASH)
//!
//! The register window is 0x200 bytes: one 0x100 byte block per bank. The
//! option byte, access control and CRC registers that are not per bank
//! appear in both blocks; bank 1's copy is the one used here.

use core::marker::PhantomData;

use regmap::address::register_ptr;
use regmap::poll::{poll_until, poll_until_limit};
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, LocalRegisterCopy};
use regmap::registers::{ReadOnly, ReadWrite, WriteOnly};
use regmap::{ErrorCode, StaticRef};

use crate::chip_specific::ChipSpecs;
use crate::memory_map;

register_structs! {
    /// Registers of one flash bank
    pub FlashBankRegisters {
        /// Access control register
        (0x00 => pub acr: ReadWrite<u32, ACR::Register>),
        /// Key register
        (0x04 => pub keyr: WriteOnly<u32>),
        /// Option key register
        (0x08 => pub optkeyr: WriteOnly<u32>),
        /// Control register
        (0x0C => pub cr: ReadWrite<u32, CR::Register>),
        /// Status register
        (0x10 => pub sr: ReadOnly<u32, SR::Register>),
        /// Clear control register, same bit positions as SR
        (0x14 => pub ccr: ReadWrite<u32, SR::Register>),
        /// Option control register
        (0x18 => pub optcr: ReadWrite<u32, OPTCR::Register>),
        /// Option status registers, current and to be programmed
        (0x1C => pub optsr_cur: ReadOnly<u32, OPTSR::Register>),
        (0x20 => pub optsr_prg: ReadWrite<u32, OPTSR::Register>),
        /// Option clear control register
        (0x24 => pub optccr: ReadWrite<u32, OPTCCR::Register>),
        /// Protection address registers
        (0x28 => pub prar_cur: ReadOnly<u32, PRAR::Register>),
        (0x2C => pub prar_prg: ReadWrite<u32, PRAR::Register>),
        /// Secure address registers
        (0x30 => pub scar_cur: ReadOnly<u32, SCAR::Register>),
        (0x34 => pub scar_prg: ReadWrite<u32, SCAR::Register>),
        /// Write sector protection registers
        (0x38 => pub wpsn_cur: ReadOnly<u32, WPSN::Register>),
        (0x3C => pub wpsn_prg: ReadWrite<u32, WPSN::Register>),
        /// Boot address registers
        (0x40 => pub boot_cur: ReadOnly<u32, BOOT::Register>),
        (0x44 => pub boot_prg: ReadWrite<u32, BOOT::Register>),
        (0x48 => _reserved0),
        /// CRC control register
        (0x50 => pub crccr: ReadWrite<u32, CRCCR::Register>),
        /// CRC start and end addresses
        (0x54 => pub crcsaddr: ReadWrite<u32>),
        (0x58 => pub crceaddr: ReadWrite<u32>),
        /// CRC data register
        (0x5C => pub crcdatar: ReadOnly<u32>),
        /// ECC fail address register
        (0x60 => pub ecc_far: ReadOnly<u32, ECC_FA::Register>),
        (0x64 => _reserved1),
        (0x100 => @END),
    }
}

register_structs! {
    pub FlashRegisters {
        (0x000 => pub bank: [FlashBankRegisters; 2]),
        (0x200 => @END),
    }
}

register_bitfields![u32,
    pub ACR [
        /// Read latency, in AXI clock cycles
        LATENCY OFFSET(0) NUMBITS(4) [],
        /// Flash signal delay
        WRHIGHFREQ OFFSET(4) NUMBITS(2) []
    ],
    pub CR [
        LOCK OFFSET(0) NUMBITS(1) [],
        /// Program enable
        PG OFFSET(1) NUMBITS(1) [],
        /// Sector erase request
        SER OFFSET(2) NUMBITS(1) [],
        /// Bank erase request
        BER OFFSET(3) NUMBITS(1) [],
        /// Program size
        PSIZE OFFSET(4) NUMBITS(2) [
            X8 = 0,
            X16 = 1,
            X32 = 2,
            X64 = 3
        ],
        /// Force write
        FW OFFSET(6) NUMBITS(1) [],
        /// Erase start
        START OFFSET(7) NUMBITS(1) [],
        /// Sector erase selection number
        SNB OFFSET(8) NUMBITS(3) [],
        CRC_EN OFFSET(15) NUMBITS(1) [],
        EOPIE OFFSET(16) NUMBITS(1) [],
        WRPERRIE OFFSET(17) NUMBITS(1) [],
        PGSERRIE OFFSET(18) NUMBITS(1) [],
        STRBERRIE OFFSET(19) NUMBITS(1) [],
        INCERRIE OFFSET(21) NUMBITS(1) [],
        OPERRIE OFFSET(22) NUMBITS(1) [],
        RDPERRIE OFFSET(23) NUMBITS(1) [],
        RDSERRIE OFFSET(24) NUMBITS(1) [],
        SNECCERRIE OFFSET(25) NUMBITS(1) [],
        DBECCERRIE OFFSET(26) NUMBITS(1) [],
        CRCENDIE OFFSET(27) NUMBITS(1) []
    ],
    pub SR [
        BSY OFFSET(0) NUMBITS(1) [],
        /// Write buffer not empty
        WBNE OFFSET(1) NUMBITS(1) [],
        /// Wait queue flag
        QW OFFSET(2) NUMBITS(1) [],
        CRC_BUSY OFFSET(3) NUMBITS(1) [],
        /// End of operation
        EOP OFFSET(16) NUMBITS(1) [],
        /// Write protection error
        WRPERR OFFSET(17) NUMBITS(1) [],
        /// Programming sequence error
        PGSERR OFFSET(18) NUMBITS(1) [],
        /// Strobe error
        STRBERR OFFSET(19) NUMBITS(1) [],
        /// Inconsistency error
        INCERR OFFSET(21) NUMBITS(1) [],
        /// Write/erase error
        OPERR OFFSET(22) NUMBITS(1) [],
        /// Read protection error
        RDPERR OFFSET(23) NUMBITS(1) [],
        /// Secure error
        RDSERR OFFSET(24) NUMBITS(1) [],
        /// Single ECC error correction
        SNECCERR OFFSET(25) NUMBITS(1) [],
        /// ECC double detection error
        DBECCERR OFFSET(26) NUMBITS(1) [],
        CRCEND OFFSET(27) NUMBITS(1) []
    ],
    pub OPTCR [
        OPTLOCK OFFSET(0) NUMBITS(1) [],
        /// Option byte start change
        OPTSTART OFFSET(1) NUMBITS(1) [],
        /// Mass erase request
        MER OFFSET(4) NUMBITS(1) [],
        OPTCHANGEERRIE OFFSET(30) NUMBITS(1) [],
        SWAP_BANK OFFSET(31) NUMBITS(1) []
    ],
    pub OPTSR [
        /// Option byte change ongoing
        OPT_BUSY OFFSET(0) NUMBITS(1) [],
        /// Brown-out level
        BOR_LEV OFFSET(2) NUMBITS(2) [],
        IWDG1_SW OFFSET(4) NUMBITS(1) [],
        NRST_STOP_D1 OFFSET(6) NUMBITS(1) [],
        NRST_STBY_D1 OFFSET(7) NUMBITS(1) [],
        /// Readout protection level
        RDP OFFSET(8) NUMBITS(8) [
            Level0 = 0xAA,
            Level2 = 0xCC
        ],
        FZ_IWDG_STOP OFFSET(17) NUMBITS(1) [],
        FZ_IWDG_SDBY OFFSET(18) NUMBITS(1) [],
        /// DTCM RAM size
        ST_RAM_SIZE OFFSET(19) NUMBITS(2) [],
        SECURITY OFFSET(21) NUMBITS(1) [],
        /// I/O high-speed at low-voltage
        IO_HSLV OFFSET(29) NUMBITS(1) [],
        OPTCHANGEERR OFFSET(30) NUMBITS(1) [],
        SWAP_BANK_OPT OFFSET(31) NUMBITS(1) []
    ],
    pub OPTCCR [
        CLR_OPTCHANGEERR OFFSET(30) NUMBITS(1) []
    ],
    pub PRAR [
        /// Protected area start and end, in 256 byte units
        PROT_AREA_START OFFSET(0) NUMBITS(12) [],
        PROT_AREA_END OFFSET(16) NUMBITS(12) [],
        /// Erase protected area on RDP level regression
        DMEP OFFSET(31) NUMBITS(1) []
    ],
    pub SCAR [
        SEC_AREA_START OFFSET(0) NUMBITS(12) [],
        SEC_AREA_END OFFSET(16) NUMBITS(12) [],
        DMES OFFSET(31) NUMBITS(1) []
    ],
    pub WPSN [
        /// One bit per sector, 0 = write protected
        WRPSN OFFSET(0) NUMBITS(8) []
    ],
    pub BOOT [
        /// Bits [31:16] of the boot addresses
        BOOT_ADD0 OFFSET(0) NUMBITS(16) [],
        BOOT_ADD1 OFFSET(16) NUMBITS(16) []
    ],
    pub CRCCR [
        CRC_SECT OFFSET(0) NUMBITS(3) [],
        ALL_BANK OFFSET(7) NUMBITS(1) [],
        CRC_BY_SECT OFFSET(8) NUMBITS(1) [],
        ADD_SECT OFFSET(9) NUMBITS(1) [],
        CLEAN_SECT OFFSET(10) NUMBITS(1) [],
        START_CRC OFFSET(16) NUMBITS(1) [],
        CLEAN_CRC OFFSET(17) NUMBITS(1) [],
        CRC_BURST OFFSET(20) NUMBITS(2) []
    ],
    pub ECC_FA [
        /// Flash word index of the last ECC failure
        FAIL_ECC_ADDR OFFSET(0) NUMBITS(15) []
    ]
];

pub const FLASH_BASE: StaticRef<FlashRegisters> = unsafe { register_ptr(memory_map::FLASH_BASE) };

pub const KEY1: u32 = 0x4567_0123;
pub const KEY2: u32 = 0xCDEF_89AB;
pub const OPTKEY1: u32 = 0x0819_2A3B;
pub const OPTKEY2: u32 = 0x4C5D_6E7F;

/// Number of reads of ACR after a latency change before giving up.
const LATENCY_READBACK_TRIES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bank {
    Bank1 = 0,
    Bank2 = 1,
}

/// Wait states and programming delay for a given AXI clock frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashLatency {
    /// ACR.LATENCY, 0..=7
    pub wait_states: u32,
    /// ACR.WRHIGHFREQ, 0..=2
    pub programming_delay: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadProtection {
    Level0,
    Level1,
    Level2,
}

/// Error flags of one bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlashErrors {
    pub write_protection: bool,
    pub programming_sequence: bool,
    pub strobe: bool,
    pub inconsistency: bool,
    pub operation: bool,
    pub read_protection: bool,
    pub read_secure: bool,
    pub single_ecc: bool,
    pub double_ecc: bool,
}

impl FlashErrors {
    fn from_register(sr: LocalRegisterCopy<u32, SR::Register>) -> FlashErrors {
        FlashErrors {
            write_protection: sr.is_set(SR::WRPERR),
            programming_sequence: sr.is_set(SR::PGSERR),
            strobe: sr.is_set(SR::STRBERR),
            inconsistency: sr.is_set(SR::INCERR),
            operation: sr.is_set(SR::OPERR),
            read_protection: sr.is_set(SR::RDPERR),
            read_secure: sr.is_set(SR::RDSERR),
            single_ecc: sr.is_set(SR::SNECCERR),
            double_ecc: sr.is_set(SR::DBECCERR),
        }
    }

    pub fn any(&self) -> bool {
        *self != FlashErrors::default()
    }
}

pub struct Flash<S: ChipSpecs> {
    registers: StaticRef<FlashRegisters>,
    _specs: PhantomData<S>,
}

impl<S: ChipSpecs> Flash<S> {
    pub const fn new(registers: StaticRef<FlashRegisters>) -> Flash<S> {
        Flash {
            registers,
            _specs: PhantomData,
        }
    }

    fn bank(&self, bank: Bank) -> Result<&FlashBankRegisters, ErrorCode> {
        let index = bank as usize;
        if index >= S::FLASH_BANKS {
            return Err(ErrorCode::NODEVICE);
        }
        Ok(&self.registers.bank[index])
    }

    fn common(&self) -> &FlashBankRegisters {
        &self.registers.bank[0]
    }

    pub fn latency(&self) -> FlashLatency {
        FlashLatency {
            wait_states: self.common().acr.read(ACR::LATENCY),
            programming_delay: self.common().acr.read(ACR::WRHIGHFREQ),
        }
    }

    /// Program the read latency and wait until the flash interface reports
    /// it. Raise the latency before increasing the clock and lower it after.
    pub fn set_latency(&self, latency: FlashLatency) -> Result<(), ErrorCode> {
        if latency.wait_states > 7 || latency.programming_delay > 2 {
            return Err(ErrorCode::INVAL);
        }
        self.common().acr.modify(
            ACR::LATENCY.val(latency.wait_states) + ACR::WRHIGHFREQ.val(latency.programming_delay),
        );
        poll_until_limit(LATENCY_READBACK_TRIES, || self.latency() == latency)
    }

    pub fn is_locked(&self, bank: Bank) -> Result<bool, ErrorCode> {
        Ok(self.bank(bank)?.cr.is_set(CR::LOCK))
    }

    /// Write the key sequence to a bank's KEYR. `FAIL` if the bank stays
    /// locked, which happens after a wrong sequence until the next reset.
    pub fn unlock(&self, bank: Bank) -> Result<(), ErrorCode> {
        let registers = self.bank(bank)?;
        if !registers.cr.is_set(CR::LOCK) {
            return Ok(());
        }
        registers.keyr.set(KEY1);
        registers.keyr.set(KEY2);
        if registers.cr.is_set(CR::LOCK) {
            Err(ErrorCode::FAIL)
        } else {
            Ok(())
        }
    }

    pub fn lock(&self, bank: Bank) -> Result<(), ErrorCode> {
        self.bank(bank)?.cr.modify(CR::LOCK::SET);
        Ok(())
    }

    pub fn unlock_options(&self) -> Result<(), ErrorCode> {
        let registers = self.common();
        if !registers.optcr.is_set(OPTCR::OPTLOCK) {
            return Ok(());
        }
        registers.optkeyr.set(OPTKEY1);
        registers.optkeyr.set(OPTKEY2);
        if registers.optcr.is_set(OPTCR::OPTLOCK) {
            Err(ErrorCode::FAIL)
        } else {
            Ok(())
        }
    }

    pub fn lock_options(&self) {
        self.common().optcr.modify(OPTCR::OPTLOCK::SET);
    }

    pub fn read_protection(&self) -> ReadProtection {
        match self.common().optsr_cur.read_as_enum(OPTSR::RDP) {
            Some(OPTSR::RDP::Value::Level0) => ReadProtection::Level0,
            Some(OPTSR::RDP::Value::Level2) => ReadProtection::Level2,
            None => ReadProtection::Level1,
        }
    }

    pub fn errors(&self, bank: Bank) -> Result<FlashErrors, ErrorCode> {
        let sr = LocalRegisterCopy::new(self.bank(bank)?.sr.get());
        Ok(FlashErrors::from_register(sr))
    }

    /// Clear the error and end-of-operation flags of a bank.
    pub fn clear_errors(&self, bank: Bank) -> Result<(), ErrorCode> {
        self.bank(bank)?.ccr.write(
            SR::EOP::SET
                + SR::WRPERR::SET
                + SR::PGSERR::SET
                + SR::STRBERR::SET
                + SR::INCERR::SET
                + SR::OPERR::SET
                + SR::RDPERR::SET
                + SR::RDSERR::SET
                + SR::SNECCERR::SET
                + SR::DBECCERR::SET,
        );
        Ok(())
    }

    /// Start address of `sector` in `bank`.
    pub fn sector_address(&self, bank: Bank, sector: usize) -> Result<usize, ErrorCode> {
        self.bank(bank)?;
        if sector >= S::sectors_per_bank() {
            return Err(ErrorCode::INVAL);
        }
        let bank_base = match bank {
            Bank::Bank1 => memory_map::FLASH_BANK1_BASE,
            Bank::Bank2 => memory_map::FLASH_BANK2_BASE,
        };
        Ok(bank_base + sector * S::FLASH_SECTOR_SIZE_BYTES)
    }

    /// Erase one sector and wait for completion. The bank must be unlocked
    /// (`OFF` otherwise); `FAIL` if the operation raised an error flag.
    /// Flags left over from earlier operations are cleared before START.
    pub fn erase_sector(&self, bank: Bank, sector: usize) -> Result<(), ErrorCode> {
        let registers = self.bank(bank)?;
        if sector >= S::sectors_per_bank() {
            return Err(ErrorCode::INVAL);
        }
        if registers.cr.is_set(CR::LOCK) {
            return Err(ErrorCode::OFF);
        }
        poll_until(|| !registers.sr.is_set(SR::QW))?;
        self.clear_errors(bank)?;
        registers.cr.modify(
            CR::SER::SET + CR::PSIZE::X32 + CR::SNB.val(sector as u32) + CR::START::SET,
        );
        let result = poll_until(|| !registers.sr.is_set(SR::QW));
        registers.cr.modify(CR::SER::CLEAR);
        result?;
        if self.errors(bank)?.any() {
            return Err(ErrorCode::FAIL);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip_specific::{Stm32h743Specs, Stm32h750Specs};
    use core::mem::{offset_of, size_of};
    use regmap::emulation::RegisterFile;
    use regmap::field_specs;
    use regmap::layout::check_register;
    use std::boxed::Box;

    fn flash<S: ChipSpecs>() -> (&'static RegisterFile<128>, Flash<S>) {
        let file: &'static RegisterFile<128> = Box::leak(Box::new(RegisterFile::new()));
        (file, Flash::new(file.static_ref()))
    }

    const BANK2: usize = 0x100;

    #[test]
    fn layout() {
        assert_eq!(size_of::<FlashBankRegisters>(), 0x100);
        assert_eq!(size_of::<FlashRegisters>(), 0x200);
        assert_eq!(offset_of!(FlashBankRegisters, optsr_cur), 0x1C);
        assert_eq!(offset_of!(FlashBankRegisters, boot_prg), 0x44);
        assert_eq!(offset_of!(FlashBankRegisters, crccr), 0x50);
        assert_eq!(offset_of!(FlashBankRegisters, ecc_far), 0x60);
        assert_eq!(
            check_register(&field_specs!(SR[
                BSY, WBNE, QW, CRC_BUSY, EOP, WRPERR, PGSERR, STRBERR, INCERR, OPERR, RDPERR,
                RDSERR, SNECCERR, DBECCERR, CRCEND
            ])),
            Ok(())
        );
        assert_eq!(FLASH_BASE.address(), 0x5200_2000);
    }

    #[test]
    fn latency() {
        let (file, flash) = flash::<Stm32h743Specs>();
        let latency = FlashLatency {
            wait_states: 4,
            programming_delay: 2,
        };
        assert_eq!(flash.set_latency(latency), Ok(()));
        assert_eq!(file.word(0x00), 0x24);
        assert_eq!(flash.latency(), latency);
        assert_eq!(
            flash.set_latency(FlashLatency {
                wait_states: 8,
                programming_delay: 0
            }),
            Err(ErrorCode::INVAL)
        );
    }

    #[test]
    fn unlock_writes_key_sequence() {
        let (file, flash) = flash::<Stm32h743Specs>();
        file.set_word(0x0C, 1);
        // The emulated bank keeps LOCK set, as after a wrong sequence.
        assert_eq!(flash.unlock(Bank::Bank1), Err(ErrorCode::FAIL));
        assert_eq!(file.word(0x04), KEY2);

        file.set_word(0x0C, 0);
        assert_eq!(flash.is_locked(Bank::Bank1), Ok(false));
        assert_eq!(flash.unlock(Bank::Bank1), Ok(()));
        assert_eq!(flash.lock(Bank::Bank2), Ok(()));
        assert_eq!(file.word(BANK2 + 0x0C), 1);
        assert_eq!(flash.is_locked(Bank::Bank2), Ok(true));
    }

    #[test]
    fn single_bank_part() {
        let (_file, flash) = flash::<Stm32h750Specs>();
        assert_eq!(flash.unlock(Bank::Bank2), Err(ErrorCode::NODEVICE));
        assert_eq!(flash.sector_address(Bank::Bank1, 0), Ok(0x0800_0000));
        assert_eq!(flash.sector_address(Bank::Bank1, 1), Err(ErrorCode::INVAL));
    }

    #[test]
    fn option_bytes() {
        let (file, flash) = flash::<Stm32h743Specs>();
        file.set_word(0x18, 1);
        assert_eq!(flash.unlock_options(), Err(ErrorCode::FAIL));
        assert_eq!(file.word(0x08), OPTKEY2);

        for (rdp, level) in [
            (0xAA, ReadProtection::Level0),
            (0xBB, ReadProtection::Level1),
            (0xCC, ReadProtection::Level2),
        ] {
            file.set_word(0x1C, rdp << 8);
            assert_eq!(flash.read_protection(), level);
        }
    }

    #[test]
    fn error_flags() {
        let (file, flash) = flash::<Stm32h743Specs>();
        file.set_word(BANK2 + 0x10, (1 << 17) | (1 << 26) | (1 << 16));
        let errors = flash.errors(Bank::Bank2).unwrap();
        assert!(errors.write_protection && errors.double_ecc);
        assert!(!errors.strobe);
        assert!(errors.any());
        assert!(!flash.errors(Bank::Bank1).unwrap().any());

        assert_eq!(flash.clear_errors(Bank::Bank2), Ok(()));
        assert_eq!(file.word(BANK2 + 0x14), 0x07EF_0000);
    }

    #[test]
    fn sector_erase() {
        let (file, flash) = flash::<Stm32h743Specs>();
        file.set_word(BANK2 + 0x0C, 1);
        assert_eq!(flash.erase_sector(Bank::Bank2, 3), Err(ErrorCode::OFF));
        file.set_word(BANK2 + 0x0C, 0);
        assert_eq!(flash.erase_sector(Bank::Bank2, 8), Err(ErrorCode::INVAL));
        assert_eq!(file.word(BANK2 + 0x14), 0);
        assert_eq!(flash.erase_sector(Bank::Bank2, 3), Ok(()));
        // SER cleared again, START and SNB left as written
        assert_eq!(file.word(BANK2 + 0x0C), (2 << 4) | (1 << 7) | (3 << 8));
        // Stale flags acknowledged before the erase started
        assert_eq!(file.word(BANK2 + 0x14), 0x07EF_0000);
        assert_eq!(file.word(0x14), 0);

        // The emulated SR ignores CCR, so this flag reads as raised by the erase.
        file.set_word(BANK2 + 0x10, 1 << 18);
        assert_eq!(flash.erase_sector(Bank::Bank2, 0), Err(ErrorCode::FAIL));
        assert_eq!(flash.sector_address(Bank::Bank2, 3), Ok(0x0816_0000));
    }
}
