// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Fixed addresses of the ARMv7-M debug components on the Private
//! Peripheral Bus.

use regmap::address::register_ptr;
use regmap::StaticRef;

use crate::dcb::DcbRegisters;
use crate::dwt::DwtRegisters;
use crate::etm::EtmRegisters;
use crate::fpb::FpbRegisters;
use crate::itm::ItmRegisters;
use crate::rom_table::RomTableRegisters;
use crate::tpiu::TpiuRegisters;

pub const ITM_BASE: usize = 0xE000_0000;
pub const DWT_BASE: usize = 0xE000_1000;
pub const FPB_BASE: usize = 0xE000_2000;
/// System Control Space
pub const SCS_BASE: usize = 0xE000_E000;
pub const DCB_BASE: usize = 0xE000_EDF0;
pub const TPIU_BASE: usize = 0xE004_0000;
pub const ETM_BASE: usize = 0xE004_1000;
pub const ROM_TABLE_BASE: usize = 0xE00F_F000;

pub const ITM: StaticRef<ItmRegisters> = unsafe { register_ptr(ITM_BASE) };
pub const DWT: StaticRef<DwtRegisters> = unsafe { register_ptr(DWT_BASE) };
pub const FPB: StaticRef<FpbRegisters> = unsafe { register_ptr(FPB_BASE) };
pub const DCB: StaticRef<DcbRegisters> = unsafe { register_ptr(DCB_BASE) };
pub const TPIU: StaticRef<TpiuRegisters> = unsafe { register_ptr(TPIU_BASE) };
pub const ETM: StaticRef<EtmRegisters> = unsafe { register_ptr(ETM_BASE) };
pub const ROM_TABLE: StaticRef<RomTableRegisters> = unsafe { register_ptr(ROM_TABLE_BASE) };

#[cfg(test)]
mod tests {
    use super::*;
    use regmap::address::block_offset;

    #[test]
    fn components_sit_in_ppb() {
        assert_eq!(ITM.address(), ITM_BASE);
        assert_eq!(DCB.address(), 0xE000_EDF0);
        assert_eq!(block_offset(SCS_BASE, DCB_BASE), Some(0xDF0));
        assert_eq!(block_offset(DWT_BASE, ITM_BASE), None);
        assert_eq!(ROM_TABLE.address(), 0xE00F_F000);
    }
}
