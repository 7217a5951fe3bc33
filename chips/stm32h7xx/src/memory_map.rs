// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Address map of the STM32H742/743/750/753.
//!
//! The part is split into three power domains: D1 (Cortex-M7, AXI matrix,
//! flash), D2 (DMA masters and most communication peripherals) and D3
//! (always-on: RCC, PWR, SYSCFG, EXTI). Debug components are reachable both
//! from the debugger through APB-D and, for the system ones, from the CPU
//! through an alias in the 0x5C00_0000 region.

use regmap::address::offset_address;

// Memories

pub const ITCM_BASE: usize = 0x0000_0000;
pub const ITCM_SIZE: usize = 64 * 1024;
pub const FLASH_BANK1_BASE: usize = 0x0800_0000;
pub const FLASH_BANK2_BASE: usize = 0x0810_0000;
pub const FLASH_BANK_SIZE: usize = 1024 * 1024;
/// System memory (bootloader)
pub const SYSTEM_MEMORY_BASE: usize = 0x1FF0_0000;
pub const DTCM_BASE: usize = 0x2000_0000;
pub const DTCM_SIZE: usize = 128 * 1024;
pub const AXI_SRAM_BASE: usize = 0x2400_0000;
pub const AXI_SRAM_SIZE: usize = 512 * 1024;
pub const SRAM1_BASE: usize = 0x3000_0000;
pub const SRAM1_SIZE: usize = 128 * 1024;
pub const SRAM2_BASE: usize = 0x3002_0000;
pub const SRAM2_SIZE: usize = 128 * 1024;
pub const SRAM3_BASE: usize = 0x3004_0000;
pub const SRAM3_SIZE: usize = 32 * 1024;
pub const SRAM4_BASE: usize = 0x3800_0000;
pub const SRAM4_SIZE: usize = 64 * 1024;
pub const BACKUP_SRAM_BASE: usize = 0x3880_0000;
pub const BACKUP_SRAM_SIZE: usize = 4 * 1024;

// Bus matrices

pub const D2_APB1_BASE: usize = 0x4000_0000;
pub const D2_APB2_BASE: usize = 0x4001_0000;
pub const D2_AHB1_BASE: usize = 0x4002_0000;
pub const D2_AHB2_BASE: usize = 0x4802_0000;
pub const D1_APB1_BASE: usize = 0x5000_0000;
pub const D1_AHB1_BASE: usize = 0x5200_0000;
pub const D3_APB1_BASE: usize = 0x5800_0000;
pub const D3_AHB1_BASE: usize = 0x5802_0000;

// Peripherals described by this crate

pub const SYSCFG_BASE: usize = offset_address(D3_APB1_BASE, 0x0400);
pub const FLASH_BASE: usize = offset_address(D1_AHB1_BASE, 0x2000);
pub const RCC_BASE: usize = offset_address(D3_AHB1_BASE, 0x4400);
pub const PWR_BASE: usize = offset_address(D3_AHB1_BASE, 0x4800);

// System debug components, CPU side

pub const DBGMCU_BASE: usize = 0x5C00_1000;
pub const SWO_BASE: usize = 0x5C00_3000;
pub const SWTF_BASE: usize = 0x5C00_4000;

// System debug components, debugger side (APB-D)

pub const SYSTEM_ROM_TABLE_DEBUG_BASE: usize = 0xE00E_0000;
pub const DBGMCU_DEBUG_BASE: usize = 0xE00E_1000;
pub const SWO_DEBUG_BASE: usize = 0xE00E_3000;
pub const SWTF_DEBUG_BASE: usize = 0xE00E_4000;

// Cortex-M7 debug components

pub const CM7_ROM_TABLE_BASE: usize = 0xE00F_E000;
pub const MCU_ROM_TABLE_BASE: usize = 0xE00F_F000;
pub const ETM_BASE: usize = 0xE004_1000;
pub const CTI_CM7_BASE: usize = 0xE004_3000;
pub const CSTF_BASE: usize = 0xE00F_3000;
pub const ETF_BASE: usize = 0xE00F_4000;
pub const TPIU_BASE: usize = 0xE00F_5000;

/// A named address range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub base: usize,
    pub size: usize,
}

impl Region {
    pub const fn end(&self) -> usize {
        self.base + self.size
    }

    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }
}

/// RAM and flash regions, in address order.
pub const MEMORY_REGIONS: [Region; 10] = [
    Region { name: "ITCM", base: ITCM_BASE, size: ITCM_SIZE },
    Region { name: "FLASH1", base: FLASH_BANK1_BASE, size: FLASH_BANK_SIZE },
    Region { name: "FLASH2", base: FLASH_BANK2_BASE, size: FLASH_BANK_SIZE },
    Region { name: "DTCM", base: DTCM_BASE, size: DTCM_SIZE },
    Region { name: "AXISRAM", base: AXI_SRAM_BASE, size: AXI_SRAM_SIZE },
    Region { name: "SRAM1", base: SRAM1_BASE, size: SRAM1_SIZE },
    Region { name: "SRAM2", base: SRAM2_BASE, size: SRAM2_SIZE },
    Region { name: "SRAM3", base: SRAM3_BASE, size: SRAM3_SIZE },
    Region { name: "SRAM4", base: SRAM4_BASE, size: SRAM4_SIZE },
    Region { name: "BKPSRAM", base: BACKUP_SRAM_BASE, size: BACKUP_SRAM_SIZE },
];

/// The memory region holding `address`, if any.
pub fn region_of(address: usize) -> Option<&'static Region> {
    MEMORY_REGIONS.iter().find(|region| region.contains(address))
}
