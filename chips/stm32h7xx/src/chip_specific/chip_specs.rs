// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

use crate::clocks::MHZ;

/// Constants that vary between members of the STM32H742/743/750/753 line.
pub trait ChipSpecs {
    const NAME: &'static str;
    /// DBGMCU_IDCODE.DEV_ID
    const DEVICE_ID: u32 = 0x450;
    const FLASH_SIZE_BYTES: usize;
    const FLASH_BANKS: usize;
    const FLASH_SECTOR_SIZE_BYTES: usize = 128 * 1024;
    /// Maximum allowed system clock frequency, reached in VOS0 only
    const SYS_CLOCK_FREQUENCY_LIMIT_HZ: u32 = 480 * MHZ;
    /// Maximum allowed AHB (hclk) frequency
    const AHB_FREQUENCY_LIMIT_HZ: u32 = 240 * MHZ;
    /// Maximum allowed APB frequency
    const APB_FREQUENCY_LIMIT_HZ: u32 = 120 * MHZ;

    fn sectors_per_bank() -> usize {
        Self::FLASH_SIZE_BYTES / Self::FLASH_BANKS / Self::FLASH_SECTOR_SIZE_BYTES
    }
}

/// STM32H743/753: 2 MiB of flash in two banks.
pub enum Stm32h743Specs {}

impl ChipSpecs for Stm32h743Specs {
    const NAME: &'static str = "STM32H743";
    const FLASH_SIZE_BYTES: usize = 2 * 1024 * 1024;
    const FLASH_BANKS: usize = 2;
}

/// STM32H750: value line with a single 128 KiB sector.
pub enum Stm32h750Specs {}

impl ChipSpecs for Stm32h750Specs {
    const NAME: &'static str = "STM32H750";
    const FLASH_SIZE_BYTES: usize = 128 * 1024;
    const FLASH_BANKS: usize = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry() {
        assert_eq!(Stm32h743Specs::sectors_per_bank(), 8);
        assert_eq!(Stm32h750Specs::sectors_per_bank(), 1);
        assert_eq!(Stm32h743Specs::DEVICE_ID, Stm32h750Specs::DEVICE_ID);
        assert_eq!(Stm32h743Specs::SYS_CLOCK_FREQUENCY_LIMIT_HZ, 480_000_000);
    }
}
