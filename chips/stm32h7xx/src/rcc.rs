// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Reset and clock control (RCC)
//!
//! The reset, enable and low-power enable registers come in groups of nine,
//! one register per bus, always in the same order. They share one bitfield
//! description per bus and one [`BusRegisters`] block per group.

use core::fmt::Write;

use regmap::address::register_ptr;
use regmap::registers::interfaces::{ReadWriteable, Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs, Field, LocalRegisterCopy};
use regmap::registers::{ReadOnly, ReadWrite};
use regmap::{ErrorCode, StaticRef};

use crate::clocks::pll::{Pll, PllConfig};
use crate::memory_map;

register_structs! {
    /// One register per bus, as laid out in each reset/enable group.
    pub BusRegisters {
        (0x00 => pub ahb3: ReadWrite<u32, AHB3::Register>),
        (0x04 => pub ahb1: ReadWrite<u32, AHB1::Register>),
        (0x08 => pub ahb2: ReadWrite<u32, AHB2::Register>),
        (0x0C => pub ahb4: ReadWrite<u32, AHB4::Register>),
        (0x10 => pub apb3: ReadWrite<u32, APB3::Register>),
        (0x14 => pub apb1l: ReadWrite<u32, APB1L::Register>),
        (0x18 => pub apb1h: ReadWrite<u32, APB1H::Register>),
        (0x1C => pub apb2: ReadWrite<u32, APB2::Register>),
        (0x20 => pub apb4: ReadWrite<u32, APB4::Register>),
        (0x24 => @END),
    }
}

register_structs! {
    /// Divider and fractional registers of one PLL.
    pub PllRegisters {
        (0x00 => pub divr: ReadWrite<u32, DIVR::Register>),
        (0x04 => pub fracr: ReadWrite<u32, FRACR::Register>),
        (0x08 => @END),
    }
}

register_structs! {
    /// Reset and clock control
    pub RccRegisters {
        /// Source control register
        (0x000 => pub cr: ReadWrite<u32, CR::Register>),
        /// HSI configuration register
        (0x004 => pub hsicfgr: ReadWrite<u32, HSICFGR::Register>),
        /// Clock recovery RC register
        (0x008 => pub crrcr: ReadOnly<u32, CRRCR::Register>),
        /// CSI configuration register
        (0x00C => pub csicfgr: ReadWrite<u32, CSICFGR::Register>),
        /// Clock configuration register
        (0x010 => pub cfgr: ReadWrite<u32, CFGR::Register>),
        (0x014 => _reserved0),
        /// Domain 1 clock configuration register
        (0x018 => pub d1cfgr: ReadWrite<u32, D1CFGR::Register>),
        /// Domain 2 clock configuration register
        (0x01C => pub d2cfgr: ReadWrite<u32, D2CFGR::Register>),
        /// Domain 3 clock configuration register
        (0x020 => pub d3cfgr: ReadWrite<u32, D3CFGR::Register>),
        (0x024 => _reserved1),
        /// PLLs clock source selection register
        (0x028 => pub pllckselr: ReadWrite<u32, PLLCKSELR::Register>),
        /// PLLs configuration register
        (0x02C => pub pllcfgr: ReadWrite<u32, PLLCFGR::Register>),
        /// PLL1..3 dividers and fractional dividers
        (0x030 => pub pll: [PllRegisters; 3]),
        (0x048 => _reserved2),
        /// Domain 1 kernel clock configuration register
        (0x04C => pub d1ccipr: ReadWrite<u32, D1CCIPR::Register>),
        /// Domain 2 kernel clock configuration registers
        (0x050 => pub d2ccip1r: ReadWrite<u32, D2CCIP1R::Register>),
        (0x054 => pub d2ccip2r: ReadWrite<u32, D2CCIP2R::Register>),
        /// Domain 3 kernel clock configuration register
        (0x058 => pub d3ccipr: ReadWrite<u32, D3CCIPR::Register>),
        (0x05C => _reserved3),
        /// Clock source interrupt enable register
        (0x060 => pub cier: ReadWrite<u32, CIER::Register>),
        /// Clock source interrupt flag register
        (0x064 => pub cifr: ReadOnly<u32, CIFR::Register>),
        /// Clock source interrupt clear register
        (0x068 => pub cicr: ReadWrite<u32, CIFR::Register>),
        (0x06C => _reserved4),
        /// Backup domain control register
        (0x070 => pub bdcr: ReadWrite<u32, BDCR::Register>),
        /// Clock control and status register
        (0x074 => pub csr: ReadWrite<u32, CSR::Register>),
        (0x078 => _reserved5),
        /// Peripheral reset registers
        (0x07C => pub rstr: BusRegisters),
        /// Global control register
        (0x0A0 => pub gcr: ReadWrite<u32, GCR::Register>),
        (0x0A4 => _reserved6),
        /// D3 autonomous mode register
        (0x0A8 => pub d3amr: ReadWrite<u32, D3AMR::Register>),
        (0x0AC => _reserved7),
        /// Reset status register
        (0x0D0 => pub rsr: ReadWrite<u32, RSR::Register>),
        /// Peripheral clock enable registers
        (0x0D4 => pub enr: BusRegisters),
        (0x0F8 => _reserved8),
        /// Peripheral clock enable in sleep mode registers
        (0x0FC => pub lpenr: BusRegisters),
        (0x120 => _reserved9),
        /// Per-core aliases of the reset status and enable registers
        (0x130 => pub c1_rsr: ReadWrite<u32, RSR::Register>),
        (0x134 => pub c1_enr: BusRegisters),
        (0x158 => _reserved10),
        (0x15C => pub c1_lpenr: BusRegisters),
        (0x180 => @END),
    }
}

register_bitfields![u32,
    pub CR [
        /// Internal high-speed clock enable
        HSION OFFSET(0) NUMBITS(1) [],
        /// HSI kernel clock enable in Stop mode
        HSIKERON OFFSET(1) NUMBITS(1) [],
        HSIRDY OFFSET(2) NUMBITS(1) [],
        /// HSI clock divider
        HSIDIV OFFSET(3) NUMBITS(2) [
            DivideBy1 = 0,
            DivideBy2 = 1,
            DivideBy4 = 2,
            DivideBy8 = 3
        ],
        /// HSI divider flag
        HSIDIVF OFFSET(5) NUMBITS(1) [],
        CSION OFFSET(7) NUMBITS(1) [],
        CSIRDY OFFSET(8) NUMBITS(1) [],
        CSIKERON OFFSET(9) NUMBITS(1) [],
        HSI48ON OFFSET(12) NUMBITS(1) [],
        HSI48RDY OFFSET(13) NUMBITS(1) [],
        /// D1 domain clocks ready flag
        D1CKRDY OFFSET(14) NUMBITS(1) [],
        /// D2 domain clocks ready flag
        D2CKRDY OFFSET(15) NUMBITS(1) [],
        HSEON OFFSET(16) NUMBITS(1) [],
        HSERDY OFFSET(17) NUMBITS(1) [],
        HSEBYP OFFSET(18) NUMBITS(1) [],
        /// HSE clock security system enable
        HSECSSON OFFSET(19) NUMBITS(1) [],
        PLL1ON OFFSET(24) NUMBITS(1) [],
        PLL1RDY OFFSET(25) NUMBITS(1) [],
        PLL2ON OFFSET(26) NUMBITS(1) [],
        PLL2RDY OFFSET(27) NUMBITS(1) [],
        PLL3ON OFFSET(28) NUMBITS(1) [],
        PLL3RDY OFFSET(29) NUMBITS(1) []
    ],
    pub HSICFGR [
        /// HSI clock calibration
        HSICAL OFFSET(0) NUMBITS(12) [],
        /// HSI clock trimming
        HSITRIM OFFSET(24) NUMBITS(7) []
    ],
    pub CRRCR [
        HSI48CAL OFFSET(0) NUMBITS(10) []
    ],
    pub CSICFGR [
        CSICAL OFFSET(0) NUMBITS(8) [],
        CSITRIM OFFSET(24) NUMBITS(5) []
    ],
    pub CFGR [
        /// System clock switch
        SW OFFSET(0) NUMBITS(3) [
            HSI = 0,
            CSI = 1,
            HSE = 2,
            PLL1 = 3
        ],
        /// System clock switch status
        SWS OFFSET(3) NUMBITS(3) [
            HSI = 0,
            CSI = 1,
            HSE = 2,
            PLL1 = 3
        ],
        /// System clock selection after a wake up from system Stop
        STOPWUCK OFFSET(6) NUMBITS(1) [],
        /// Kernel clock selection after a wake up from system Stop
        STOPKERWUCK OFFSET(7) NUMBITS(1) [],
        /// HSE division factor for RTC clock
        RTCPRE OFFSET(8) NUMBITS(6) [],
        /// High Resolution Timer clock prescaler selection
        HRTIMSEL OFFSET(14) NUMBITS(1) [],
        /// Timers clocks prescaler selection
        TIMPRE OFFSET(15) NUMBITS(1) [],
        MCO1PRE OFFSET(18) NUMBITS(4) [],
        MCO1 OFFSET(22) NUMBITS(3) [
            HSI = 0,
            LSE = 1,
            HSE = 2,
            PLL1_Q = 3,
            HSI48 = 4
        ],
        MCO2PRE OFFSET(25) NUMBITS(4) [],
        MCO2 OFFSET(29) NUMBITS(3) [
            SYSCLK = 0,
            PLL2_P = 1,
            HSE = 2,
            PLL1_P = 3,
            CSI = 4,
            LSI = 5
        ]
    ],
    pub D1CFGR [
        /// D1 domain AHB prescaler
        HPRE OFFSET(0) NUMBITS(4) [],
        /// D1 domain APB3 prescaler
        D1PPRE OFFSET(4) NUMBITS(3) [],
        /// D1 domain core prescaler
        D1CPRE OFFSET(8) NUMBITS(4) []
    ],
    pub D2CFGR [
        /// D2 domain APB1 prescaler
        D2PPRE1 OFFSET(4) NUMBITS(3) [],
        /// D2 domain APB2 prescaler
        D2PPRE2 OFFSET(8) NUMBITS(3) []
    ],
    pub D3CFGR [
        /// D3 domain APB4 prescaler
        D3PPRE OFFSET(4) NUMBITS(3) []
    ],
    pub PLLCKSELR [
        /// DIVMx and PLLs clock source selection
        PLLSRC OFFSET(0) NUMBITS(2) [
            HSI = 0,
            CSI = 1,
            HSE = 2,
            NoClock = 3
        ],
        DIVM1 OFFSET(4) NUMBITS(6) [],
        DIVM2 OFFSET(12) NUMBITS(6) [],
        DIVM3 OFFSET(20) NUMBITS(6) []
    ],
    pub PLLCFGR [
        PLL1FRACEN OFFSET(0) NUMBITS(1) [],
        PLL1VCOSEL OFFSET(1) NUMBITS(1) [
            Wide = 0,
            Medium = 1
        ],
        PLL1RGE OFFSET(2) NUMBITS(2) [
            Range1 = 0,
            Range2 = 1,
            Range4 = 2,
            Range8 = 3
        ],
        PLL2FRACEN OFFSET(4) NUMBITS(1) [],
        PLL2VCOSEL OFFSET(5) NUMBITS(1) [
            Wide = 0,
            Medium = 1
        ],
        PLL2RGE OFFSET(6) NUMBITS(2) [
            Range1 = 0,
            Range2 = 1,
            Range4 = 2,
            Range8 = 3
        ],
        PLL3FRACEN OFFSET(8) NUMBITS(1) [],
        PLL3VCOSEL OFFSET(9) NUMBITS(1) [
            Wide = 0,
            Medium = 1
        ],
        PLL3RGE OFFSET(10) NUMBITS(2) [
            Range1 = 0,
            Range2 = 1,
            Range4 = 2,
            Range8 = 3
        ],
        DIVP1EN OFFSET(16) NUMBITS(1) [],
        DIVQ1EN OFFSET(17) NUMBITS(1) [],
        DIVR1EN OFFSET(18) NUMBITS(1) [],
        DIVP2EN OFFSET(19) NUMBITS(1) [],
        DIVQ2EN OFFSET(20) NUMBITS(1) [],
        DIVR2EN OFFSET(21) NUMBITS(1) [],
        DIVP3EN OFFSET(22) NUMBITS(1) [],
        DIVQ3EN OFFSET(23) NUMBITS(1) [],
        DIVR3EN OFFSET(24) NUMBITS(1) []
    ],
    pub DIVR [
        /// Multiplication factor minus one
        N OFFSET(0) NUMBITS(9) [],
        /// Output dividers minus one
        P OFFSET(9) NUMBITS(7) [],
        Q OFFSET(16) NUMBITS(7) [],
        R OFFSET(24) NUMBITS(7) []
    ],
    pub FRACR [
        FRACN OFFSET(3) NUMBITS(13) []
    ],
    pub D1CCIPR [
        FMCSEL OFFSET(0) NUMBITS(2) [
            HCLK3 = 0,
            PLL1_Q = 1,
            PLL2_R = 2,
            PER = 3
        ],
        QSPISEL OFFSET(4) NUMBITS(2) [
            HCLK3 = 0,
            PLL1_Q = 1,
            PLL2_R = 2,
            PER = 3
        ],
        SDMMCSEL OFFSET(16) NUMBITS(1) [
            PLL1_Q = 0,
            PLL2_R = 1
        ],
        /// Per clock source, shared by several kernel clock muxes
        CKPERSEL OFFSET(28) NUMBITS(2) [
            HSI = 0,
            CSI = 1,
            HSE = 2
        ]
    ],
    pub D2CCIP1R [
        SAI1SEL OFFSET(0) NUMBITS(3) [
            PLL1_Q = 0,
            PLL2_P = 1,
            PLL3_P = 2,
            I2S_CKIN = 3,
            PER = 4
        ],
        SAI23SEL OFFSET(6) NUMBITS(3) [
            PLL1_Q = 0,
            PLL2_P = 1,
            PLL3_P = 2,
            I2S_CKIN = 3,
            PER = 4
        ],
        SPI123SEL OFFSET(12) NUMBITS(3) [
            PLL1_Q = 0,
            PLL2_P = 1,
            PLL3_P = 2,
            I2S_CKIN = 3,
            PER = 4
        ],
        SPI45SEL OFFSET(16) NUMBITS(3) [
            APB = 0,
            PLL2_Q = 1,
            PLL3_Q = 2,
            HSI = 3,
            CSI = 4,
            HSE = 5
        ],
        SPDIFSEL OFFSET(20) NUMBITS(2) [
            PLL1_Q = 0,
            PLL2_R = 1,
            PLL3_R = 2,
            HSI = 3
        ],
        DFSDM1SEL OFFSET(24) NUMBITS(1) [
            PCLK2 = 0,
            SYSCLK = 1
        ],
        FDCANSEL OFFSET(28) NUMBITS(2) [
            HSE = 0,
            PLL1_Q = 1,
            PLL2_Q = 2
        ],
        /// SWPMI kernel clock source
        SWPSEL OFFSET(31) NUMBITS(1) [
            PCLK1 = 0,
            HSI = 1
        ]
    ],
    pub D2CCIP2R [
        USART234578SEL OFFSET(0) NUMBITS(3) [
            PCLK1 = 0,
            PLL2_Q = 1,
            PLL3_Q = 2,
            HSI = 3,
            CSI = 4,
            LSE = 5
        ],
        USART16SEL OFFSET(3) NUMBITS(3) [
            PCLK2 = 0,
            PLL2_Q = 1,
            PLL3_Q = 2,
            HSI = 3,
            CSI = 4,
            LSE = 5
        ],
        RNGSEL OFFSET(8) NUMBITS(2) [
            HSI48 = 0,
            PLL1_Q = 1,
            LSE = 2,
            LSI = 3
        ],
        I2C123SEL OFFSET(12) NUMBITS(2) [
            PCLK1 = 0,
            PLL3_R = 1,
            HSI = 2,
            CSI = 3
        ],
        USBSEL OFFSET(20) NUMBITS(2) [
            Disabled = 0,
            PLL1_Q = 1,
            PLL3_Q = 2,
            HSI48 = 3
        ],
        CECSEL OFFSET(22) NUMBITS(2) [
            LSE = 0,
            LSI = 1,
            CSI = 2
        ],
        LPTIM1SEL OFFSET(28) NUMBITS(3) [
            PCLK1 = 0,
            PLL2_P = 1,
            PLL3_R = 2,
            LSE = 3,
            LSI = 4,
            PER = 5
        ]
    ],
    pub D3CCIPR [
        LPUART1SEL OFFSET(0) NUMBITS(3) [
            PCLK4 = 0,
            PLL2_Q = 1,
            PLL3_Q = 2,
            HSI = 3,
            CSI = 4,
            LSE = 5
        ],
        I2C4SEL OFFSET(8) NUMBITS(2) [
            PCLK4 = 0,
            PLL3_R = 1,
            HSI = 2,
            CSI = 3
        ],
        LPTIM2SEL OFFSET(10) NUMBITS(3) [
            PCLK4 = 0,
            PLL2_P = 1,
            PLL3_R = 2,
            LSE = 3,
            LSI = 4,
            PER = 5
        ],
        LPTIM345SEL OFFSET(13) NUMBITS(3) [
            PCLK4 = 0,
            PLL2_P = 1,
            PLL3_R = 2,
            LSE = 3,
            LSI = 4,
            PER = 5
        ],
        ADCSEL OFFSET(16) NUMBITS(2) [
            PLL2_P = 0,
            PLL3_R = 1,
            PER = 2
        ],
        SAI4ASEL OFFSET(21) NUMBITS(3) [
            PLL1_Q = 0,
            PLL2_P = 1,
            PLL3_P = 2,
            I2S_CKIN = 3,
            PER = 4
        ],
        SAI4BSEL OFFSET(24) NUMBITS(3) [
            PLL1_Q = 0,
            PLL2_P = 1,
            PLL3_P = 2,
            I2S_CKIN = 3,
            PER = 4
        ],
        SPI6SEL OFFSET(28) NUMBITS(3) [
            PCLK4 = 0,
            PLL2_Q = 1,
            PLL3_Q = 2,
            HSI = 3,
            CSI = 4,
            HSE = 5
        ]
    ],
    pub CIER [
        LSIRDYIE OFFSET(0) NUMBITS(1) [],
        LSERDYIE OFFSET(1) NUMBITS(1) [],
        HSIRDYIE OFFSET(2) NUMBITS(1) [],
        HSERDYIE OFFSET(3) NUMBITS(1) [],
        CSIRDYIE OFFSET(4) NUMBITS(1) [],
        HSI48RDYIE OFFSET(5) NUMBITS(1) [],
        PLL1RDYIE OFFSET(6) NUMBITS(1) [],
        PLL2RDYIE OFFSET(7) NUMBITS(1) [],
        PLL3RDYIE OFFSET(8) NUMBITS(1) [],
        LSECSSIE OFFSET(9) NUMBITS(1) []
    ],
    /// Shared by the flag and the clear register.
    pub CIFR [
        LSIRDY OFFSET(0) NUMBITS(1) [],
        LSERDY OFFSET(1) NUMBITS(1) [],
        HSIRDY OFFSET(2) NUMBITS(1) [],
        HSERDY OFFSET(3) NUMBITS(1) [],
        CSIRDY OFFSET(4) NUMBITS(1) [],
        HSI48RDY OFFSET(5) NUMBITS(1) [],
        PLL1RDY OFFSET(6) NUMBITS(1) [],
        PLL2RDY OFFSET(7) NUMBITS(1) [],
        PLL3RDY OFFSET(8) NUMBITS(1) [],
        LSECSS OFFSET(9) NUMBITS(1) [],
        HSECSS OFFSET(10) NUMBITS(1) []
    ],
    pub BDCR [
        LSEON OFFSET(0) NUMBITS(1) [],
        LSERDY OFFSET(1) NUMBITS(1) [],
        LSEBYP OFFSET(2) NUMBITS(1) [],
        /// LSE oscillator driving capability
        LSEDRV OFFSET(3) NUMBITS(2) [
            Lowest = 0,
            MediumLow = 1,
            MediumHigh = 2,
            Highest = 3
        ],
        LSECSSON OFFSET(5) NUMBITS(1) [],
        LSECSSD OFFSET(6) NUMBITS(1) [],
        RTCSEL OFFSET(8) NUMBITS(2) [
            NoClock = 0,
            LSE = 1,
            LSI = 2,
            HSE = 3
        ],
        RTCEN OFFSET(15) NUMBITS(1) [],
        /// Backup domain software reset
        BDRST OFFSET(16) NUMBITS(1) []
    ],
    pub CSR [
        LSION OFFSET(0) NUMBITS(1) [],
        LSIRDY OFFSET(1) NUMBITS(1) []
    ],
    pub GCR [
        /// WWDG1 reset scope control
        WW1RSC OFFSET(0) NUMBITS(1) []
    ],
    pub D3AMR [
        BDMAAMEN OFFSET(0) NUMBITS(1) [],
        LPUART1AMEN OFFSET(3) NUMBITS(1) [],
        SPI6AMEN OFFSET(5) NUMBITS(1) [],
        I2C4AMEN OFFSET(7) NUMBITS(1) [],
        LPTIM2AMEN OFFSET(9) NUMBITS(1) [],
        LPTIM3AMEN OFFSET(10) NUMBITS(1) [],
        LPTIM4AMEN OFFSET(11) NUMBITS(1) [],
        LPTIM5AMEN OFFSET(12) NUMBITS(1) [],
        COMP12AMEN OFFSET(14) NUMBITS(1) [],
        VREFAMEN OFFSET(15) NUMBITS(1) [],
        RTCAMEN OFFSET(16) NUMBITS(1) [],
        CRCAMEN OFFSET(19) NUMBITS(1) [],
        SAI4AMEN OFFSET(21) NUMBITS(1) [],
        ADC3AMEN OFFSET(24) NUMBITS(1) [],
        BKPRAMAMEN OFFSET(28) NUMBITS(1) [],
        SRAM4AMEN OFFSET(29) NUMBITS(1) []
    ],
    pub RSR [
        /// Remove reset flags
        RMVF OFFSET(16) NUMBITS(1) [],
        CPURSTF OFFSET(17) NUMBITS(1) [],
        D1RSTF OFFSET(19) NUMBITS(1) [],
        D2RSTF OFFSET(20) NUMBITS(1) [],
        BORRSTF OFFSET(21) NUMBITS(1) [],
        PINRSTF OFFSET(22) NUMBITS(1) [],
        PORRSTF OFFSET(23) NUMBITS(1) [],
        SFTRSTF OFFSET(24) NUMBITS(1) [],
        IWDG1RSTF OFFSET(26) NUMBITS(1) [],
        WWDG1RSTF OFFSET(28) NUMBITS(1) [],
        LPWRRSTF OFFSET(30) NUMBITS(1) []
    ],
    pub AHB3 [
        MDMA OFFSET(0) NUMBITS(1) [],
        DMA2D OFFSET(4) NUMBITS(1) [],
        JPGDEC OFFSET(5) NUMBITS(1) [],
        FMC OFFSET(12) NUMBITS(1) [],
        QSPI OFFSET(14) NUMBITS(1) [],
        SDMMC1 OFFSET(16) NUMBITS(1) []
    ],
    pub AHB1 [
        DMA1 OFFSET(0) NUMBITS(1) [],
        DMA2 OFFSET(1) NUMBITS(1) [],
        ADC12 OFFSET(5) NUMBITS(1) [],
        ETH1MAC OFFSET(15) NUMBITS(1) [],
        ETH1TX OFFSET(16) NUMBITS(1) [],
        ETH1RX OFFSET(17) NUMBITS(1) [],
        USB1OTGHS OFFSET(25) NUMBITS(1) [],
        USB1OTGHSULPI OFFSET(26) NUMBITS(1) [],
        USB2OTGFS OFFSET(27) NUMBITS(1) [],
        USB2OTGFSULPI OFFSET(28) NUMBITS(1) []
    ],
    pub AHB2 [
        /// Camera interface
        DCMI OFFSET(0) NUMBITS(1) [],
        CRYPT OFFSET(4) NUMBITS(1) [],
        HASH OFFSET(5) NUMBITS(1) [],
        RNG OFFSET(6) NUMBITS(1) [],
        SDMMC2 OFFSET(9) NUMBITS(1) [],
        SRAM1 OFFSET(29) NUMBITS(1) [],
        SRAM2 OFFSET(30) NUMBITS(1) [],
        SRAM3 OFFSET(31) NUMBITS(1) []
    ],
    pub AHB4 [
        GPIOA OFFSET(0) NUMBITS(1) [],
        GPIOB OFFSET(1) NUMBITS(1) [],
        GPIOC OFFSET(2) NUMBITS(1) [],
        GPIOD OFFSET(3) NUMBITS(1) [],
        GPIOE OFFSET(4) NUMBITS(1) [],
        GPIOF OFFSET(5) NUMBITS(1) [],
        GPIOG OFFSET(6) NUMBITS(1) [],
        GPIOH OFFSET(7) NUMBITS(1) [],
        GPIOI OFFSET(8) NUMBITS(1) [],
        GPIOJ OFFSET(9) NUMBITS(1) [],
        GPIOK OFFSET(10) NUMBITS(1) [],
        CRC OFFSET(19) NUMBITS(1) [],
        BDMA OFFSET(21) NUMBITS(1) [],
        ADC3 OFFSET(24) NUMBITS(1) [],
        /// Hardware semaphore
        HSEM OFFSET(25) NUMBITS(1) [],
        BKPRAM OFFSET(28) NUMBITS(1) []
    ],
    pub APB3 [
        LTDC OFFSET(3) NUMBITS(1) [],
        WWDG1 OFFSET(6) NUMBITS(1) []
    ],
    pub APB1L [
        TIM2 OFFSET(0) NUMBITS(1) [],
        TIM3 OFFSET(1) NUMBITS(1) [],
        TIM4 OFFSET(2) NUMBITS(1) [],
        TIM5 OFFSET(3) NUMBITS(1) [],
        TIM6 OFFSET(4) NUMBITS(1) [],
        TIM7 OFFSET(5) NUMBITS(1) [],
        TIM12 OFFSET(6) NUMBITS(1) [],
        TIM13 OFFSET(7) NUMBITS(1) [],
        TIM14 OFFSET(8) NUMBITS(1) [],
        LPTIM1 OFFSET(9) NUMBITS(1) [],
        SPI2 OFFSET(14) NUMBITS(1) [],
        SPI3 OFFSET(15) NUMBITS(1) [],
        SPDIFRX OFFSET(16) NUMBITS(1) [],
        USART2 OFFSET(17) NUMBITS(1) [],
        USART3 OFFSET(18) NUMBITS(1) [],
        UART4 OFFSET(19) NUMBITS(1) [],
        UART5 OFFSET(20) NUMBITS(1) [],
        I2C1 OFFSET(21) NUMBITS(1) [],
        I2C2 OFFSET(22) NUMBITS(1) [],
        I2C3 OFFSET(23) NUMBITS(1) [],
        CEC OFFSET(27) NUMBITS(1) [],
        DAC12 OFFSET(29) NUMBITS(1) [],
        UART7 OFFSET(30) NUMBITS(1) [],
        UART8 OFFSET(31) NUMBITS(1) []
    ],
    pub APB1H [
        /// Clock recovery system
        CRS OFFSET(1) NUMBITS(1) [],
        SWP OFFSET(2) NUMBITS(1) [],
        OPAMP OFFSET(4) NUMBITS(1) [],
        MDIOS OFFSET(5) NUMBITS(1) [],
        FDCAN OFFSET(8) NUMBITS(1) []
    ],
    pub APB2 [
        TIM1 OFFSET(0) NUMBITS(1) [],
        TIM8 OFFSET(1) NUMBITS(1) [],
        USART1 OFFSET(4) NUMBITS(1) [],
        USART6 OFFSET(5) NUMBITS(1) [],
        SPI1 OFFSET(12) NUMBITS(1) [],
        SPI4 OFFSET(13) NUMBITS(1) [],
        TIM15 OFFSET(16) NUMBITS(1) [],
        TIM16 OFFSET(17) NUMBITS(1) [],
        TIM17 OFFSET(18) NUMBITS(1) [],
        SPI5 OFFSET(20) NUMBITS(1) [],
        SAI1 OFFSET(22) NUMBITS(1) [],
        SAI2 OFFSET(23) NUMBITS(1) [],
        SAI3 OFFSET(24) NUMBITS(1) [],
        DFSDM1 OFFSET(28) NUMBITS(1) [],
        HRTIM OFFSET(29) NUMBITS(1) []
    ],
    pub APB4 [
        SYSCFG OFFSET(1) NUMBITS(1) [],
        LPUART1 OFFSET(3) NUMBITS(1) [],
        SPI6 OFFSET(5) NUMBITS(1) [],
        I2C4 OFFSET(7) NUMBITS(1) [],
        LPTIM2 OFFSET(9) NUMBITS(1) [],
        LPTIM3 OFFSET(10) NUMBITS(1) [],
        LPTIM4 OFFSET(11) NUMBITS(1) [],
        LPTIM5 OFFSET(12) NUMBITS(1) [],
        COMP12 OFFSET(14) NUMBITS(1) [],
        VREF OFFSET(15) NUMBITS(1) [],
        RTCAPB OFFSET(16) NUMBITS(1) [],
        SAI4 OFFSET(21) NUMBITS(1) []
    ]
];

pub const RCC_BASE: StaticRef<RccRegisters> = unsafe { register_ptr(memory_map::RCC_BASE) };

const PLL_ON: [Field<u32, CR::Register>; 3] = [CR::PLL1ON, CR::PLL2ON, CR::PLL3ON];
const PLL_RDY: [Field<u32, CR::Register>; 3] = [CR::PLL1RDY, CR::PLL2RDY, CR::PLL3RDY];
const DIVM: [Field<u32, PLLCKSELR::Register>; 3] =
    [PLLCKSELR::DIVM1, PLLCKSELR::DIVM2, PLLCKSELR::DIVM3];
const FRACEN: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::PLL1FRACEN, PLLCFGR::PLL2FRACEN, PLLCFGR::PLL3FRACEN];
const VCOSEL: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::PLL1VCOSEL, PLLCFGR::PLL2VCOSEL, PLLCFGR::PLL3VCOSEL];
const RGE: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::PLL1RGE, PLLCFGR::PLL2RGE, PLLCFGR::PLL3RGE];
const DIVPEN: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::DIVP1EN, PLLCFGR::DIVP2EN, PLLCFGR::DIVP3EN];
const DIVQEN: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::DIVQ1EN, PLLCFGR::DIVQ2EN, PLLCFGR::DIVQ3EN];
const DIVREN: [Field<u32, PLLCFGR::Register>; 3] =
    [PLLCFGR::DIVR1EN, PLLCFGR::DIVR2EN, PLLCFGR::DIVR3EN];

pub(crate) fn pll_on_field(pll: Pll) -> Field<u32, CR::Register> {
    PLL_ON[pll.index()]
}

/// Decode the dividers of `pll` from raw register values.
pub(crate) fn decode_pll_config(
    pll: Pll,
    pllckselr: u32,
    pllcfgr: u32,
    divr: u32,
    fracr: u32,
) -> PllConfig {
    let i = pll.index();
    let pllckselr = LocalRegisterCopy::<u32, PLLCKSELR::Register>::new(pllckselr);
    let pllcfgr = LocalRegisterCopy::<u32, PLLCFGR::Register>::new(pllcfgr);
    let divr = LocalRegisterCopy::<u32, DIVR::Register>::new(divr);
    let fracr = LocalRegisterCopy::<u32, FRACR::Register>::new(fracr);
    let output = |enable: Field<u32, PLLCFGR::Register>, divider: Field<u32, DIVR::Register>| {
        if pllcfgr.is_set(enable) {
            Some(divr.read(divider) + 1)
        } else {
            None
        }
    };
    PllConfig {
        m: pllckselr.read(DIVM[i]),
        n: divr.read(DIVR::N) + 1,
        p: output(DIVPEN[i], DIVR::P),
        q: output(DIVQEN[i], DIVR::Q),
        r: output(DIVREN[i], DIVR::R),
        fracn: if pllcfgr.is_set(FRACEN[i]) {
            fracr.read(FRACR::FRACN)
        } else {
            0
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Oscillator {
    /// 64 MHz internal RC
    HSI,
    /// 4 MHz low-power internal RC
    CSI,
    /// 48 MHz internal RC for USB and RNG
    HSI48,
    HSE,
    /// 32 kHz internal RC
    LSI,
    /// 32.768 kHz external crystal
    LSE,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysClockSource {
    HSI = 0b000,
    CSI = 0b001,
    HSE = 0b010,
    PLL1 = 0b011,
}

impl SysClockSource {
    pub(crate) fn from_sws(value: Option<CFGR::SWS::Value>) -> Option<SysClockSource> {
        match value {
            Some(CFGR::SWS::Value::HSI) => Some(SysClockSource::HSI),
            Some(CFGR::SWS::Value::CSI) => Some(SysClockSource::CSI),
            Some(CFGR::SWS::Value::HSE) => Some(SysClockSource::HSE),
            Some(CFGR::SWS::Value::PLL1) => Some(SysClockSource::PLL1),
            None => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllSource {
    HSI = 0b00,
    CSI = 0b01,
    HSE = 0b10,
    /// No clock sent to the DIVM dividers
    NoClock = 0b11,
}

impl PllSource {
    pub(crate) fn from_register(bits: u32) -> PllSource {
        match bits & 0b11 {
            0b00 => PllSource::HSI,
            0b01 => PllSource::CSI,
            0b10 => PllSource::HSE,
            _ => PllSource::NoClock,
        }
    }
}

/// HSI output divider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HsiDivider {
    DivideBy1 = 0,
    DivideBy2 = 1,
    DivideBy4 = 2,
    DivideBy8 = 3,
}

impl From<HsiDivider> for u32 {
    fn from(item: HsiDivider) -> u32 {
        1 << (item as u32)
    }
}

/// D1CPRE and HPRE encodings. Any value below 0b1000 means no division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AHBPrescaler {
    DivideBy1 = 0b0000,
    DivideBy2 = 0b1000,
    DivideBy4 = 0b1001,
    DivideBy8 = 0b1010,
    DivideBy16 = 0b1011,
    DivideBy64 = 0b1100,
    DivideBy128 = 0b1101,
    DivideBy256 = 0b1110,
    DivideBy512 = 0b1111,
}

impl AHBPrescaler {
    pub fn from_register(bits: u32) -> AHBPrescaler {
        match bits & 0b1111 {
            0b1000 => AHBPrescaler::DivideBy2,
            0b1001 => AHBPrescaler::DivideBy4,
            0b1010 => AHBPrescaler::DivideBy8,
            0b1011 => AHBPrescaler::DivideBy16,
            0b1100 => AHBPrescaler::DivideBy64,
            0b1101 => AHBPrescaler::DivideBy128,
            0b1110 => AHBPrescaler::DivideBy256,
            0b1111 => AHBPrescaler::DivideBy512,
            _ => AHBPrescaler::DivideBy1,
        }
    }
}

impl From<AHBPrescaler> for u32 {
    fn from(item: AHBPrescaler) -> u32 {
        match item {
            AHBPrescaler::DivideBy1 => 1,
            AHBPrescaler::DivideBy2 => 2,
            AHBPrescaler::DivideBy4 => 4,
            AHBPrescaler::DivideBy8 => 8,
            AHBPrescaler::DivideBy16 => 16,
            AHBPrescaler::DivideBy64 => 64,
            AHBPrescaler::DivideBy128 => 128,
            AHBPrescaler::DivideBy256 => 256,
            AHBPrescaler::DivideBy512 => 512,
        }
    }
}

/// D1PPRE, D2PPRE1, D2PPRE2 and D3PPRE encodings. Any value below 0b100
/// means no division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum APBPrescaler {
    DivideBy1 = 0b000,
    DivideBy2 = 0b100,
    DivideBy4 = 0b101,
    DivideBy8 = 0b110,
    DivideBy16 = 0b111,
}

impl APBPrescaler {
    pub fn from_register(bits: u32) -> APBPrescaler {
        match bits & 0b111 {
            0b100 => APBPrescaler::DivideBy2,
            0b101 => APBPrescaler::DivideBy4,
            0b110 => APBPrescaler::DivideBy8,
            0b111 => APBPrescaler::DivideBy16,
            _ => APBPrescaler::DivideBy1,
        }
    }
}

impl From<APBPrescaler> for u32 {
    fn from(item: APBPrescaler) -> u32 {
        match item {
            APBPrescaler::DivideBy1 => 1,
            APBPrescaler::DivideBy2 => 2,
            APBPrescaler::DivideBy4 => 4,
            APBPrescaler::DivideBy8 => 8,
            APBPrescaler::DivideBy16 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApbBus {
    /// D2 domain, pclk1
    APB1,
    /// D2 domain, pclk2
    APB2,
    /// D1 domain, pclk3
    APB3,
    /// D3 domain, pclk4
    APB4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MCO1Source {
    HSI = 0,
    LSE = 1,
    HSE = 2,
    PLL1Q = 3,
    HSI48 = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MCO2Source {
    SYSCLK = 0,
    PLL2P = 1,
    HSE = 2,
    PLL1P = 3,
    CSI = 4,
    LSI = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtcClockSource {
    LSE = 1,
    LSI = 2,
    /// HSE divided by CFGR.RTCPRE
    HSE = 3,
}

/// Peripherals on the D1 AHB3 bus (hclk3). The discriminant is the bit
/// position in every AHB3 reset and enable register. Memories and the flash
/// interface only have sleep enable bits and are not listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HCLK3 {
    MDMA = 0,
    DMA2D = 4,
    JPGDEC = 5,
    FMC = 12,
    QSPI = 14,
    SDMMC1 = 16,
}

/// Peripherals on the D2 AHB1 bus (hclk1)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HCLK1 {
    DMA1 = 0,
    DMA2 = 1,
    ADC12 = 5,
    ETH1MAC = 15,
    ETH1TX = 16,
    ETH1RX = 17,
    USB1OTGHS = 25,
    USB1OTGHSULPI = 26,
    USB2OTGFS = 27,
    USB2OTGFSULPI = 28,
}

/// Peripherals on the D2 AHB2 bus (hclk2)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HCLK2 {
    DCMI = 0,
    CRYPT = 4,
    HASH = 5,
    RNG = 6,
    SDMMC2 = 9,
    SRAM1 = 29,
    SRAM2 = 30,
    SRAM3 = 31,
}

/// Peripherals on the D3 AHB4 bus (hclk4)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HCLK4 {
    GPIOA = 0,
    GPIOB = 1,
    GPIOC = 2,
    GPIOD = 3,
    GPIOE = 4,
    GPIOF = 5,
    GPIOG = 6,
    GPIOH = 7,
    GPIOI = 8,
    GPIOJ = 9,
    GPIOK = 10,
    CRC = 19,
    BDMA = 21,
    ADC3 = 24,
    HSEM = 25,
    BKPRAM = 28,
}

/// Peripherals on the D1 APB3 bus (pclk3)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PCLK3 {
    LTDC = 3,
    WWDG1 = 6,
}

/// Peripherals on the low half of the D2 APB1 bus (pclk1)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PCLK1L {
    TIM2 = 0,
    TIM3 = 1,
    TIM4 = 2,
    TIM5 = 3,
    TIM6 = 4,
    TIM7 = 5,
    TIM12 = 6,
    TIM13 = 7,
    TIM14 = 8,
    LPTIM1 = 9,
    SPI2 = 14,
    SPI3 = 15,
    SPDIFRX = 16,
    USART2 = 17,
    USART3 = 18,
    UART4 = 19,
    UART5 = 20,
    I2C1 = 21,
    I2C2 = 22,
    I2C3 = 23,
    CEC = 27,
    DAC12 = 29,
    UART7 = 30,
    UART8 = 31,
}

/// Peripherals on the high half of the D2 APB1 bus (pclk1)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PCLK1H {
    CRS = 1,
    SWP = 2,
    OPAMP = 4,
    MDIOS = 5,
    FDCAN = 8,
}

/// Peripherals on the D2 APB2 bus (pclk2)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PCLK2 {
    TIM1 = 0,
    TIM8 = 1,
    USART1 = 4,
    USART6 = 5,
    SPI1 = 12,
    SPI4 = 13,
    TIM15 = 16,
    TIM16 = 17,
    TIM17 = 18,
    SPI5 = 20,
    SAI1 = 22,
    SAI2 = 23,
    SAI3 = 24,
    DFSDM1 = 28,
    HRTIM = 29,
}

/// Peripherals on the D3 APB4 bus (pclk4)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PCLK4 {
    SYSCFG = 1,
    LPUART1 = 3,
    SPI6 = 5,
    I2C4 = 7,
    LPTIM2 = 9,
    LPTIM3 = 10,
    LPTIM4 = 11,
    LPTIM5 = 12,
    COMP12 = 14,
    VREF = 15,
    RTCAPB = 16,
    SAI4 = 21,
}

/// A peripheral whose bus clock and reset are controlled by the RCC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeripheralClock {
    AHB3(HCLK3),
    AHB1(HCLK1),
    AHB2(HCLK2),
    AHB4(HCLK4),
    APB3(PCLK3),
    APB1L(PCLK1L),
    APB1H(PCLK1H),
    APB2(PCLK2),
    APB4(PCLK4),
}

impl PeripheralClock {
    /// Bit position in the reset and enable registers of the bus.
    pub fn bit(&self) -> u32 {
        match *self {
            PeripheralClock::AHB3(p) => p as u32,
            PeripheralClock::AHB1(p) => p as u32,
            PeripheralClock::AHB2(p) => p as u32,
            PeripheralClock::AHB4(p) => p as u32,
            PeripheralClock::APB3(p) => p as u32,
            PeripheralClock::APB1L(p) => p as u32,
            PeripheralClock::APB1H(p) => p as u32,
            PeripheralClock::APB2(p) => p as u32,
            PeripheralClock::APB4(p) => p as u32,
        }
    }
}

/// Which register of a bus group to act on.
#[derive(Clone, Copy)]
enum Group {
    Reset,
    Enable,
    SleepEnable,
}

// Runs `$body` with `$register` bound to the register of `$bus_registers`
// matching the bus of `$clock`. The per-bus registers have distinct types,
// so the body is expanded once per bus.
macro_rules! with_bus_register {
    ($bus_registers:expr, $clock:expr, |$register:ident| $body:expr) => {
        match $clock {
            PeripheralClock::AHB3(_) => {
                let $register = &$bus_registers.ahb3;
                $body
            }
            PeripheralClock::AHB1(_) => {
                let $register = &$bus_registers.ahb1;
                $body
            }
            PeripheralClock::AHB2(_) => {
                let $register = &$bus_registers.ahb2;
                $body
            }
            PeripheralClock::AHB4(_) => {
                let $register = &$bus_registers.ahb4;
                $body
            }
            PeripheralClock::APB3(_) => {
                let $register = &$bus_registers.apb3;
                $body
            }
            PeripheralClock::APB1L(_) => {
                let $register = &$bus_registers.apb1l;
                $body
            }
            PeripheralClock::APB1H(_) => {
                let $register = &$bus_registers.apb1h;
                $body
            }
            PeripheralClock::APB2(_) => {
                let $register = &$bus_registers.apb2;
                $body
            }
            PeripheralClock::APB4(_) => {
                let $register = &$bus_registers.apb4;
                $body
            }
        }
    };
}

/// Causes of the last reset, decoded from RSR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetFlags {
    pub cpu: bool,
    pub d1: bool,
    pub d2: bool,
    pub brown_out: bool,
    pub pin: bool,
    pub power_on: bool,
    pub software: bool,
    pub independent_watchdog: bool,
    pub window_watchdog: bool,
    pub low_power: bool,
}

impl ResetFlags {
    pub fn from_register(rsr: u32) -> ResetFlags {
        let rsr = LocalRegisterCopy::<u32, RSR::Register>::new(rsr);
        ResetFlags {
            cpu: rsr.is_set(RSR::CPURSTF),
            d1: rsr.is_set(RSR::D1RSTF),
            d2: rsr.is_set(RSR::D2RSTF),
            brown_out: rsr.is_set(RSR::BORRSTF),
            pin: rsr.is_set(RSR::PINRSTF),
            power_on: rsr.is_set(RSR::PORRSTF),
            software: rsr.is_set(RSR::SFTRSTF),
            independent_watchdog: rsr.is_set(RSR::IWDG1RSTF),
            window_watchdog: rsr.is_set(RSR::WWDG1RSTF),
            low_power: rsr.is_set(RSR::LPWRRSTF),
        }
    }
}

/// Raw copy of the registers the clock tree is derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RccSnapshot {
    pub cr: u32,
    pub cfgr: u32,
    pub d1cfgr: u32,
    pub d2cfgr: u32,
    pub d3cfgr: u32,
    pub pllckselr: u32,
    pub pllcfgr: u32,
    pub plldivr: [u32; 3],
    pub pllfracr: [u32; 3],
}

pub struct Rcc {
    registers: StaticRef<RccRegisters>,
}

impl Rcc {
    pub const fn new(registers: StaticRef<RccRegisters>) -> Rcc {
        Rcc { registers }
    }

    pub fn enable_oscillator(&self, oscillator: Oscillator) {
        self.set_oscillator(oscillator, true);
    }

    /// The oscillator must not be feeding the system clock or a running PLL.
    pub fn disable_oscillator(&self, oscillator: Oscillator) {
        self.set_oscillator(oscillator, false);
    }

    fn set_oscillator(&self, oscillator: Oscillator, on: bool) {
        let on = on as u32;
        match oscillator {
            Oscillator::HSI => self.registers.cr.modify(CR::HSION.val(on)),
            Oscillator::CSI => self.registers.cr.modify(CR::CSION.val(on)),
            Oscillator::HSI48 => self.registers.cr.modify(CR::HSI48ON.val(on)),
            Oscillator::HSE => self.registers.cr.modify(CR::HSEON.val(on)),
            Oscillator::LSI => self.registers.csr.modify(CSR::LSION.val(on)),
            Oscillator::LSE => self.registers.bdcr.modify(BDCR::LSEON.val(on)),
        }
    }

    pub fn is_oscillator_enabled(&self, oscillator: Oscillator) -> bool {
        match oscillator {
            Oscillator::HSI => self.registers.cr.is_set(CR::HSION),
            Oscillator::CSI => self.registers.cr.is_set(CR::CSION),
            Oscillator::HSI48 => self.registers.cr.is_set(CR::HSI48ON),
            Oscillator::HSE => self.registers.cr.is_set(CR::HSEON),
            Oscillator::LSI => self.registers.csr.is_set(CSR::LSION),
            Oscillator::LSE => self.registers.bdcr.is_set(BDCR::LSEON),
        }
    }

    pub fn is_oscillator_ready(&self, oscillator: Oscillator) -> bool {
        match oscillator {
            Oscillator::HSI => self.registers.cr.is_set(CR::HSIRDY),
            Oscillator::CSI => self.registers.cr.is_set(CR::CSIRDY),
            Oscillator::HSI48 => self.registers.cr.is_set(CR::HSI48RDY),
            Oscillator::HSE => self.registers.cr.is_set(CR::HSERDY),
            Oscillator::LSI => self.registers.csr.is_set(CSR::LSIRDY),
            Oscillator::LSE => self.registers.bdcr.is_set(BDCR::LSERDY),
        }
    }

    /// Use an external clock on OSC_IN instead of a crystal. Only effective
    /// while the HSE is off.
    pub fn set_hse_bypass(&self, bypass: bool) {
        self.registers.cr.modify(CR::HSEBYP.val(bypass as u32));
    }

    pub fn set_hsi_divider(&self, divider: HsiDivider) {
        self.registers.cr.modify(CR::HSIDIV.val(divider as u32));
    }

    pub fn hsi_divider(&self) -> HsiDivider {
        match self.registers.cr.read_as_enum(CR::HSIDIV) {
            Some(CR::HSIDIV::Value::DivideBy2) => HsiDivider::DivideBy2,
            Some(CR::HSIDIV::Value::DivideBy4) => HsiDivider::DivideBy4,
            Some(CR::HSIDIV::Value::DivideBy8) => HsiDivider::DivideBy8,
            _ => HsiDivider::DivideBy1,
        }
    }

    /// Source currently driving the system clock, from SWS. `None` for a
    /// reserved encoding.
    pub fn sys_clock_source(&self) -> Option<SysClockSource> {
        SysClockSource::from_sws(self.registers.cfgr.read_as_enum(CFGR::SWS))
    }

    /// Request a system clock switch. The source must be enabled and ready
    /// and the flash latency must suit the new frequency.
    pub fn set_sys_clock_source(&self, source: SysClockSource) {
        self.registers.cfgr.modify(CFGR::SW.val(source as u32));
    }

    /// Request a switch and wait until SWS reports it.
    pub fn switch_sys_clock(&self, source: SysClockSource) -> Result<(), ErrorCode> {
        self.set_sys_clock_source(source);
        regmap::poll::poll_until(|| self.sys_clock_source() == Some(source))
    }

    pub fn pll_source(&self) -> PllSource {
        PllSource::from_register(self.registers.pllckselr.read(PLLCKSELR::PLLSRC))
    }

    /// The source is shared by the three PLLs and can only change while
    /// all of them are off.
    pub fn set_pll_source(&self, source: PllSource) -> Result<(), ErrorCode> {
        if Pll::ALL.iter().any(|&pll| self.is_enabled_pll(pll)) {
            return Err(ErrorCode::BUSY);
        }
        self.registers
            .pllckselr
            .modify(PLLCKSELR::PLLSRC.val(source as u32));
        Ok(())
    }

    pub fn enable_pll(&self, pll: Pll) {
        self.registers.cr.modify(PLL_ON[pll.index()].val(1));
    }

    pub fn disable_pll(&self, pll: Pll) {
        self.registers.cr.modify(PLL_ON[pll.index()].val(0));
    }

    pub fn is_enabled_pll(&self, pll: Pll) -> bool {
        self.registers.cr.is_set(PLL_ON[pll.index()])
    }

    pub fn is_locked_pll(&self, pll: Pll) -> bool {
        self.registers.cr.is_set(PLL_RDY[pll.index()])
    }

    /// Program the dividers of a stopped PLL fed with `input_hz`.
    ///
    /// Returns `BUSY` if the PLL is running and `INVAL` if the configuration
    /// is out of range. Outputs set to `None` are disabled and their
    /// dividers left untouched.
    pub fn configure_pll(
        &self,
        pll: Pll,
        config: &PllConfig,
        input_hz: u32,
    ) -> Result<(), ErrorCode> {
        if self.is_enabled_pll(pll) {
            return Err(ErrorCode::BUSY);
        }
        let settings = config.validate(pll, input_hz)?;
        let i = pll.index();

        self.registers.pllckselr.modify(DIVM[i].val(config.m));

        let mut divr = LocalRegisterCopy::<u32, DIVR::Register>::new(self.registers.pll[i].divr.get());
        divr.modify(DIVR::N.val(config.n - 1));
        if let Some(p) = config.p {
            divr.modify(DIVR::P.val(p - 1));
        }
        if let Some(q) = config.q {
            divr.modify(DIVR::Q.val(q - 1));
        }
        if let Some(r) = config.r {
            divr.modify(DIVR::R.val(r - 1));
        }
        self.registers.pll[i].divr.set(divr.get());

        // FRACN is latched when FRACEN goes from 0 to 1.
        self.registers.pllcfgr.modify(FRACEN[i].val(0));
        self.registers.pll[i]
            .fracr
            .write(FRACR::FRACN.val(config.fracn));
        self.registers.pllcfgr.modify(
            FRACEN[i].val((config.fracn != 0) as u32)
                + VCOSEL[i].val(settings.vco_range as u32)
                + RGE[i].val(settings.input_range as u32)
                + DIVPEN[i].val(config.p.is_some() as u32)
                + DIVQEN[i].val(config.q.is_some() as u32)
                + DIVREN[i].val(config.r.is_some() as u32),
        );
        Ok(())
    }

    /// Read back the dividers of `pll`.
    pub fn pll_config(&self, pll: Pll) -> PllConfig {
        let i = pll.index();
        decode_pll_config(
            pll,
            self.registers.pllckselr.get(),
            self.registers.pllcfgr.get(),
            self.registers.pll[i].divr.get(),
            self.registers.pll[i].fracr.get(),
        )
    }

    /// Divider between the system clock and the core (D1CPRE).
    pub fn set_cpu_prescaler(&self, prescaler: AHBPrescaler) {
        self.registers
            .d1cfgr
            .modify(D1CFGR::D1CPRE.val(prescaler as u32));
    }

    pub fn cpu_prescaler(&self) -> AHBPrescaler {
        AHBPrescaler::from_register(self.registers.d1cfgr.read(D1CFGR::D1CPRE))
    }

    /// Divider between the core clock and the AHB buses (HPRE).
    pub fn set_ahb_prescaler(&self, prescaler: AHBPrescaler) {
        self.registers
            .d1cfgr
            .modify(D1CFGR::HPRE.val(prescaler as u32));
    }

    pub fn ahb_prescaler(&self) -> AHBPrescaler {
        AHBPrescaler::from_register(self.registers.d1cfgr.read(D1CFGR::HPRE))
    }

    pub fn set_apb_prescaler(&self, bus: ApbBus, prescaler: APBPrescaler) {
        let value = prescaler as u32;
        match bus {
            ApbBus::APB1 => self.registers.d2cfgr.modify(D2CFGR::D2PPRE1.val(value)),
            ApbBus::APB2 => self.registers.d2cfgr.modify(D2CFGR::D2PPRE2.val(value)),
            ApbBus::APB3 => self.registers.d1cfgr.modify(D1CFGR::D1PPRE.val(value)),
            ApbBus::APB4 => self.registers.d3cfgr.modify(D3CFGR::D3PPRE.val(value)),
        }
    }

    pub fn apb_prescaler(&self, bus: ApbBus) -> APBPrescaler {
        APBPrescaler::from_register(match bus {
            ApbBus::APB1 => self.registers.d2cfgr.read(D2CFGR::D2PPRE1),
            ApbBus::APB2 => self.registers.d2cfgr.read(D2CFGR::D2PPRE2),
            ApbBus::APB3 => self.registers.d1cfgr.read(D1CFGR::D1PPRE),
            ApbBus::APB4 => self.registers.d3cfgr.read(D3CFGR::D3PPRE),
        })
    }

    /// Route `source` to MCO1, divided by `divider` (1..=15).
    pub fn set_mco1(&self, source: MCO1Source, divider: u32) -> Result<(), ErrorCode> {
        if divider == 0 || divider > 15 {
            return Err(ErrorCode::INVAL);
        }
        self.registers
            .cfgr
            .modify(CFGR::MCO1.val(source as u32) + CFGR::MCO1PRE.val(divider));
        Ok(())
    }

    /// Route `source` to MCO2, divided by `divider` (1..=15).
    pub fn set_mco2(&self, source: MCO2Source, divider: u32) -> Result<(), ErrorCode> {
        if divider == 0 || divider > 15 {
            return Err(ErrorCode::INVAL);
        }
        self.registers
            .cfgr
            .modify(CFGR::MCO2.val(source as u32) + CFGR::MCO2PRE.val(divider));
        Ok(())
    }

    /// RTCSEL can only be written once after a backup domain reset;
    /// selecting a different source afterwards returns `ALREADY`. Backup
    /// domain write access must be enabled in the PWR block.
    pub fn set_rtc_clock_source(&self, source: RtcClockSource) -> Result<(), ErrorCode> {
        match self.registers.bdcr.read(BDCR::RTCSEL) {
            0 => {
                self.registers
                    .bdcr
                    .modify(BDCR::RTCSEL.val(source as u32) + BDCR::RTCEN::SET);
                Ok(())
            }
            current if current == source as u32 => Ok(()),
            _ => Err(ErrorCode::ALREADY),
        }
    }

    fn group(&self, group: Group) -> &BusRegisters {
        match group {
            Group::Reset => &self.registers.rstr,
            Group::Enable => &self.registers.enr,
            Group::SleepEnable => &self.registers.lpenr,
        }
    }

    fn write_clock_bit(&self, group: Group, clock: PeripheralClock, value: bool) {
        let mask = 1 << clock.bit();
        let bus_registers = self.group(group);
        with_bus_register!(bus_registers, clock, |register| {
            let word = register.get();
            register.set(if value { word | mask } else { word & !mask });
        })
    }

    fn read_clock_bit(&self, group: Group, clock: PeripheralClock) -> bool {
        let mask = 1 << clock.bit();
        let bus_registers = self.group(group);
        with_bus_register!(bus_registers, clock, |register| register.get() & mask != 0)
    }

    pub fn enable_clock(&self, clock: PeripheralClock) {
        self.write_clock_bit(Group::Enable, clock, true);
    }

    pub fn disable_clock(&self, clock: PeripheralClock) {
        self.write_clock_bit(Group::Enable, clock, false);
    }

    pub fn is_enabled_clock(&self, clock: PeripheralClock) -> bool {
        self.read_clock_bit(Group::Enable, clock)
    }

    /// Keep the clock running while the core sleeps.
    pub fn set_clock_in_sleep(&self, clock: PeripheralClock, enabled: bool) {
        self.write_clock_bit(Group::SleepEnable, clock, enabled);
    }

    pub fn is_enabled_clock_in_sleep(&self, clock: PeripheralClock) -> bool {
        self.read_clock_bit(Group::SleepEnable, clock)
    }

    /// Pulse the peripheral's reset line.
    pub fn reset_peripheral(&self, clock: PeripheralClock) {
        self.write_clock_bit(Group::Reset, clock, true);
        self.write_clock_bit(Group::Reset, clock, false);
    }

    pub fn reset_flags(&self) -> ResetFlags {
        ResetFlags::from_register(self.registers.rsr.get())
    }

    pub fn clear_reset_flags(&self) {
        self.registers.rsr.modify(RSR::RMVF::SET);
    }

    pub fn snapshot(&self) -> RccSnapshot {
        let r = &self.registers;
        RccSnapshot {
            cr: r.cr.get(),
            cfgr: r.cfgr.get(),
            d1cfgr: r.d1cfgr.get(),
            d2cfgr: r.d2cfgr.get(),
            d3cfgr: r.d3cfgr.get(),
            pllckselr: r.pllckselr.get(),
            pllcfgr: r.pllcfgr.get(),
            plldivr: [r.pll[0].divr.get(), r.pll[1].divr.get(), r.pll[2].divr.get()],
            pllfracr: [r.pll[0].fracr.get(), r.pll[1].fracr.get(), r.pll[2].fracr.get()],
        }
    }

    /// Dump the clock configuration in human readable form.
    pub fn print_state(&self, writer: &mut dyn Write) {
        let _ = writer.write_fmt(format_args!(
            "RCC: sysclk {:?}, pll source {:?}\r\n",
            self.sys_clock_source(),
            self.pll_source(),
        ));
        for oscillator in [
            Oscillator::HSI,
            Oscillator::CSI,
            Oscillator::HSI48,
            Oscillator::HSE,
            Oscillator::LSI,
            Oscillator::LSE,
        ] {
            let _ = writer.write_fmt(format_args!(
                " {:<6} on: {:<5} ready: {}\r\n",
                oscillator,
                self.is_oscillator_enabled(oscillator),
                self.is_oscillator_ready(oscillator),
            ));
        }
        for pll in Pll::ALL {
            let config = self.pll_config(pll);
            let _ = writer.write_fmt(format_args!(
                " {:?} on: {:<5} locked: {:<5} m: {} n: {} p: {:?} q: {:?} r: {:?} fracn: {}\r\n",
                pll,
                self.is_enabled_pll(pll),
                self.is_locked_pll(pll),
                config.m,
                config.n,
                config.p,
                config.q,
                config.r,
                config.fracn,
            ));
        }
        let _ = writer.write_fmt(format_args!(
            " D1CPRE /{} HPRE /{} APB1 /{} APB2 /{} APB3 /{} APB4 /{}\r\n",
            u32::from(self.cpu_prescaler()),
            u32::from(self.ahb_prescaler()),
            u32::from(self.apb_prescaler(ApbBus::APB1)),
            u32::from(self.apb_prescaler(ApbBus::APB2)),
            u32::from(self.apb_prescaler(ApbBus::APB3)),
            u32::from(self.apb_prescaler(ApbBus::APB4)),
        ));
        let _ = writer.write_fmt(format_args!(" reset: {:?}\r\n", self.reset_flags()));
    }
}

impl core::fmt::Display for Oscillator {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let name = match self {
            Oscillator::HSI => "HSI",
            Oscillator::CSI => "CSI",
            Oscillator::HSI48 => "HSI48",
            Oscillator::HSE => "HSE",
            Oscillator::LSI => "LSI",
            Oscillator::LSE => "LSE",
        };
        f.pad(name)
    }
}
