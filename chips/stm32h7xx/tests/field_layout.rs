// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Every field of the bring-up registers must fit its word and no two
//! fields of one register may share a bit.

use regmap::field_specs;
use regmap::layout::{check_register, occupied_bits, FieldSpec};

use stm32h7xx::dbgmcu::CR as DBGMCU_CR;
use stm32h7xx::flash::{ACR, OPTSR, SR as FLASH_SR};
use stm32h7xx::pwr::{CPUCR, CR3, CSR1, D3CR};
use stm32h7xx::rcc::{BDCR, CFGR, CR, D1CFGR, DIVR, PLLCFGR, PLLCKSELR, RSR};
use stm32h7xx::syscfg::{PMCR, UR0, UR2};

fn assert_valid(name: &str, fields: &[FieldSpec]) {
    assert_eq!(check_register(fields), Ok(()), "{}", name);
}

#[test]
fn rcc_registers() {
    assert_valid(
        "RCC_CR",
        &field_specs!(CR[
            HSION, HSIKERON, HSIRDY, HSIDIV, HSIDIVF, CSION, CSIRDY, CSIKERON, HSI48ON, HSI48RDY,
            D1CKRDY, D2CKRDY, HSEON, HSERDY, HSEBYP, HSECSSON, PLL1ON, PLL1RDY, PLL2ON, PLL2RDY,
            PLL3ON, PLL3RDY
        ]),
    );
    assert_valid(
        "RCC_CFGR",
        &field_specs!(CFGR[
            SW, SWS, STOPWUCK, STOPKERWUCK, RTCPRE, HRTIMSEL, TIMPRE, MCO1PRE, MCO1, MCO2PRE, MCO2
        ]),
    );
    assert_valid("RCC_D1CFGR", &field_specs!(D1CFGR[HPRE, D1PPRE, D1CPRE]));
    assert_valid(
        "RCC_PLLCKSELR",
        &field_specs!(PLLCKSELR[PLLSRC, DIVM1, DIVM2, DIVM3]),
    );
    assert_valid(
        "RCC_PLLCFGR",
        &field_specs!(PLLCFGR[
            PLL1FRACEN, PLL1VCOSEL, PLL1RGE, PLL2FRACEN, PLL2VCOSEL, PLL2RGE, PLL3FRACEN,
            PLL3VCOSEL, PLL3RGE, DIVP1EN, DIVQ1EN, DIVR1EN, DIVP2EN, DIVQ2EN, DIVR2EN, DIVP3EN,
            DIVQ3EN, DIVR3EN
        ]),
    );
    assert_valid(
        "RCC_BDCR",
        &field_specs!(BDCR[LSEON, LSERDY, LSEBYP, LSEDRV, LSECSSON, LSECSSD, RTCSEL, RTCEN, BDRST]),
    );
    assert_valid(
        "RCC_RSR",
        &field_specs!(RSR[
            RMVF, CPURSTF, D1RSTF, D2RSTF, BORRSTF, PINRSTF, PORRSTF, SFTRSTF, IWDG1RSTF,
            WWDG1RSTF, LPWRRSTF
        ]),
    );
}

#[test]
fn pll_dividers_cover_their_register() {
    let divr = field_specs!(DIVR[N, P, Q, R]);
    assert_valid("RCC_PLLxDIVR", &divr);
    assert_eq!(occupied_bits(&divr), 0x7F7F_FFFF);
}

#[test]
fn pwr_registers() {
    assert_valid(
        "PWR_CR3",
        &field_specs!(CR3[BYPASS, LDOEN, SCUEN, VBE, VBRS, USB33DEN, USBREGEN, USB33RDY]),
    );
    assert_valid("PWR_CSR1", &field_specs!(CSR1[PVDO, ACTVOSRDY, ACTVOS, AVDO]));
    assert_valid(
        "PWR_CPUCR",
        &field_specs!(CPUCR[PDDS_D1, PDDS_D2, PDDS_D3, STOPF, SBF, SBF_D1, SBF_D2, CSSF, RUN_D3]),
    );
    assert_valid("PWR_D3CR", &field_specs!(D3CR[VOSRDY, VOS]));
}

#[test]
fn flash_registers() {
    assert_valid("FLASH_ACR", &field_specs!(ACR[LATENCY, WRHIGHFREQ]));
    assert_valid(
        "FLASH_SR",
        &field_specs!(FLASH_SR[
            BSY, WBNE, QW, CRC_BUSY, EOP, WRPERR, PGSERR, STRBERR, INCERR, OPERR, RDPERR, RDSERR,
            SNECCERR, DBECCERR, CRCEND
        ]),
    );
    assert_valid(
        "FLASH_OPTSR",
        &field_specs!(OPTSR[
            OPT_BUSY, BOR_LEV, IWDG1_SW, NRST_STOP_D1, NRST_STBY_D1, RDP, FZ_IWDG_STOP,
            FZ_IWDG_SDBY, ST_RAM_SIZE, SECURITY, IO_HSLV, OPTCHANGEERR, SWAP_BANK_OPT
        ]),
    );
}

#[test]
fn syscfg_and_dbgmcu_registers() {
    assert_valid(
        "SYSCFG_PMCR",
        &field_specs!(PMCR[
            I2C1FMP, I2C2FMP, I2C3FMP, I2C4FMP, PB6FMP, PB7FMP, PB8FMP, PB9FMP, BOOSTE,
            BOOSTVDDSEL, EPIS, PA0SO, PA1SO, PC2SO, PC3SO
        ]),
    );
    assert_valid("SYSCFG_UR0", &field_specs!(UR0[BKS, RDP]));
    assert_valid("SYSCFG_UR2", &field_specs!(UR2[BORH, BOOT_ADD0]));
    assert_valid(
        "DBGMCU_CR",
        &field_specs!(DBGMCU_CR[
            DBGSLEEP_D1, DBGSTOP_D1, DBGSTBY_D1, DBGSLEEP_D2, DBGSTOP_D2, DBGSTBY_D2, DBGSTOP_D3,
            DBGSTBY_D3, TRACECLKEN, D1DBGCKEN, D3DBGCKEN, TRGOEN
        ]),
    );
}
