// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Bus frequencies derived from the RCC configuration.
//!
//! ```text
//! sys_ck --D1CPRE--> sys_d1cpre_ck (CPU) --HPRE--> hclk (AXI/AHB)
//!                                                    |--D1PPRE--> pclk3
//!                                                    |--D2PPRE1-> pclk1
//!                                                    |--D2PPRE2-> pclk2
//!                                                    `--D3PPRE--> pclk4
//! ```

use regmap::registers::LocalRegisterCopy;
use regmap::ErrorCode;

use crate::chip_specific::ChipSpecs;
use crate::clocks::pll::Pll;
use crate::clocks::{CSI_FREQUENCY_HZ, HSI_FREQUENCY_HZ, MHZ};
use crate::flash::FlashLatency;
use crate::pwr::VoltageScale;
use crate::rcc::{
    decode_pll_config, pll_on_field, AHBPrescaler, APBPrescaler, HsiDivider, PllSource,
    RccSnapshot, SysClockSource, CFGR, CR, D1CFGR, D2CFGR, D3CFGR,
};

/// Output frequencies of one PLL; `None` for a disabled output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PllOutputs {
    pub p_hz: Option<u32>,
    pub q_hz: Option<u32>,
    pub r_hz: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockTree {
    pub sys_hz: u32,
    pub cpu_hz: u32,
    pub hclk_hz: u32,
    pub pclk1_hz: u32,
    pub pclk2_hz: u32,
    pub pclk3_hz: u32,
    pub pclk4_hz: u32,
    pub pll: [PllOutputs; 3],
}

impl ClockTree {
    /// Compute every bus frequency from a register snapshot.
    ///
    /// `hse_hz` is the frequency of the external oscillator, if one is
    /// fitted. Fails with `OFF` when the active configuration draws from a
    /// clock that is not running, and with `INVAL` on a reserved SWS value.
    pub fn from_registers(rcc: &RccSnapshot, hse_hz: Option<u32>) -> Result<ClockTree, ErrorCode> {
        let cr = LocalRegisterCopy::<u32, CR::Register>::new(rcc.cr);
        let cfgr = LocalRegisterCopy::<u32, CFGR::Register>::new(rcc.cfgr);
        let d1cfgr = LocalRegisterCopy::<u32, D1CFGR::Register>::new(rcc.d1cfgr);
        let d2cfgr = LocalRegisterCopy::<u32, D2CFGR::Register>::new(rcc.d2cfgr);
        let d3cfgr = LocalRegisterCopy::<u32, D3CFGR::Register>::new(rcc.d3cfgr);

        let hsi_divider = match cr.read_as_enum(CR::HSIDIV) {
            Some(CR::HSIDIV::Value::DivideBy2) => HsiDivider::DivideBy2,
            Some(CR::HSIDIV::Value::DivideBy4) => HsiDivider::DivideBy4,
            Some(CR::HSIDIV::Value::DivideBy8) => HsiDivider::DivideBy8,
            _ => HsiDivider::DivideBy1,
        };
        let hsi_hz = HSI_FREQUENCY_HZ / u32::from(hsi_divider);

        let pll_input_hz = match PllSource::from_register(rcc.pllckselr) {
            PllSource::HSI => Some(hsi_hz),
            PllSource::CSI => Some(CSI_FREQUENCY_HZ),
            PllSource::HSE => hse_hz,
            PllSource::NoClock => None,
        };

        let mut pll = [PllOutputs::default(); 3];
        for p in Pll::ALL {
            let i = p.index();
            let config = decode_pll_config(
                p,
                rcc.pllckselr,
                rcc.pllcfgr,
                rcc.plldivr[i],
                rcc.pllfracr[i],
            );
            if let (true, Some(input_hz)) = (cr.is_set(pll_on_field(p)), pll_input_hz) {
                if config.m != 0 {
                    pll[i] = PllOutputs {
                        p_hz: config.p_hz(input_hz),
                        q_hz: config.q_hz(input_hz),
                        r_hz: config.r_hz(input_hz),
                    };
                }
            }
        }

        let sys_hz = match SysClockSource::from_sws(cfgr.read_as_enum(CFGR::SWS)) {
            Some(SysClockSource::HSI) => hsi_hz,
            Some(SysClockSource::CSI) => CSI_FREQUENCY_HZ,
            Some(SysClockSource::HSE) => hse_hz.ok_or(ErrorCode::OFF)?,
            Some(SysClockSource::PLL1) => pll[Pll::PLL1.index()].p_hz.ok_or(ErrorCode::OFF)?,
            None => return Err(ErrorCode::INVAL),
        };

        let cpu_hz = sys_hz / u32::from(AHBPrescaler::from_register(d1cfgr.read(D1CFGR::D1CPRE)));
        let hclk_hz = cpu_hz / u32::from(AHBPrescaler::from_register(d1cfgr.read(D1CFGR::HPRE)));
        let apb = |bits: u32| hclk_hz / u32::from(APBPrescaler::from_register(bits));

        Ok(ClockTree {
            sys_hz,
            cpu_hz,
            hclk_hz,
            pclk1_hz: apb(d2cfgr.read(D2CFGR::D2PPRE1)),
            pclk2_hz: apb(d2cfgr.read(D2CFGR::D2PPRE2)),
            pclk3_hz: apb(d1cfgr.read(D1CFGR::D1PPRE)),
            pclk4_hz: apb(d3cfgr.read(D3CFGR::D3PPRE)),
            pll,
        })
    }

    /// `INVAL` if any bus runs faster than the part allows.
    pub fn check_limits<S: ChipSpecs>(&self) -> Result<(), ErrorCode> {
        let apb_max = [self.pclk1_hz, self.pclk2_hz, self.pclk3_hz, self.pclk4_hz]
            .into_iter()
            .max()
            .unwrap_or(0);
        if self.cpu_hz > S::SYS_CLOCK_FREQUENCY_LIMIT_HZ
            || self.hclk_hz > S::AHB_FREQUENCY_LIMIT_HZ
            || apb_max > S::APB_FREQUENCY_LIMIT_HZ
        {
            Err(ErrorCode::INVAL)
        } else {
            Ok(())
        }
    }
}

/// Flash read latency needed at `hclk_hz` for the given core voltage scale.
///
/// Each row holds the highest AXI clock frequency (inclusive) supported by
/// a wait state count and programming delay pair.
pub fn flash_latency(hclk_hz: u32, scale: VoltageScale) -> Result<FlashLatency, ErrorCode> {
    const VOS0: &[(u32, u32, u32)] = &[
        (70, 0, 0),
        (140, 1, 1),
        (185, 2, 1),
        (210, 2, 2),
        (225, 3, 2),
        (240, 4, 2),
    ];
    const VOS1: &[(u32, u32, u32)] = &[
        (70, 0, 0),
        (140, 1, 1),
        (185, 2, 1),
        (210, 2, 2),
        (225, 3, 2),
    ];
    const VOS2: &[(u32, u32, u32)] = &[(55, 0, 0), (110, 1, 1), (165, 2, 1), (225, 3, 2)];
    const VOS3: &[(u32, u32, u32)] = &[
        (45, 0, 0),
        (90, 1, 1),
        (135, 2, 1),
        (180, 3, 2),
        (225, 4, 2),
    ];

    let table = match scale {
        VoltageScale::VOS0 => VOS0,
        VoltageScale::VOS1 => VOS1,
        VoltageScale::VOS2 => VOS2,
        VoltageScale::VOS3 => VOS3,
    };
    table
        .iter()
        .find(|(max_mhz, _, _)| hclk_hz <= max_mhz * MHZ)
        .map(|&(_, wait_states, programming_delay)| FlashLatency {
            wait_states,
            programming_delay,
        })
        .ok_or(ErrorCode::INVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip_specific::Stm32h743Specs;
    use crate::rcc::{PLLCFGR, PLLCKSELR};
    use regmap::registers::{FieldValue, RegisterLongName};

    fn word<R: RegisterLongName>(value: FieldValue<u32, R>) -> u32 {
        let mut copy = LocalRegisterCopy::<u32, R>::new(0);
        copy.modify(value);
        copy.get()
    }

    fn reset_snapshot() -> RccSnapshot {
        RccSnapshot {
            cr: 0,
            cfgr: 0,
            d1cfgr: 0,
            d2cfgr: 0,
            d3cfgr: 0,
            pllckselr: 0,
            pllcfgr: 0,
            plldivr: [0; 3],
            pllfracr: [0; 3],
        }
    }

    /// 25 MHz HSE, PLL1 at 960 MHz VCO, sysclk 480 MHz, hclk 240 MHz.
    fn full_speed_snapshot() -> RccSnapshot {
        let mut rcc = reset_snapshot();
        rcc.cr = word(CR::HSEON::SET + CR::PLL1ON::SET);
        rcc.cfgr = word(CFGR::SWS::PLL1);
        rcc.d1cfgr = word(D1CFGR::HPRE.val(0b1000) + D1CFGR::D1PPRE.val(0b100));
        rcc.d2cfgr = word(D2CFGR::D2PPRE1.val(0b100) + D2CFGR::D2PPRE2.val(0b100));
        rcc.d3cfgr = word(D3CFGR::D3PPRE.val(0b100));
        rcc.pllckselr = word(PLLCKSELR::PLLSRC::HSE + PLLCKSELR::DIVM1.val(5));
        rcc.pllcfgr = word(PLLCFGR::DIVP1EN::SET + PLLCFGR::DIVQ1EN::SET);
        // N = 192, P = 2, Q = 4
        rcc.plldivr[0] = 191 | (1 << 9) | (3 << 16);
        rcc
    }

    #[test]
    fn reset_state_runs_from_hsi() {
        let tree = ClockTree::from_registers(&reset_snapshot(), None).unwrap();
        assert_eq!(tree.sys_hz, 64 * MHZ);
        assert_eq!(tree.hclk_hz, 64 * MHZ);
        assert_eq!(tree.pclk4_hz, 64 * MHZ);
        assert_eq!(tree.pll, [PllOutputs::default(); 3]);
    }

    #[test]
    fn hsi_divider_applies() {
        let mut rcc = reset_snapshot();
        rcc.cr = word(CR::HSIDIV::DivideBy4);
        let tree = ClockTree::from_registers(&rcc, None).unwrap();
        assert_eq!(tree.sys_hz, 16 * MHZ);
    }

    #[test]
    fn full_speed() {
        let tree = ClockTree::from_registers(&full_speed_snapshot(), Some(25 * MHZ)).unwrap();
        assert_eq!(tree.sys_hz, 480 * MHZ);
        assert_eq!(tree.cpu_hz, 480 * MHZ);
        assert_eq!(tree.hclk_hz, 240 * MHZ);
        assert_eq!(tree.pclk1_hz, 120 * MHZ);
        assert_eq!(tree.pclk2_hz, 120 * MHZ);
        assert_eq!(tree.pclk3_hz, 120 * MHZ);
        assert_eq!(tree.pclk4_hz, 120 * MHZ);
        assert_eq!(
            tree.pll[0],
            PllOutputs {
                p_hz: Some(480 * MHZ),
                q_hz: Some(240 * MHZ),
                r_hz: None,
            }
        );
        assert_eq!(tree.check_limits::<Stm32h743Specs>(), Ok(()));
    }

    #[test]
    fn overclocked_bus_is_rejected() {
        let mut rcc = full_speed_snapshot();
        rcc.d1cfgr = 0;
        let tree = ClockTree::from_registers(&rcc, Some(25 * MHZ)).unwrap();
        assert_eq!(tree.hclk_hz, 480 * MHZ);
        assert_eq!(tree.check_limits::<Stm32h743Specs>(), Err(ErrorCode::INVAL));
    }

    #[test]
    fn secondary_pll_from_csi() {
        let mut rcc = reset_snapshot();
        rcc.cr = word(CR::PLL2ON::SET);
        rcc.pllckselr = word(PLLCKSELR::PLLSRC::CSI + PLLCKSELR::DIVM2.val(1));
        rcc.pllcfgr = word(PLLCFGR::DIVQ2EN::SET);
        rcc.plldivr[1] = 99 | (3 << 16);
        let tree = ClockTree::from_registers(&rcc, None).unwrap();
        assert_eq!(tree.pll[1].q_hz, Some(100 * MHZ));
        assert_eq!(tree.pll[1].p_hz, None);
        assert_eq!(tree.pll[0], PllOutputs::default());
    }

    #[test]
    fn missing_clocks() {
        let rcc = full_speed_snapshot();
        assert_eq!(ClockTree::from_registers(&rcc, None), Err(ErrorCode::OFF));

        let mut rcc = reset_snapshot();
        rcc.cfgr = word(CFGR::SWS::HSE);
        assert_eq!(ClockTree::from_registers(&rcc, None), Err(ErrorCode::OFF));

        rcc.cfgr = word(CFGR::SWS::PLL1);
        assert_eq!(ClockTree::from_registers(&rcc, None), Err(ErrorCode::OFF));

        rcc.cfgr = 0b101 << 3;
        assert_eq!(ClockTree::from_registers(&rcc, None), Err(ErrorCode::INVAL));
    }

    #[test]
    fn latency_table() {
        let latency = |mhz, scale| flash_latency(mhz * MHZ, scale);
        assert_eq!(
            latency(240, VoltageScale::VOS0),
            Ok(FlashLatency {
                wait_states: 4,
                programming_delay: 2
            })
        );
        assert_eq!(latency(240, VoltageScale::VOS1), Err(ErrorCode::INVAL));
        assert_eq!(
            latency(70, VoltageScale::VOS1),
            Ok(FlashLatency {
                wait_states: 0,
                programming_delay: 0
            })
        );
        assert_eq!(latency(71, VoltageScale::VOS1).map(|l| l.wait_states), Ok(1));
        assert_eq!(latency(200, VoltageScale::VOS2).map(|l| l.wait_states), Ok(3));
        assert_eq!(latency(200, VoltageScale::VOS3).map(|l| l.wait_states), Ok(4));
        assert_eq!(latency(226, VoltageScale::VOS3), Err(ErrorCode::INVAL));
    }
}
