// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! PLL divider arithmetic.
//!
//! Each of the three PLLs divides its input by `M`, multiplies the result
//! (the reference clock) by `N + FRACN / 2^13` in the VCO, and divides the
//! VCO output by `P`, `Q` and `R` to produce up to three outputs:
//!
//! ```text
//! ref = input / M                    1 MHz ..= 16 MHz
//! vco = ref * (N + FRACN / 8192)     150 ..= 420 MHz (medium)
//!                                    192 ..= 960 MHz (wide)
//! pllx_p = vco / P, pllx_q = vco / Q, pllx_r = vco / R
//! ```

use regmap::ErrorCode;

use crate::clocks::MHZ;

/// Denominator of the fractional part of the multiplication factor.
pub const FRACN_DENOMINATOR: u32 = 1 << 13;

pub const M_MAX: u32 = 63;
pub const N_MIN: u32 = 4;
pub const N_MAX: u32 = 512;
pub const DIV_MAX: u32 = 128;

pub const REFERENCE_MIN_HZ: u32 = MHZ;
pub const REFERENCE_MAX_HZ: u32 = 16 * MHZ;
pub const VCO_WIDE_MIN_HZ: u32 = 192 * MHZ;
pub const VCO_WIDE_MAX_HZ: u32 = 960 * MHZ;
pub const VCO_MEDIUM_MIN_HZ: u32 = 150 * MHZ;
pub const VCO_MEDIUM_MAX_HZ: u32 = 420 * MHZ;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pll {
    PLL1 = 0,
    PLL2 = 1,
    PLL3 = 2,
}

impl Pll {
    pub const ALL: [Pll; 3] = [Pll::PLL1, Pll::PLL2, Pll::PLL3];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Reference clock range, the RGE field of PLLCFGR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllInputRange {
    /// 1 to 2 MHz
    Range1 = 0,
    /// 2 to 4 MHz
    Range2 = 1,
    /// 4 to 8 MHz
    Range4 = 2,
    /// 8 to 16 MHz
    Range8 = 3,
}

impl PllInputRange {
    pub fn for_reference(reference_hz: u32) -> Option<PllInputRange> {
        match reference_hz {
            f if f < REFERENCE_MIN_HZ || f > REFERENCE_MAX_HZ => None,
            f if f < 2 * MHZ => Some(PllInputRange::Range1),
            f if f < 4 * MHZ => Some(PllInputRange::Range2),
            f if f < 8 * MHZ => Some(PllInputRange::Range4),
            _ => Some(PllInputRange::Range8),
        }
    }

    pub fn from_register(bits: u32) -> PllInputRange {
        match bits & 0b11 {
            0 => PllInputRange::Range1,
            1 => PllInputRange::Range2,
            2 => PllInputRange::Range4,
            _ => PllInputRange::Range8,
        }
    }
}

/// VCO range, the VCOSEL field of PLLCFGR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VcoRange {
    Wide = 0,
    Medium = 1,
}

impl VcoRange {
    /// The wide VCO needs at least a 2 MHz reference.
    pub fn for_reference(reference_hz: u32) -> VcoRange {
        if reference_hz < 2 * MHZ {
            VcoRange::Medium
        } else {
            VcoRange::Wide
        }
    }

    pub const fn limits_hz(self) -> (u32, u32) {
        match self {
            VcoRange::Wide => (VCO_WIDE_MIN_HZ, VCO_WIDE_MAX_HZ),
            VcoRange::Medium => (VCO_MEDIUM_MIN_HZ, VCO_MEDIUM_MAX_HZ),
        }
    }
}

/// Divider settings of one PLL. An output set to `None` is disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllConfig {
    pub m: u32,
    pub n: u32,
    pub p: Option<u32>,
    pub q: Option<u32>,
    pub r: Option<u32>,
    /// Fractional part of the multiplication factor, in 1/8192 steps.
    pub fracn: u32,
}

/// Range fields derived from a validated configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllSettings {
    pub input_range: PllInputRange,
    pub vco_range: VcoRange,
    pub vco_hz: u32,
}

impl PllConfig {
    /// Integer-N configuration with only the P output enabled.
    pub const fn integer(m: u32, n: u32, p: u32) -> PllConfig {
        PllConfig {
            m,
            n,
            p: Some(p),
            q: None,
            r: None,
            fracn: 0,
        }
    }

    pub fn reference_hz(&self, input_hz: u32) -> u32 {
        if self.m == 0 {
            0
        } else {
            input_hz / self.m
        }
    }

    pub fn vco_hz(&self, input_hz: u32) -> u32 {
        if self.m == 0 {
            return 0;
        }
        let factor = self.n as u64 * FRACN_DENOMINATOR as u64 + self.fracn as u64;
        let vco = input_hz as u64 * factor / (self.m as u64 * FRACN_DENOMINATOR as u64);
        vco.min(u32::MAX as u64) as u32
    }

    fn output_hz(&self, input_hz: u32, divider: Option<u32>) -> Option<u32> {
        match divider {
            Some(d) if d > 0 => Some(self.vco_hz(input_hz) / d),
            _ => None,
        }
    }

    pub fn p_hz(&self, input_hz: u32) -> Option<u32> {
        self.output_hz(input_hz, self.p)
    }

    pub fn q_hz(&self, input_hz: u32) -> Option<u32> {
        self.output_hz(input_hz, self.q)
    }

    pub fn r_hz(&self, input_hz: u32) -> Option<u32> {
        self.output_hz(input_hz, self.r)
    }

    /// Check the dividers against the limits of `pll` fed with `input_hz`.
    pub fn validate(&self, pll: Pll, input_hz: u32) -> Result<PllSettings, ErrorCode> {
        if self.m == 0 || self.m > M_MAX {
            return Err(ErrorCode::INVAL);
        }
        if self.n < N_MIN || self.n > N_MAX {
            return Err(ErrorCode::INVAL);
        }
        if self.fracn >= FRACN_DENOMINATOR {
            return Err(ErrorCode::INVAL);
        }
        for divider in [self.p, self.q, self.r].into_iter().flatten() {
            if divider == 0 || divider > DIV_MAX {
                return Err(ErrorCode::INVAL);
            }
        }
        // PLL1 P does not accept odd division factors other than 1.
        if let (Pll::PLL1, Some(p)) = (pll, self.p) {
            if p != 1 && p % 2 != 0 {
                return Err(ErrorCode::INVAL);
            }
        }

        let reference = self.reference_hz(input_hz);
        let input_range = PllInputRange::for_reference(reference).ok_or(ErrorCode::INVAL)?;
        let vco_range = VcoRange::for_reference(reference);
        let vco_hz = self.vco_hz(input_hz);
        let (min, max) = vco_range.limits_hz();
        if vco_hz < min || vco_hz > max {
            return Err(ErrorCode::INVAL);
        }
        Ok(PllSettings {
            input_range,
            vco_range,
            vco_hz,
        })
    }
}
