// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Clock tree arithmetic.

pub mod pll;
pub mod tree;

pub use pll::{Pll, PllConfig};
pub use tree::{flash_latency, ClockTree, PllOutputs};

pub const MHZ: u32 = 1_000_000;

/// HSI frequency before HSIDIV
pub const HSI_FREQUENCY_HZ: u32 = 64 * MHZ;
pub const CSI_FREQUENCY_HZ: u32 = 4 * MHZ;
pub const HSI48_FREQUENCY_HZ: u32 = 48 * MHZ;
pub const LSI_FREQUENCY_HZ: u32 = 32_000;
pub const LSE_FREQUENCY_HZ: u32 = 32_768;
