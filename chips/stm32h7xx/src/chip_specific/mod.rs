// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Chip-specific constants.
//!
//! The members of the family share one register map but differ in flash
//! size and bank count. Drivers that care take a `ChipSpecs` type
//! parameter instead of a cargo feature.

pub mod chip_specs;

pub use chip_specs::{ChipSpecs, Stm32h743Specs, Stm32h750Specs};
