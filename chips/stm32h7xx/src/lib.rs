// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Register descriptions for the STM32H742/743/750/753 family (RM0433).
//!
//! Covers the blocks needed to bring the part up and to trace it: reset and
//! clock control, power, the embedded flash interface, system configuration,
//! the debug MCU block, and the placement of the CoreSight components that
//! the [`coresight`] crate describes.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod chip_specific;
pub mod clocks;
pub mod dbgmcu;
pub mod debug;
pub mod flash;
pub mod memory_map;
pub mod pwr;
pub mod rcc;
pub mod syscfg;
