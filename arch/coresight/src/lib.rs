// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! ARM CoreSight debug and trace components.
//!
//! Register blocks and small drivers for the components found behind the
//! debug port of an ARMv7-M system: the processor-local units on the
//! Private Peripheral Bus (DCB, ITM, DWT, FPB, ETM) and the system trace
//! infrastructure (CTI, trace funnels, TMC, TPIU and SWO). Every block
//! carries the common management window described in [`component`], and
//! [`rom_table`] discovers which blocks exist.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod component;
pub mod cti;
pub mod dcb;
pub mod dwt;
pub mod etm;
pub mod fpb;
pub mod funnel;
pub mod itm;
pub mod ppb;
pub mod rom_table;
pub mod swo;
pub mod tmc;
pub mod tpiu;
