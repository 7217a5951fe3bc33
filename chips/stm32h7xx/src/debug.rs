// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Placement of the CoreSight components on STM32H7.
//!
//! The Cortex-M7 private components (ITM, DWT, FPB, DCB) sit at their
//! architectural addresses and are reused from `coresight::ppb`. The
//! components listed here live either on the Cortex-M7 external PPB
//! (ETM, CTI, CSTF, ETF, TPIU) or on the APB-D system debug bus
//! (SWO, SWTF), which the core reaches at `0x5C00_0000` and a debugger at
//! `0xE00E_0000`.
//!
//! Trace leaves the core through two funnels:
//!
//! ```text
//! ITM --> CSTF port 1 --+--> ETF --> TPIU
//! ETM --> CSTF port 0 --'    |
//!                            `--> SWTF port 0 --> SWO
//! ```

use coresight::cti::CtiRegisters;
use coresight::etm::EtmRegisters;
use coresight::funnel::{Funnel, FunnelRegisters};
use coresight::rom_table::{self, DiscoveredComponent, RomTableRegisters};
use coresight::swo::{Swo, SwoRegisters};
use coresight::tmc::TmcRegisters;
use coresight::tpiu::{SwoProtocol, TpiuRegisters};
use regmap::access::MemoryAccess;
use regmap::address::register_ptr;
use regmap::{ErrorCode, StaticRef};

use crate::dbgmcu::Dbgmcu;
use crate::memory_map;

pub use coresight::ppb::{DCB, DWT, FPB, ITM};

pub const ETM: StaticRef<EtmRegisters> = unsafe { register_ptr(memory_map::ETM_BASE) };
pub const CTI_CM7: StaticRef<CtiRegisters> = unsafe { register_ptr(memory_map::CTI_CM7_BASE) };
pub const CSTF: StaticRef<FunnelRegisters> = unsafe { register_ptr(memory_map::CSTF_BASE) };
/// Embedded trace FIFO, a TMC in FIFO configuration
pub const ETF: StaticRef<TmcRegisters> = unsafe { register_ptr(memory_map::ETF_BASE) };
pub const TPIU: StaticRef<TpiuRegisters> = unsafe { register_ptr(memory_map::TPIU_BASE) };
pub const SWO: StaticRef<SwoRegisters> = unsafe { register_ptr(memory_map::SWO_BASE) };
pub const SWTF: StaticRef<FunnelRegisters> = unsafe { register_ptr(memory_map::SWTF_BASE) };

pub const CM7_ROM_TABLE: StaticRef<RomTableRegisters> =
    unsafe { register_ptr(memory_map::CM7_ROM_TABLE_BASE) };
pub const MCU_ROM_TABLE: StaticRef<RomTableRegisters> =
    unsafe { register_ptr(memory_map::MCU_ROM_TABLE_BASE) };

/// Where the trace stream is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceSink {
    /// Single-wire output, ITM only
    Swo,
    /// Parallel trace port
    Tpiu,
    /// On-chip trace memory, drained by the debugger
    TraceMemory,
}

impl TraceSink {
    /// Slave ports to enable on (CSTF, SWTF).
    pub const fn funnel_ports(self) -> (u8, u8) {
        match self {
            TraceSink::Swo => (0b00, 0b01),
            TraceSink::Tpiu | TraceSink::TraceMemory => (0b10, 0b00),
        }
    }
}

/// Program both funnels so that trace reaches `sink`.
pub fn route_trace(cstf: &Funnel, swtf: &Funnel, sink: TraceSink) {
    let (cstf_ports, swtf_ports) = sink.funnel_ports();
    cstf.enable_ports(cstf_ports);
    swtf.enable_ports(swtf_ports);
}

/// Turn on the trace clock, route trace to the SWO pin and set its baud
/// rate. `trace_clock_hz` is the frequency of the trace clock (the D3
/// domain clock by default).
pub fn enable_swo_trace(
    dbgmcu: &Dbgmcu,
    cstf: &Funnel,
    swtf: &Funnel,
    swo: &Swo,
    trace_clock_hz: u32,
    baud_hz: u32,
) -> Result<(), ErrorCode> {
    dbgmcu.enable_trace_clock();
    route_trace(cstf, swtf, TraceSink::Swo);
    swo.configure(trace_clock_hz, baud_hz, SwoProtocol::Nrz)
}

/// Walk the system ROM table as seen from the debug port and report every
/// component found. Returns how many were visited.
pub fn discover<M, F>(mem: &M, visitor: &mut F) -> Result<usize, ErrorCode>
where
    M: MemoryAccess,
    F: FnMut(&DiscoveredComponent),
{
    rom_table::walk(mem, memory_map::SYSTEM_ROM_TABLE_DEBUG_BASE as u32, visitor)
}
