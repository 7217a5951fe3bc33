// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! CoreSight ROM tables and component discovery.
//!
//! A ROM table is a component whose body is a list of 32-bit entries, each
//! holding the signed offset of another component relative to the table.
//! Entries may point at further ROM tables, so the set of components
//! reachable from a debug port is a tree. [`walk`] visits that tree depth
//! first.
//!
//! Two table formats are understood:
//!
//! - class 0x1 tables, up to 960 entries, terminated by a zero word,
//! - class 0x9 tables (DEVARCH reports a ROM table), up to 512 entries,
//!   where an entry is present when bits [1:0] read 0b11.

use core::fmt;

use regmap::access::MemoryAccess;
use regmap::registers::{register_bitfields, register_structs, LocalRegisterCopy, ReadOnly};
use regmap::ErrorCode;

use crate::component::{
    ComponentClass, ComponentId, ComponentRegisters, DevArch, DevType, PeripheralId,
};

/// Deepest nesting level below the root table, which is at depth 0.
/// Components past it are reported as `SIZE`.
pub const MAX_DEPTH: usize = 8;

register_structs! {
    pub RomTableRegisters {
        (0x000 => pub entries: [ReadOnly<u32, ENTRY::Register>; 960]),
        (0xF00 => pub management: ComponentRegisters),
        (0x1000 => @END),
    }
}

register_bitfields![u32,
    pub ENTRY [
        PRESENT OFFSET(0) NUMBITS(1) [],
        /// 1 for the 32-bit entry format
        FORMAT OFFSET(1) NUMBITS(1) [],
        POWERIDVALID OFFSET(2) NUMBITS(1) [],
        POWERID OFFSET(4) NUMBITS(5) [],
        /// Signed offset of the component, in 4 KiB units
        ADDRESS_OFFSET OFFSET(12) NUMBITS(20) []
    ],
    /// DEVTYPE of a class 0x1 table is the MEMTYPE register.
    pub MEMTYPE [
        /// System memory is present on the bus holding the table
        SYSMEM OFFSET(0) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RomTableEntry {
    /// Zero word: no further entries.
    End,
    /// Entry with the present bit clear; later entries may still be present.
    NotPresent,
    Present {
        /// Absolute address of the component's 4 KiB window.
        address: u32,
        power_domain: Option<u8>,
    },
}

impl RomTableEntry {
    /// Decode a class 0x1 entry of the table at `table_base`.
    ///
    /// The 8-bit entry format is `NOSUPPORT`.
    pub fn decode(word: u32, table_base: u32) -> Result<RomTableEntry, ErrorCode> {
        if word == 0 {
            return Ok(RomTableEntry::End);
        }
        let entry = LocalRegisterCopy::<u32, ENTRY::Register>::new(word);
        if !entry.is_set(ENTRY::FORMAT) {
            return Err(ErrorCode::NOSUPPORT);
        }
        if !entry.is_set(ENTRY::PRESENT) {
            return Ok(RomTableEntry::NotPresent);
        }
        Ok(Self::present(entry, table_base))
    }

    /// Decode a class 0x9 entry of the table at `table_base`.
    pub fn decode_class9(word: u32, table_base: u32) -> RomTableEntry {
        if word == 0 {
            return RomTableEntry::End;
        }
        let entry = LocalRegisterCopy::<u32, ENTRY::Register>::new(word);
        if entry.is_set(ENTRY::PRESENT) && entry.is_set(ENTRY::FORMAT) {
            Self::present(entry, table_base)
        } else {
            RomTableEntry::NotPresent
        }
    }

    fn present(entry: LocalRegisterCopy<u32, ENTRY::Register>, table_base: u32) -> RomTableEntry {
        let offset = entry.get() & (ENTRY::ADDRESS_OFFSET.mask << ENTRY::ADDRESS_OFFSET.shift);
        let power_domain = if entry.is_set(ENTRY::POWERIDVALID) {
            Some(entry.read(ENTRY::POWERID) as u8)
        } else {
            None
        };
        RomTableEntry::Present {
            address: table_base.wrapping_add(offset),
            power_domain,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Class1,
    Class9,
}

impl TableFormat {
    pub const fn max_entries(&self) -> usize {
        match self {
            TableFormat::Class1 => 960,
            TableFormat::Class9 => 512,
        }
    }

    fn decode(&self, word: u32, table_base: u32) -> Result<RomTableEntry, ErrorCode> {
        match self {
            TableFormat::Class1 => RomTableEntry::decode(word, table_base),
            TableFormat::Class9 => Ok(RomTableEntry::decode_class9(word, table_base)),
        }
    }

    /// Format of the component at `base`, or `None` if it is not a table.
    fn detect<M: MemoryAccess>(
        mem: &M,
        base: u32,
        id: ComponentId,
    ) -> Result<Option<TableFormat>, ErrorCode> {
        match id.class {
            ComponentClass::RomTable => Ok(Some(TableFormat::Class1)),
            ComponentClass::CoreSight => match DevArch::read(mem, base)? {
                Some(arch) if arch.is_rom_table() => Ok(Some(TableFormat::Class9)),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

/// A ROM table reached through `MemoryAccess`.
pub struct RomTable<'a, M: MemoryAccess> {
    mem: &'a M,
    base: u32,
    format: TableFormat,
}

impl<'a, M: MemoryAccess> RomTable<'a, M> {
    /// Identify the table at `base`; `NODEVICE` if the component there is
    /// not a ROM table.
    pub fn read(mem: &'a M, base: u32) -> Result<RomTable<'a, M>, ErrorCode> {
        let id = ComponentId::read(mem, base)?;
        match TableFormat::detect(mem, base, id)? {
            Some(format) => Ok(RomTable { mem, base, format }),
            None => Err(ErrorCode::NODEVICE),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// MEMTYPE.SYSMEM of a class 0x1 table.
    pub fn has_system_memory(&self) -> Result<bool, ErrorCode> {
        let word = self.mem.read_word(self.base.wrapping_add(0xFCC))?;
        Ok(LocalRegisterCopy::<u32, MEMTYPE::Register>::new(word).is_set(MEMTYPE::SYSMEM))
    }

    /// Entries in table order, ending before the first zero word.
    pub fn entries(&self) -> Entries<'a, M> {
        Entries {
            mem: self.mem,
            base: self.base,
            format: self.format,
            index: 0,
            done: false,
        }
    }
}

pub struct Entries<'a, M: MemoryAccess> {
    mem: &'a M,
    base: u32,
    format: TableFormat,
    index: usize,
    done: bool,
}

impl<M: MemoryAccess> Iterator for Entries<'_, M> {
    type Item = Result<RomTableEntry, ErrorCode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.format.max_entries() {
            return None;
        }
        let address = self.base.wrapping_add(4 * self.index as u32);
        self.index += 1;

        let entry = self
            .mem
            .read_word(address)
            .and_then(|word| self.format.decode(word, self.base));
        match entry {
            Ok(RomTableEntry::End) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
            entry => Some(entry),
        }
    }
}

/// A component found while walking ROM tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveredComponent {
    pub address: u32,
    /// 0 for the root table.
    pub depth: usize,
    pub component_id: ComponentId,
    pub peripheral_id: PeripheralId,
    pub dev_type: DevType,
}

impl fmt::Display for DiscoveredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("  ")?;
        }
        write!(
            f,
            "{:#010x} {:?}: {}",
            self.address, self.component_id.class, self.peripheral_id
        )
    }
}

/// Visit every component reachable from the ROM table at `base`, the table
/// itself included, and return how many were visited.
///
/// Fails with `NODEVICE` if `base` is not a ROM table, with `SIZE` when
/// tables nest deeper than [`MAX_DEPTH`], and with the error of the first
/// read or identification that fails.
pub fn walk<M, F>(mem: &M, base: u32, visitor: &mut F) -> Result<usize, ErrorCode>
where
    M: MemoryAccess,
    F: FnMut(&DiscoveredComponent),
{
    RomTable::read(mem, base)?;
    visit(mem, base, 0, visitor)
}

fn visit<M, F>(mem: &M, address: u32, depth: usize, visitor: &mut F) -> Result<usize, ErrorCode>
where
    M: MemoryAccess,
    F: FnMut(&DiscoveredComponent),
{
    if depth > MAX_DEPTH {
        return Err(ErrorCode::SIZE);
    }

    let component_id = ComponentId::read(mem, address)?;
    visitor(&DiscoveredComponent {
        address,
        depth,
        component_id,
        peripheral_id: PeripheralId::read(mem, address)?,
        dev_type: DevType::read(mem, address)?,
    });

    let mut visited = 1;
    if let Some(format) = TableFormat::detect(mem, address, component_id)? {
        let table = RomTable {
            mem,
            base: address,
            format,
        };
        for entry in table.entries() {
            if let RomTableEntry::Present { address: child, .. } = entry? {
                visited += visit(mem, child, depth + 1, visitor)?;
            }
        }
    }
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::{arm_pidr, cidr};
    use core::mem::{offset_of, size_of};
    use regmap::field_specs;
    use regmap::layout::check_register;
    use std::collections::{BTreeMap, BTreeSet};
    use std::format;
    use std::vec::Vec;

    /// Sparse 4 KiB pages; words never written read as zero.
    #[derive(Default)]
    struct FakeBus {
        pages: BTreeSet<u32>,
        words: BTreeMap<u32, u32>,
    }

    impl FakeBus {
        fn component(&mut self, base: u32, class: u32, part: u16) {
            self.pages.insert(base);
            for (i, word) in cidr(class).iter().enumerate() {
                self.words.insert(base + 0xFF0 + 4 * i as u32, *word);
            }
            let pidr = arm_pidr(part, 0);
            for i in 0..4 {
                self.words.insert(base + 0xFE0 + 4 * i as u32, pidr[i as usize]);
                self.words.insert(base + 0xFD0 + 4 * i as u32, pidr[4 + i as usize]);
            }
        }

        fn entry(&mut self, table: u32, index: u32, word: u32) {
            self.words.insert(table + 4 * index, word);
        }
    }

    impl MemoryAccess for FakeBus {
        fn read_word(&self, address: u32) -> Result<u32, ErrorCode> {
            if address % 4 != 0 {
                return Err(ErrorCode::INVAL);
            }
            if !self.pages.contains(&(address & !0xFFF)) {
                return Err(ErrorCode::NOACK);
            }
            Ok(self.words.get(&address).copied().unwrap_or(0))
        }

        fn write_word(&self, _address: u32, _value: u32) -> Result<(), ErrorCode> {
            Err(ErrorCode::NOSUPPORT)
        }
    }

    fn offset_entry(table: u32, target: u32) -> u32 {
        (target.wrapping_sub(table) & 0xFFFF_F000) | 0b11
    }

    fn collect(bus: &FakeBus, base: u32) -> Result<Vec<(u32, usize)>, ErrorCode> {
        let mut found = Vec::new();
        walk(bus, base, &mut |c: &DiscoveredComponent| {
            found.push((c.address, c.depth))
        })?;
        Ok(found)
    }

    #[test]
    fn layout() {
        assert_eq!(size_of::<RomTableRegisters>(), 0x1000);
        assert_eq!(offset_of!(RomTableRegisters, management), 0xF00);
        assert_eq!(
            check_register(&field_specs!(ENTRY[
                PRESENT,
                FORMAT,
                POWERIDVALID,
                POWERID,
                ADDRESS_OFFSET
            ])),
            Ok(())
        );
    }

    #[test]
    fn entry_decoding() {
        assert_eq!(RomTableEntry::decode(0, 0xE00F_F000), Ok(RomTableEntry::End));
        assert_eq!(
            RomTableEntry::decode(0x0000_1002, 0xE00F_F000),
            Ok(RomTableEntry::NotPresent)
        );
        assert_eq!(
            RomTableEntry::decode(0x0000_1001, 0xE00F_F000),
            Err(ErrorCode::NOSUPPORT)
        );
        // Negative offset: 0xFFF0F003 from the Cortex-M7 PPB table.
        assert_eq!(
            RomTableEntry::decode(0xFFF0_F003, 0xE00F_F000),
            Ok(RomTableEntry::Present {
                address: 0xE000_E000,
                power_domain: None,
            })
        );
        assert_eq!(
            RomTableEntry::decode(0x0000_1037, 0xE00F_E000),
            Ok(RomTableEntry::Present {
                address: 0xE00F_F000,
                power_domain: Some(3),
            })
        );
    }

    #[test]
    fn class9_entry_decoding() {
        assert_eq!(
            RomTableEntry::decode_class9(0x0000_2003, 0x8000_0000),
            RomTableEntry::Present {
                address: 0x8000_2000,
                power_domain: None,
            }
        );
        assert_eq!(
            RomTableEntry::decode_class9(0x0000_2002, 0x8000_0000),
            RomTableEntry::NotPresent
        );
        assert_eq!(
            RomTableEntry::decode_class9(0x0000_2001, 0x8000_0000),
            RomTableEntry::NotPresent
        );
    }

    #[test]
    fn entries_stop_at_zero_word() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x1, 0x4C4);
        bus.entry(0x1000, 0, 0x0000_1003);
        bus.entry(0x1000, 1, 0x0000_2002);
        bus.entry(0x1000, 3, 0x0000_3003);

        let table = RomTable::read(&bus, 0x1000).unwrap();
        assert_eq!(table.format(), TableFormat::Class1);
        let entries: Vec<_> = table.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], Ok(RomTableEntry::NotPresent));
    }

    #[test]
    fn walks_nested_tables() {
        let mut bus = FakeBus::default();
        // Root table with a nested table and a funnel; nested table holds
        // an ETM and a CTI.
        bus.component(0x1000, 0x1, 0x4C7);
        bus.component(0x4000, 0x1, 0x4C4);
        bus.component(0x2000, 0x9, 0x908);
        bus.component(0x5000, 0x9, 0x975);
        bus.component(0x6000, 0x9, 0x906);
        bus.entry(0x1000, 0, offset_entry(0x1000, 0x4000));
        bus.entry(0x1000, 1, offset_entry(0x1000, 0x2000));
        bus.entry(0x4000, 0, offset_entry(0x4000, 0x5000));
        bus.entry(0x4000, 1, 0x0000_7002);
        bus.entry(0x4000, 2, offset_entry(0x4000, 0x6000));

        assert_eq!(
            collect(&bus, 0x1000),
            Ok(std::vec![
                (0x1000, 0),
                (0x4000, 1),
                (0x5000, 2),
                (0x6000, 2),
                (0x2000, 1)
            ])
        );
    }

    #[test]
    fn walks_class9_table() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x9, 0x4C7);
        bus.words.insert(0x1FBC, (0x23B << 21) | (1 << 20) | 0x0AF7);
        bus.component(0x3000, 0x9, 0x912);
        bus.entry(0x1000, 0, 0x0000_1001);
        bus.entry(0x1000, 1, 0x0000_2003);

        assert_eq!(collect(&bus, 0x1000), Ok(std::vec![(0x1000, 0), (0x3000, 1)]));
    }

    #[test]
    fn root_must_be_a_table() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x9, 0x975);
        assert_eq!(collect(&bus, 0x1000), Err(ErrorCode::NODEVICE));
    }

    #[test]
    fn bad_child_preamble_is_reported() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x1, 0x4C4);
        bus.pages.insert(0x2000);
        bus.entry(0x1000, 0, offset_entry(0x1000, 0x2000));
        assert_eq!(collect(&bus, 0x1000), Err(ErrorCode::INVAL));
    }

    #[test]
    fn unmapped_child_is_reported() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x1, 0x4C4);
        bus.entry(0x1000, 0, offset_entry(0x1000, 0x9000));
        assert_eq!(collect(&bus, 0x1000), Err(ErrorCode::NOACK));
    }

    #[test]
    fn self_referencing_table_hits_depth_limit() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x1, 0x4C4);
        bus.entry(0x1000, 0, 0x0000_0003);
        assert_eq!(collect(&bus, 0x1000), Err(ErrorCode::SIZE));
    }

    fn table_chain(levels: u32) -> FakeBus {
        let mut bus = FakeBus::default();
        for level in 0..levels {
            let base = 0x1000 * (level + 1);
            bus.component(base, 0x1, 0x4C4);
            if level + 1 < levels {
                bus.entry(base, 0, offset_entry(base, base + 0x1000));
            }
        }
        bus
    }

    #[test]
    fn depth_limit_counts_levels_below_root() {
        let deepest = MAX_DEPTH as u32 + 1;
        let found = collect(&table_chain(deepest), 0x1000).unwrap();
        assert_eq!(found.len(), MAX_DEPTH + 1);
        assert_eq!(found[MAX_DEPTH], (0x1000 * deepest, MAX_DEPTH));

        assert_eq!(
            collect(&table_chain(deepest + 1), 0x1000),
            Err(ErrorCode::SIZE)
        );
    }

    #[test]
    fn system_memory_flag() {
        let mut bus = FakeBus::default();
        bus.component(0x1000, 0x1, 0x4C4);
        bus.words.insert(0x1FCC, 1);
        assert_eq!(
            RomTable::read(&bus, 0x1000).and_then(|t| t.has_system_memory()),
            Ok(true)
        );
    }

    #[test]
    fn display_indents_by_depth() {
        let component = DiscoveredComponent {
            address: 0xE004_1000,
            depth: 2,
            component_id: ComponentId {
                class: ComponentClass::CoreSight,
            },
            peripheral_id: PeripheralId::from_pidr(arm_pidr(0x975, 1)),
            dev_type: DevType { major: 3, sub: 1 },
        };
        assert_eq!(
            format!("{}", component),
            "    0xe0041000 CoreSight: ETM-M7 (part 0x975, rev 1), ARM Ltd"
        );
    }
}
