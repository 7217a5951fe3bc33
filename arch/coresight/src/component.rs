// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! CoreSight component management registers and identification.
//!
//! Every CoreSight component occupies a 4 KiB window whose last 256 bytes
//! (offsets 0xF00 to 0xFFF) hold the same set of management registers:
//! integration mode, claim tags, the software lock, authentication status,
//! device architecture/type and the peripheral and component ID registers.
//! [`ComponentRegisters`] describes that window relative to 0xF00 and is
//! embedded at offset 0xF00 by every component block in this crate.
//!
//! <https://developer.arm.com/documentation/ihi0029/latest>

use core::fmt;

use regmap::access::MemoryAccess;
use regmap::registers::interfaces::{Readable, Writeable};
use regmap::registers::{register_bitfields, register_structs};
use regmap::registers::{LocalRegisterCopy, ReadOnly, ReadWrite, WriteOnly};
use regmap::{ErrorCode, StaticRef};

/// Value written to LAR to unlock write access to a component.
pub const LAR_KEY: u32 = 0xC5AC_CE55;

/// Offset of the management window inside a component.
pub const MANAGEMENT_OFFSET: u32 = 0xF00;

const PIDR4_OFFSET: u32 = 0xFD0;
const PIDR0_OFFSET: u32 = 0xFE0;
const CIDR0_OFFSET: u32 = 0xFF0;
const DEVARCH_OFFSET: u32 = 0xFBC;
const DEVTYPE_OFFSET: u32 = 0xFCC;

register_structs! {
    /// CoreSight management registers, offsets relative to 0xF00.
    pub ComponentRegisters {
        /// Integration Mode Control Register
        (0x00 => pub itctrl: ReadWrite<u32, ITCTRL::Register>),
        (0x04 => _reserved0),
        /// Claim Tag Set Register
        (0xA0 => pub claimset: ReadWrite<u32, CLAIM::Register>),
        /// Claim Tag Clear Register
        (0xA4 => pub claimclr: ReadWrite<u32, CLAIM::Register>),
        /// Device Affinity Registers
        (0xA8 => pub devaff0: ReadOnly<u32>),
        (0xAC => pub devaff1: ReadOnly<u32>),
        /// Software Lock Access Register
        (0xB0 => pub lar: WriteOnly<u32>),
        /// Software Lock Status Register
        (0xB4 => pub lsr: ReadOnly<u32, LSR::Register>),
        /// Authentication Status Register
        (0xB8 => pub authstatus: ReadOnly<u32, AUTHSTATUS::Register>),
        /// Device Architecture Register
        (0xBC => pub devarch: ReadOnly<u32, DEVARCH::Register>),
        /// Device Configuration Registers, component specific
        (0xC0 => pub devid2: ReadOnly<u32>),
        (0xC4 => pub devid1: ReadOnly<u32>),
        (0xC8 => pub devid: ReadOnly<u32>),
        /// Device Type Identifier Register (MEMTYPE in ROM tables)
        (0xCC => pub devtype: ReadOnly<u32, DEVTYPE::Register>),
        /// Peripheral Identification Registers 4-7
        (0xD0 => pub pidr4: ReadOnly<u32, PIDR4::Register>),
        (0xD4 => pub pidr5: ReadOnly<u32>),
        (0xD8 => pub pidr6: ReadOnly<u32>),
        (0xDC => pub pidr7: ReadOnly<u32>),
        /// Peripheral Identification Registers 0-3
        (0xE0 => pub pidr0: ReadOnly<u32, PIDR0::Register>),
        (0xE4 => pub pidr1: ReadOnly<u32, PIDR1::Register>),
        (0xE8 => pub pidr2: ReadOnly<u32, PIDR2::Register>),
        (0xEC => pub pidr3: ReadOnly<u32, PIDR3::Register>),
        /// Component Identification Registers 0-3
        (0xF0 => pub cidr0: ReadOnly<u32, CIDR0::Register>),
        (0xF4 => pub cidr1: ReadOnly<u32, CIDR1::Register>),
        (0xF8 => pub cidr2: ReadOnly<u32, CIDR2::Register>),
        (0xFC => pub cidr3: ReadOnly<u32, CIDR3::Register>),
        (0x100 => @END),
    }
}

register_bitfields![u32,
    pub ITCTRL [
        /// Integration mode enable
        IME OFFSET(0) NUMBITS(1) []
    ],
    pub CLAIM [
        /// One bit per claim tag
        TAGS OFFSET(0) NUMBITS(8) []
    ],
    pub LSR [
        /// Software lock implemented
        SLI OFFSET(0) NUMBITS(1) [],
        /// Software lock status, 1 when locked
        SLK OFFSET(1) NUMBITS(1) [],
        /// Not 32-bit; always 0
        NTT OFFSET(2) NUMBITS(1) []
    ],
    pub AUTHSTATUS [
        /// Non-secure invasive debug
        NSID OFFSET(0) NUMBITS(2) [],
        /// Non-secure non-invasive debug
        NSNID OFFSET(2) NUMBITS(2) [],
        /// Secure invasive debug
        SID OFFSET(4) NUMBITS(2) [],
        /// Secure non-invasive debug
        SNID OFFSET(6) NUMBITS(2) []
    ],
    pub DEVARCH [
        ARCHID OFFSET(0) NUMBITS(16) [],
        REVISION OFFSET(16) NUMBITS(4) [],
        /// Set when DEVARCH is implemented
        PRESENT OFFSET(20) NUMBITS(1) [],
        /// JEP106 code of the architect
        ARCHITECT OFFSET(21) NUMBITS(11) []
    ],
    pub DEVTYPE [
        MAJOR OFFSET(0) NUMBITS(4) [
            Miscellaneous = 0,
            TraceSink = 1,
            TraceLink = 2,
            TraceSource = 3,
            DebugControl = 4,
            DebugLogic = 5,
            PerformanceMonitor = 6
        ],
        SUB OFFSET(4) NUMBITS(4) []
    ],
    pub PIDR0 [
        PART_0 OFFSET(0) NUMBITS(8) []
    ],
    pub PIDR1 [
        PART_1 OFFSET(0) NUMBITS(4) [],
        DES_0 OFFSET(4) NUMBITS(4) []
    ],
    pub PIDR2 [
        DES_1 OFFSET(0) NUMBITS(3) [],
        /// Set when the designer is identified by a JEP106 code
        JEDEC OFFSET(3) NUMBITS(1) [],
        REVISION OFFSET(4) NUMBITS(4) []
    ],
    pub PIDR3 [
        CMOD OFFSET(0) NUMBITS(4) [],
        REVAND OFFSET(4) NUMBITS(4) []
    ],
    pub PIDR4 [
        /// JEP106 continuation code
        DES_2 OFFSET(0) NUMBITS(4) [],
        /// log2 of the number of 4 KiB blocks occupied
        SIZE OFFSET(4) NUMBITS(4) []
    ],
    pub CIDR0 [
        PRMBL_0 OFFSET(0) NUMBITS(8) []
    ],
    pub CIDR1 [
        PRMBL_1 OFFSET(0) NUMBITS(4) [],
        CLASS OFFSET(4) NUMBITS(4) [
            GenericVerification = 0x0,
            RomTable = 0x1,
            CoreSight = 0x9,
            PeripheralTestBlock = 0xB,
            GenericIp = 0xE,
            PrimeCell = 0xF
        ]
    ],
    pub CIDR2 [
        PRMBL_2 OFFSET(0) NUMBITS(8) []
    ],
    pub CIDR3 [
        PRMBL_3 OFFSET(0) NUMBITS(8) []
    ]
];

/// Component class from CIDR1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentClass {
    GenericVerification,
    RomTable,
    CoreSight,
    PeripheralTestBlock,
    GenericIp,
    PrimeCell,
}

/// Decoded CIDR0-3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentId {
    pub class: ComponentClass,
}

impl ComponentId {
    /// Decode the four component ID registers, low byte of each word.
    pub fn from_cidr(cidr: [u32; 4]) -> Result<ComponentId, ErrorCode> {
        let cidr0 = LocalRegisterCopy::<u32, CIDR0::Register>::new(cidr[0]);
        let cidr1 = LocalRegisterCopy::<u32, CIDR1::Register>::new(cidr[1]);
        let cidr2 = LocalRegisterCopy::<u32, CIDR2::Register>::new(cidr[2]);
        let cidr3 = LocalRegisterCopy::<u32, CIDR3::Register>::new(cidr[3]);

        if cidr0.read(CIDR0::PRMBL_0) != 0x0D
            || cidr1.read(CIDR1::PRMBL_1) != 0x0
            || cidr2.read(CIDR2::PRMBL_2) != 0x05
            || cidr3.read(CIDR3::PRMBL_3) != 0xB1
        {
            return Err(ErrorCode::INVAL);
        }

        let class = match cidr1.read_as_enum(CIDR1::CLASS) {
            Some(CIDR1::CLASS::Value::GenericVerification) => ComponentClass::GenericVerification,
            Some(CIDR1::CLASS::Value::RomTable) => ComponentClass::RomTable,
            Some(CIDR1::CLASS::Value::CoreSight) => ComponentClass::CoreSight,
            Some(CIDR1::CLASS::Value::PeripheralTestBlock) => ComponentClass::PeripheralTestBlock,
            Some(CIDR1::CLASS::Value::GenericIp) => ComponentClass::GenericIp,
            Some(CIDR1::CLASS::Value::PrimeCell) => ComponentClass::PrimeCell,
            None => return Err(ErrorCode::NOSUPPORT),
        };
        Ok(ComponentId { class })
    }

    /// Read and decode the component ID of the component at `base`.
    pub fn read<M: MemoryAccess>(mem: &M, base: u32) -> Result<ComponentId, ErrorCode> {
        Self::from_cidr(mem.read_words::<4>(base.wrapping_add(CIDR0_OFFSET))?)
    }
}

/// JEP106 manufacturer code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Jep106 {
    pub continuation: u8,
    pub identity: u8,
}

impl Jep106 {
    pub const ARM: Jep106 = Jep106 {
        continuation: 4,
        identity: 0x3B,
    };
    pub const STMICROELECTRONICS: Jep106 = Jep106 {
        continuation: 0,
        identity: 0x20,
    };

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Jep106::ARM => Some("ARM Ltd"),
            Jep106::STMICROELECTRONICS => Some("STMicroelectronics"),
            _ => None,
        }
    }
}

/// Decoded PIDR0-7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralId {
    pub part: u16,
    /// `None` for legacy parts that predate JEP106 identification.
    pub designer: Option<Jep106>,
    pub revision: u8,
    pub customer_modified: u8,
    pub revand: u8,
    /// log2 of the number of 4 KiB blocks occupied by the component
    pub size: u8,
}

impl PeripheralId {
    /// Decode the peripheral ID registers given in the order PIDR0..PIDR7.
    pub fn from_pidr(pidr: [u32; 8]) -> PeripheralId {
        let pidr0 = LocalRegisterCopy::<u32, PIDR0::Register>::new(pidr[0]);
        let pidr1 = LocalRegisterCopy::<u32, PIDR1::Register>::new(pidr[1]);
        let pidr2 = LocalRegisterCopy::<u32, PIDR2::Register>::new(pidr[2]);
        let pidr3 = LocalRegisterCopy::<u32, PIDR3::Register>::new(pidr[3]);
        let pidr4 = LocalRegisterCopy::<u32, PIDR4::Register>::new(pidr[4]);

        let part = pidr0.read(PIDR0::PART_0) | (pidr1.read(PIDR1::PART_1) << 8);
        let designer = if pidr2.is_set(PIDR2::JEDEC) {
            Some(Jep106 {
                continuation: pidr4.read(PIDR4::DES_2) as u8,
                identity: (pidr1.read(PIDR1::DES_0) | (pidr2.read(PIDR2::DES_1) << 4)) as u8,
            })
        } else {
            None
        };

        PeripheralId {
            part: part as u16,
            designer,
            revision: pidr2.read(PIDR2::REVISION) as u8,
            customer_modified: pidr3.read(PIDR3::CMOD) as u8,
            revand: pidr3.read(PIDR3::REVAND) as u8,
            size: pidr4.read(PIDR4::SIZE) as u8,
        }
    }

    /// Read and decode the peripheral ID of the component at `base`.
    pub fn read<M: MemoryAccess>(mem: &M, base: u32) -> Result<PeripheralId, ErrorCode> {
        let high = mem.read_words::<4>(base.wrapping_add(PIDR4_OFFSET))?;
        let low = mem.read_words::<4>(base.wrapping_add(PIDR0_OFFSET))?;
        Ok(Self::from_pidr([
            low[0], low[1], low[2], low[3], high[0], high[1], high[2], high[3],
        ]))
    }

    /// Bytes of address space occupied by the component.
    pub fn size_bytes(&self) -> u32 {
        4096u32 << self.size
    }

    /// Name of well known ARM parts.
    pub fn part_name(&self) -> Option<&'static str> {
        if self.designer != Some(Jep106::ARM) {
            return None;
        }
        match self.part {
            0x906 => Some("CTI"),
            0x908 => Some("CSTF"),
            0x912 => Some("TPIU"),
            0x914 => Some("SWO"),
            0x961 => Some("TMC"),
            0x975 => Some("ETM-M7"),
            _ => None,
        }
    }
}

/// Decoded DEVARCH register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DevArch {
    pub architect: u16,
    pub revision: u8,
    pub archid: u16,
}

impl DevArch {
    /// ARCHID of a class 0x9 ROM table.
    pub const ROM_TABLE_ARCHID: u16 = 0x0AF7;
    /// JEP106 code of ARM as encoded in ARCHITECT.
    pub const ARM_ARCHITECT: u16 = 0x23B;

    /// `None` when the PRESENT bit is clear.
    pub fn decode(word: u32) -> Option<DevArch> {
        let devarch = LocalRegisterCopy::<u32, DEVARCH::Register>::new(word);
        if !devarch.is_set(DEVARCH::PRESENT) {
            return None;
        }
        Some(DevArch {
            architect: devarch.read(DEVARCH::ARCHITECT) as u16,
            revision: devarch.read(DEVARCH::REVISION) as u8,
            archid: devarch.read(DEVARCH::ARCHID) as u16,
        })
    }

    pub fn read<M: MemoryAccess>(mem: &M, base: u32) -> Result<Option<DevArch>, ErrorCode> {
        Ok(Self::decode(mem.read_word(base.wrapping_add(DEVARCH_OFFSET))?))
    }

    pub fn is_rom_table(&self) -> bool {
        self.architect == Self::ARM_ARCHITECT && self.archid == Self::ROM_TABLE_ARCHID
    }
}

/// Decoded DEVTYPE register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DevType {
    pub major: u8,
    pub sub: u8,
}

impl DevType {
    pub fn decode(word: u32) -> DevType {
        let devtype = LocalRegisterCopy::<u32, DEVTYPE::Register>::new(word);
        DevType {
            major: devtype.read(DEVTYPE::MAJOR) as u8,
            sub: devtype.read(DEVTYPE::SUB) as u8,
        }
    }

    pub fn read<M: MemoryAccess>(mem: &M, base: u32) -> Result<DevType, ErrorCode> {
        Ok(Self::decode(mem.read_word(base.wrapping_add(DEVTYPE_OFFSET))?))
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part_name() {
            Some(name) => write!(f, "{} (part {:#05x}, rev {})", name, self.part, self.revision),
            None => write!(f, "part {:#05x}, rev {}", self.part, self.revision),
        }?;
        if let Some(designer) = self.designer {
            match designer.name() {
                Some(name) => write!(f, ", {}", name),
                None => write!(
                    f,
                    ", JEP106 {}:{:#04x}",
                    designer.continuation, designer.identity
                ),
            }?;
        }
        Ok(())
    }
}

/// Management operations shared by all components.
pub struct Component {
    registers: StaticRef<ComponentRegisters>,
}

impl Component {
    pub const fn new(registers: StaticRef<ComponentRegisters>) -> Component {
        Component { registers }
    }

    /// Unlock write access to the component's other registers.
    pub fn unlock(&self) {
        self.registers.lar.set(LAR_KEY);
    }

    /// Re-enable the software lock.
    pub fn lock(&self) {
        self.registers.lar.set(0);
    }

    /// Whether writes to the component are currently ignored.
    pub fn is_locked(&self) -> bool {
        self.registers.lsr.is_set(LSR::SLI) && self.registers.lsr.is_set(LSR::SLK)
    }

    /// Set claim tag bits.
    pub fn claim(&self, tags: u32) {
        self.registers.claimset.write(CLAIM::TAGS.val(tags));
    }

    /// Clear claim tag bits.
    pub fn release(&self, tags: u32) {
        self.registers.claimclr.write(CLAIM::TAGS.val(tags));
    }

    /// Claim tags currently set.
    pub fn claimed(&self) -> u32 {
        self.registers.claimclr.read(CLAIM::TAGS)
    }

    pub fn component_id(&self) -> Result<ComponentId, ErrorCode> {
        let r = &self.registers;
        ComponentId::from_cidr([r.cidr0.get(), r.cidr1.get(), r.cidr2.get(), r.cidr3.get()])
    }

    pub fn peripheral_id(&self) -> PeripheralId {
        let r = &self.registers;
        PeripheralId::from_pidr([
            r.pidr0.get(),
            r.pidr1.get(),
            r.pidr2.get(),
            r.pidr3.get(),
            r.pidr4.get(),
            r.pidr5.get(),
            r.pidr6.get(),
            r.pidr7.get(),
        ])
    }

    pub fn dev_type(&self) -> DevType {
        DevType::decode(self.registers.devtype.get())
    }

    pub fn dev_arch(&self) -> Option<DevArch> {
        DevArch::decode(self.registers.devarch.get())
    }
}
