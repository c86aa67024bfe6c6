extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate packed_struct;
extern crate packed_struct_codegen;
use packed_struct::prelude::*;

#[macro_use]
extern crate bitflags;

pub mod hexfile;
pub mod image;
pub mod isa;

bitflags! {
    pub struct Flags: u8 {
        const CARRY = 0b0001;
        const ZERO = 0b0010;
    }
}

impl Flags {
    pub fn from_alu(carry: bool, zero: bool) -> Flags {
        let mut flags = Flags::empty();
        flags.set(Flags::CARRY, carry);
        flags.set(Flags::ZERO, zero);
        flags
    }

    pub fn carry(&self) -> bool {
        self.contains(Flags::CARRY)
    }

    pub fn zero(&self) -> bool {
        self.contains(Flags::ZERO)
    }
}

/// Source driving the primary read bus.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum BusAR {
    Abxy = 0,
    D = 1,
    In = 2,
    T = 3,
    Ram = 4,
    Pc = 5,
    Sp = 6,
    Bp = 7,
}

/// Sink loaded from the primary bus. `ResetCycle` and `AdvancePcResetCycle`
/// load nothing and end the instruction.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum BusAW {
    None = 0,
    Abxy = 1,
    D = 2,
    Out = 3,
    AluT = 4,
    ResetCycle = 5,
    I = 6,
    Ram = 7,
    Pc = 8,
    Sp = 9,
    Bp = 10,
    Ma = 11,
    PcPlus = 12,
    SpPlus = 13,
    SpMinus = 14,
    AdvancePcResetCycle = 15,
}

impl BusAW {
    pub fn resets_cycle(&self) -> bool {
        matches!(self, BusAW::ResetCycle | BusAW::AdvancePcResetCycle)
    }
}

/// Secondary bus. Also picks the half of a 16-bit pair: `D` is the low
/// byte and `Ab` the high byte.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum BusB {
    Ab = 0,
    D = 1,
}

impl BusB {
    pub const HIGH: BusB = BusB::Ab;
    pub const LOW: BusB = BusB::D;

    pub fn is_low(&self) -> bool {
        *self == BusB::LOW
    }
}

/// Register pair driving the address bus. `Xy` puts Y on the high byte.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum BusC {
    Pc = 0,
    Ma = 1,
    Sp = 2,
    Xy = 3,
}

/// Arithmetic-mode select values. Every function also adds the carry in.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
pub enum ArithOp {
    A = 0b0000,
    MinusOne = 0b0011,
    AMinusBMinusOne = 0b0110,
    APlusB = 0b1001,
    APlusA = 0b1100,
    AMinusOne = 0b1111,
}

/// Logic-mode select values, the full 16-entry function table.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
pub enum LogicOp {
    NotA = 0b0000,
    Nor = 0b0001,
    NotAAndB = 0b0010,
    Zero = 0b0011,
    Nand = 0b0100,
    NotB = 0b0101,
    Xor = 0b0110,
    AAndNotB = 0b0111,
    NotAOrB = 0b1000,
    Xnor = 0b1001,
    B = 0b1010,
    And = 0b1011,
    One = 0b1100,
    AOrNotB = 0b1101,
    Or = 0b1110,
    A = 0b1111,
}

/// One control-store entry. Bits 0..=7 live in bank 0, bits 8..=15 in bank 1.
#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(PackedStruct)]
#[packed_struct(size_bytes = "2", endian = "lsb", bit_numbering = "lsb0")]
pub struct ControlWord {
    #[packed_field(bits = "0..=2", ty = "enum")]
    pub bus_ar: BusAR,
    #[packed_field(bits = "3..=6", ty = "enum")]
    pub bus_aw: BusAW,
    #[packed_field(bits = "7", ty = "enum")]
    pub bus_b: BusB,
    #[packed_field(bits = "8..=9", ty = "enum")]
    pub bus_c: BusC,
    #[packed_field(bits = "10..=13")]
    pub alu_select: Integer<u8, packed_bits::Bits::<4>>,
    #[packed_field(bits = "14")]
    pub alu_logic: bool,
    #[packed_field(bits = "15")]
    pub alu_carry_in: bool,
}

impl Default for ControlWord {
    /// The all-zero word: reads a register onto a bus nobody loads.
    fn default() -> ControlWord {
        ControlWord::transfer(BusAR::Abxy, BusAW::None)
    }
}

impl ControlWord {
    pub fn transfer(bus_ar: BusAR, bus_aw: BusAW) -> ControlWord {
        ControlWord {
            bus_ar,
            bus_aw,
            bus_b: BusB::Ab,
            bus_c: BusC::Pc,
            alu_select: 0u8.into(),
            alu_logic: false,
            alu_carry_in: false,
        }
    }

    /// Loads `T` with an arithmetic function of the read bus and bus B.
    pub fn arith(bus_ar: BusAR, bus_b: BusB, op: ArithOp, carry_in: bool) -> ControlWord {
        ControlWord {
            alu_select: (op as u8).into(),
            alu_carry_in: carry_in,
            bus_b,
            ..ControlWord::transfer(bus_ar, BusAW::AluT)
        }
    }

    /// Loads `T` with a logic function of the read bus and bus B.
    pub fn logic(bus_ar: BusAR, bus_b: BusB, op: LogicOp) -> ControlWord {
        ControlWord {
            alu_select: (op as u8).into(),
            alu_logic: true,
            bus_b,
            ..ControlWord::transfer(bus_ar, BusAW::AluT)
        }
    }

    pub fn with_b(self, bus_b: BusB) -> ControlWord {
        ControlWord { bus_b, ..self }
    }

    pub fn with_c(self, bus_c: BusC) -> ControlWord {
        ControlWord { bus_c, ..self }
    }

    pub fn alu_op(&self) -> u8 {
        *self.alu_select
    }

    pub fn is_idle(&self) -> bool {
        *self == ControlWord::default()
    }

    pub fn to_banks(&self) -> Result<(u8, u8), PackingError> {
        let bytes = self.pack()?;
        Ok((bytes[1], bytes[0]))
    }

    pub fn from_banks(bank0: u8, bank1: u8) -> Result<ControlWord, PackingError> {
        ControlWord::unpack(&[bank1, bank0])
    }
}

pub const INSTRUCTION_QUANTITY: usize = 256;
pub const INSTRUCTION_CYCLE_QUANTITY: usize = 16;
pub const UROM_SIZE: usize = 32768;

const CYCLE_MASK: u8 = 0x0F;

/// Control-store address of `{opcode, cycle, carry, zero}`. Both the
/// generator and the sequencer go through here.
pub fn urom_address(opcode: u8, cycle: u8, carry: bool, zero: bool) -> usize {
    (opcode as usize) * 4 * INSTRUCTION_CYCLE_QUANTITY
        + ((cycle & CYCLE_MASK) as usize) * 4
        + (carry as usize) * 2
        + (zero as usize)
}

pub const MEMORY_PAGE_SIZE: usize = 256;
pub const MEMORY_PAGE_QUANTITY: usize = 256;
pub const MEMORY_SIZE: usize = MEMORY_PAGE_SIZE * MEMORY_PAGE_QUANTITY;

pub const BIOS_SIZE: usize = 2048;
pub const MEMORY_BIOS_ADDRESS: u16 = 0x0000;
pub const MEMORY_OS_ADDRESS: u16 = 0x0800;
pub const MEMORY_APP_ADDRESS: u16 = 0x2000;
pub const MEMORY_SP_ADDRESS: u16 = 0xF000;

pub const FREQUENCY: u64 = 1_000_000;
pub const INTERVAL_MS: u64 = 125;
pub const TICKS_PER_INTERVAL: u64 = FREQUENCY * INTERVAL_MS / 1000;
pub const CLOCK_INTERVAL_MS: u64 = 125;
pub const CLOCK_TICKS_PER_INTERVAL: u64 = FREQUENCY * CLOCK_INTERVAL_MS / 1000;

pub const IN_DATA_MASK: u8 = 0x0F;
pub const IN_CONTROL_MASK: u8 = 0xF0;
pub const IN_CLOCK_BIT: u8 = 1 << 4;
pub const IN_KEYBOARD_READY_BIT: u8 = 1 << 5;
pub const IN_RS232_READY_BIT: u8 = 1 << 6;
pub const IN_OPERATION_COMPLETE_BIT: u8 = 1 << 7;

pub const OUT_DATA_MASK: u8 = 0x0F;
pub const OUT_CONTROL_MASK: u8 = 0xF0;
pub const OUT_HALF_BIT: u8 = 1 << 4;
pub const OUT_MODE_BIT: u8 = 1 << 5;
pub const OUT_RW_BIT: u8 = 1 << 6;
pub const OUT_DATA_READY_BIT: u8 = 1 << 7;

/// Opcode bit selecting the flag bank an instruction reads and writes.
pub const INSTRUCTION_FLAG_BANK_MASK: u8 = 0b1000_0000;

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
}

impl Register {
    pub fn from_field(bits: u8) -> Register {
        match bits & 0b11 {
            0 => Register::A,
            1 => Register::B,
            2 => Register::X,
            _ => Register::Y,
        }
    }

    /// A and B are the only registers a narrow field can name.
    pub fn is_narrow(&self) -> bool {
        matches!(self, Register::A | Register::B)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    #[test]
    fn pack() {
        let fetch = ControlWord::transfer(BusAR::Ram, BusAW::I);
        assert_eq!((0x34, 0x00), fetch.to_banks().unwrap());

        let add = ControlWord {
            bus_ar: BusAR::Abxy,
            bus_aw: BusAW::AluT,
            bus_b: BusB::D,
            bus_c: BusC::Xy,
            alu_select: (ArithOp::APlusB as u8).into(),
            alu_logic: false,
            alu_carry_in: true,
        };
        assert_eq!((0xA0, 0xA7), add.to_banks().unwrap());
    }

    #[test]
    fn idle_is_zero() {
        assert_eq!((0, 0), ControlWord::default().to_banks().unwrap());
        assert!(ControlWord::from_banks(0, 0).unwrap().is_idle());
    }

    #[test]
    fn every_pattern_decodes() {
        for bank0 in 0..=0xFFu8 {
            for bank1 in 0..=0xFFu8 {
                let word = ControlWord::from_banks(bank0, bank1).unwrap();
                assert_eq!((bank0, bank1), word.to_banks().unwrap());
            }
        }
    }

    #[test]
    fn bus_half_aliases() {
        assert_eq!(BusB::D, BusB::LOW);
        assert_eq!(BusB::Ab, BusB::HIGH);
        assert!(BusB::LOW.is_low());
    }

    #[test]
    fn address_layout() {
        assert_eq!(0, urom_address(0, 0, false, false));
        assert_eq!(1, urom_address(0, 0, false, true));
        assert_eq!(2, urom_address(0, 0, true, false));
        assert_eq!(4, urom_address(0, 1, false, false));
        assert_eq!(64, urom_address(1, 0, false, false));
        assert_eq!(urom_address(0xFF, 0, true, true) + 63, urom_address(0xFF, 15, true, true) + 3);
        assert!(urom_address(0xFF, 15, true, true) < UROM_SIZE);
        assert_eq!(urom_address(3, 16, false, false), urom_address(3, 0, false, false));
    }

    #[test]
    fn address_is_unique() {
        let mut seen = vec![false; UROM_SIZE];
        for opcode in 0..=0xFFu8 {
            for cycle in 0..INSTRUCTION_CYCLE_QUANTITY as u8 {
                for (carry, zero) in [(false, false), (false, true), (true, false), (true, true)] {
                    let addr = urom_address(opcode, cycle, carry, zero);
                    assert!(!seen[addr], "{:05x}", addr);
                    seen[addr] = true;
                }
            }
        }
    }

    #[test]
    fn registers() {
        for r in Register::iter() {
            assert_eq!(r, Register::from_field(r as u8));
            assert_eq!(r, r.to_string().parse().unwrap());
        }
        assert!(Register::B.is_narrow());
        assert!(!Register::X.is_narrow());
    }

    #[test]
    fn flags() {
        let f = Flags::from_alu(true, false);
        assert!(f.carry());
        assert!(!f.zero());
        assert_eq!(Flags::ZERO, Flags::from_alu(false, true));
    }

    #[test]
    fn clock_interval() {
        assert_eq!(125_000, TICKS_PER_INTERVAL);
        assert_eq!(125_000, CLOCK_TICKS_PER_INTERVAL);
    }
}
