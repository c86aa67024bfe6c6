extern crate strum;
#[macro_use]
extern crate strum_macros;

use std::{borrow::Cow, fmt, ops::Range};

use log::{debug, info};
use packed_struct::PackingError;

use common::hexfile::HexFile;
use common::image::ControlStoreImage;
use common::isa::Op;
use common::*;

/// Flag requirement of an instruction variant.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Flag {
    Any,
    Disable,
    Enable,
}

impl Flag {
    pub fn admits(&self, set: bool) -> bool {
        match self {
            Flag::Any => true,
            Flag::Disable => !set,
            Flag::Enable => set,
        }
    }
}

impl From<bool> for Flag {
    fn from(set: bool) -> Flag {
        if set {
            Flag::Enable
        } else {
            Flag::Disable
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub word: ControlWord,
    pub file: &'static str,
    pub line: u32,
}

/// Steps for one instruction, or for one flag variant of it.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub carry: Flag,
    pub zero: Flag,
    pub steps: Vec<Step>,
}

impl Instruction {
    pub fn new(op: Op) -> Instruction {
        Instruction {
            op,
            carry: Flag::Any,
            zero: Flag::Any,
            steps: Vec::new(),
        }
    }

    pub fn when_carry(self, carry: Flag) -> Instruction {
        Instruction { carry, ..self }
    }

    pub fn when_zero(self, zero: Flag) -> Instruction {
        Instruction { zero, ..self }
    }

    pub fn push(&mut self, word: ControlWord, file: &'static str, line: u32) {
        self.steps.push(Step { word, file, line });
    }

    fn admits(&self, carry: bool, zero: bool) -> bool {
        self.carry.admits(carry) && self.zero.admits(zero)
    }
}

macro_rules! add {
    ($inst:expr, $word:expr) => {
        $inst.push($word, file!(), line!())
    };
}

mod table;

#[derive(Debug)]
pub enum GenerateError {
    DuplicateEntry { opcode: u8, step: usize },
    TooManySteps { opcode: u8, steps: usize },
    Packing(PackingError),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::DuplicateEntry { opcode, step } => write!(
                f,
                "Duplicated usage of uROM data entry for opcode 0x{:02x} in step {}",
                opcode, step),
            GenerateError::TooManySteps { opcode, steps } => write!(
                f,
                "opcode 0x{:02x} has {} steps, at most {} fit",
                opcode, steps, INSTRUCTION_CYCLE_QUANTITY),
            GenerateError::Packing(e) => write!(f, "control word does not pack: {:?}", e),
        }
    }
}

impl std::error::Error for GenerateError {}

impl From<PackingError> for GenerateError {
    fn from(e: PackingError) -> Self {
        GenerateError::Packing(e)
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    banks: (u8, u8),
    word: ControlWord,
    op: Op,
    step: usize,
    file: &'static str,
    line: u32,
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Empty,
    Idle,
    Word(Entry),
}

const FLAG_COMBINATIONS: [(bool, bool); 4] = [(false, false), (false, true), (true, false), (true, true)];

pub struct Ucode {
    slots: Vec<Slot>,
    assigned: Vec<bool>,
    print: bool,
}

impl Ucode {
    pub fn new(print: bool) -> Ucode {
        Ucode {
            slots: vec![Slot::Empty; UROM_SIZE],
            assigned: vec![false; INSTRUCTION_QUANTITY],
            print,
        }
    }

    pub fn is_opcode_assigned(&self, opcode: u8) -> bool {
        self.assigned[opcode as usize]
    }

    /// Claims every address of `inst` across its opcode block. Nothing is
    /// written unless the whole block is free.
    pub fn add_instruction(&mut self, inst: Instruction) -> Result<(), GenerateError> {
        let base = inst.op.opcode() as usize;
        let block = base..base + inst.op.block_width();
        self.claim(block, &inst)
    }

    fn claim(&mut self, block: Range<usize>, inst: &Instruction) -> Result<(), GenerateError> {
        if inst.steps.len() > INSTRUCTION_CYCLE_QUANTITY {
            return Err(GenerateError::TooManySteps {
                opcode: block.start as u8,
                steps: inst.steps.len(),
            });
        }

        let mut writes = Vec::new();
        for opcode in block.clone() {
            let opcode = opcode as u8;
            for (step, s) in inst.steps.iter().enumerate() {
                let banks = s.word.to_banks()?;
                for (carry, zero) in FLAG_COMBINATIONS {
                    if !inst.admits(carry, zero) {
                        continue;
                    }

                    let address = urom_address(opcode, step as u8, carry, zero);
                    if !matches!(self.slots[address], Slot::Empty) {
                        return Err(GenerateError::DuplicateEntry { opcode, step });
                    }

                    writes.push((address, Entry {
                        banks,
                        word: s.word,
                        op: inst.op,
                        step,
                        file: s.file,
                        line: s.line,
                    }));
                }
            }
        }

        debug!(target: "ucode", "{:?} {:02x}..{:02x} carry:{} zero:{} steps:{}",
            inst.op, block.start, block.end, inst.carry, inst.zero, inst.steps.len());

        for opcode in block {
            self.assigned[opcode] = true;
        }
        for (address, entry) in writes {
            self.slots[address] = Slot::Word(entry);
        }
        Ok(())
    }

    /// Installs a no-op for every opcode nothing claimed, then marks every
    /// address still unwritten as idle.
    pub fn finalize(&mut self) -> Result<ControlStoreImage, GenerateError> {
        let unassigned: Vec<usize> = (0..INSTRUCTION_QUANTITY).filter(|&o| !self.assigned[o]).collect();
        info!(target: "ucode", "filling {} unassigned opcodes with nop", unassigned.len());
        for opcode in unassigned {
            self.claim(opcode..opcode + 1, &table::nop())?;
        }

        let mut image = ControlStoreImage::blank();
        for (address, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Slot::Word(entry) => image.set(address, entry.banks.0, entry.banks.1),
                Slot::Empty => *slot = Slot::Idle,
                Slot::Idle => {}
            }
        }

        if self.print {
            print!("{}", self.listing());
        }

        Ok(image)
    }

    /// Every address is written.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| !matches!(s, Slot::Empty))
    }

    /// `v2.0 raw` dump of both banks interleaved, each word annotated with the
    /// line that authored it.
    pub fn listing(&self) -> HexFile {
        let mut hex = HexFile::default();
        let mut idle = 0;
        for (address, slot) in self.slots.iter().enumerate() {
            let entry = match slot {
                Slot::Word(entry) => entry,
                Slot::Empty | Slot::Idle => {
                    idle += 1;
                    continue;
                }
            };

            if idle > 0 {
                hex.comment(format!(" {} idle", idle));
                hex.data(&vec![0; 2 * idle]);
                idle = 0;
            }

            let mut file = Cow::Borrowed(entry.file);
            if file.contains('\\') {
                file = Cow::Owned(file.replace('\\', "/"));
            }
            hex.comment(format!(" addr:{:05x} op:{:?} step:{} {:?} source:{}:{}",
                address, entry.op, entry.step, entry.word, file, entry.line));
            hex.data(&[entry.banks.0, entry.banks.1]);
        }
        if idle > 0 {
            hex.comment(format!(" {} idle", idle));
            hex.data(&vec![0; 2 * idle]);
        }
        hex
    }
}

/// Builds the full control store.
pub fn ucode(print: bool) -> Result<ControlStoreImage, GenerateError> {
    let mut ucode = Ucode::new(print);
    table::add_all(&mut ucode)?;
    ucode.finalize()
}
