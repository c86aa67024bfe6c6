use std::{collections::HashMap, fmt};

use lazy_static::lazy_static;
use strum::IntoEnumIterator;

use crate::Register;

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ArgKind {
    Ab,
    Abxy,
    Imm,
    Addr,
}

impl ArgKind {
    /// Number of opcode values one argument of this kind spans.
    pub fn opcode_width(&self) -> usize {
        match self {
            ArgKind::Ab => 2,
            ArgKind::Abxy => 4,
            ArgKind::Imm | ArgKind::Addr => 1,
        }
    }

    pub fn operand_bytes(&self) -> usize {
        match self {
            ArgKind::Imm => 1,
            ArgKind::Addr => 2,
            ArgKind::Ab | ArgKind::Abxy => 0,
        }
    }

    pub fn is_register(&self) -> bool {
        matches!(self, ArgKind::Ab | ArgKind::Abxy)
    }
}

/// Size of the contiguous opcode block an argument list reserves. Only the
/// first two arguments can carry register fields.
pub fn opcode_block_width(args: &[ArgKind]) -> usize {
    args.iter().take(2).map(|a| a.opcode_width()).product()
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter)]
pub enum Op {
    Nop,
    Halt,

    Not,
    AndReg,
    OrReg,
    XorReg,
    Shl,
    Shr,
    AndImm,
    OrImm,
    XorImm,

    Inc,
    IncCarry,
    Dec,
    DecCarry,
    AddReg,
    AddCarryReg,
    SubReg,
    SubCarryReg,
    AddImm,
    AddCarryImm,
    SubImm,
    SubCarryImm,

    MovReg,
    MovImm,
    Clr,
    Swap,
    XchgReg,
    XchgRegFinish,
    XchgMem,

    In,
    OutReg,
    OutImm,

    Ld,
    StReg,
    StImm,
    StpImm,
    Ldp,
    StpReg,
    GpLow,
    GpHigh,
    PairOffsetLow,
    PairOffsetHigh,
    LoadPairOffset,
    StorePairOffset,

    CmpReg,
    CmpImm,
    Jmp,
    Je,
    Jne,
    Jg,
    Jge,
    Jl,
    Jle,

    Rstsp,
    PushReg,
    Pop,
    PushImm,

    Loope,
    Loopz,

    Call,
    Ret,
    RetImm,
    Enter,
    Leave,
    Alloc,
    Free,
    Ldf,
    StfReg,
    StfImm,
    GpfLow,
    GpfHigh,
}

impl Op {
    /// Mnemonic, base opcode and declared arguments. Arguments are encoded
    /// after the opcode byte in this order.
    fn info(&self) -> (&'static str, u8, &'static [ArgKind]) {
        use ArgKind::*;
        match self {
            Op::Nop => ("nop", 0x00, &[]),
            Op::Halt => ("halt", 0xFF, &[]),

            Op::Not => ("not", 0x24, &[Abxy]),
            Op::AndReg => ("and", 0x28, &[Ab, Abxy]),
            Op::OrReg => ("or", 0x30, &[Ab, Abxy]),
            Op::XorReg => ("xor", 0x38, &[Ab, Abxy]),
            Op::Shl => ("shl", 0x4C, &[Abxy]),
            Op::Shr => ("shr", 0x50, &[Abxy]),
            Op::AndImm => ("and", 0x40, &[Imm, Abxy]),
            Op::OrImm => ("or", 0x44, &[Imm, Abxy]),
            Op::XorImm => ("xor", 0x48, &[Imm, Abxy]),

            Op::Inc => ("inc", 0x80, &[Abxy]),
            Op::IncCarry => ("incc", 0x84, &[Abxy]),
            Op::Dec => ("dec", 0x88, &[Abxy]),
            Op::DecCarry => ("decc", 0x8C, &[Abxy]),
            Op::AddReg => ("add", 0x90, &[Ab, Abxy]),
            Op::AddCarryReg => ("addc", 0x98, &[Ab, Abxy]),
            Op::SubReg => ("sub", 0xA0, &[Ab, Abxy]),
            Op::SubCarryReg => ("subc", 0xA8, &[Ab, Abxy]),
            Op::AddImm => ("add", 0xB0, &[Imm, Abxy]),
            Op::AddCarryImm => ("addc", 0xB4, &[Imm, Abxy]),
            Op::SubImm => ("sub", 0xB8, &[Imm, Abxy]),
            Op::SubCarryImm => ("subc", 0xBC, &[Imm, Abxy]),

            Op::MovReg => ("mov", 0xD0, &[Abxy, Abxy]),
            Op::MovImm => ("mov", 0xCC, &[Imm, Abxy]),
            Op::Clr => ("clr", 0x54, &[Abxy]),
            Op::Swap => ("swap", 0x58, &[Abxy]),
            Op::XchgReg => ("xchg.1", 0x60, &[Abxy, Abxy]),
            Op::XchgRegFinish => ("xchg.2", 0x5C, &[Abxy]),
            Op::XchgMem => ("xchg", 0x18, &[Addr, Abxy]),

            Op::In => ("in", 0xF0, &[Abxy]),
            Op::OutReg => ("out", 0xF4, &[Abxy]),
            Op::OutImm => ("out", 0x03, &[Imm]),

            Op::Ld => ("ld", 0xE4, &[Addr, Abxy]),
            Op::StReg => ("st", 0xEC, &[Abxy, Addr]),
            Op::StImm => ("st", 0x02, &[Imm, Addr]),
            Op::StpImm => ("stp", 0x01, &[Imm]),
            Op::Ldp => ("ldp", 0xE0, &[Abxy]),
            Op::StpReg => ("stp", 0xE8, &[Abxy]),
            Op::GpLow => ("gp.1", 0x0E, &[Addr]),
            Op::GpHigh => ("gp.2", 0x0F, &[]),
            Op::PairOffsetLow => ("po.1", 0x0A, &[Imm]),
            Op::PairOffsetHigh => ("po.2", 0x0B, &[]),
            Op::LoadPairOffset => ("ldpo.3", 0x08, &[Ab]),
            Op::StorePairOffset => ("stpo.3", 0x0C, &[Ab]),

            Op::CmpReg => ("cmp", 0xC0, &[Ab, Abxy]),
            Op::CmpImm => ("cmp", 0xC8, &[Imm, Abxy]),
            Op::Jmp => ("jmp", 0xF8, &[Addr]),
            Op::Je => ("je", 0xF9, &[Addr]),
            Op::Jne => ("jne", 0xFA, &[Addr]),
            Op::Jg => ("jg", 0xFB, &[Addr]),
            Op::Jge => ("jge", 0xFC, &[Addr]),
            Op::Jl => ("jl", 0xFD, &[Addr]),
            Op::Jle => ("jle", 0xFE, &[Addr]),

            Op::Rstsp => ("rstsp", 0x04, &[]),
            Op::PushReg => ("push", 0x78, &[Abxy]),
            Op::Pop => ("pop", 0x7C, &[Abxy]),
            Op::PushImm => ("push", 0x21, &[Imm]),

            Op::Loope => ("loope", 0x10, &[Imm, Abxy, Addr]),
            Op::Loopz => ("loopz", 0x14, &[Abxy, Addr]),

            Op::Call => ("call", 0x05, &[Addr]),
            Op::Ret => ("ret", 0x06, &[]),
            Op::RetImm => ("ret", 0x1E, &[Imm]),
            Op::Enter => ("enter", 0x1F, &[]),
            Op::Leave => ("leave", 0x20, &[]),
            Op::Alloc => ("alloc", 0x1C, &[Imm]),
            Op::Free => ("free", 0x1D, &[Imm]),
            Op::Ldf => ("ldf", 0x70, &[Imm, Abxy]),
            Op::StfReg => ("stf", 0x74, &[Abxy, Imm]),
            // offset, then value
            Op::StfImm => ("stf", 0x07, &[Imm, Imm]),
            Op::GpfLow => ("gpf.1", 0x22, &[Imm]),
            Op::GpfHigh => ("gpf.2", 0x23, &[]),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        self.info().0
    }

    pub fn opcode(&self) -> u8 {
        self.info().1
    }

    pub fn args(&self) -> &'static [ArgKind] {
        self.info().2
    }

    pub fn block_width(&self) -> usize {
        opcode_block_width(self.args())
    }

    /// Encoded length in bytes, opcode included.
    pub fn len(&self) -> usize {
        1 + self.args().iter().map(|a| a.operand_bytes()).sum::<usize>()
    }

    /// The instruction whose opcode block contains `opcode`.
    pub fn decode(opcode: u8) -> Option<Op> {
        BY_OPCODE[opcode as usize]
    }

    pub fn encode(&self, operands: &[Operand]) -> Result<Vec<u8>, EncodeError> {
        let args = self.args();
        if args.len() != operands.len() {
            return Err(EncodeError::OperandCount {
                op: *self,
                expected: args.len(),
                found: operands.len(),
            });
        }

        let mut registers = Vec::new();
        let mut data = Vec::new();
        for (position, (kind, operand)) in args.iter().zip(operands).enumerate() {
            match (kind, operand) {
                (ArgKind::Ab, Operand::Reg(r)) if r.is_narrow() => registers.push(*r),
                (ArgKind::Abxy, Operand::Reg(r)) => registers.push(*r),
                (ArgKind::Imm, Operand::Imm(value)) => data.push(*value),
                (ArgKind::Addr, Operand::Addr(addr)) => data.extend_from_slice(&addr.to_le_bytes()),
                _ => return Err(EncodeError::OperandMismatch { op: *self, position }),
            }
        }

        // the last register lands in the low field, one before it in bits 2..=3
        let fields = match registers.as_slice() {
            [] => 0,
            [low] => *low as u8,
            [.., high, low] => ((*high as u8) << 2) | (*low as u8),
        };

        let mut bytes = vec![self.opcode() | fields];
        bytes.extend(data);
        Ok(bytes)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    Imm(u8),
    Addr(u16),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Imm(v) => write!(f, "0x{:02x}", v),
            Operand::Addr(a) => write!(f, "0x{:04x}", a),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    UnknownMnemonic(String),
    NoMatchingForm { mnemonic: String, operands: Vec<Operand> },
    OperandCount { op: Op, expected: usize, found: usize },
    OperandMismatch { op: Op, position: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnknownMnemonic(m) => write!(f, "unknown instruction '{}'", m),
            EncodeError::NoMatchingForm { mnemonic, operands } => {
                write!(f, "no form of '{}' takes (", mnemonic)?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
            EncodeError::OperandCount { op, expected, found } => {
                write!(f, "{:?} takes {} operands but {} were given", op, expected, found)
            }
            EncodeError::OperandMismatch { op, position } => {
                write!(f, "operand {} of {:?} has the wrong kind", position, op)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

lazy_static! {
    static ref BY_MNEMONIC: HashMap<&'static str, Vec<Op>> = {
        let mut map: HashMap<&'static str, Vec<Op>> = HashMap::new();
        for op in Op::iter() {
            map.entry(op.mnemonic()).or_default().push(op);
        }
        map
    };

    static ref BY_OPCODE: Vec<Option<Op>> = {
        let mut table = vec![None; 256];
        for op in Op::iter() {
            let base = op.opcode() as usize;
            for slot in &mut table[base..base + op.block_width()] {
                *slot = Some(op);
            }
        }
        table
    };
}

/// Multi-opcode forms the assembler offers on top of the primitives.
fn composite(mnemonic: &str, operands: &[Operand]) -> Option<Vec<(Op, Vec<Operand>)>> {
    use Operand::*;
    use Register::*;

    Some(match (mnemonic, operands) {
        ("incp", []) => vec![(Op::Inc, vec![Reg(X)]), (Op::IncCarry, vec![Reg(Y)])],
        ("decp", []) => vec![(Op::Dec, vec![Reg(X)]), (Op::DecCarry, vec![Reg(Y)])],
        ("addp", [Reg(r)]) => vec![(Op::AddReg, vec![Reg(*r), Reg(X)]), (Op::IncCarry, vec![Reg(Y)])],
        ("addp", [Imm(v)]) => vec![(Op::AddImm, vec![Imm(*v), Reg(X)]), (Op::IncCarry, vec![Reg(Y)])],
        ("subp", [Reg(r)]) => vec![(Op::SubReg, vec![Reg(*r), Reg(X)]), (Op::DecCarry, vec![Reg(Y)])],
        ("subp", [Imm(v)]) => vec![(Op::SubImm, vec![Imm(*v), Reg(X)]), (Op::DecCarry, vec![Reg(Y)])],
        ("xchg", [Reg(a), Reg(b)]) => vec![
            (Op::XchgReg, vec![Reg(*a), Reg(*b)]),
            (Op::XchgRegFinish, vec![Reg(*a)]),
        ],
        ("gp", [Addr(a)]) => vec![(Op::GpLow, vec![Addr(*a)]), (Op::GpHigh, vec![])],
        ("gpf", [Imm(v)]) => vec![(Op::GpfLow, vec![Imm(*v)]), (Op::GpfHigh, vec![])],
        ("ldpo", [Imm(v), Reg(r)]) => vec![
            (Op::PairOffsetLow, vec![Imm(*v)]),
            (Op::PairOffsetHigh, vec![]),
            (Op::LoadPairOffset, vec![Reg(*r)]),
        ],
        ("stpo", [Reg(r), Imm(v)]) => vec![
            (Op::PairOffsetLow, vec![Imm(*v)]),
            (Op::PairOffsetHigh, vec![]),
            (Op::StorePairOffset, vec![Reg(*r)]),
        ],
        _ => return None,
    })
}

/// Bytes of a composite form, or `None` when `mnemonic` with these operand
/// shapes is not one.
pub fn encode_composite(mnemonic: &str, operands: &[Operand]) -> Option<Result<Vec<u8>, EncodeError>> {
    let parts = composite(mnemonic, operands)?;
    let mut bytes = Vec::new();
    for (op, operands) in &parts {
        match op.encode(operands) {
            Ok(encoded) => bytes.extend(encoded),
            Err(e) => return Some(Err(e)),
        }
    }
    Some(Ok(bytes))
}

/// Encode one source-level instruction, picking the form whose operand
/// kinds match.
pub fn assemble(mnemonic: &str, operands: &[Operand]) -> Result<Vec<u8>, EncodeError> {
    if let Some(encoded) = encode_composite(mnemonic, operands) {
        return encoded;
    }

    let candidates = BY_MNEMONIC
        .get(mnemonic)
        .ok_or_else(|| EncodeError::UnknownMnemonic(mnemonic.to_owned()))?;

    candidates
        .iter()
        .find_map(|op| op.encode(operands).ok())
        .ok_or_else(|| EncodeError::NoMatchingForm {
            mnemonic: mnemonic.to_owned(),
            operands: operands.to_vec(),
        })
}
