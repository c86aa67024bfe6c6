use common::isa::Op;
use common::{ArithOp, BusAR, BusAW, BusB, BusC, ControlWord, LogicOp};

use crate::{Flag, GenerateError, Instruction, Ucode};

fn mov(from: BusAR, to: BusAW) -> ControlWord {
    ControlWord::transfer(from, to)
}

fn fetch() -> ControlWord {
    mov(BusAR::Ram, BusAW::I)
}

fn pc_plus() -> ControlWord {
    mov(BusAR::Abxy, BusAW::PcPlus)
}

fn advance() -> ControlWord {
    mov(BusAR::Abxy, BusAW::AdvancePcResetCycle)
}

fn reset_cycle() -> ControlWord {
    mov(BusAR::Abxy, BusAW::ResetCycle)
}

fn arith(from: BusAR, b: BusB, op: ArithOp, carry_in: bool) -> ControlWord {
    ControlWord::arith(from, b, op, carry_in)
}

fn logic(from: BusAR, b: BusB, op: LogicOp) -> ControlWord {
    ControlWord::logic(from, b, op)
}

fn low(word: ControlWord) -> ControlWord {
    word.with_b(BusB::LOW)
}

fn high(word: ControlWord) -> ControlWord {
    word.with_b(BusB::HIGH)
}

/// The step list every unclaimed opcode gets.
pub(crate) fn nop() -> Instruction {
    let mut i = Instruction::new(Op::Nop);
    add!(i, fetch());
    add!(i, advance());
    i
}

impl Ucode {
    fn single<F>(&mut self, op: Op, build: F) -> Result<(), GenerateError>
    where
        F: Fn(&mut Instruction),
    {
        let mut i = Instruction::new(op);
        build(&mut i);
        self.add_instruction(i)
    }

    /// One variant per carry value; `build` sees the carry the variant runs with.
    fn with_carry<F>(&mut self, op: Op, build: F) -> Result<(), GenerateError>
    where
        F: Fn(&mut Instruction, bool),
    {
        for carry in [false, true] {
            let mut i = Instruction::new(op).when_carry(carry.into());
            build(&mut i, carry);
            self.add_instruction(i)?;
        }
        Ok(())
    }

    fn with_zero<F>(&mut self, op: Op, build: F) -> Result<(), GenerateError>
    where
        F: Fn(&mut Instruction, bool),
    {
        for zero in [false, true] {
            let mut i = Instruction::new(op).when_zero(zero.into());
            build(&mut i, zero);
            self.add_instruction(i)?;
        }
        Ok(())
    }

    fn with_flags<F>(&mut self, op: Op, build: F) -> Result<(), GenerateError>
    where
        F: Fn(&mut Instruction, bool, bool),
    {
        for carry in [false, true] {
            for zero in [false, true] {
                let mut i = Instruction::new(op)
                    .when_carry(Flag::from(carry))
                    .when_zero(Flag::from(zero));
                build(&mut i, carry, zero);
                self.add_instruction(i)?;
            }
        }
        Ok(())
    }

    fn add_logic(&mut self) -> Result<(), GenerateError> {
        self.single(Op::Not, |i| {
            add!(i, fetch());
            add!(i, logic(BusAR::Abxy, BusB::Ab, LogicOp::NotA));
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, advance());
        })?;

        for (op, f) in [(Op::AndReg, LogicOp::And), (Op::OrReg, LogicOp::Or), (Op::XorReg, LogicOp::Xor)] {
            self.single(op, |i| {
                add!(i, fetch());
                add!(i, logic(BusAR::Abxy, BusB::Ab, f));
                add!(i, mov(BusAR::T, BusAW::Abxy));
                add!(i, advance());
            })?;
        }

        for (op, f) in [(Op::AndImm, LogicOp::And), (Op::OrImm, LogicOp::Or), (Op::XorImm, LogicOp::Xor)] {
            self.single(op, |i| {
                add!(i, fetch());
                add!(i, pc_plus());
                add!(i, mov(BusAR::Ram, BusAW::D));
                add!(i, logic(BusAR::Abxy, BusB::D, f));
                add!(i, mov(BusAR::T, BusAW::Abxy));
                add!(i, advance());
            })?;
        }

        self.single(Op::Shl, |i| {
            add!(i, fetch());
            add!(i, arith(BusAR::Abxy, BusB::Ab, ArithOp::APlusA, false));
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, advance());
        })?;

        // eight rotations through carry, the first with carry clear
        self.with_carry(Op::Shr, |i, carry| {
            add!(i, fetch());
            add!(i, arith(BusAR::Abxy, BusB::Ab, ArithOp::APlusA, false));
            for _ in 0..7 {
                add!(i, arith(BusAR::T, BusB::Ab, ArithOp::APlusA, carry));
            }
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, advance());
        })
    }

    fn add_arithmetic(&mut self) -> Result<(), GenerateError> {
        let unary = [
            (Op::Inc, ArithOp::A, Some(true)),
            (Op::IncCarry, ArithOp::A, None),
            (Op::Dec, ArithOp::AMinusOne, Some(false)),
            (Op::DecCarry, ArithOp::AMinusOne, None),
        ];
        let binary = [
            (Op::AddReg, Op::AddImm, ArithOp::APlusB, Some(false)),
            (Op::AddCarryReg, Op::AddCarryImm, ArithOp::APlusB, None),
            (Op::SubReg, Op::SubImm, ArithOp::AMinusBMinusOne, Some(true)),
            (Op::SubCarryReg, Op::SubCarryImm, ArithOp::AMinusBMinusOne, None),
        ];

        // `None` takes the carry in from the flag
        for (op, f, carry_in) in unary {
            let build = |i: &mut Instruction, carry: bool| {
                add!(i, fetch());
                add!(i, arith(BusAR::Abxy, BusB::Ab, f, carry_in.unwrap_or(carry)));
                add!(i, mov(BusAR::T, BusAW::Abxy));
                add!(i, advance());
            };
            match carry_in {
                Some(_) => self.single(op, |i| build(i, false))?,
                None => self.with_carry(op, build)?,
            }
        }

        for (reg_op, imm_op, f, carry_in) in binary {
            let reg = |i: &mut Instruction, carry: bool| {
                add!(i, fetch());
                add!(i, arith(BusAR::Abxy, BusB::Ab, f, carry_in.unwrap_or(carry)));
                add!(i, mov(BusAR::T, BusAW::Abxy));
                add!(i, advance());
            };
            let imm = |i: &mut Instruction, carry: bool| {
                add!(i, fetch());
                add!(i, pc_plus());
                add!(i, mov(BusAR::Ram, BusAW::D));
                add!(i, arith(BusAR::Abxy, BusB::D, f, carry_in.unwrap_or(carry)));
                add!(i, mov(BusAR::T, BusAW::Abxy));
                add!(i, advance());
            };
            match carry_in {
                Some(_) => {
                    self.single(reg_op, |i| reg(i, false))?;
                    self.single(imm_op, |i| imm(i, false))?;
                }
                None => {
                    self.with_carry(reg_op, reg)?;
                    self.with_carry(imm_op, imm)?;
                }
            }
        }

        Ok(())
    }

    fn add_move(&mut self) -> Result<(), GenerateError> {
        self.single(Op::MovReg, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::MovImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::Clr, |i| {
            add!(i, fetch());
            add!(i, logic(BusAR::Abxy, BusB::Ab, LogicOp::Zero));
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, advance());
        })?;

        // four times: shift left, then add the bit that fell out
        self.with_carry(Op::Swap, |i, carry| {
            add!(i, fetch());
            add!(i, arith(BusAR::Abxy, BusB::Ab, ArithOp::APlusA, false));
            add!(i, arith(BusAR::T, BusB::Ab, ArithOp::A, carry));
            for _ in 0..3 {
                add!(i, arith(BusAR::T, BusB::Ab, ArithOp::APlusA, false));
                add!(i, arith(BusAR::T, BusB::Ab, ArithOp::A, carry));
            }
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::XchgReg, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::D));
            add!(i, mov(BusAR::Abxy, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::XchgRegFinish, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::D, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::XchgMem, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, low(mov(BusAR::Ram, BusAW::Ma)));
            add!(i, pc_plus());
            add!(i, high(mov(BusAR::Ram, BusAW::Ma)));
            add!(i, mov(BusAR::Ram, BusAW::D).with_c(BusC::Ma));
            add!(i, mov(BusAR::Abxy, BusAW::Ram).with_c(BusC::Ma));
            add!(i, mov(BusAR::D, BusAW::Abxy));
            add!(i, advance());
        })
    }

    fn add_io(&mut self) -> Result<(), GenerateError> {
        self.single(Op::In, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::In, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::OutReg, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::Out));
            add!(i, advance());
        })?;

        self.single(Op::OutImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::Out));
            add!(i, advance());
        })
    }

    fn add_memory(&mut self) -> Result<(), GenerateError> {
        for (op, access) in [
            (Op::Ld, mov(BusAR::Ram, BusAW::Abxy)),
            (Op::StReg, mov(BusAR::Abxy, BusAW::Ram)),
        ] {
            self.single(op, |i| {
                add!(i, fetch());
                add!(i, pc_plus());
                add!(i, low(mov(BusAR::Ram, BusAW::Ma)));
                add!(i, pc_plus());
                add!(i, high(mov(BusAR::Ram, BusAW::Ma)));
                add!(i, access.with_c(BusC::Ma));
                add!(i, advance());
            })?;
        }

        self.single(Op::StImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, pc_plus());
            add!(i, low(mov(BusAR::Ram, BusAW::Ma)));
            add!(i, pc_plus());
            add!(i, high(mov(BusAR::Ram, BusAW::Ma)));
            add!(i, mov(BusAR::D, BusAW::Ram).with_c(BusC::Ma));
            add!(i, advance());
        })?;

        self.single(Op::StpImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, mov(BusAR::D, BusAW::Ram).with_c(BusC::Xy));
            add!(i, advance());
        })?;

        self.single(Op::Ldp, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Ram, BusAW::Abxy).with_c(BusC::Xy));
            add!(i, advance());
        })?;

        self.single(Op::StpReg, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::Ram).with_c(BusC::Xy));
            add!(i, advance());
        })?;

        // the low opcode bits of the two halves name X and Y
        self.single(Op::GpLow, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::Abxy));
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, advance());
        })?;

        self.single(Op::GpHigh, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::D, BusAW::Abxy));
            add!(i, advance());
        })?;

        self.single(Op::PairOffsetLow, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Abxy, BusB::D, ArithOp::APlusB, false));
            add!(i, low(mov(BusAR::T, BusAW::Ma)));
            add!(i, advance());
        })?;

        self.with_carry(Op::PairOffsetHigh, |i, carry| {
            add!(i, fetch());
            add!(i, arith(BusAR::Abxy, BusB::Ab, ArithOp::A, carry));
            add!(i, high(mov(BusAR::T, BusAW::Ma)));
            add!(i, advance());
        })?;

        self.single(Op::LoadPairOffset, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Ram, BusAW::Abxy).with_c(BusC::Ma));
            add!(i, advance());
        })?;

        self.single(Op::StorePairOffset, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::Ram).with_c(BusC::Ma));
            add!(i, advance());
        })
    }

    fn add_jump(&mut self) -> Result<(), GenerateError> {
        self.single(Op::CmpReg, |i| {
            add!(i, fetch());
            add!(i, arith(BusAR::Abxy, BusB::Ab, ArithOp::AMinusBMinusOne, true));
            add!(i, advance());
        })?;

        self.single(Op::CmpImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Abxy, BusB::D, ArithOp::AMinusBMinusOne, true));
            add!(i, advance());
        })?;

        self.single(Op::Jmp, jump)?;

        // after `cmp src, reg` the flags describe reg - src
        let conditions: [(Op, fn(bool, bool) -> bool); 6] = [
            (Op::Je, |_, z| z),
            (Op::Jne, |_, z| !z),
            (Op::Jg, |c, _| !c),
            (Op::Jge, |c, z| !c || z),
            (Op::Jl, |c, z| c && !z),
            (Op::Jle, |c, _| c),
        ];
        for (op, taken) in conditions {
            self.with_flags(op, |i, carry, zero| {
                if taken(carry, zero) {
                    jump(i);
                } else {
                    add!(i, fetch());
                    add!(i, pc_plus());
                    add!(i, pc_plus());
                    add!(i, advance());
                }
            })?;
        }

        Ok(())
    }

    fn add_stack(&mut self) -> Result<(), GenerateError> {
        self.single(Op::Rstsp, |i| {
            add!(i, fetch());
            add!(i, logic(BusAR::D, BusB::Ab, LogicOp::Zero));
            add!(i, low(mov(BusAR::T, BusAW::Sp)));
            add!(i, high(mov(BusAR::T, BusAW::Sp)));
            add!(i, advance());
        })?;

        self.single(Op::PushReg, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::Ram).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, advance());
        })?;

        self.single(Op::Pop, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::Abxy, BusAW::SpMinus));
            add!(i, mov(BusAR::Ram, BusAW::Abxy).with_c(BusC::Sp));
            add!(i, advance());
        })?;

        self.single(Op::PushImm, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, mov(BusAR::D, BusAW::Ram).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, advance());
        })
    }

    /// Both loops compare, then either skip the address or jump to it and
    /// step the register. The stepping ALU op can flip the zero flag, so
    /// both variants carry the same tail.
    fn add_loop(&mut self) -> Result<(), GenerateError> {
        fn branch(i: &mut Instruction, exit: bool, step: ControlWord) {
            if exit {
                add!(i, pc_plus());
                add!(i, pc_plus());
                add!(i, advance());
            } else {
                add!(i, pc_plus());
                add!(i, mov(BusAR::Ram, BusAW::D));
                add!(i, pc_plus());
            }
            add!(i, high(mov(BusAR::Ram, BusAW::Pc)));
            add!(i, low(mov(BusAR::D, BusAW::Pc)));
            add!(i, step);
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, reset_cycle());
        }

        self.with_zero(Op::Loope, |i, zero| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Abxy, BusB::D, ArithOp::AMinusBMinusOne, true));
            branch(i, zero, arith(BusAR::Abxy, BusB::Ab, ArithOp::A, true));
        })?;

        self.with_zero(Op::Loopz, |i, zero| {
            add!(i, fetch());
            add!(i, logic(BusAR::D, BusB::Ab, LogicOp::Zero));
            add!(i, mov(BusAR::T, BusAW::D));
            add!(i, arith(BusAR::Abxy, BusB::D, ArithOp::AMinusBMinusOne, true));
            branch(i, zero, arith(BusAR::Abxy, BusB::Ab, ArithOp::AMinusOne, false));
        })
    }

    fn add_function(&mut self) -> Result<(), GenerateError> {
        self.single(Op::Call, |i| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, pc_plus());
            add!(i, low(mov(BusAR::Pc, BusAW::Ram)).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, high(mov(BusAR::Pc, BusAW::Ram)).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, high(mov(BusAR::Ram, BusAW::Pc)));
            add!(i, low(mov(BusAR::D, BusAW::Pc)));
            add!(i, reset_cycle());
        })?;

        self.single(Op::Ret, |i| {
            add!(i, fetch());
            pop_pc(i);
            add!(i, advance());
        })?;

        self.with_carry(Op::RetImm, |i, carry| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            pop_pc(i);
            add!(i, arith(BusAR::Sp, BusB::LOW, ArithOp::AMinusBMinusOne, true));
            add!(i, low(mov(BusAR::T, BusAW::Sp)));
            add!(i, arith(BusAR::Sp, BusB::HIGH, ArithOp::AMinusOne, carry));
            add!(i, high(mov(BusAR::T, BusAW::Sp)));
            add!(i, advance());
        })?;

        // the opcode byte under PC doubles as the frame size
        self.with_carry(Op::Enter, |i, carry| {
            add!(i, fetch());
            add!(i, low(mov(BusAR::Bp, BusAW::Ram)).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, high(mov(BusAR::Bp, BusAW::Ram)).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpPlus));
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Sp, BusB::LOW, ArithOp::AMinusBMinusOne, false));
            add!(i, low(mov(BusAR::T, BusAW::Bp)));
            add!(i, arith(BusAR::Sp, BusB::HIGH, ArithOp::AMinusOne, carry));
            add!(i, high(mov(BusAR::T, BusAW::Bp)));
            add!(i, advance());
        })?;

        self.with_carry(Op::Leave, |i, carry| {
            add!(i, fetch());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Bp, BusB::LOW, ArithOp::APlusB, false));
            add!(i, low(mov(BusAR::T, BusAW::Sp)));
            add!(i, arith(BusAR::Bp, BusB::HIGH, ArithOp::A, carry));
            add!(i, high(mov(BusAR::T, BusAW::Sp)));
            add!(i, mov(BusAR::Abxy, BusAW::SpMinus));
            add!(i, high(mov(BusAR::Ram, BusAW::Bp)).with_c(BusC::Sp));
            add!(i, mov(BusAR::Abxy, BusAW::SpMinus));
            add!(i, low(mov(BusAR::Ram, BusAW::Bp)).with_c(BusC::Sp));
            add!(i, advance());
        })?;

        for (op, lo, hi, carry_in) in [
            (Op::Alloc, ArithOp::APlusB, ArithOp::A, false),
            (Op::Free, ArithOp::AMinusBMinusOne, ArithOp::AMinusOne, true),
        ] {
            self.with_carry(op, |i, carry| {
                add!(i, fetch());
                add!(i, pc_plus());
                add!(i, mov(BusAR::Ram, BusAW::D));
                add!(i, arith(BusAR::Sp, BusB::LOW, lo, carry_in));
                add!(i, low(mov(BusAR::T, BusAW::Sp)));
                add!(i, arith(BusAR::Sp, BusB::HIGH, hi, carry));
                add!(i, high(mov(BusAR::T, BusAW::Sp)));
                add!(i, advance());
            })?;
        }

        for (op, access) in [
            (Op::Ldf, mov(BusAR::Ram, BusAW::Abxy)),
            (Op::StfReg, mov(BusAR::Abxy, BusAW::Ram)),
        ] {
            self.with_carry(op, |i, carry| {
                add!(i, fetch());
                frame_address(i, carry);
                add!(i, access.with_c(BusC::Ma));
                add!(i, advance());
            })?;
        }

        self.with_carry(Op::StfImm, |i, carry| {
            add!(i, fetch());
            frame_address(i, carry);
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, mov(BusAR::D, BusAW::Ram).with_c(BusC::Ma));
            add!(i, advance());
        })?;

        // X gets the low byte, D holds the high byte for the second half
        self.with_carry(Op::GpfLow, |i, carry| {
            add!(i, fetch());
            add!(i, pc_plus());
            add!(i, mov(BusAR::Ram, BusAW::D));
            add!(i, arith(BusAR::Bp, BusB::LOW, ArithOp::APlusB, false));
            add!(i, mov(BusAR::T, BusAW::Abxy));
            add!(i, arith(BusAR::Bp, BusB::HIGH, ArithOp::A, carry));
            add!(i, mov(BusAR::T, BusAW::D));
            add!(i, advance());
        })?;

        self.single(Op::GpfHigh, |i| {
            add!(i, fetch());
            add!(i, mov(BusAR::D, BusAW::Abxy));
            add!(i, advance());
        })
    }

    fn add_misc(&mut self) -> Result<(), GenerateError> {
        self.single(Op::Halt, |i| {
            add!(i, fetch());
            add!(i, reset_cycle());
        })
    }
}

fn jump(i: &mut Instruction) {
    add!(i, fetch());
    add!(i, pc_plus());
    add!(i, mov(BusAR::Ram, BusAW::D));
    add!(i, pc_plus());
    add!(i, high(mov(BusAR::Ram, BusAW::Pc)));
    add!(i, low(mov(BusAR::D, BusAW::Pc)));
    add!(i, reset_cycle());
}

fn pop_pc(i: &mut Instruction) {
    add!(i, mov(BusAR::Abxy, BusAW::SpMinus));
    add!(i, high(mov(BusAR::Ram, BusAW::Pc)).with_c(BusC::Sp));
    add!(i, mov(BusAR::Abxy, BusAW::SpMinus));
    add!(i, low(mov(BusAR::Ram, BusAW::Pc)).with_c(BusC::Sp));
}

/// MA = BP + the immediate under the next PC.
fn frame_address(i: &mut Instruction, carry: bool) {
    add!(i, pc_plus());
    add!(i, mov(BusAR::Ram, BusAW::D));
    add!(i, arith(BusAR::Bp, BusB::LOW, ArithOp::APlusB, false));
    add!(i, low(mov(BusAR::T, BusAW::Ma)));
    add!(i, arith(BusAR::Bp, BusB::HIGH, ArithOp::A, carry));
    add!(i, high(mov(BusAR::T, BusAW::Ma)));
}

pub(crate) fn add_all(ucode: &mut Ucode) -> Result<(), GenerateError> {
    ucode.add_logic()?;
    ucode.add_arithmetic()?;
    ucode.add_move()?;
    ucode.add_io()?;
    ucode.add_memory()?;
    ucode.add_jump()?;
    ucode.add_stack()?;
    ucode.add_loop()?;
    ucode.add_function()?;
    ucode.add_misc()
}
