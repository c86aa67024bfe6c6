use std::fmt::{self, Debug};

use log::{debug, trace};

use alu::alu8;
use common::image::{ControlStoreImage, ImageError};
use common::*;

/// Host side of a running machine.
pub trait Observer {
    /// A control word loaded OUT.
    fn on_output(&mut self, _out: u8) {}

    /// End of a batch of instructions.
    fn on_update(&mut self, _machine: &Machine) {}
}

impl Observer for () {}

impl Observer for Vec<u8> {
    fn on_output(&mut self, out: u8) {
        self.push(out);
    }
}

const SP_BASE: u8 = (MEMORY_SP_ADDRESS >> 8) as u8;

fn half(pair: &mut [u8; 2], bus_b: BusB) -> &mut u8 {
    if bus_b.is_low() {
        &mut pair[0]
    } else {
        &mut pair[1]
    }
}

fn read_half(pair: [u8; 2], bus_b: BusB) -> u8 {
    if bus_b.is_low() {
        pair[0]
    } else {
        pair[1]
    }
}

pub struct Machine {
    urom: Vec<ControlWord>,
    bios: Vec<u8>,
    ram: Vec<u8>,
    pub regs: [u8; 4],
    pub d: u8,
    pub t: u8,
    pub i: u8,
    pub input: u8,
    pub out: u8,
    pub pc: [u8; 2],
    pub sp: [u8; 2],
    pub bp: [u8; 2],
    pub ma: [u8; 2],
    pub flags: [Flags; 2],
    cycle: u8,
    ticks: u64,
    max_sp: u16,
    running: bool,
}

impl Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle:{:x}", self.cycle)?;
        write!(f, " i:{:02x}", self.i)?;
        write!(f, " pc:{:04x}", self.pc())?;
        write!(f, " sp:{:04x}", self.sp())?;
        write!(f, " bp:{:04x}", self.bp())?;
        write!(f, " ma:{:04x}", self.ma())?;
        write!(f, " abxy:{:02x?}", self.regs)?;
        write!(f, " d:{:02x} t:{:02x}", self.d, self.t)?;
        write!(f, " in:{:02x} out:{:02x}", self.input, self.out)?;
        write!(f, " flags:[{:?} {:?}]", self.flags[0], self.flags[1])?;
        Ok(())
    }
}

impl Machine {
    /// Decodes the whole control store up front, so execution itself cannot
    /// fail.
    pub fn new(store: &ControlStoreImage) -> Result<Machine, ImageError> {
        let mut m = Machine {
            urom: store.decode()?,
            bios: vec![0; BIOS_SIZE],
            ram: vec![0; MEMORY_SIZE],
            regs: [0; 4],
            d: 0,
            t: 0,
            i: 0,
            input: 0,
            out: 0,
            pc: [0; 2],
            sp: [0; 2],
            bp: [0; 2],
            ma: [0; 2],
            flags: [Flags::empty(); 2],
            cycle: 0,
            ticks: 0,
            max_sp: 0,
            running: false,
        };
        m.reset();
        Ok(m)
    }

    /// Replaces the bootstrap image. Shorter images are zero padded.
    pub fn load_bios(&mut self, bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.len() > BIOS_SIZE {
            return Err(ImageError::BiosSize(bytes.len()));
        }
        self.bios.fill(0);
        self.bios[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn reset(&mut self) {
        debug!(target: "sim", "reset");
        self.ram.fill(0);
        self.regs = [0; 4];
        self.d = 0;
        self.t = 0;
        self.i = 0;
        self.input = 0;
        self.out = 0;
        self.pc = [0; 2];
        self.sp = MEMORY_SP_ADDRESS.to_le_bytes();
        self.bp = [0; 2];
        self.ma = [0; 2];
        self.flags = [Flags::empty(); 2];
        self.cycle = 0;
        self.ticks = 0;
        self.max_sp = 0;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.reset();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Replaces the non-clock bits of IN. The latch is not clocked before
    /// the first tick, so earlier calls are dropped.
    pub fn set_input(&mut self, value: u8) {
        if self.ticks > 0 {
            self.input = (self.input & IN_CLOCK_BIT) | (value & !IN_CLOCK_BIT);
        }
    }

    /// Executes whole instructions until at least `ticks` micro-cycles have
    /// elapsed. Returns the number actually run.
    pub fn run<O: Observer>(&mut self, ticks: u64, observer: &mut O) -> u64 {
        self.running = true;
        let start = self.ticks;
        while self.ticks - start < ticks {
            self.execute(observer);
        }
        observer.on_update(self);
        self.ticks - start
    }

    /// Executes exactly one instruction, fetch included.
    pub fn step_instruction<O: Observer>(&mut self, observer: &mut O) -> u64 {
        let start = self.ticks;
        self.execute(observer);
        observer.on_update(self);
        self.ticks - start
    }

    fn execute<O: Observer>(&mut self, observer: &mut O) {
        loop {
            self.tick(observer);
            if self.cycle == 0 {
                break;
            }
        }
    }

    fn flag_bank(&self) -> usize {
        if self.i & INSTRUCTION_FLAG_BANK_MASK != 0 {
            1
        } else {
            0
        }
    }

    fn address_bus(&self, bus_c: BusC) -> u16 {
        match bus_c {
            BusC::Pc => self.pc(),
            BusC::Ma => self.ma(),
            BusC::Sp => self.sp(),
            BusC::Xy => self.xy(),
        }
    }

    fn tick<O: Observer>(&mut self, observer: &mut O) {
        let bank = self.flag_bank();
        let flags = self.flags[bank];
        let urom_addr = urom_address(self.i, self.cycle, flags.carry(), flags.zero());
        let word = self.urom[urom_addr];
        self.cycle = self.cycle.wrapping_add(1);

        let address = self.address_bus(word.bus_c);

        let ar_field = if word.bus_ar == BusAR::Abxy && word.bus_aw == BusAW::Abxy {
            (self.i >> 2) & 3
        } else {
            self.i & 3
        };
        let value = match word.bus_ar {
            BusAR::Abxy => self.regs[ar_field as usize],
            BusAR::D => self.d,
            BusAR::In => self.input,
            BusAR::T => self.t,
            BusAR::Ram => self.memory(address),
            BusAR::Pc => read_half(self.pc, word.bus_b),
            BusAR::Sp => read_half(self.sp, word.bus_b),
            BusAR::Bp => read_half(self.bp, word.bus_b),
        };
        let value_b = match word.bus_b {
            BusB::Ab => self.regs[((self.i >> 2) & 1) as usize],
            BusB::D => self.d,
        };

        trace!(target: "sim", "{:05x} {:?} {:?} ar:{:02x} b:{:02x} addr:{:04x}",
            urom_addr, self, word, value, value_b, address);

        match word.bus_aw {
            BusAW::None => {}
            BusAW::Abxy => self.regs[(self.i & 3) as usize] = value,
            BusAW::D => self.d = value,
            BusAW::Out => {
                self.out = value;
                debug!(target: "sim", "out {:02x}", value);
                observer.on_output(value);
            }
            BusAW::AluT => {
                let (t, carry, zero) = alu8(value, value_b, word.alu_op(), word.alu_logic, word.alu_carry_in);
                self.t = t;
                self.flags[bank] = Flags::from_alu(carry, zero);
            }
            BusAW::ResetCycle => self.cycle = 0,
            BusAW::I => self.i = value,
            BusAW::Ram => {
                if address as usize >= BIOS_SIZE {
                    self.ram[address as usize] = value;
                }
            }
            BusAW::Pc => *half(&mut self.pc, word.bus_b) = value,
            BusAW::Sp => {
                let value = if word.bus_b.is_low() { value } else { SP_BASE | value };
                *half(&mut self.sp, word.bus_b) = value;
            }
            BusAW::Bp => *half(&mut self.bp, word.bus_b) = value,
            BusAW::Ma => *half(&mut self.ma, word.bus_b) = value,
            BusAW::PcPlus => self.pc = self.pc().wrapping_add(1).to_le_bytes(),
            BusAW::SpPlus => {
                self.sp[0] = self.sp[0].wrapping_add(1);
                self.max_sp = self.max_sp.max(self.sp());
            }
            BusAW::SpMinus => self.sp[0] = self.sp[0].wrapping_sub(1),
            BusAW::AdvancePcResetCycle => {
                self.pc = self.pc().wrapping_add(1).to_le_bytes();
                self.cycle = 0;
            }
        }

        self.ticks += 1;
        if self.ticks % CLOCK_TICKS_PER_INTERVAL == 0 {
            self.input ^= IN_CLOCK_BIT;
        }
    }

    /// Reads through the memory map: bootstrap image below `BIOS_SIZE`,
    /// RAM above.
    pub fn memory(&self, address: u16) -> u8 {
        let address = address as usize;
        if address < BIOS_SIZE {
            self.bios[address]
        } else {
            self.ram[address]
        }
    }

    pub fn bios(&self) -> &[u8] {
        &self.bios
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn reg(&self, r: Register) -> u8 {
        self.regs[r as usize]
    }

    pub fn pc(&self) -> u16 {
        u16::from_le_bytes(self.pc)
    }

    pub fn sp(&self) -> u16 {
        u16::from_le_bytes(self.sp)
    }

    pub fn bp(&self) -> u16 {
        u16::from_le_bytes(self.bp)
    }

    pub fn ma(&self) -> u16 {
        u16::from_le_bytes(self.ma)
    }

    pub fn xy(&self) -> u16 {
        u16::from_le_bytes([self.regs[Register::X as usize], self.regs[Register::Y as usize]])
    }

    /// Flags of the bank the current instruction uses.
    pub fn active_flags(&self) -> Flags {
        self.flags[self.flag_bank()]
    }

    pub fn cycle(&self) -> u8 {
        self.cycle
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Highest stack pointer reached by a push since reset.
    pub fn max_sp(&self) -> u16 {
        self.max_sp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::isa::{assemble, Op, Operand, Operand::*};
    use common::Register::*;
    use itertools::iproduct;
    use lazy_static::lazy_static;
    use strum::IntoEnumIterator;

    lazy_static! {
        static ref IMAGE: ControlStoreImage = ucode::ucode(false).unwrap();
    }

    #[derive(Default)]
    struct Program(Vec<u8>);

    impl Program {
        fn i(mut self, mnemonic: &str, operands: &[Operand]) -> Program {
            self.0.extend(assemble(mnemonic, operands).unwrap());
            self
        }

        fn org(mut self, address: usize) -> Program {
            assert!(self.0.len() <= address);
            self.0.resize(address, 0);
            self
        }

        fn len(&self) -> u16 {
            self.0.len() as u16
        }
    }

    fn machine(program: &Program) -> Machine {
        let mut m = Machine::new(&IMAGE).unwrap();
        m.load_bios(&program.0).unwrap();
        m
    }

    fn run_to_halt(m: &mut Machine, out: &mut Vec<u8>) {
        for _ in 0..10_000 {
            if m.i == Op::Halt.opcode() {
                return;
            }
            m.step_instruction(out);
        }
        panic!("never halted: {:?}", m);
    }

    fn run(program: &Program) -> (Machine, Vec<u8>) {
        let mut m = machine(program);
        let mut out = Vec::new();
        run_to_halt(&mut m, &mut out);
        (m, out)
    }

    #[test]
    fn reset_state() {
        let m = Machine::new(&IMAGE).unwrap();
        assert_eq!(0xF000, m.sp());
        assert_eq!(0, m.pc());
        assert_eq!(0, m.ticks());
        assert!(m.flags.iter().all(|f| f.is_empty()));
        assert!(!m.is_running());
    }

    #[test]
    fn bios_size() {
        let mut m = Machine::new(&IMAGE).unwrap();
        assert!(matches!(m.load_bios(&[0; BIOS_SIZE + 1]), Err(ImageError::BiosSize(_))));
        m.load_bios(&[0xFF; BIOS_SIZE]).unwrap();
        m.load_bios(&[0x01]).unwrap();
        assert_eq!(0x01, m.memory(0));
        assert_eq!(0x00, m.memory(1));
    }

    #[test]
    fn mov_add_out() {
        let body = Program::default()
            .i("mov", &[Imm(5), Reg(A)])
            .i("add", &[Imm(7), Reg(A)])
            .i("out", &[Reg(A)]);
        let end = body.len();
        let (m, out) = run(&body.i("halt", &[]));

        assert_eq!(12, m.reg(A));
        assert_eq!(12, m.out);
        assert_eq!(vec![12], out);
        assert_eq!(end, m.pc());
    }

    #[test]
    fn every_register() {
        for r in Register::iter() {
            let p = Program::default()
                .i("mov", &[Imm(0x40 + r as u8), Reg(r)])
                .i("inc", &[Reg(r)])
                .i("push", &[Reg(r)])
                .i("halt", &[]);
            let (m, _) = run(&p);
            assert_eq!(0x41 + r as u8, m.reg(r), "{}", r);
            assert_eq!(0x41 + r as u8, m.memory(0xF000), "{}", r);
            for other in Register::iter().filter(|o| *o != r) {
                assert_eq!(0, m.reg(other));
            }
        }
    }

    #[test]
    fn halt_spins() {
        let mut m = machine(&Program::default().i("halt", &[]));
        let ticks = m.run(100, &mut ());
        assert_eq!(100, ticks);
        assert_eq!(0, m.pc());
        assert_eq!(0xFF, m.i);
        assert!(m.is_running());
        m.pause();
        assert!(!m.is_running());
    }

    #[test]
    fn unassigned_opcode_is_nop() {
        let (m, _) = run(&Program::default().i("nop", &[]).i("nop", &[]).i("halt", &[]));
        assert_eq!(2, m.pc());
    }

    #[test]
    fn call_ret() {
        let p = Program::default()
            .i("call", &[Addr(0x0008)])
            .i("out", &[Reg(A)])
            .i("halt", &[])
            .org(0x0008)
            .i("mov", &[Imm(0x2A), Reg(A)])
            .i("ret", &[]);
        let (m, out) = run(&p);

        assert_eq!(vec![0x2A], out);
        assert_eq!(0xF000, m.sp());
        assert_eq!(4, m.pc());
        assert_eq!(0xF002, m.max_sp());
    }

    #[test]
    fn ret_drops_arguments() {
        let p = Program::default()
            .i("push", &[Imm(1)])
            .i("push", &[Imm(2)])
            .i("call", &[Addr(0x000A)])
            .i("halt", &[])
            .org(0x000A)
            .i("ret", &[Imm(2)]);
        let (m, _) = run(&p);

        assert_eq!(0xF000, m.sp());
        assert_eq!(7, m.pc());
        assert_eq!(1, m.memory(0xF000));
        assert_eq!(2, m.memory(0xF001));
    }

    #[test]
    fn conditional_jumps() {
        let jumps: [(&str, fn(u8, u8) -> bool); 6] = [
            ("je", |src, reg| src == reg),
            ("jne", |src, reg| src != reg),
            ("jg", |src, reg| src > reg),
            ("jge", |src, reg| src >= reg),
            ("jl", |src, reg| src < reg),
            ("jle", |src, reg| src <= reg),
        ];

        let operands = [(3, 3), (5, 3), (3, 5), (0, 0xFF), (0xFF, 0)];
        for ((mnemonic, expected), (src, reg)) in iproduct!(jumps, operands) {
            let p = Program::default()
                .i("mov", &[Imm(reg), Reg(B)])
                .i("cmp", &[Imm(src), Reg(B)])
                .i(mnemonic, &[Addr(0x000C)])
                .i("out", &[Imm(0)])
                .i("halt", &[])
                .org(0x000C)
                .i("out", &[Imm(1)])
                .i("halt", &[]);
            let (_, out) = run(&p);
            assert_eq!(vec![expected(src, reg) as u8], out, "{} src:{} reg:{}", mnemonic, src, reg);
        }
    }

    #[test]
    fn jmp() {
        let p = Program::default()
            .i("jmp", &[Addr(0x0010)])
            .i("out", &[Imm(0)])
            .org(0x0010)
            .i("halt", &[]);
        let (m, out) = run(&p);
        assert!(out.is_empty());
        assert_eq!(0x0010, m.pc());
    }

    #[test]
    fn logic_uses_the_other_flag_bank() {
        // xor sets zero in bank 0, je reads bank 1
        let p = Program::default()
            .i("mov", &[Imm(1), Reg(A)])
            .i("cmp", &[Imm(2), Reg(A)])
            .i("xor", &[Reg(A), Reg(A)])
            .i("je", &[Addr(0x0010)])
            .i("out", &[Imm(0)])
            .i("halt", &[])
            .org(0x0010)
            .i("out", &[Imm(1)])
            .i("halt", &[]);
        let (m, out) = run(&p);
        assert_eq!(vec![0], out);
        assert_eq!(0, m.reg(A));
        assert!(m.flags[0].zero());
        assert!(!m.flags[1].zero());
    }

    #[test]
    fn logic() {
        let p = Program::default()
            .i("mov", &[Imm(0b1100), Reg(A)])
            .i("mov", &[Imm(0b1010), Reg(X)])
            .i("mov", &[Imm(0b1010), Reg(Y)])
            .i("mov", &[Imm(0x0F), Reg(B)])
            .i("and", &[Reg(A), Reg(X)])
            .i("or", &[Reg(A), Reg(Y)])
            .i("xor", &[Imm(0xFF), Reg(B)])
            .i("not", &[Reg(A)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0b1000, m.reg(X));
        assert_eq!(0b1110, m.reg(Y));
        assert_eq!(0xF0, m.reg(B));
        assert_eq!(0xF3, m.reg(A));
    }

    #[test]
    fn shifts() {
        let p = Program::default()
            .i("mov", &[Imm(0x9D), Reg(A)])
            .i("mov", &[Imm(0x9D), Reg(B)])
            .i("mov", &[Imm(0x9D), Reg(X)])
            .i("shl", &[Reg(A)])
            .i("shr", &[Reg(B)])
            .i("swap", &[Reg(X)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x3A, m.reg(A));
        assert_eq!(0x4E, m.reg(B));
        assert_eq!(0xD9, m.reg(X));
    }

    #[test]
    fn shr_ignores_incoming_carry() {
        let p = Program::default()
            .i("mov", &[Imm(0xFF), Reg(A)])
            // leaves carry set in bank 0
            .i("shl", &[Reg(A)])
            .i("mov", &[Imm(0x02), Reg(Y)])
            .i("shr", &[Reg(Y)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x01, m.reg(Y));
    }

    #[test]
    fn arithmetic() {
        let p = Program::default()
            .i("mov", &[Imm(3), Reg(A)])
            .i("mov", &[Imm(5), Reg(B)])
            .i("sub", &[Reg(B), Reg(A)])
            .i("mov", &[Imm(0), Reg(X)])
            .i("subc", &[Imm(0), Reg(X)])
            .i("mov", &[Imm(0xFF), Reg(Y)])
            .i("inc", &[Reg(Y)])
            .i("incc", &[Reg(B)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0xFE, m.reg(A));
        assert_eq!(0xFF, m.reg(X));
        assert_eq!(0x00, m.reg(Y));
        assert_eq!(6, m.reg(B));
    }

    #[test]
    fn sixteen_bit_add() {
        // 0x01FF + 0x0001
        let p = Program::default()
            .i("mov", &[Imm(0xFF), Reg(A)])
            .i("mov", &[Imm(0x01), Reg(B)])
            .i("add", &[Imm(0x01), Reg(A)])
            .i("addc", &[Imm(0x00), Reg(B)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x00, m.reg(A));
        assert_eq!(0x02, m.reg(B));
        assert!(!m.flags[1].zero());
    }

    #[test]
    fn pair_arithmetic() {
        let p = Program::default()
            .i("gp", &[Addr(0x12FF)])
            .i("incp", &[])
            .i("mov", &[Imm(0x20), Reg(A)])
            .i("addp", &[Reg(A)])
            .i("subp", &[Imm(0x21)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x12FF, m.xy());

        let (m, _) = run(&Program::default().i("gp", &[Addr(0x1300)]).i("decp", &[]).i("halt", &[]));
        assert_eq!(0x12FF, m.xy());
    }

    #[test]
    fn dec() {
        let p = Program::default()
            .i("mov", &[Imm(0x00), Reg(A)])
            .i("mov", &[Imm(0x10), Reg(B)])
            .i("dec", &[Reg(A)])
            .i("decc", &[Reg(B)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0xFF, m.reg(A));
        assert_eq!(0x0F, m.reg(B));
    }

    #[test]
    fn moves() {
        let p = Program::default()
            .i("mov", &[Imm(1), Reg(A)])
            .i("mov", &[Imm(2), Reg(B)])
            .i("mov", &[Imm(3), Reg(Y)])
            .i("xchg", &[Reg(A), Reg(B)])
            .i("mov", &[Reg(Y), Reg(X)])
            .i("clr", &[Reg(Y)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!([2, 1, 3, 0], m.regs);
    }

    #[test]
    fn memory() {
        let p = Program::default()
            .i("mov", &[Imm(0x66), Reg(X)])
            .i("st", &[Reg(X), Addr(0x0A00)])
            .i("ld", &[Addr(0x0A00), Reg(Y)])
            .i("st", &[Imm(0x44), Addr(0x0900)])
            .i("mov", &[Imm(0x55), Reg(A)])
            .i("xchg", &[Addr(0x0900), Reg(A)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x66, m.memory(0x0A00));
        assert_eq!(0x66, m.reg(Y));
        assert_eq!(0x55, m.memory(0x0900));
        assert_eq!(0x44, m.reg(A));
    }

    #[test]
    fn bios_is_read_only() {
        let p = Program::default()
            .i("st", &[Imm(0x99), Addr(0x0000)])
            .i("st", &[Imm(0x99), Addr(0x0010)])
            .i("st", &[Imm(0x99), Addr(0x0800)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(p.0[0], m.memory(0x0000));
        assert_eq!(0x00, m.memory(0x0010));
        assert_eq!(0x99, m.memory(0x0800));
    }

    #[test]
    fn pointer_access() {
        let p = Program::default()
            .i("gp", &[Addr(0x0B00)])
            .i("stp", &[Imm(0x12)])
            .i("ldp", &[Reg(A)])
            .i("gp", &[Addr(0x0B01)])
            .i("mov", &[Imm(0x34), Reg(B)])
            .i("stp", &[Reg(B)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x12, m.memory(0x0B00));
        assert_eq!(0x12, m.reg(A));
        assert_eq!(0x34, m.memory(0x0B01));
        assert_eq!(0x0B01, m.xy());
    }

    #[test]
    fn pair_offset() {
        let p = Program::default()
            .i("st", &[Imm(0x77), Addr(0x1102)])
            .i("gp", &[Addr(0x10FE)])
            .i("ldpo", &[Imm(4), Reg(A)])
            .i("mov", &[Imm(0x88), Reg(B)])
            .i("stpo", &[Reg(B), Imm(0x05)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x77, m.reg(A));
        assert_eq!(0x88, m.memory(0x1103));
        assert_eq!(0x1103, m.ma());
    }

    #[test]
    fn stack() {
        let p = Program::default()
            .i("mov", &[Imm(0x33), Reg(A)])
            .i("push", &[Reg(A)])
            .i("pop", &[Reg(B)])
            .i("push", &[Imm(0x44)])
            .i("push", &[Imm(0x55)])
            .i("rstsp", &[])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0x33, m.reg(B));
        assert_eq!(0x44, m.memory(0xF000));
        assert_eq!(0x55, m.memory(0xF001));
        assert_eq!(0xF000, m.sp());
        assert_eq!(0xF002, m.max_sp());
    }

    #[test]
    fn loops() {
        let p = Program::default()
            .i("mov", &[Imm(3), Reg(B)])
            .i("out", &[Reg(B)])
            .i("loopz", &[Reg(B), Addr(0x0002)])
            .i("halt", &[]);
        let (m, out) = run(&p);
        assert_eq!(vec![3, 2, 1, 0], out);
        assert_eq!(0, m.reg(B));
        assert_eq!(6, m.pc());

        let p = Program::default()
            .i("clr", &[Reg(A)])
            .i("out", &[Reg(A)])
            .i("loope", &[Imm(3), Reg(A), Addr(0x0001)])
            .i("halt", &[]);
        let (m, out) = run(&p);
        assert_eq!(vec![0, 1, 2, 3], out);
        assert_eq!(6, m.pc());
    }

    #[test]
    fn frames() {
        let p = Program::default()
            .i("mov", &[Imm(0x11), Reg(A)])
            .i("enter", &[])
            .i("stf", &[Reg(A), Imm(3)])
            .i("ldf", &[Imm(3), Reg(B)])
            .i("stf", &[Imm(4), Imm(0x22)])
            .i("gpf", &[Imm(3)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0xF002, m.sp());
        assert_eq!(0xEFE2, m.bp());
        assert_eq!(0x11, m.memory(0xEFE5));
        assert_eq!(0x22, m.memory(0xEFE6));
        assert_eq!(0x11, m.reg(B));
        assert_eq!(0xEFE5, m.xy());

        let (m, _) = run(&Program::default().i("enter", &[]).i("leave", &[]).i("halt", &[]));
        assert_eq!(0xF000, m.sp());
        assert_eq!(0, m.bp());
    }

    #[test]
    fn alloc_free() {
        let p = Program::default()
            .i("alloc", &[Imm(0x10)])
            .i("free", &[Imm(0x08)])
            .i("halt", &[]);
        let (m, _) = run(&p);
        assert_eq!(0xF008, m.sp());
    }

    #[test]
    fn input() {
        let p = Program::default().i("nop", &[]).i("in", &[Reg(A)]).i("out", &[Reg(A)]).i("halt", &[]);
        let mut m = machine(&p);
        m.set_input(0x0F);
        assert_eq!(0, m.input);

        let mut out = Vec::new();
        m.step_instruction(&mut out);
        m.set_input(0xA5);
        run_to_halt(&mut m, &mut out);
        assert_eq!(vec![0xA5 & !IN_CLOCK_BIT], out);
    }

    #[test]
    fn clock_line() {
        let mut m = machine(&Program::default().i("halt", &[]));
        m.run(CLOCK_TICKS_PER_INTERVAL - 2, &mut ());
        assert_eq!(0, m.input & IN_CLOCK_BIT);
        m.run(2, &mut ());
        assert_eq!(IN_CLOCK_BIT, m.input & IN_CLOCK_BIT);

        m.set_input(0x03);
        assert_eq!(IN_CLOCK_BIT | 0x03, m.input);
    }

    #[test]
    fn stop_resets() {
        let p = Program::default().i("mov", &[Imm(9), Reg(A)]).i("st", &[Reg(A), Addr(0x0900)]).i("halt", &[]);
        let (mut m, _) = run(&p);
        assert_eq!(9, m.memory(0x0900));
        m.stop();
        assert_eq!(0, m.memory(0x0900));
        assert_eq!(0, m.reg(A));
        assert_eq!(0, m.ticks());
        // the bootstrap image survives
        assert_eq!(p.0[0], m.memory(0));
    }

    struct Updates(usize);

    impl Observer for Updates {
        fn on_update(&mut self, machine: &Machine) {
            assert_eq!(0, machine.cycle());
            self.0 += 1;
        }
    }

    #[test]
    fn observer() {
        let mut m = machine(&Program::default().i("nop", &[]).i("halt", &[]));
        let mut updates = Updates(0);
        m.step_instruction(&mut updates);
        m.run(10, &mut updates);
        assert_eq!(2, updates.0);
    }
}
