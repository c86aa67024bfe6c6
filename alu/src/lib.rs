extern crate strum;

use lazy_static::lazy_static;

/// Every `(a, b, select, logic, carry_in)` combination, indexed by
/// [`lut_index`].
pub const ALU_LUT_SIZE: usize = 16 * 16 * 16 * 2 * 2;

lazy_static! {
    pub static ref ALU: Vec<(u8, bool, bool)> = (0..ALU_LUT_SIZE)
        .map(|i| {
            let i = i as u16;
            alu(
                (i & 0xF) as u8,
                ((i >> 4) & 0xF) as u8,
                ((i >> 8) & 0xF) as u8,
                (i >> 12) & 1 == 1,
                (i >> 13) & 1 == 1)
        })
        .collect();
}

pub fn lut_index(a: u8, b: u8, select: u8, logic: bool, carry_in: bool) -> usize {
    (a & 0xF) as usize
        | ((b & 0xF) as usize) << 4
        | ((select & 0xF) as usize) << 8
        | (logic as usize) << 12
        | (carry_in as usize) << 13
}

fn bit(v: u8, i: usize) -> bool {
    (v >> i) & 1 == 1
}

/// One 4-bit slice, evaluated gate by gate.
///
/// The carry pins of the part are active low. This function is not: a
/// `carry_in` of true adds one, and the returned carry is true when the
/// nibble overflowed (for subtraction, when no borrow occurred). `zero` is
/// true when the 4-bit result is zero.
pub fn alu(a: u8, b: u8, select: u8, logic: bool, carry_in: bool) -> (u8, bool, bool) {
    let s = [bit(select, 0), bit(select, 1), bit(select, 2), bit(select, 3)];
    let arith = !logic;
    let cn = !carry_in;

    // per-bit propagate / generate terms, both inverted
    let mut p = [false; 4];
    let mut g = [false; 4];
    for i in 0..4 {
        let (ai, bi) = (bit(a, i), bit(b, i));
        p[i] = !(ai | (bi & s[0]) | (!bi & s[1]));
        g[i] = !((!bi & ai & s[2]) | (ai & bi & s[3]));
    }

    let carry0 = !(cn & arith);

    let c1_a = !p[0];
    let c1_b = arith & p[0];
    let c1_c = arith & g[0] & cn;

    let c2_a = !p[1];
    let c2_b = arith & p[1];
    let c2_c = arith & p[0] & g[1];
    let c2_d = arith & g[0] & g[1] & cn;

    let c3_a = !p[2];
    let c3_b = arith & p[2];
    let c3_c = arith & p[1] & g[2];
    let c3_d = arith & p[0] & g[1] & g[2];
    let c3_e = arith & g[0] & g[1] & g[2] & cn;

    let d3 = !p[3];
    let all_g = g[0] & g[1] & g[2] & g[3];
    let ripple = !(all_g & cn);
    let gen = [
        p[0] & g[1] & g[2] & g[3],
        p[1] & g[2] & g[3],
        p[2] & g[3],
        p[3],
    ];

    let h0 = c1_a & g[0];
    let k1 = !(c1_b | c1_c);
    let h1 = c2_a & g[1];
    let k2 = !(c2_b | c2_c | c2_d);
    let h2 = c3_a & g[2];
    let k3 = !(c3_b | c3_c | c3_d | c3_e);
    let h3 = d3 & g[3];
    let no_generate = !(gen[0] | gen[1] | gen[2] | gen[3]);

    let f = [carry0 ^ h0, k1 ^ h1, k2 ^ h2, k3 ^ h3];
    let result = f.iter().enumerate().fold(0u8, |acc, (i, &fi)| acc | ((fi as u8) << i));

    let carry_out_pin = !ripple | !no_generate;

    (result, !carry_out_pin, result == 0)
}

/// Two slices chained through the carry: the low nibble's carry out feeds the
/// high nibble, and the 8-bit zero flag is the AND of both nibble zero flags.
pub fn alu8(a: u8, b: u8, select: u8, logic: bool, carry_in: bool) -> (u8, bool, bool) {
    let (lo, lo_carry, lo_zero) = lookup(a & 0xF, b & 0xF, select, logic, carry_in);
    let (hi, hi_carry, hi_zero) = lookup(a >> 4, b >> 4, select, logic, lo_carry);
    ((hi << 4) | lo, hi_carry, lo_zero && hi_zero)
}

pub fn lookup(a: u8, b: u8, select: u8, logic: bool, carry_in: bool) -> (u8, bool, bool) {
    ALU[lut_index(a, b, select, logic, carry_in)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ArithOp, LogicOp};
    use itertools::iproduct;
    use strum::IntoEnumIterator;

    fn expected_logic(op: LogicOp, a: u8, b: u8) -> u8 {
        let v = match op {
            LogicOp::NotA => !a,
            LogicOp::Nor => !(a | b),
            LogicOp::NotAAndB => !a & b,
            LogicOp::Zero => 0,
            LogicOp::Nand => !(a & b),
            LogicOp::NotB => !b,
            LogicOp::Xor => a ^ b,
            LogicOp::AAndNotB => a & !b,
            LogicOp::NotAOrB => !a | b,
            LogicOp::Xnor => !(a ^ b),
            LogicOp::B => b,
            LogicOp::And => a & b,
            LogicOp::One => 0xF,
            LogicOp::AOrNotB => a | !b,
            LogicOp::Or => a | b,
            LogicOp::A => a,
        };
        v & 0xF
    }

    fn expected_sum(op: ArithOp, a: u8, b: u8) -> u8 {
        match op {
            ArithOp::A => a,
            ArithOp::MinusOne => 15,
            ArithOp::AMinusBMinusOne => a + (15 - b),
            ArithOp::APlusB => a + b,
            ArithOp::APlusA => a + a,
            ArithOp::AMinusOne => a + 15,
        }
    }

    #[test]
    fn probes() {
        let add = ArithOp::APlusB as u8;
        assert_eq!((8, false, false), alu(5, 3, add, false, false));
        assert_eq!((9, false, false), alu(5, 3, add, false, true));
        assert_eq!((0, true, true), alu(15, 1, add, false, false));
    }

    #[test]
    fn logic() {
        for op in LogicOp::iter() {
            for (a, b, carry_in) in iproduct!(0..16u8, 0..16u8, [false, true]) {
                let (result, _, zero) = alu(a, b, op as u8, true, carry_in);
                let expected = expected_logic(op, a, b);
                assert_eq!(expected, result, "{:?} {} {} {}", op, a, b, carry_in);
                assert_eq!(expected == 0, zero);
            }
        }
    }

    #[test]
    fn arithmetic() {
        for op in ArithOp::iter() {
            for (a, b, carry_in) in iproduct!(0..16u8, 0..16u8, [false, true]) {
                let sum = expected_sum(op, a, b) + carry_in as u8;
                assert_eq!(
                    (sum & 0xF, sum > 15, sum & 0xF == 0),
                    alu(a, b, op as u8, false, carry_in),
                    "{:?} {} {} {}", op, a, b, carry_in);
            }
        }
    }

    #[test]
    fn subtract_sets_carry_without_borrow() {
        let sub = ArithOp::AMinusBMinusOne as u8;
        assert_eq!((2, true, false), alu(5, 3, sub, false, true));
        assert_eq!((0, true, true), alu(3, 3, sub, false, true));
        assert_eq!((14, false, false), alu(3, 5, sub, false, true));
    }

    #[test]
    fn lut_matches_gates() {
        for (i, entry) in ALU.iter().enumerate() {
            let (a, b, select) = (i as u8 & 0xF, (i >> 4) as u8 & 0xF, (i >> 8) as u8 & 0xF);
            let (logic, carry_in) = ((i >> 12) & 1 == 1, (i >> 13) & 1 == 1);
            assert_eq!(i, lut_index(a, b, select, logic, carry_in));
            assert_eq!(alu(a, b, select, logic, carry_in), *entry);
        }
    }

    #[test]
    fn eight_bit() {
        let add = ArithOp::APlusB as u8;
        let sub = ArithOp::AMinusBMinusOne as u8;
        for (a, b) in iproduct!((0..=255u8).step_by(7), (0..=255u8).step_by(5)) {
            let sum = a as u16 + b as u16;
            assert_eq!(((sum & 0xFF) as u8, sum > 0xFF, sum & 0xFF == 0), alu8(a, b, add, false, false));

            let (diff, no_borrow, zero) = alu8(a, b, sub, false, true);
            assert_eq!((a.wrapping_sub(b), a >= b, a == b), (diff, no_borrow, zero));
        }

        assert_eq!((0, true, true), alu8(0xFF, 0, ArithOp::A as u8, false, true));
        let (result, _, zero) = alu8(0x0F, 0xF0, LogicOp::NotA as u8, true, false);
        assert_eq!((0xF0, false), (result, zero));
        // zero needs both nibbles clear
        assert_eq!((0x10, false, false), alu8(0x10, 0, ArithOp::A as u8, false, false));
        assert_eq!((0x38, true, false), alu8(0x9C, 0, ArithOp::APlusA as u8, false, false));
    }
}
