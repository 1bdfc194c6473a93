//! Condition flags.
//!
//! Bit positions follow x86 EFLAGS so a flags word read with `mov eax, flags`
//! looks familiar. Carry follows x86 borrow semantics: after `sub a, b`, CF is
//! set when `a < b` as unsigned values.

/// Carry flag bit.
pub const CF: u32 = 0x0001;
/// Zero flag bit.
pub const ZF: u32 = 0x0040;
/// Sign flag bit.
pub const SF: u32 = 0x0080;
/// Overflow flag bit.
pub const OF: u32 = 0x0800;

/// Condition flags for branching decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Zero flag: set when result is zero.
    pub zf: bool,
    /// Sign flag: set when the result's top bit is set.
    pub sf: bool,
    /// Carry flag: unsigned carry out of, or borrow into, the top bit.
    pub cf: bool,
    /// Overflow flag: signed overflow.
    pub of: bool,
}

impl Flags {
    /// Decode a flags word. Unknown bits are ignored.
    pub fn from_word(word: u32) -> Self {
        Self {
            zf: word & ZF != 0,
            sf: word & SF != 0,
            cf: word & CF != 0,
            of: word & OF != 0,
        }
    }

    /// Encode into a flags word.
    pub fn to_word(self) -> u32 {
        let mut word = 0;
        if self.zf {
            word |= ZF;
        }
        if self.sf {
            word |= SF;
        }
        if self.cf {
            word |= CF;
        }
        if self.of {
            word |= OF;
        }
        word
    }

    /// Flags for a logic result: ZF and SF from the value, CF and OF clear.
    #[inline]
    pub fn from_logic(result: u32) -> Self {
        Self {
            zf: result == 0,
            sf: (result as i32) < 0,
            cf: false,
            of: false,
        }
    }

    /// Flags for `a + b = result`.
    #[inline]
    pub fn from_add(a: u32, b: u32, result: u32) -> Self {
        let a_sign = (a >> 31) != 0;
        let b_sign = (b >> 31) != 0;
        let r_sign = (result >> 31) != 0;

        Self {
            zf: result == 0,
            sf: r_sign,
            cf: result < a,
            of: (a_sign == b_sign) && (r_sign != a_sign),
        }
    }

    /// Flags for `a - b = result`.
    #[inline]
    pub fn from_sub(a: u32, b: u32, result: u32) -> Self {
        let a_sign = (a >> 31) != 0;
        let b_sign = (b >> 31) != 0;
        let r_sign = (result >> 31) != 0;

        Self {
            zf: result == 0,
            sf: r_sign,
            cf: a < b,
            of: (a_sign != b_sign) && (r_sign != a_sign),
        }
    }

    /// Short display form, e.g. `ZF CF` or `-` when clear.
    pub fn describe(self) -> String {
        let names: Vec<&str> = [
            (self.cf, "CF"),
            (self.zf, "ZF"),
            (self.sf, "SF"),
            (self.of, "OF"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(" ")
        }
    }
}
