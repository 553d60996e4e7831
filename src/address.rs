//! The two kinds of storage an operand can name: one of the four registers, or a slot in the
//! 512 word memory. Both hold 9 bit unsigned values.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use crate::error::ExecutionError;

/// Registers, memory slots and stack entries all hold a 9 bit unsigned value.
pub type Value = u16;

pub const VALUE_BITS : u32   = 9;
pub const MAX_VALUE  : Value = (1 << VALUE_BITS) - 1;
pub const MEMORY_SIZE: usize = 1 << VALUE_BITS;

/// A 9 bit index into memory.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Address(u16);

impl Address {
  /// Truncates `value` to the 9 bits of the address space.
  pub fn new(value: u16) -> Address {
    Address(value & MAX_VALUE)
  }

  /// Converts an index into the memory vector to an address, or `None` past the end of memory.
  pub fn from_idx(idx: usize) -> Option<Address> {
    match idx < MEMORY_SIZE {
      true  => Some(Address(idx as u16)),
      false => None
    }
  }

  /// Converts the address to an index into the memory vector.
  pub fn idx(&self) -> usize {
    self.0 as usize
  }

  pub fn value(&self) -> u16 {
    self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "M[{}]", self.0)
  }
}

/// The register file. A register operand holds the register's code, `0..=3`.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u16)]
pub enum Register {
  #[strum(to_string = "t0")]
  T0 = 0,
  #[strum(to_string = "t1")]
  T1 = 1,
  #[strum(to_string = "t2")]
  T2 = 2,
  #[strum(to_string = "t3")]
  T3 = 3,
}

pub const REGISTER_COUNT: usize = 4;

impl Register {
  /// Resolves the canonical code found in a register operand.
  pub fn from_code(code: u16) -> Result<Register, ExecutionError> {
    Register::try_from(code).map_err(|_| ExecutionError::InvalidRegister(code))
  }

  pub fn code(&self) -> u16 {
    Into::<u16>::into(*self)
  }

  /// Converts the register to an index into the register file.
  pub fn idx(&self) -> usize {
    self.code() as usize
  }
}
