use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use crate::address::{Address, Register};
use crate::bytecode::binary::decode_variable_name;

/**
  Opcodes of the machine. The discriminant of each variant is its 5 bit code in the instruction
  word. The codes are not contiguous: `11010`-`11101` and `10010`-`10111` are unassigned and fail
  to decode.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u8)]
pub enum Operation {
  // Data movement //
  #[strum(to_string = "LDA")]  Load        = 0b00000, // LDA register, source
  #[strum(to_string = "STR")]  Store       = 0b00001, // STR variable, register|constant
  #[strum(to_string = "PUSH")] Push        = 0b00010, // PUSH source
  // Bitwise //
  #[strum(to_string = "AND")]  And         = 0b00011, // AND register, source
  #[strum(to_string = "OR")]   Or          = 0b00100, // OR register, source
  // Arithmetic //
  #[strum(to_string = "ADD")]  Add         = 0b00101, // ADD register, source
  #[strum(to_string = "SUB")]  Subtract    = 0b00110, // SUB register, source
  #[strum(to_string = "DIV")]  Divide      = 0b00111, // DIV register, source
  #[strum(to_string = "MUL")]  Multiply    = 0b01000, // MUL register, source
  #[strum(to_string = "MOD")]  Modulo      = 0b01001, // MOD register, source
  #[strum(to_string = "INC")]  Increment   = 0b01010, // INC register
  #[strum(to_string = "DEC")]  Decrement   = 0b01011, // DEC register
  // Control flow //
  #[strum(to_string = "BEQ")]  BranchEqual    = 0b01100, // BEQ source, source, label
  #[strum(to_string = "BNE")]  BranchNotEqual = 0b01101, // BNE source, source, label
  #[strum(to_string = "BBG")]  BranchBigger   = 0b01110, // BBG source, source, label
  #[strum(to_string = "BSM")]  BranchSmaller  = 0b01111, // BSM source, source, label
  #[strum(to_string = "JMP")]  Jump           = 0b10000, // JMP label
  #[strum(to_string = "HLT")]  Halt           = 0b10001, // HLT
  // Stack and complement //
  #[strum(to_string = "POP")]  Pop         = 0b11000, // POP register
  #[strum(to_string = "NOT")]  Not         = 0b11001, // NOT register
  // Variable management //
  #[strum(to_string = "VAD")]  VariableAdd    = 0b11110, // VAD name
  #[strum(to_string = "VDE")]  VariableDelete = 0b11111, // VDE name
}

/// Which fields of the instruction word an operation reads, used for disassembly.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Format {
  /// `OP operand1 operand2`
  Binary,
  /// `OP operand1`
  Unary,
  /// `OP operand1 operand2 label`
  Branch,
  /// `OP label`
  Jump,
  /// `OP`
  Nullary,
  /// `OP name`, the name packed across both operands and the label.
  Variable,
}

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn format(&self) -> Format {
    match self {
      | Operation::Load
      | Operation::Store
      | Operation::And
      | Operation::Or
      | Operation::Add
      | Operation::Subtract
      | Operation::Divide
      | Operation::Multiply
      | Operation::Modulo => Format::Binary,

      | Operation::Push
      | Operation::Pop
      | Operation::Not
      | Operation::Increment
      | Operation::Decrement => Format::Unary,

      | Operation::BranchEqual
      | Operation::BranchNotEqual
      | Operation::BranchBigger
      | Operation::BranchSmaller => Format::Branch,

      Operation::Jump => Format::Jump,
      Operation::Halt => Format::Nullary,

      | Operation::VariableAdd
      | Operation::VariableDelete => Format::Variable,
    }
  }
}

/// How an operand field is to be interpreted. The discriminant is the 2 bit code.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum OperandKind {
  #[strum(to_string = "register")] Register = 0b00,
  #[strum(to_string = "constant")] Constant = 0b01,
  #[strum(to_string = "memory")]   Memory   = 0b10,
  #[strum(to_string = "label")]    Label    = 0b11,
}

impl OperandKind {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }
}

/// A fully typed instruction. The operand fields keep their raw 9 bit contents; what they mean
/// depends on the corresponding kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub operation : Operation,
  pub kind1     : OperandKind,
  pub kind2     : OperandKind,
  pub operand1  : u16,
  pub operand2  : u16,
  pub label     : u8,
}

impl Instruction {
  pub fn new(
    operation: Operation,
    kind1: OperandKind,
    kind2: OperandKind,
    operand1: u16,
    operand2: u16,
    label: u8
  ) -> Instruction {
    Instruction { operation, kind1, kind2, operand1, operand2, label }
  }

  /// An instruction taking no operands, like `HLT`.
  pub fn nullary(operation: Operation) -> Instruction {
    Instruction::new(operation, OperandKind::Register, OperandKind::Register, 0, 0, 0)
  }

  pub fn operand(&self, position: u8) -> (OperandKind, u16) {
    match position {
      1 => (self.kind1, self.operand1),
      _ => (self.kind2, self.operand2),
    }
  }

  /// Writes the text of one operand without consulting any machine state. Memory operands are
  /// shown by address.
  fn fmt_operand(kind: OperandKind, raw: u16, f: &mut Formatter<'_>) -> std::fmt::Result {
    match kind {
      OperandKind::Register => match Register::from_code(raw) {
        Ok(register) => write!(f, "{}", register),
        Err(_)       => write!(f, "r?{}", raw),
      },
      OperandKind::Constant => write!(f, "{}", raw),
      OperandKind::Memory   => write!(f, "{}", Address::new(raw)),
      OperandKind::Label    => write!(f, "@{}", raw),
    }
  }
}

/// One operand field displayed on its own, as it appears in `Instruction`'s `Display`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RawOperand(pub OperandKind, pub u16);

impl Display for RawOperand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Instruction::fmt_operand(self.0, self.1, f)
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.operation)?;
    match self.operation.format() {

      Format::Binary => {
        write!(f, " ")?;
        Instruction::fmt_operand(self.kind1, self.operand1, f)?;
        write!(f, " ")?;
        Instruction::fmt_operand(self.kind2, self.operand2, f)
      }

      Format::Unary => {
        write!(f, " ")?;
        Instruction::fmt_operand(self.kind1, self.operand1, f)
      }

      Format::Branch => {
        write!(f, " ")?;
        Instruction::fmt_operand(self.kind1, self.operand1, f)?;
        write!(f, " ")?;
        Instruction::fmt_operand(self.kind2, self.operand2, f)?;
        write!(f, " {}", self.label)
      }

      Format::Jump => write!(f, " {}", self.label),

      Format::Nullary => Ok(()),

      Format::Variable => write!(f, " {}", decode_variable_name(self)),

    }
  }
}
