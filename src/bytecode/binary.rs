/*!
  This module is responsible for the encoding and decoding of binary instructions.
*/
use std::convert::TryFrom;

use super::{Instruction, OperandKind, Operation};
use crate::error::DecodeError;

// If you change this you must also change the field offsets below.
pub type Word = u32;
pub const WORD_BITS: usize = 32;

// Field offsets, counted from the least significant bit.
const OPCODE_SHIFT   : u32 = 27;
const KIND1_SHIFT    : u32 = 25;
const KIND2_SHIFT    : u32 = 23;
const OPERAND1_SHIFT : u32 = 14;
const OPERAND2_SHIFT : u32 = 5;

const OPCODE_MASK  : Word = 0b11111;
const KIND_MASK    : Word = 0b11;
const OPERAND_MASK : Word = 0x1FF;
const LABEL_MASK   : Word = 0b11111;

// A variable name is three 7 bit characters.
const NAME_CHARS    : usize = 3;
const NAME_CHAR_BITS: u32   = 7;
const NAME_CHAR_MASK: u32   = 0x7F;

/// The fields of an instruction word before any of them has been interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawInstruction {
  pub opcode   : u8,
  pub kind1    : u8,
  pub kind2    : u8,
  pub operand1 : u16,
  pub operand2 : u16,
  pub label    : u8,
}

/// Positional slicing of a word into its fields. Total over every `Word`.
pub fn slice(word: Word) -> RawInstruction {
  // [OpCode:5][Kind1:2][Kind2:2][Operand1:9][Operand2:9][Label:5]
  RawInstruction {
    opcode   : ((word >> OPCODE_SHIFT)   & OPCODE_MASK)  as u8,
    kind1    : ((word >> KIND1_SHIFT)    & KIND_MASK)    as u8,
    kind2    : ((word >> KIND2_SHIFT)    & KIND_MASK)    as u8,
    operand1 : ((word >> OPERAND1_SHIFT) & OPERAND_MASK) as u16,
    operand2 : ((word >> OPERAND2_SHIFT) & OPERAND_MASK) as u16,
    label    : ( word                    & LABEL_MASK)   as u8,
  }
}

pub fn decode_operation(code: u8) -> Result<Operation, DecodeError> {
  Operation::try_from(code).map_err(|_| DecodeError::InvalidOpcode(code))
}

pub fn decode_operand_kind(code: u8) -> Result<OperandKind, DecodeError> {
  OperandKind::try_from(code).map_err(|_| DecodeError::InvalidOperandKind(code))
}

pub fn decode(raw: RawInstruction) -> Result<Instruction, DecodeError> {
  Ok(
    Instruction {
      operation : decode_operation(raw.opcode)?,
      kind1     : decode_operand_kind(raw.kind1)?,
      kind2     : decode_operand_kind(raw.kind2)?,
      operand1  : raw.operand1,
      operand2  : raw.operand2,
      label     : raw.label,
    }
  )
}

pub fn decode_word(word: Word) -> Result<Instruction, DecodeError> {
  decode(slice(word))
}

/**
  Encodes the instruction into a word. Operand and label values wider than their fields are
  truncated.
*/
pub fn encode(instruction: &Instruction) -> Word {
  ((instruction.operation.code() as Word & OPCODE_MASK)  << OPCODE_SHIFT)   |
  ((instruction.kind1.code()     as Word & KIND_MASK)    << KIND1_SHIFT)    |
  ((instruction.kind2.code()     as Word & KIND_MASK)    << KIND2_SHIFT)    |
  ((instruction.operand1         as Word & OPERAND_MASK) << OPERAND1_SHIFT) |
  ((instruction.operand2         as Word & OPERAND_MASK) << OPERAND2_SHIFT) |
   (instruction.label            as Word & LABEL_MASK)
}

/// The 21 bits after the top two bits of `operand1`, in word order.
fn name_bits(instruction: &Instruction) -> u32 {
  (((instruction.operand1 as u32) & NAME_CHAR_MASK) << 14) |
  (((instruction.operand2 as u32) & OPERAND_MASK)   << 5)  |
   ((instruction.label    as u32) & LABEL_MASK)
}

/**
  Reads the variable name packed into a `VAD` or `VDE` instruction. The name always has three
  characters, each in `0..128`. Whether they form a legal name is for the caller to decide.
*/
pub fn decode_variable_name(instruction: &Instruction) -> String {
  let bits = name_bits(instruction);
  (0..NAME_CHARS)
    .rev()
    .map(|i| ((bits >> (i as u32 * NAME_CHAR_BITS)) & NAME_CHAR_MASK) as u8 as char)
    .collect()
}

/**
  Packs a three character ASCII name into `(operand1, operand2, label)`. Returns `None` if the
  name is not exactly three characters below 128.
*/
pub fn encode_variable_name(name: &str) -> Option<(u16, u16, u8)> {
  let chars: Vec<char> = name.chars().collect();
  if chars.len() != NAME_CHARS || chars.iter().any(|c| (*c as u32) > NAME_CHAR_MASK) {
    return None;
  }
  let bits = chars
    .iter()
    .fold(0u32, |bits, c| (bits << NAME_CHAR_BITS) | *c as u32);

  Some((
    (bits >> 14) as u16,
    ((bits >> 5) & OPERAND_MASK) as u16,
    (bits & LABEL_MASK) as u8
  ))
}
