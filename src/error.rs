//! Error types for every stage of the simulator: loading an image, decoding its words, and
//! executing the decoded program.

use std::path::PathBuf;

use string_cache::DefaultAtom;
use thiserror::Error;

use crate::address::Address;
use crate::bytecode::{OperandKind, Operation};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors found while reading a program image, before any word is decoded.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("could not read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid file content: {character:?} at position {position} is not 0, 1 or a newline")]
  InvalidFileContent { position: usize, character: char },

  #[error("invalid file length: {length} bits is not a multiple of 32")]
  InvalidFileLength { length: usize },

  #[error("instruction {index}: {source}")]
  Decode {
    index: usize,
    #[source]
    source: DecodeError,
  },
}

/// Errors found while turning a word into an `Instruction`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
  #[error("invalid opcode {0:05b}")]
  InvalidOpcode(u8),

  #[error("invalid operand kind {0:02b}")]
  InvalidOperandKind(u8),
}

/// Errors raised by a single instruction. None of these leave a partial write behind.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ExecutionError {
  #[error("{operation}: operand {position} cannot be a {kind}")]
  InvalidOperandKind {
    operation: Operation,
    position: u8,
    kind: OperandKind,
  },

  #[error("invalid register {0:09b}")]
  InvalidRegister(u16),

  #[error("no variable is bound at {0}")]
  UnboundVariable(Address),

  #[error("{0}: overflow")]
  Overflow(Operation),

  #[error("{0}: underflow")]
  Underflow(Operation),

  #[error("{0}: division by zero")]
  DivideByZero(Operation),

  #[error("stack overflow")]
  StackOverflow,

  #[error("stack underflow")]
  StackUnderflow,

  #[error("no free memory slot")]
  NoFreeSlot,

  #[error("invalid variable name {0:?}")]
  InvalidVariableName(String),

  #[error("variable {0} already exists")]
  VariableExists(DefaultAtom),

  #[error("variable {0} does not exist")]
  VariableNotFound(DefaultAtom),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Load(#[from] LoadError),

  #[error("at instruction {program_counter}: {source}")]
  Execution {
    program_counter: usize,
    #[source]
    source: ExecutionError,
  },
}
