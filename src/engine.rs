/*!
  The execution engine. `execute` dispatches on the operation of a decoded instruction and runs
  its handler against the machine.

  Every handler follows the same order: check the operand kinds, resolve every operand, compute
  the result, and only then write it back. A failing instruction therefore leaves the machine
  exactly as it found it.

  Handlers that change the program counter assign it directly. Advancing past the instruction
  is the caller's job (see `crate::simulator`).
*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use tracing::trace;

use crate::address::{Register, Value, MAX_VALUE};
use crate::bytecode::{decode_variable_name, Instruction, OperandKind, Operation};
use crate::error::ExecutionError;
use crate::machine::Machine;
use crate::operand::ResolvedOperand;

/// Operand kinds an instruction may read a value from.
const SOURCE: &[OperandKind] = &[OperandKind::Register, OperandKind::Constant, OperandKind::Memory];
const STORE_SOURCE: &[OperandKind] = &[OperandKind::Register, OperandKind::Constant];
const REGISTER: &[OperandKind] = &[OperandKind::Register];
const MEMORY: &[OperandKind] = &[OperandKind::Memory];
const CONSTANT: &[OperandKind] = &[OperandKind::Constant];
const LABEL: &[OperandKind] = &[OperandKind::Label];

/// What the driver of the machine must react to after an instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Signal {
  Continue,
  /// The program executed `HLT`.
  Halt,
  /// A variable was bound or unbound, so the disassembly of memory operands has changed.
  VariablesChanged,
}

/// The record of one executed instruction: its operation and operands as resolved when it ran.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Executed {
  pub operation : Operation,
  pub operands  : Vec<ResolvedOperand>,
  pub signal    : Signal,
}

impl Executed {
  fn new(operation: Operation, operands: Vec<ResolvedOperand>) -> Executed {
    Executed { operation, operands, signal: Signal::Continue }
  }

  fn with_signal(mut self, signal: Signal) -> Executed {
    self.signal = signal;
    self
  }
}

impl Display for Executed {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.operation)?;
    for operand in &self.operands {
      write!(f, " {}", operand)?;
    }
    Ok(())
  }
}

/// Executes one instruction against `machine`.
pub fn execute(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  trace!(pc = machine.program_counter(), %instruction, "executing");

  match instruction.operation {
    Operation::Load           => load(instruction, machine),
    Operation::Store          => store(instruction, machine),
    Operation::Push           => push(instruction, machine),
    Operation::Pop            => pop(instruction, machine),
    Operation::And            => arithmetic(instruction, machine, |dest, source| Ok(dest & source)),
    Operation::Or             => arithmetic(instruction, machine, |dest, source| Ok(dest | source)),
    Operation::Not            => not(instruction, machine),
    Operation::Add            => arithmetic(instruction, machine, add),
    Operation::Subtract       => arithmetic(instruction, machine, subtract),
    Operation::Multiply       => arithmetic(instruction, machine, multiply),
    Operation::Divide         => arithmetic(instruction, machine, divide),
    Operation::Modulo         => arithmetic(instruction, machine, modulo),
    Operation::Increment      => increment(instruction, machine),
    Operation::Decrement      => decrement(instruction, machine),
    Operation::BranchEqual    => branch(instruction, machine, |a, b| a == b),
    Operation::BranchNotEqual => branch(instruction, machine, |a, b| a != b),
    Operation::BranchBigger   => branch(instruction, machine, |a, b| a > b),
    Operation::BranchSmaller  => branch(instruction, machine, |a, b| a < b),
    Operation::Jump           => jump(instruction, machine),
    Operation::Halt           => halt(instruction, machine),
    Operation::VariableAdd    => variable_add(instruction, machine),
    Operation::VariableDelete => variable_delete(instruction, machine),
  }
}

// region Operand helpers

fn require(instruction: &Instruction, position: u8, allowed: &[OperandKind]) -> Result<(), ExecutionError> {
  let (kind, _raw) = instruction.operand(position);
  match allowed.contains(&kind) {
    true  => Ok(()),
    false => Err(ExecutionError::InvalidOperandKind { operation: instruction.operation, position, kind })
  }
}

fn resolve(instruction: &Instruction, position: u8, machine: &Machine) -> Result<ResolvedOperand, ExecutionError> {
  let (kind, raw) = instruction.operand(position);
  ResolvedOperand::resolve(machine, kind, raw)
}

/// Resolves the destination register held by the first operand. Its kind must already be checked.
fn destination(instruction: &Instruction, machine: &Machine) -> Result<Register, ExecutionError> {
  machine.resolve_register(instruction.operand1)
}

/// Decodes and validates the name carried by `VAD` and `VDE`.
fn variable_name(instruction: &Instruction) -> Result<DefaultAtom, ExecutionError> {
  require(instruction, 1, CONSTANT)?;
  require(instruction, 2, CONSTANT)?;

  let name = decode_variable_name(instruction);
  match name.chars().all(|c| c.is_ascii_alphabetic()) {
    true  => Ok(DefaultAtom::from(name)),
    false => Err(ExecutionError::InvalidVariableName(name))
  }
}

// endregion

// region Data movement

/// `LDA register, source`: copies the source value into the register.
fn load(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, REGISTER)?;
  require(instruction, 2, SOURCE)?;
  let dest = destination(instruction, machine)?;
  let source = resolve(instruction, 2, machine)?;

  let value = source.value(machine);
  machine.set_register(dest, value);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest), source]))
}

/// `STR variable, register|constant`: copies the source value into the variable's slot.
fn store(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, MEMORY)?;
  require(instruction, 2, STORE_SOURCE)?;
  let dest   = resolve(instruction, 1, machine)?;
  let source = resolve(instruction, 2, machine)?;

  let value = source.value(machine);
  if let ResolvedOperand::Variable { address, .. } = &dest {
    machine.set_memory_at(*address, value);
  }
  Ok(Executed::new(instruction.operation, vec![dest, source]))
}

fn push(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, SOURCE)?;
  let source = resolve(instruction, 1, machine)?;

  let value = source.value(machine);
  machine.push(value)?;
  Ok(Executed::new(instruction.operation, vec![source]))
}

fn pop(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, REGISTER)?;
  let dest = destination(instruction, machine)?;

  let value = machine.pop()?;
  machine.set_register(dest, value);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest)]))
}

// endregion

// region Arithmetic and logic

/**
  The shared shape of `AND`, `OR`, `ADD`, `SUB`, `MUL`, `DIV` and `MOD`: the destination register
  is also the first input. `operation` receives `(destination value, source value)`.
*/
fn arithmetic<F>(instruction: &Instruction, machine: &mut Machine, operation: F)
  -> Result<Executed, ExecutionError>
  where F: Fn(Value, Value) -> Result<Value, ExecutionError>
{
  require(instruction, 1, REGISTER)?;
  require(instruction, 2, SOURCE)?;
  let dest = destination(instruction, machine)?;
  let source = resolve(instruction, 2, machine)?;

  let result = operation(machine.register(dest), source.value(machine))?;
  machine.set_register(dest, result);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest), source]))
}

/// `value` if it fits in a register.
fn checked(value: u32) -> Option<Value> {
  match value <= MAX_VALUE as u32 {
    true  => Some(value as Value),
    false => None
  }
}

fn add(dest: Value, source: Value) -> Result<Value, ExecutionError> {
  checked(dest as u32 + source as u32).ok_or(ExecutionError::Overflow(Operation::Add))
}

/// The destination's own value is the subtrahend.
fn subtract(dest: Value, source: Value) -> Result<Value, ExecutionError> {
  source.checked_sub(dest).ok_or(ExecutionError::Underflow(Operation::Subtract))
}

fn multiply(dest: Value, source: Value) -> Result<Value, ExecutionError> {
  checked(dest as u32 * source as u32).ok_or(ExecutionError::Overflow(Operation::Multiply))
}

/// The destination's own value is the divisor.
fn divide(dest: Value, source: Value) -> Result<Value, ExecutionError> {
  source.checked_div(dest).ok_or(ExecutionError::DivideByZero(Operation::Divide))
}

fn modulo(dest: Value, source: Value) -> Result<Value, ExecutionError> {
  source.checked_rem(dest).ok_or(ExecutionError::DivideByZero(Operation::Modulo))
}

fn not(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, REGISTER)?;
  let dest = destination(instruction, machine)?;

  let value = !machine.register(dest) & MAX_VALUE;
  machine.set_register(dest, value);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest)]))
}

fn increment(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, REGISTER)?;
  let dest = destination(instruction, machine)?;

  let value = checked(machine.register(dest) as u32 + 1)
    .ok_or(ExecutionError::Overflow(instruction.operation))?;
  machine.set_register(dest, value);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest)]))
}

fn decrement(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, REGISTER)?;
  let dest = destination(instruction, machine)?;

  let value = machine.register(dest)
    .checked_sub(1)
    .ok_or(ExecutionError::Underflow(instruction.operation))?;
  machine.set_register(dest, value);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Register(dest)]))
}

// endregion

// region Control flow

/// Branch targets are absolute instruction indices taken from the label field.
fn branch<F>(instruction: &Instruction, machine: &mut Machine, condition: F)
  -> Result<Executed, ExecutionError>
  where F: Fn(Value, Value) -> bool
{
  require(instruction, 1, SOURCE)?;
  require(instruction, 2, SOURCE)?;
  let left  = resolve(instruction, 1, machine)?;
  let right = resolve(instruction, 2, machine)?;

  if condition(left.value(machine), right.value(machine)) {
    trace!(label = instruction.label, "branch taken");
    machine.set_program_counter(instruction.label as usize);
  }
  Ok(Executed::new(
    instruction.operation,
    vec![left, right, ResolvedOperand::Label(instruction.label as u16)]
  ))
}

fn jump(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  require(instruction, 1, LABEL)?;

  machine.set_program_counter(instruction.label as usize);
  Ok(Executed::new(instruction.operation, vec![ResolvedOperand::Label(instruction.label as u16)]))
}

/// Moves the program counter to the last instruction of the program.
fn halt(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  let last = machine.program().len().saturating_sub(1);
  machine.set_program_counter(last);
  Ok(Executed::new(instruction.operation, vec![]).with_signal(Signal::Halt))
}

// endregion

// region Variable management

fn variable_add(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  let name = variable_name(instruction)?;
  if machine.symbols().contains(&name) {
    return Err(ExecutionError::VariableExists(name));
  }

  let address = machine.allocate(name.clone(), None)?;
  Ok(
    Executed::new(instruction.operation, vec![ResolvedOperand::Variable { name, address }])
      .with_signal(Signal::VariablesChanged)
  )
}

fn variable_delete(instruction: &Instruction, machine: &mut Machine) -> Result<Executed, ExecutionError> {
  let name = variable_name(instruction)?;
  let address = machine.symbols()
    .get_address(&name)
    .ok_or_else(|| ExecutionError::VariableNotFound(name.clone()))?;

  machine.deallocate(&name);
  Ok(
    Executed::new(instruction.operation, vec![ResolvedOperand::Variable { name, address }])
      .with_signal(Signal::VariablesChanged)
  )
}

// endregion
