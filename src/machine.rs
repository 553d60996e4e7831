//! The machine state: register file, memory, the variable allocation table, the stack, the
//! program counter, and the decoded program being executed.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use string_cache::DefaultAtom;
use strum::IntoEnumIterator;
use tracing::trace;

use crate::address::*;
use crate::bytecode::*;
use crate::error::ExecutionError;
use crate::symboltable::SymbolTable;

/// The stack refuses pushes beyond this many values.
pub const STACK_CAPACITY: usize = 4096;

#[derive(Clone, Debug)]
pub struct Machine {

  // Memory Stores
  memory    : Vec<Value>,        // Data memory, addressed through `symbols`
  stack     : Vec<Value>,        // The value stack, top at the end
  program   : Vec<Instruction>,  // Decoded code memory

  // Registers //
  registers       : [Value; REGISTER_COUNT],
  program_counter : usize,

  // Variable name -> address of its value in `memory`.
  symbols : SymbolTable,

}

impl Machine {

  // region Display methods

  fn make_table<T, U>(
      titles    : (&str, &str),
      rows      : impl Iterator<Item = (T, U)>,
      highlight : Option<usize>
    ) -> Table
    where T: Display, U: Display
  {

    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->titles.0, ubl->titles.1]);

    for (i, (left, right)) in rows.enumerate() {
      match Some(i) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {}", left), format!("{}", right)]);
        }

        false => {
          table.add_row(row![r->format!("{}", left), format!("{}", right)]);
        }

      } // end match on highlight
    } // end for
    table
  }

  /**
    Disassembles `instruction` against the current bindings: memory operands show the name of
    the variable bound at their address when there is one.
  */
  pub fn disassemble(&self, instruction: &Instruction) -> String {
    match instruction.operation.format() {

      Format::Binary => {
        format!(
          "{} {} {}",
          instruction.operation,
          self.operand_text(instruction.kind1, instruction.operand1),
          self.operand_text(instruction.kind2, instruction.operand2)
        )
      }

      Format::Unary => {
        format!(
          "{} {}",
          instruction.operation,
          self.operand_text(instruction.kind1, instruction.operand1)
        )
      }

      Format::Branch => {
        format!(
          "{} {} {} {}",
          instruction.operation,
          self.operand_text(instruction.kind1, instruction.operand1),
          self.operand_text(instruction.kind2, instruction.operand2),
          instruction.label
        )
      }

      | Format::Jump
      | Format::Nullary
      | Format::Variable => instruction.to_string(),

    }
  }

  fn operand_text(&self, kind: OperandKind, raw: u16) -> String {
    match kind {

      OperandKind::Memory => match self.symbols.get_name(&Address::new(raw)) {
        Some(name) => name.to_string(),
        None       => Address::new(raw).to_string(),
      },

      _ => RawOperand(kind, raw).to_string(),

    }
  }

  /// The disassembly of the whole program, one line per instruction.
  pub fn listing(&self) -> Vec<String> {
    self.program.iter().map(|instruction| self.disassemble(instruction)).collect()
  }

  // endregion

  // region Low-level utility methods

  pub fn new() -> Machine {
    Machine {
      memory          : vec![0; MEMORY_SIZE],
      stack           : vec![],
      program         : vec![],
      registers       : [0; REGISTER_COUNT],
      program_counter : 0,
      symbols         : SymbolTable::new(),
    }
  }

  /// Replaces the program and returns every other part of the machine to its initial state.
  pub fn load(&mut self, program: Vec<Instruction>) {
    self.clear();
    self.program = program;
  }

  /// Clears registers, memory, bindings, stack and program counter. The program is kept.
  pub fn clear(&mut self) {
    self.memory          = vec![0; MEMORY_SIZE];
    self.stack           = vec![];
    self.registers       = [0; REGISTER_COUNT];
    self.program_counter = 0;
    self.symbols.clear();
  }

  pub fn program(&self) -> &[Instruction] {
    &self.program
  }

  pub fn program_counter(&self) -> usize {
    self.program_counter
  }

  pub fn set_program_counter(&mut self, program_counter: usize) {
    self.program_counter = program_counter;
  }

  /// The instruction the program counter points at, if any.
  pub fn current_instruction(&self) -> Option<Instruction> {
    self.program.get(self.program_counter).copied()
  }

  pub fn register(&self, register: Register) -> Value {
    self.registers[register.idx()]
  }

  pub fn set_register(&mut self, register: Register, value: Value) {
    self.registers[register.idx()] = value & MAX_VALUE;
  }

  /// Register names and values in register order.
  pub fn registers(&self) -> impl Iterator<Item = (Register, Value)> + '_ {
    Register::iter().map(move |register| (register, self.register(register)))
  }

  pub fn memory_at(&self, address: Address) -> Value {
    self.memory[address.idx()]
  }

  pub fn set_memory_at(&mut self, address: Address, value: Value) {
    self.memory[address.idx()] = value & MAX_VALUE;
  }

  /// Bound variables as `(name, address, value)` in ascending address order.
  pub fn variables(&self) -> impl Iterator<Item = (DefaultAtom, Address, Value)> + '_ {
    self.symbols
      .iter()
      .map(move |(name, address)| (name, address, self.memory_at(address)))
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  /// Stack contents from the top down.
  pub fn stack(&self) -> impl Iterator<Item = Value> + '_ {
    self.stack.iter().rev().copied()
  }

  pub fn stack_len(&self) -> usize {
    self.stack.len()
  }

  pub fn push(&mut self, value: Value) -> Result<(), ExecutionError> {
    if self.stack.len() >= STACK_CAPACITY {
      return Err(ExecutionError::StackOverflow);
    }
    self.stack.push(value & MAX_VALUE);
    Ok(())
  }

  pub fn pop(&mut self) -> Result<Value, ExecutionError> {
    self.stack.pop().ok_or(ExecutionError::StackUnderflow)
  }

  // endregion

  // region Resolution and allocation

  /// Resolves the canonical code held by a register operand.
  pub fn resolve_register(&self, code: u16) -> Result<Register, ExecutionError> {
    Register::from_code(code)
  }

  /// The name of the variable bound at `address`, the target of a memory operand.
  pub fn resolve_memory_operand(&self, address: Address) -> Result<DefaultAtom, ExecutionError> {
    self.symbols.get_name(&address).ok_or(ExecutionError::UnboundVariable(address))
  }

  /**
    Binds `name` to the lowest free address. If `name` is already bound it keeps its address.
    Either way, a given `value` is written to the variable's slot.
  */
  pub fn allocate(&mut self, name: DefaultAtom, value: Option<Value>) -> Result<Address, ExecutionError> {
    let address = self.symbols.insert(name.clone())?;
    if let Some(value) = value {
      self.set_memory_at(address, value);
    }
    trace!(%name, %address, "variable allocated");
    Ok(address)
  }

  /**
    Unbinds `name` and zeroes its slot. Memory operands are stored as addresses, so instructions
    that referred to the variable now refer to the freed address. Returns `false` if `name` was
    not bound.
  */
  pub fn deallocate(&mut self, name: &DefaultAtom) -> bool {
    match self.symbols.remove(name) {

      Some(address) => {
        self.set_memory_at(address, 0);
        trace!(%name, %address, "variable deallocated");
        true
      }

      None => false

    }
  }

  // endregion

}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new()
  }
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = Machine::make_table(
      ("Register", "Value"),
      self.registers()
          .map(|(register, value)| (register.to_string(), value.to_string()))
          .chain(std::iter::once(("PC".to_string(), self.program_counter.to_string()))),
      None
    );
    let variable_table = Machine::make_table(
      ("Variable", "Value"),
      self.variables().map(|(name, address, value)| (format!("{} {}", name, address), value)),
      None
    );
    let stack_table = Machine::make_table(
      ("Depth", "Value"),
      self.stack().enumerate(),
      Some(0)
    );
    let listing = self.listing();
    let code_table = Machine::make_table(
      ("Line", "Instruction"),
      listing.iter().enumerate(),
      Some(self.program_counter)
    );

    let mut combined_table = table!([register_table, variable_table, stack_table, code_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Variables", ub->"Stack", ub->"Code"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}
