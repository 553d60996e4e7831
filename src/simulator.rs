/*!
  The program loop. A `Simulator` owns a `Machine` and drives the engine over its program one
  instruction at a time, either to completion (`run`) or one instruction per call (`step`).

  After every instruction the program counter advances by one, including after a taken branch
  or jump: a branch to label `n` resumes execution at instruction `n + 1`. `HLT` is the exception.
  It leaves the program counter on the last instruction and stops the machine.
*/

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::bytecode::{load_program, Instruction};
use crate::engine::{self, Executed, Signal};
use crate::error::{Error, LoadError, Result};
use crate::machine::Machine;

/// What happened during one call to `Simulator::step`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome {
  Continued(Executed),
  /// The instruction was `HLT`. Further steps return `Finished`.
  Halted(Executed),
  /// The instruction was `VAD` or `VDE`; listings that show variable names are stale.
  VariablesChanged(Executed),
  /// There was no instruction to execute.
  Finished,
}

#[derive(Clone, Debug, Default)]
pub struct Simulator {
  machine : Machine,
  halted  : bool,
}

impl Simulator {

  pub fn new() -> Simulator {
    Simulator::default()
  }

  pub fn with_program(program: Vec<Instruction>) -> Simulator {
    let mut simulator = Simulator::new();
    simulator.load(program);
    simulator
  }

  /// Decodes a textual image into a fresh simulator.
  pub fn from_image(text: &str) -> Result<Simulator> {
    Ok(Simulator::with_program(load_program(text)?))
  }

  pub fn load(&mut self, program: Vec<Instruction>) {
    self.machine.load(program);
    self.halted = false;
  }

  /// Replaces the program with the one in `text`. If the image is rejected, the current program
  /// and machine state are left untouched.
  pub fn load_image(&mut self, text: &str) -> Result<()> {
    let program = load_program(text)?;
    self.load(program);
    Ok(())
  }

  pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
      .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), "image read");
    self.load_image(&text)
  }

  /// Returns the machine to its power-on state, keeping the program.
  pub fn reset(&mut self) {
    self.machine.clear();
    self.halted = false;
  }

  pub fn machine(&self) -> &Machine {
    &self.machine
  }

  pub fn is_halted(&self) -> bool {
    self.halted
  }

  /// True once the program has halted or run off its end.
  pub fn is_finished(&self) -> bool {
    self.halted || self.machine.current_instruction().is_none()
  }

  /**
    Executes the instruction at the program counter. On error the program counter still points
    at the failing instruction and the machine is unchanged by it.
  */
  pub fn step(&mut self) -> Result<StepOutcome> {
    let program_counter = self.machine.program_counter();
    let instruction = match self.machine.current_instruction() {
      Some(instruction) if !self.halted => instruction,
      _ => return Ok(StepOutcome::Finished),
    };

    let executed = engine::execute(&instruction, &mut self.machine)
      .map_err(|source| {
        warn!(pc = program_counter, %instruction, error = %source, "instruction failed");
        Error::Execution { program_counter, source }
      })?;

    match executed.signal {

      Signal::Halt => {
        self.halted = true;
        debug!(pc = self.machine.program_counter(), "halted");
      }

      | Signal::Continue
      | Signal::VariablesChanged => {
        let next = self.machine.program_counter() + 1;
        self.machine.set_program_counter(next);
      }

    }

    #[cfg(feature = "trace_computation")]
    println!("{}\n{}", executed, self.machine);

    Ok(
      match executed.signal {
        Signal::Continue         => StepOutcome::Continued(executed),
        Signal::Halt             => StepOutcome::Halted(executed),
        Signal::VariablesChanged => StepOutcome::VariablesChanged(executed),
      }
    )
  }

  /// Steps until the program halts or runs off its end. Returns the number of instructions
  /// executed.
  pub fn run(&mut self) -> Result<usize> {
    self.run_bounded(usize::MAX)
  }

  /// As `run`, but executes at most `max_steps` instructions.
  pub fn run_bounded(&mut self, max_steps: usize) -> Result<usize> {
    let mut steps = 0;
    while steps < max_steps {
      match self.step()? {
        StepOutcome::Finished   => break,
        StepOutcome::Halted(_)  => {
          steps += 1;
          break;
        }
        | StepOutcome::Continued(_)
        | StepOutcome::VariablesChanged(_) => steps += 1,
      }
    }
    debug!(steps, pc = self.machine.program_counter(), finished = self.is_finished(), "run stopped");
    Ok(steps)
  }

}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::address::{Address, Register};
  use crate::bytecode::{encode, encode_variable_name, OperandKind, Operation};
  use crate::error::ExecutionError;
  use crate::bytecode::OperandKind::{Constant, Label, Memory};
  use string_cache::DefaultAtom;

  fn image(program: &[Instruction]) -> String {
    program.iter().map(|i| format!("{:032b}\n", encode(i))).collect()
  }

  fn op(operation: Operation, kind1: OperandKind, operand1: u16, kind2: OperandKind, operand2: u16, label: u8) -> Instruction {
    Instruction::new(operation, kind1, kind2, operand1, operand2, label)
  }

  fn named(operation: Operation, name: &str) -> Instruction {
    let (operand1, operand2, label) = encode_variable_name(name).unwrap();
    Instruction::new(operation, Constant, Constant, operand1, operand2, label)
  }

  const REG: OperandKind = OperandKind::Register;

  #[test]
  fn lda_then_hlt(){
    let text = "00000000100000000000000010100000\n10001000000000000000000000000000\n";
    let mut simulator = Simulator::from_image(text).unwrap();
    assert_eq!(simulator.run().unwrap(), 2);
    assert_eq!(simulator.machine().register(Register::T0), 5);
    assert_eq!(simulator.machine().program_counter(), 1);
    assert!(simulator.is_halted());
    assert_eq!(simulator.step().unwrap(), StepOutcome::Finished);
  }

  #[test]
  fn counting_loop_resumes_after_label(){
    let program = vec![
      op(Operation::Load,           REG, 0, Constant, 0, 0),
      op(Operation::Increment,      REG, 0, REG,      0, 0),
      // Branch to 0, so the loop resumes at the INC on line 1.
      op(Operation::BranchNotEqual, REG, 0, Constant, 5, 0),
      Instruction::nullary(Operation::Halt),
    ];
    let mut simulator = Simulator::from_image(&image(&program)).unwrap();
    let steps = simulator.run().unwrap();
    assert_eq!(simulator.machine().register(Register::T0), 5);
    assert_eq!(steps, 1 + 5 * 2 + 1);
    assert_eq!(simulator.machine().program_counter(), 3);
  }

  #[test]
  fn taken_branch_still_increments(){
    let halts = vec![Instruction::nullary(Operation::Halt); 4];

    let mut program = vec![op(Operation::BranchEqual, REG, 0, REG, 1, 3)];
    program.extend(halts.iter().copied());
    let mut simulator = Simulator::with_program(program);
    simulator.step().unwrap();
    assert_eq!(simulator.machine().program_counter(), 4);

    let mut program = vec![op(Operation::BranchEqual, REG, 0, Constant, 1, 3)];
    program.extend(halts.iter().copied());
    let mut simulator = Simulator::with_program(program);
    simulator.step().unwrap();
    assert_eq!(simulator.machine().program_counter(), 1);
  }

  #[test]
  fn running_off_the_end(){
    let program = vec![op(Operation::Jump, Label, 0, REG, 0, 20)];
    let mut simulator = Simulator::with_program(program);
    assert_eq!(simulator.run().unwrap(), 1);
    assert_eq!(simulator.machine().program_counter(), 21);
    assert!(simulator.is_finished());
    assert!(!simulator.is_halted());
  }

  #[test]
  fn stepping_reports_variable_changes(){
    let program = vec![
      named(Operation::VariableAdd, "abc"),
      op(Operation::Store, Memory, 0, Constant, 7, 0),
      op(Operation::Load,  REG,    1, Memory,   0, 0),
      named(Operation::VariableDelete, "abc"),
      Instruction::nullary(Operation::Halt),
    ];
    let mut simulator = Simulator::from_image(&image(&program)).unwrap();
    assert_eq!(simulator.machine().listing()[1], "STR M[0] 7");

    assert!(matches!(simulator.step().unwrap(), StepOutcome::VariablesChanged(_)));
    assert_eq!(simulator.machine().listing()[1], "STR abc 7");
    assert_eq!(simulator.machine().listing()[0], "VAD abc");

    assert!(matches!(simulator.step().unwrap(), StepOutcome::Continued(_)));
    match simulator.step().unwrap() {
      StepOutcome::Continued(executed) => assert_eq!(executed.to_string(), "LDA t1 abc"),
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(simulator.machine().register(Register::T1), 7);

    assert!(matches!(simulator.step().unwrap(), StepOutcome::VariablesChanged(_)));
    assert_eq!(simulator.machine().listing()[1], "STR M[0] 7");
    assert_eq!(simulator.machine().variables().count(), 0);

    assert!(matches!(simulator.step().unwrap(), StepOutcome::Halted(_)));
    assert_eq!(simulator.step().unwrap(), StepOutcome::Finished);
  }

  #[test]
  fn freed_address_seen_by_later_variable(){
    let program = vec![
      named(Operation::VariableAdd, "old"),
      named(Operation::VariableDelete, "old"),
      named(Operation::VariableAdd, "new"),
      op(Operation::Store, Memory, 0, Constant, 9, 0),
      Instruction::nullary(Operation::Halt),
    ];
    let mut simulator = Simulator::with_program(program);
    simulator.run().unwrap();
    let variables: Vec<_> = simulator.machine().variables().collect();
    assert_eq!(variables, vec![(DefaultAtom::from("new"), Address::new(0), 9)]);
  }

  #[test]
  fn error_stops_at_failing_instruction(){
    let program = vec![
      op(Operation::Load, REG, 0, Constant, 1, 0),
      op(Operation::Divide, REG, 1, Constant, 8, 0),
      Instruction::nullary(Operation::Halt),
    ];
    let mut simulator = Simulator::with_program(program);
    match simulator.run() {
      Err(Error::Execution { program_counter, source }) => {
        assert_eq!(program_counter, 1);
        assert_eq!(source, ExecutionError::DivideByZero(Operation::Divide));
      }
      other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(simulator.machine().program_counter(), 1);
    assert_eq!(simulator.machine().register(Register::T0), 1);
    assert!(!simulator.is_finished());
  }

  #[test]
  fn rejected_image_keeps_program(){
    let program = vec![op(Operation::Load, REG, 0, Constant, 3, 0)];
    let mut simulator = Simulator::with_program(program);
    assert!(matches!(
      simulator.load_image("0123"),
      Err(Error::Load(LoadError::InvalidFileContent { position: 2, character: '2' }))
    ));
    assert!(matches!(
      simulator.load_image("0101"),
      Err(Error::Load(LoadError::InvalidFileLength { length: 4 }))
    ));
    assert_eq!(simulator.machine().program().len(), 1);
    simulator.run().unwrap();
    assert_eq!(simulator.machine().register(Register::T0), 3);
  }

  #[test]
  fn missing_file(){
    let mut simulator = Simulator::new();
    assert!(matches!(
      simulator.load_file("/nonexistent/program.txt"),
      Err(Error::Load(LoadError::Io { .. }))
    ));
  }

  #[test]
  fn reset_and_rerun(){
    let program = vec![
      op(Operation::Push, Constant, 4, REG, 0, 0),
      Instruction::nullary(Operation::Halt),
    ];
    let mut simulator = Simulator::with_program(program);
    simulator.run().unwrap();
    assert_eq!(simulator.machine().stack_len(), 1);

    simulator.reset();
    assert!(!simulator.is_finished());
    assert_eq!(simulator.machine().stack_len(), 0);
    simulator.run().unwrap();
    assert_eq!(simulator.machine().stack().collect::<Vec<_>>(), vec![4]);
  }

  #[test]
  fn bounded_run(){
    let program = vec![op(Operation::Jump, Label, 0, REG, 0, 0), op(Operation::Jump, Label, 0, REG, 0, 0)];
    let mut simulator = Simulator::with_program(program);
    assert_eq!(simulator.run_bounded(10).unwrap(), 10);
    assert!(!simulator.is_finished());
  }

}
