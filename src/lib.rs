/*!
  A simulator for a small fixed-width instruction set.

  A program image is a text of `0`s and `1`s which is sliced into 32 bit words, each decoded
  into an [`Instruction`](bytecode::Instruction). The [`Simulator`](simulator::Simulator) then
  executes the decoded program against a [`Machine`](machine::Machine): four 9 bit registers,
  512 slots of 9 bit memory addressed through named variables, a value stack, and a program
  counter.

  The pipeline is this:
  ```text
  text -> [`bytecode::load_program`] -> `Instruction`s ->⋯

  ⋯-> [`Simulator::step`/`Simulator::run`] -> [`engine::execute`] -> `Executed`
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
extern crate strum_macros;

pub mod address;
pub mod bytecode;
pub mod engine;
pub mod error;
pub mod machine;
pub mod operand;
pub mod simulator;
pub mod symboltable;

pub use address::{Address, Register, Value};
pub use bytecode::{Instruction, Operation, OperandKind};
pub use error::{Error, Result};
pub use machine::Machine;
pub use simulator::{Simulator, StepOutcome};
