//! An operand after resolution against the machine: the raw 9 bit field interpreted according
//! to its kind. Resolution never modifies the instruction it reads from.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::address::{Address, Register, Value, MAX_VALUE};
use crate::bytecode::OperandKind;
use crate::error::ExecutionError;
use crate::machine::Machine;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResolvedOperand {
  Register(Register),
  /// A memory operand names the variable currently bound at its address.
  Variable {
    name    : DefaultAtom,
    address : Address
  },
  Constant(Value),
  Label(u16),
}

impl ResolvedOperand {
  pub fn resolve(machine: &Machine, kind: OperandKind, raw: u16) -> Result<ResolvedOperand, ExecutionError> {
    match kind {

      OperandKind::Register => {
        Ok(ResolvedOperand::Register(machine.resolve_register(raw)?))
      }

      OperandKind::Memory => {
        let address = Address::new(raw);
        let name    = machine.resolve_memory_operand(address)?;
        Ok(ResolvedOperand::Variable { name, address })
      }

      OperandKind::Constant => Ok(ResolvedOperand::Constant(raw & MAX_VALUE)),

      OperandKind::Label => Ok(ResolvedOperand::Label(raw)),

    }
  }

  /// The value the operand stands for. A label stands for its own number.
  pub fn value(&self, machine: &Machine) -> Value {
    match self {
      ResolvedOperand::Register(register)     => machine.register(*register),
      ResolvedOperand::Variable { address, .. } => machine.memory_at(*address),
      ResolvedOperand::Constant(value)        => *value,
      ResolvedOperand::Label(label)           => *label,
    }
  }
}

impl Display for ResolvedOperand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ResolvedOperand::Register(register)  => write!(f, "{}", register),
      ResolvedOperand::Variable { name, .. } => write!(f, "{}", name),
      ResolvedOperand::Constant(value)     => write!(f, "{}", value),
      ResolvedOperand::Label(label)        => write!(f, "@{}", label),
    }
  }
}
