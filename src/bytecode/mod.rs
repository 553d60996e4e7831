/*!

  Every instruction is exactly one 32 bit word. A program image is a sequence of words written
  most significant bit first as a text of `0` and `1` characters, optionally broken into lines.
  The fields of a word are positional:

  ```text
    [OpCode:5][Kind1:2][Kind2:2][Operand1:9][Operand2:9][Label:5]
  ```

  The two kinds say how the operand fields are interpreted: as a register code, a literal
  constant, a memory address, or a label. Branches and jumps read their target from the label
  field as an absolute instruction index.

  A fixed word has no room for identifiers, so `VAD` and `VDE` reuse the low 7 bits of
  `Operand1`, all of `Operand2` and the label as three 7 bit ASCII codes naming a variable:

  ```text
    [OpCode:5][01][01][xx|Char1:7][Char2:7|Char3:2][Char3:5]
  ```

  Decoding is pure. Decoded instructions are plain `Copy` values and are never rewritten while
  the program executes; operand resolution against the machine happens in `crate::operand`.

*/

mod binary;
mod image;
mod instruction;

pub use binary::{
  decode, decode_operand_kind, decode_operation, decode_variable_name, decode_word, encode,
  encode_variable_name, slice, RawInstruction, Word, WORD_BITS
};
pub use image::{load_program, parse_image};
pub use instruction::{Format, Instruction, OperandKind, Operation, RawOperand};
