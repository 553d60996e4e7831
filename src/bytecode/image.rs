/*!
  Reading a program image: a text made only of `0`, `1` and newlines whose bit count, once the
  newlines are removed, is a multiple of the word size.
*/

use nom::{
  bytes::complete::take,
  combinator::{all_consuming, map_res},
  multi::many0,
  IResult
};
use tracing::debug;

use super::binary::{decode_word, Word, WORD_BITS};
use super::Instruction;
use crate::error::LoadError;

fn word(input: &str) -> IResult<&str, Word> {
  map_res(take(WORD_BITS), |bits: &str| Word::from_str_radix(bits, 2))(input)
}

/// Strips newlines, rejecting any character other than `0` and `1`.
fn clean_bits(text: &str) -> Result<String, LoadError> {
  let mut bits = String::with_capacity(text.len());

  for (position, character) in text.char_indices() {
    match character {
      '0' | '1' => bits.push(character),
      '\n'      => {},
      _         => {
        return Err(LoadError::InvalidFileContent { position, character });
      }
    }
  }

  Ok(bits)
}

/// Validates the image and splits it into words in document order.
pub fn parse_image(text: &str) -> Result<Vec<Word>, LoadError> {
  let bits = clean_bits(text)?;
  let length = bits.len();

  if length % WORD_BITS != 0 {
    return Err(LoadError::InvalidFileLength { length });
  }

  let parsed = all_consuming(many0(word))(bits.as_str());
  match parsed {
    Ok((_rest, words)) => Ok(words),
    // Only reachable if the cleaned text were not a whole number of binary words.
    Err(_e)            => Err(LoadError::InvalidFileLength { length }),
  }
}

/**
  Parses and decodes a whole image. Decoding is all or nothing: the first word that fails to
  decode rejects the program.
*/
pub fn load_program(text: &str) -> Result<Vec<Instruction>, LoadError> {
  let words = parse_image(text)?;

  let program = words
    .into_iter()
    .enumerate()
    .map(|(index, word)| {
      decode_word(word).map_err(|source| LoadError::Decode { index, source })
    })
    .collect::<Result<Vec<Instruction>, LoadError>>()?;

  debug!(instructions = program.len(), "program decoded");
  Ok(program)
}
