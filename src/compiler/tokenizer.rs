/*!

Splits program text into tokens and parses integer literals.

The lexical grammar is:
    ```
    <token>    ::= '(' | ')' | <atom>
    <atom>     ::= [A-Za-z0-9_]+
    <literal>  ::= '0' ('x' | 'X') <hex_digit>+
                 | '0' <oct_digit>+
                 | [1-9] <digit>*
                 | '0'
    ```

Whitespace separates tokens and is otherwise ignored. Any other character is an error. Whether an
atom is a name, a keyword, or a literal is decided by the compiler.

*/

use std::fmt::{Display, Formatter};

use nom::{
  branch::alt,
  bytes::complete::{tag_no_case, take_while, take_while1},
  character::complete::{
    char as one_char,
    digit0,
    hex_digit1,
    oct_digit1,
    one_of
  },
  combinator::{all_consuming, map, recognize},
  sequence::{pair, preceded},
  IResult
};

use crate::bytecode::Word;
use crate::error::CompileError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Token<'a> {
  Open,
  Close,
  Atom(&'a str)
}

impl<'a> Display for Token<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Token::Open       => write!(f, "("),
      Token::Close      => write!(f, ")"),
      Token::Atom(atom) => write!(f, "{}", atom),
    }
  }
}

fn is_atom_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// <token> ::= '(' | ')' | <atom>, with leading whitespace skipped.
fn ptoken(text: &str) -> IResult<&str, Token<'_>> {
  preceded(
    take_while(char::is_whitespace),
    alt((
      map(one_char('('), |_| Token::Open),
      map(one_char(')'), |_| Token::Close),
      map(take_while1(is_atom_char), Token::Atom)
    ))
  )(text)
}

/// A cursor over the tokens of a program text.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
  source : &'a str,
  rest   : &'a str
}

impl<'a> Tokenizer<'a> {

  pub fn new(source: &'a str) -> Self {
    Tokenizer {
      source,
      rest: source
    }
  }

  /// Byte offset of the next unread character.
  pub fn offset(&self) -> usize {
    self.source.len() - self.rest.len()
  }

  /// Returns the next token, or `None` once only whitespace remains.
  pub fn next_token(&mut self) -> Result<Option<Token<'a>>, CompileError> {
    let remaining = self.rest.trim_start();
    if remaining.is_empty() {
      self.rest = remaining;
      return Ok(None);
    }

    match ptoken(self.rest) {

      Ok((rest, token)) => {
        self.rest = rest;
        Ok(Some(token))
      }

      Err(_) => {
        self.rest = remaining;
        // `remaining` is not empty, so there is a first character.
        let character = remaining.chars().next().unwrap_or_default();
        Err(CompileError::UnexpectedCharacter { character, offset: self.offset() })
      }

    }
  }

  /// Byte offset of the next token, past any whitespace.
  pub fn next_offset(&self) -> usize {
    self.source.len() - self.rest.trim_start().len()
  }

  /// True when nothing but whitespace is left.
  pub fn at_end(&self) -> bool {
    self.rest.trim_start().is_empty()
  }
}

#[cfg(test)]
impl<'a> Iterator for Tokenizer<'a> {
  type Item = Result<Token<'a>, CompileError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.next_token().transpose()
  }
}

/**
  Parses an unsigned integer literal with C-style radix prefixes: `0x` for hexadecimal, a
  leading `0` for octal, decimal otherwise. Returns `None` for malformed digits and for values
  that do not fit in a word.
*/
pub fn parse_integer(text: &str) -> Option<Word> {
  let result: IResult<&str, (&str, u32)> =
    all_consuming(alt((
      map(preceded(tag_no_case("0x"), hex_digit1), |digits| (digits, 16)),
      map(preceded(one_char('0'), oct_digit1), |digits| (digits, 8)),
      map(recognize(pair(one_of("123456789"), digit0)), |digits| (digits, 10)),
      map(one_char('0'), |_| ("0", 10))
    )))(text);

  match result {
    Ok((_, (digits, radix))) => Word::from_str_radix(digits, radix).ok(),
    Err(_)                   => None
  }
}
