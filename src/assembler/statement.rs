//! [Statement] struct and its utilities
//!
//! A line is lexed into tokens first; the label rules and the comma
//! accounting of operand lists are enforced on the token stream.

use regex::Regex;

use crate::assembler::instructions::OPERATIONS;
use crate::assembler::{Error, MAX_SYMBOL_LEN};

/// Split a source line into tokens
///
/// A token is a double-quoted string, a single comma, or a run of
/// characters containing neither whitespace nor commas. Commas are kept as
/// tokens of their own so operand separation can be validated exactly.
pub fn tokenize(line: &str) -> Vec<&str> {
    let re = Regex::new(r#""[^"]*"|,|[^\s,]+"#).unwrap();
    re.find_iter(line).map(|m| m.as_str()).collect()
}

/// One non-blank, non-comment source line, with its optional label peeled off
#[derive(Debug)]
pub struct Statement<'a> {
    label: Option<&'a str>,
    tokens: Vec<&'a str>,
    line_number: usize,
}

impl<'a> Statement<'a> {
    /// Lex a line and extract its label definition, if any
    ///
    /// Returns `Ok(None)` for blank lines and comment lines. A label is the
    /// first token when it ends with `:`; the colon must touch the name and
    /// must be followed by whitespace or the end of the line.
    pub fn parse(line: &'a str, line_number: usize) -> Result<Option<Statement<'a>>, Error> {
        if line.trim_start().starts_with(';') {
            return Ok(None);
        }

        let mut tokens = tokenize(line);
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut label = None;
        let first = tokens[0];
        if let Some(colon) = first.find(':') {
            if colon != first.len() - 1 {
                return Err(Error::JunkAfterLabelColon { line_number });
            }
            let name = &first[..colon];
            if is_reserved_word(name) {
                return Err(Error::ReservedWordLabel {
                    name: name.to_string(),
                    line_number,
                });
            }
            label = Some(name);
            tokens.remove(0);
            if tokens.is_empty() {
                return Err(Error::LabelOnlyLine { line_number });
            }
        } else if tokens.len() > 1 && tokens[1].starts_with(':') {
            return Err(Error::DetachedLabelColon { line_number });
        }

        Ok(Some(Statement {
            label,
            tokens,
            line_number,
        }))
    }

    /// The label defined at the start of the line, if any
    pub fn label(&self) -> Option<&'a str> {
        self.label
    }

    /// The directive or operation mnemonic of the statement
    pub fn keyword(&self) -> &'a str {
        self.tokens[0]
    }

    /// A cursor over the tokens following the keyword
    pub fn operands(&self) -> Operands<'_> {
        Operands {
            tokens: &self.tokens[1..],
            pos: 0,
            line_number: self.line_number,
        }
    }

    /// The line number of the statement
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// A cursor over an operand list that accounts for every comma
///
/// The language demands zero commas before the first operand, exactly one
/// between operands, and zero after the last.
#[derive(Debug)]
pub struct Operands<'a> {
    tokens: &'a [&'a str],
    pos: usize,
    line_number: usize,
}

impl<'a> Operands<'a> {
    /// Advance over consecutive comma tokens and count them
    pub fn skip_commas(&mut self) -> usize {
        let mut commas = 0;
        while self.tokens.get(self.pos) == Some(&",") {
            commas += 1;
            self.pos += 1;
        }
        commas
    }

    /// The next non-comma token, without comma validation
    pub fn next_token(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    /// Take the next operand, demanding an exact number of commas before it
    pub fn take(&mut self, expected_commas: usize) -> Result<&'a str, Error> {
        let commas = self.skip_commas();
        if commas < expected_commas {
            return Err(Error::MissingComma {
                line_number: self.line_number,
            });
        }
        if commas > expected_commas {
            return Err(Error::TooManyCommas {
                line_number: self.line_number,
            });
        }
        self.next_token().ok_or(Error::MissingOperand {
            line_number: self.line_number,
        })
    }

    /// Demand that nothing but the end of the line remains
    pub fn finish(&mut self) -> Result<(), Error> {
        if self.skip_commas() > 0 {
            return Err(Error::TooManyCommas {
                line_number: self.line_number,
            });
        }
        if self.pos < self.tokens.len() {
            return Err(Error::ExtraOperand {
                line_number: self.line_number,
            });
        }
        Ok(())
    }
}

/// Test whether a name is one of the eight registers r0..r7
pub fn is_register(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 2 && bytes[0] == b'r' && (b'0'..=b'7').contains(&bytes[1])
}

/// Test whether a name is reserved: a directive, an operation, or a register
pub fn is_reserved_word(name: &str) -> bool {
    matches!(
        name,
        "data" | "string" | "entry" | "extern" | ".data" | ".string" | ".entry" | ".extern"
    ) || OPERATIONS.contains_key(name)
        || is_register(name)
}

/// Test whether a name is a valid symbol
///
/// A symbol starts with a letter, continues with letters and digits, and is
/// at most [MAX_SYMBOL_LEN] characters long.
pub fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= MAX_SYMBOL_LEN && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Parse a whole token as a signed decimal number
///
/// The token may carry one leading `+` or `-`; everything after it must be
/// digits. Partial parses are rejected, so `12ab` and `3.5` are not numbers.
pub fn parse_number(token: &str) -> Option<i32> {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Test whether a number fits the two's-complement range of `bits` bits
pub fn fits_in_bits(value: i32, bits: u32) -> bool {
    let half = 1i32 << (bits - 1);
    (-half..half).contains(&value)
}
