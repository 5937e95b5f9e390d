//! The operation table and instruction word encoding
//!
//! The first word of an instruction carries the opcode in bits 14-11, the
//! source addressing mode one-hot in bits 10-7, the target one-hot in bits
//! 6-3 and the ARE suffix in bits 2-0. Each operand adds one extra word,
//! except that two register operands share a single word.

use phf::phf_map;

use crate::assembler::statement::{
    fits_in_bits, is_register, is_valid_symbol, parse_number, Statement,
};
use crate::assembler::{ARE_ABSOLUTE, Error, IMMEDIATE_BITS, Word};

/// The four addressing modes of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// `#N`: the operand is the number itself
    Immediate,
    /// A symbol name, resolved to an address in the second pass
    Direct,
    /// `*rX`: the register holds the operand's address
    IndirectRegister,
    /// `rX`: the register holds the operand
    DirectRegister,
}

impl AddressingMode {
    /// The mode number, 0 to 3
    pub fn index(self) -> u16 {
        match self {
            AddressingMode::Immediate => 0,
            AddressingMode::Direct => 1,
            AddressingMode::IndirectRegister => 2,
            AddressingMode::DirectRegister => 3,
        }
    }

    /// The one-hot encoding used in the first instruction word
    pub fn one_hot(self) -> u16 {
        1 << self.index()
    }

    fn is_register_mode(self) -> bool {
        matches!(
            self,
            AddressingMode::IndirectRegister | AddressingMode::DirectRegister
        )
    }
}

/// One entry of the operation table
#[derive(Debug)]
pub struct Operation {
    pub opcode: u16,
    pub num_operands: u8,
    /// Permitted source modes, one bit per [AddressingMode::index]
    pub source_modes: u8,
    /// Permitted target modes, one bit per [AddressingMode::index]
    pub target_modes: u8,
}

impl Operation {
    const fn new(opcode: u16, num_operands: u8, source_modes: u8, target_modes: u8) -> Operation {
        Operation {
            opcode,
            num_operands,
            source_modes,
            target_modes,
        }
    }

    fn allows_source(&self, mode: AddressingMode) -> bool {
        self.source_modes & mode.one_hot() as u8 != 0
    }

    fn allows_target(&self, mode: AddressingMode) -> bool {
        self.target_modes & mode.one_hot() as u8 != 0
    }
}

/// The 16 operations of the machine, with their operand counts and the
/// addressing modes each operand position accepts
pub static OPERATIONS: phf::Map<&'static str, Operation> = phf_map! {
    "mov"  => Operation::new(0, 2, 0b1111, 0b1110),
    "cmp"  => Operation::new(1, 2, 0b1111, 0b1111),
    "add"  => Operation::new(2, 2, 0b1111, 0b1110),
    "sub"  => Operation::new(3, 2, 0b1111, 0b1110),
    "lea"  => Operation::new(4, 2, 0b0010, 0b1110),
    "clr"  => Operation::new(5, 1, 0b0000, 0b1110),
    "not"  => Operation::new(6, 1, 0b0000, 0b1110),
    "inc"  => Operation::new(7, 1, 0b0000, 0b1110),
    "dec"  => Operation::new(8, 1, 0b0000, 0b1110),
    "jmp"  => Operation::new(9, 1, 0b0000, 0b0110),
    "bne"  => Operation::new(10, 1, 0b0000, 0b0110),
    "red"  => Operation::new(11, 1, 0b0000, 0b1110),
    "prn"  => Operation::new(12, 1, 0b0000, 0b1111),
    "jsr"  => Operation::new(13, 1, 0b0000, 0b0110),
    "rts"  => Operation::new(14, 0, 0b0000, 0b0000),
    "stop" => Operation::new(15, 0, 0b0000, 0b0000),
};

/// Classify an operand by its addressing mode
///
/// Registers are tested before symbols: `r3` is a register operand even
/// though it would also scan as a symbol name.
pub fn addressing_mode(operand: &str, line_number: usize) -> Result<AddressingMode, Error> {
    if operand.starts_with('#') {
        return Ok(AddressingMode::Immediate);
    }
    if let Some(register) = operand.strip_prefix('*') {
        return if is_register(register) {
            Ok(AddressingMode::IndirectRegister)
        } else {
            Err(Error::InvalidRegister {
                name: register.to_string(),
                line_number,
            })
        };
    }
    if is_register(operand) {
        return Ok(AddressingMode::DirectRegister);
    }
    if is_valid_symbol(operand) {
        return Ok(AddressingMode::Direct);
    }
    Err(Error::UnknownAddressingMode {
        operand: operand.to_string(),
        line_number,
    })
}

/// Encode one instruction statement into its machine words
///
/// The first word is always produced; each operand contributes one more,
/// with two register operands fused into a single shared word.
pub fn encode(statement: &Statement) -> Result<Vec<Word>, Error> {
    let line_number = statement.line_number();
    let name = statement.keyword();
    let Some(operation) = OPERATIONS.get(name) else {
        return Err(Error::UnknownOperation {
            name: name.to_string(),
            line_number,
        });
    };

    let mut ops = statement.operands();
    let mut words = Vec::new();

    match operation.num_operands {
        0 => {
            words.push(Word::Bits(operation.opcode << 11 | ARE_ABSOLUTE));
        }
        1 => {
            let target = ops.take(0)?;
            let mode = addressing_mode(target, line_number)?;
            if !operation.allows_target(mode) {
                return Err(Error::OperandModeMismatch {
                    operand: target.to_string(),
                    operation: name.to_string(),
                    line_number,
                });
            }
            words.push(Word::Bits(
                operation.opcode << 11 | mode.one_hot() << 3 | ARE_ABSOLUTE,
            ));
            words.push(operand_word(target, mode, true, line_number)?);
        }
        _ => {
            let source = ops.take(0)?;
            let source_mode = addressing_mode(source, line_number)?;
            if !operation.allows_source(source_mode) {
                return Err(Error::OperandModeMismatch {
                    operand: source.to_string(),
                    operation: name.to_string(),
                    line_number,
                });
            }

            let target = ops.take(1)?;
            let target_mode = addressing_mode(target, line_number)?;
            if !operation.allows_target(target_mode) {
                return Err(Error::OperandModeMismatch {
                    operand: target.to_string(),
                    operation: name.to_string(),
                    line_number,
                });
            }

            words.push(Word::Bits(
                operation.opcode << 11
                    | source_mode.one_hot() << 7
                    | target_mode.one_hot() << 3
                    | ARE_ABSOLUTE,
            ));

            if source_mode.is_register_mode() && target_mode.is_register_mode() {
                words.push(Word::Bits(
                    register_number(source) << 6 | register_number(target) << 3 | ARE_ABSOLUTE,
                ));
            } else {
                words.push(operand_word(source, source_mode, false, line_number)?);
                words.push(operand_word(target, target_mode, true, line_number)?);
            }
        }
    }

    ops.finish()?;
    Ok(words)
}

/// Encode the extra word of a single operand
fn operand_word(
    operand: &str,
    mode: AddressingMode,
    is_target: bool,
    line_number: usize,
) -> Result<Word, Error> {
    match mode {
        AddressingMode::Immediate => {
            let text = &operand[1..];
            let value = parse_number(text).ok_or_else(|| Error::InvalidNumber {
                token: text.to_string(),
                line_number,
            })?;
            if !fits_in_bits(value, IMMEDIATE_BITS) {
                return Err(Error::NumberOutOfRange {
                    value,
                    bits: IMMEDIATE_BITS,
                    line_number,
                });
            }
            Ok(Word::Bits(((value & 0xFFF) as u16) << 3 | ARE_ABSOLUTE))
        }
        AddressingMode::Direct => Ok(Word::Symbol(operand.to_string())),
        AddressingMode::IndirectRegister | AddressingMode::DirectRegister => {
            let shift = if is_target { 3 } else { 6 };
            Ok(Word::Bits(register_number(operand) << shift | ARE_ABSOLUTE))
        }
    }
}

/// The number of a register operand, with any leading `*` stripped
fn register_number(operand: &str) -> u16 {
    let register = operand.strip_prefix('*').unwrap_or(operand);
    (register.as_bytes()[1] - b'0') as u16
}
