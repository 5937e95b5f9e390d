//! First pass: statement scanning, symbol table construction, encoding
//!
//! Walks the expanded source line by line, growing the instruction and data
//! lists and the symbol table. Direct-mode operands are stored as symbol
//! placeholders for the second pass. A malformed line is reported and
//! skipped so one run surfaces every diagnostic in the file.

use crate::assembler::statement::{is_valid_symbol, Statement};
use crate::assembler::{directives, instructions};
use crate::assembler::{Address, CodeWord, Error, MAX_LINE_LEN, Symbol, Unit, Word};
use crate::logging;

/// Scan one expanded source file into `unit`
///
/// At end of file, data addresses and `before_data` symbols are offset by
/// the final IC, so code and data occupy one contiguous address range. The
/// adjustment is skipped when this pass reported errors: no output will be
/// written and the raw addresses keep later diagnostics honest.
pub fn run(source: &str, unit: &mut Unit, errors: &mut Vec<Error>) {
    let errors_before = errors.len();

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        if line.len() > MAX_LINE_LEN {
            errors.push(Error::LineTooLong { line_number });
            continue;
        }
        match Statement::parse(line, line_number) {
            Ok(None) => {}
            Ok(Some(statement)) => {
                if let Err(error) = encode_statement(&statement, unit) {
                    errors.push(error);
                }
            }
            Err(error) => errors.push(error),
        }
    }

    if errors.len() == errors_before {
        for code_word in &mut unit.data {
            code_word.address += unit.ic;
        }
        for symbol in &mut unit.symbols {
            if symbol.before_data {
                if let Some(address) = &mut symbol.address {
                    *address += unit.ic;
                }
            }
        }
    }
}

/// Encode one statement into `unit`, directive or instruction
fn encode_statement(statement: &Statement, unit: &mut Unit) -> Result<(), Error> {
    let line_number = statement.line_number();

    if let Some(directive) = statement.keyword().strip_prefix('.') {
        match directive {
            "data" => {
                if let Some(name) = statement.label() {
                    define_label(unit, name, unit.dc, true, line_number)?;
                }
                append_data(unit, directives::data(statement)?, line_number);
            }
            "string" => {
                if let Some(name) = statement.label() {
                    define_label(unit, name, unit.dc, true, line_number)?;
                }
                append_data(unit, directives::string(statement)?, line_number);
            }
            "entry" => {
                check_ignored_label(statement)?;
                let name = directives::single_symbol(statement, ".entry")?;
                unit.symbols.push(Symbol {
                    name: name.to_string(),
                    address: None,
                    before_data: false,
                    is_entry: true,
                    is_extern: false,
                    line_number,
                });
            }
            "extern" => {
                check_ignored_label(statement)?;
                let name = directives::single_symbol(statement, ".extern")?;
                unit.symbols.push(Symbol {
                    name: name.to_string(),
                    address: Some(0),
                    before_data: false,
                    is_entry: false,
                    is_extern: true,
                    line_number,
                });
            }
            _ => {
                return Err(Error::UnknownDirective {
                    name: directive.to_string(),
                    line_number,
                });
            }
        }
    } else {
        if let Some(name) = statement.label() {
            define_label(unit, name, unit.ic, false, line_number)?;
        }
        for word in instructions::encode(statement)? {
            unit.instructions.push(CodeWord {
                word,
                address: unit.ic,
                line_number,
            });
            unit.ic += 1;
        }
    }

    Ok(())
}

/// Create a symbol record for a label definition
fn define_label(
    unit: &mut Unit,
    name: &str,
    address: Address,
    before_data: bool,
    line_number: usize,
) -> Result<(), Error> {
    if !is_valid_symbol(name) {
        return Err(Error::InvalidLabel {
            name: name.to_string(),
            line_number,
        });
    }
    unit.symbols.push(Symbol {
        name: name.to_string(),
        address: Some(address),
        before_data,
        is_entry: false,
        is_extern: false,
        line_number,
    });
    Ok(())
}

/// Append encoded data words, advancing DC
fn append_data(unit: &mut Unit, words: Vec<Word>, line_number: usize) {
    for word in words {
        unit.data.push(CodeWord {
            word,
            address: unit.dc,
            line_number,
        });
        unit.dc += 1;
    }
}

/// A label in front of `.entry` or `.extern` defines nothing, but it must
/// still scan as a valid label before it is ignored
fn check_ignored_label(statement: &Statement) -> Result<(), Error> {
    let Some(name) = statement.label() else {
        return Ok(());
    };
    if !is_valid_symbol(name) {
        return Err(Error::InvalidLabel {
            name: name.to_string(),
            line_number: statement.line_number(),
        });
    }
    logging::warning(
        "a label in front of '.entry' or '.extern' is meaningless and is ignored".to_string(),
        statement.line_number(),
    );
    Ok(())
}
