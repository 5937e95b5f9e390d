//! Macro preprocessing: expanding `macr` ... `endmacr` blocks
//!
//! The expander is a two-state machine over source lines. Outside a
//! definition, a line starting with `macr` opens one, a line whose first
//! token names a known macro is replaced by the stored body, and every
//! other line is copied through. Inside a definition, lines accumulate
//! verbatim until `endmacr`.

use std::fs;
use std::path::PathBuf;

use crate::assembler::statement::{is_reserved_word, tokenize};
use crate::assembler::Error;

const MACRO_START: &str = "macr";
const MACRO_END: &str = "endmacr";

/// A named macro body, stored with its trailing newlines intact
#[derive(Debug)]
pub struct Macro {
    pub name: String,
    pub body: String,
}

/// All macros defined by one source file, in definition order
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable { macros: Vec::new() }
    }

    /// The body of the macro with this name, if one is defined
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.macros
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.body.as_str())
    }
}

/// Expand the macros of `P.as` into `P.am`
///
/// The expanded file is written even when a definition is malformed, so
/// later passes can still scan it for more diagnostics; expansion itself
/// stops at the offending line.
pub fn expand_file(
    prefix: &str,
    table: &mut MacroTable,
    errors: &mut Vec<Error>,
) -> Result<(), Error> {
    let source_path = format!("{prefix}.as");
    let source = fs::read_to_string(&source_path).map_err(|source| Error::Io {
        path: PathBuf::from(source_path),
        source,
    })?;

    let expanded = expand(&source, table, errors);

    let expanded_path = format!("{prefix}.am");
    fs::write(&expanded_path, expanded).map_err(|source| Error::Io {
        path: PathBuf::from(expanded_path),
        source,
    })
}

/// Expand macro definitions and invocations in a source string
///
/// Returns the expanded text accumulated so far; on a malformed definition
/// an error is recorded and expansion stops.
pub fn expand(source: &str, table: &mut MacroTable, errors: &mut Vec<Error>) -> String {
    let mut output = String::new();
    // (name, body, definition line) of the macro currently being read
    let mut current: Option<(String, String, usize)> = None;

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let tokens = tokenize(line);
        let first = tokens.first().copied();

        match current.take() {
            Some((name, mut body, defined_at)) => {
                if first == Some(MACRO_END) {
                    if tokens.len() != 1 {
                        errors.push(Error::JunkAfterMacroEnd { line_number });
                        return output;
                    }
                    table.macros.push(Macro { name, body });
                } else {
                    body.push_str(line);
                    body.push('\n');
                    current = Some((name, body, defined_at));
                }
            }
            None => {
                if first == Some(MACRO_START) {
                    if tokens.len() != 2 {
                        errors.push(Error::InvalidMacroDefinition { line_number });
                        return output;
                    }
                    let name = tokens[1];
                    if is_reserved_word(name) {
                        errors.push(Error::InvalidMacroName {
                            name: name.to_string(),
                            line_number,
                        });
                        return output;
                    }
                    if table.lookup(name).is_some() {
                        errors.push(Error::DuplicateMacro {
                            name: name.to_string(),
                            line_number,
                        });
                        return output;
                    }
                    current = Some((name.to_string(), String::new(), line_number));
                } else if let Some(body) = first.and_then(|name| table.lookup(name)) {
                    output.push_str(body);
                } else {
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }
    }

    if let Some((name, _, line_number)) = current {
        errors.push(Error::UnterminatedMacro { name, line_number });
    }

    output
}
