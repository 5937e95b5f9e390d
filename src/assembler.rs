//! Translates assembly source for a 15-bit educational CPU into octal
//! object listings in a two-pass manner
//!
//! The macro preprocessor expands `macr` blocks into a `.am` file, the first
//! pass builds the symbol table and encodes instructions and data, and the
//! second pass resolves symbol references and writes the output files.
//!
//! Comments are lines whose first non-blank character is a semicolon (`;`).
//! A label is defined by writing `NAME:` (no space before the colon) at the
//! start of a line. Instructions and directives may be indented as you wish;
//! operands are separated by exactly one comma:
//!
//! ```ignore
//! ; copy a value and loop until it reaches zero
//! MAIN:   mov #12, r1
//! LOOP:   dec r1
//!         cmp r1, #0
//!         bne LOOP
//!         stop
//! COUNT:  .data 12, -5, 7
//! GREET:  .string "hello"
//! ```
//!
//! The assembler supports the following operations:
//! - mov, cmp, add, sub: two-operand arithmetic and comparison
//! - lea: load the address of a label into the target operand
//! - clr, not, inc, dec: one-operand register/memory updates
//! - jmp, bne, jsr: jumps and subroutine calls
//! - red, prn: read a character into / print an operand
//! - rts, stop: return and halt (no operands)
//!
//! Operands use four addressing modes: immediate (`#7`), direct (a label),
//! indirect register (`*r3`) and direct register (`r3`).
//!
//! The assembler supports the following directives:
//! - .data: store a comma-separated list of integers
//! - .string: store a double-quoted string, terminated by a zero word
//! - .entry: export a label defined in this file
//! - .extern: import a label defined in another file
//!
//! Macros are defined with `macr NAME` ... `endmacr`; a line whose first
//! token is a known macro name is replaced by the stored body.
//!
//! For each input prefix `P`, the assembler consumes `P.as` and produces the
//! expanded source `P.am`, the object file `P.ob`, and, when relevant,
//! entries (`P.ent`) and externals (`P.ext`) listings. Output files are only
//! written when the whole pipeline finished without a single diagnostic.

pub mod directives;
pub mod emitter;
pub mod first_pass;
pub mod instructions;
pub mod macros;
pub mod second_pass;
pub mod statement;

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use self::macros::MacroTable;

/// The address of an encoded word in memory
pub type Address = u16;

/// First memory address available to code; IC starts here
pub const MEMORY_START: Address = 100;

/// Width of an encoded machine word, in bits
pub const WORD_BITS: u32 = 15;

/// Width of the immediate-operand payload, in bits
pub const IMMEDIATE_BITS: u32 = 12;

/// Longest accepted source line, excluding the newline
pub const MAX_LINE_LEN: usize = 80;

/// Longest accepted symbol name
pub const MAX_SYMBOL_LEN: usize = 31;

/// ARE suffix of an absolute word
pub const ARE_ABSOLUTE: u16 = 0b100;
/// ARE suffix of a relocatable word
pub const ARE_RELOCATABLE: u16 = 0b010;
/// ARE suffix of a word referencing an extern symbol
pub const ARE_EXTERNAL: u16 = 0b001;

/// A machine word under construction
///
/// A direct-mode operand references a symbol whose address is unknown until
/// the whole file has been scanned, so the first pass stores the symbol name
/// and the second pass patches it with the resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    /// A fully encoded word; only the low 15 bits are significant
    Bits(u16),
    /// An unresolved reference to a symbol, patched in the second pass
    Symbol(String),
}

impl Word {
    /// The resolved bit pattern, masked to 15 bits
    ///
    /// The emitter only runs on units with no unresolved references left.
    pub fn bits(&self) -> u16 {
        match self {
            Word::Bits(bits) => bits & 0x7FFF,
            Word::Symbol(_) => 0,
        }
    }
}

/// An encoded instruction or data word together with its memory address
#[derive(Debug, Clone)]
pub struct CodeWord {
    pub word: Word,
    pub address: Address,
    pub line_number: usize,
}

/// A record of the symbol table
///
/// Created by the first pass for label definitions and for `.entry` /
/// `.extern` directives. A provisional `.entry` record has no address until
/// the second pass merges it with the record that defines the label.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub address: Option<Address>,
    /// Defined before the final code size was known; the address is
    /// relative to the data section and is offset by the final IC
    pub before_data: bool,
    pub is_entry: bool,
    pub is_extern: bool,
    pub line_number: usize,
}

/// One use site of an extern symbol, reported in the `.ext` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternRef {
    pub name: String,
    pub address: Address,
}

/// Per-file assembly state, reset between input files
///
/// The instruction list starts at address [MEMORY_START]; the data list
/// starts at 0 and is offset by the final IC at the end of the first pass.
#[derive(Debug)]
pub struct Unit {
    pub symbols: Vec<Symbol>,
    pub instructions: Vec<CodeWord>,
    pub data: Vec<CodeWord>,
    pub extern_refs: Vec<ExternRef>,
    pub ic: Address,
    pub dc: Address,
}

impl Unit {
    /// Create the empty state for one input file
    pub fn new() -> Unit {
        Unit {
            symbols: Vec::new(),
            instructions: Vec::new(),
            data: Vec::new(),
            extern_refs: Vec::new(),
            ic: MEMORY_START,
            dc: 0,
        }
    }
}

impl Default for Unit {
    fn default() -> Unit {
        Unit::new()
    }
}

/// Run the whole pipeline for one path prefix
///
/// Reads `P.as`, writes `P.am`, and on success writes `P.ob` and the
/// optional `P.ent` / `P.ext` listings. Returns the diagnostics collected
/// across all passes; output files exist if and only if the list is empty.
/// An I/O failure aborts this file's pipeline.
pub fn assemble_prefix(prefix: &str) -> Result<Vec<Error>, Error> {
    let mut errors = Vec::new();
    let mut macro_table = MacroTable::new();

    macros::expand_file(prefix, &mut macro_table, &mut errors)?;

    let expanded_path = format!("{prefix}.am");
    let expanded = fs::read_to_string(&expanded_path).map_err(|source| Error::Io {
        path: PathBuf::from(expanded_path),
        source,
    })?;

    let mut unit = Unit::new();
    first_pass::run(&expanded, &mut unit, &mut errors);
    check_macro_collisions(&macro_table, &unit, &mut errors);
    second_pass::run(&mut unit, &mut errors);

    if errors.is_empty() {
        emitter::write_outputs(prefix, &unit).map_err(|source| Error::Io {
            path: PathBuf::from(prefix),
            source,
        })?;
    }

    Ok(errors)
}

/// Report every symbol that shares its name with a macro
///
/// A macro invocation is only recognized as the first token of a line, so a
/// label with a macro's name would silently never be expandable; the
/// original language forbids the collision outright.
fn check_macro_collisions(macro_table: &MacroTable, unit: &Unit, errors: &mut Vec<Error>) {
    for symbol in &unit.symbols {
        if macro_table.lookup(&symbol.name).is_some() {
            errors.push(Error::MacroLabelCollision {
                name: symbol.name.clone(),
                line_number: symbol.line_number,
            });
        }
    }
}

/// An error that can occur during the assembly process
///
/// Every variant except [Error::Io] carries the number of the source line
/// that triggered it.
#[derive(Debug)]
pub enum Error {
    /// The `macr` keyword was not followed by exactly one macro name
    InvalidMacroDefinition { line_number: usize },
    /// A macro was named after a reserved word
    InvalidMacroName { name: String, line_number: usize },
    /// A macro with this name already exists
    DuplicateMacro { name: String, line_number: usize },
    /// Extra characters after `endmacr`
    JunkAfterMacroEnd { line_number: usize },
    /// The file ended inside a `macr` ... `endmacr` block
    UnterminatedMacro { name: String, line_number: usize },
    /// A source line is longer than [MAX_LINE_LEN] characters
    LineTooLong { line_number: usize },
    /// The `:` of a label definition was not followed by whitespace
    JunkAfterLabelColon { line_number: usize },
    /// Whitespace between a label name and its `:`
    DetachedLabelColon { line_number: usize },
    /// A label definition with nothing after it
    LabelOnlyLine { line_number: usize },
    /// A reserved word was used as a label name
    ReservedWordLabel { name: String, line_number: usize },
    /// A label name that is not a valid symbol
    InvalidLabel { name: String, line_number: usize },
    /// A `.` word that is not one of the four directives
    UnknownDirective { name: String, line_number: usize },
    /// A mnemonic that is not one of the 16 operations
    UnknownOperation { name: String, line_number: usize },
    /// An operand or data value that is not a whole decimal number
    InvalidNumber { token: String, line_number: usize },
    /// A number that does not fit the two's-complement range of its word
    NumberOutOfRange { value: i32, bits: u32, line_number: usize },
    /// Fewer commas than operands require
    MissingComma { line_number: usize },
    /// More commas than operands allow
    TooManyCommas { line_number: usize },
    /// An operand was expected but the line ended
    MissingOperand { line_number: usize },
    /// Unconsumed text after the last operand
    ExtraOperand { line_number: usize },
    /// A `*` or register operand naming a register outside r0..r7
    InvalidRegister { name: String, line_number: usize },
    /// An operand matching no addressing mode
    UnknownAddressingMode { operand: String, line_number: usize },
    /// An operand whose addressing mode the operation does not permit
    OperandModeMismatch { operand: String, operation: String, line_number: usize },
    /// A malformed `.string` argument
    InvalidString { line_number: usize },
    /// A directive that takes one operand was given more
    ExtraDirectiveOperand { directive: &'static str, line_number: usize },
    /// A direct-mode operand naming a symbol with no definition
    UndefinedLabel { name: String, line_number: usize },
    /// Two non-extern definitions of the same label
    DuplicateLabel { name: String, line_number: usize },
    /// An extern label that is also defined in this file
    ExternRedefined { name: String, line_number: usize },
    /// A label marked both `.entry` and `.extern`
    EntryExternConflict { name: String, line_number: usize },
    /// An `.entry` naming a label this file never defines
    UndefinedEntry { name: String, line_number: usize },
    /// A label sharing its name with a macro
    MacroLabelCollision { name: String, line_number: usize },
    /// A file could not be opened or written
    Io { path: PathBuf, source: io::Error },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidMacroDefinition { line_number } => write!(
                f,
                "line {line_number}: a macro definition is 'macr NAME' with nothing else on the line"
            ),
            Error::InvalidMacroName { name, line_number } => write!(
                f,
                "line {line_number}: '{name}' is a reserved word and cannot name a macro"
            ),
            Error::DuplicateMacro { name, line_number } => write!(
                f,
                "line {line_number}: macro '{name}' is already defined"
            ),
            Error::JunkAfterMacroEnd { line_number } => write!(
                f,
                "line {line_number}: no characters are allowed after 'endmacr'"
            ),
            Error::UnterminatedMacro { name, line_number } => write!(
                f,
                "line {line_number}: macro '{name}' is never closed with 'endmacr'"
            ),
            Error::LineTooLong { line_number } => write!(
                f,
                "line {line_number}: line is longer than {MAX_LINE_LEN} characters"
            ),
            Error::JunkAfterLabelColon { line_number } => write!(
                f,
                "line {line_number}: the ':' of a label definition must be followed by whitespace"
            ),
            Error::DetachedLabelColon { line_number } => write!(
                f,
                "line {line_number}: a label must be attached to its ':' without spaces"
            ),
            Error::LabelOnlyLine { line_number } => write!(
                f,
                "line {line_number}: a label must be followed by an instruction or a directive"
            ),
            Error::ReservedWordLabel { name, line_number } => write!(
                f,
                "line {line_number}: reserved word '{name}' cannot be used as a label name"
            ),
            Error::InvalidLabel { name, line_number } => write!(
                f,
                "line {line_number}: invalid label '{name}': a label starts with a letter, \
                 continues with letters and digits, and is at most {MAX_SYMBOL_LEN} characters long"
            ),
            Error::UnknownDirective { name, line_number } => write!(
                f,
                "line {line_number}: unknown directive '.{name}'"
            ),
            Error::UnknownOperation { name, line_number } => write!(
                f,
                "line {line_number}: operation '{name}' does not exist"
            ),
            Error::InvalidNumber { token, line_number } => write!(
                f,
                "line {line_number}: '{token}' is not a whole decimal number"
            ),
            Error::NumberOutOfRange { value, bits, line_number } => write!(
                f,
                "line {line_number}: {value} does not fit in {bits} bits (two's complement)"
            ),
            Error::MissingComma { line_number } => {
                write!(f, "line {line_number}: missing comma")
            }
            Error::TooManyCommas { line_number } => {
                write!(f, "line {line_number}: too many commas")
            }
            Error::MissingOperand { line_number } => {
                write!(f, "line {line_number}: missing operand")
            }
            Error::ExtraOperand { line_number } => {
                write!(f, "line {line_number}: extra operand")
            }
            Error::InvalidRegister { name, line_number } => write!(
                f,
                "line {line_number}: invalid register name '{name}'; registers are r0 to r7"
            ),
            Error::UnknownAddressingMode { operand, line_number } => write!(
                f,
                "line {line_number}: operand '{operand}' matches no addressing mode"
            ),
            Error::OperandModeMismatch { operand, operation, line_number } => write!(
                f,
                "line {line_number}: operand '{operand}' has an addressing mode that '{operation}' \
                 does not accept"
            ),
            Error::InvalidString { line_number } => write!(
                f,
                "line {line_number}: '.string' takes one double-quoted string of printable characters"
            ),
            Error::ExtraDirectiveOperand { directive, line_number } => write!(
                f,
                "line {line_number}: the '{directive}' directive accepts a single operand"
            ),
            Error::UndefinedLabel { name, line_number } => write!(
                f,
                "line {line_number}: using the undefined label '{name}'"
            ),
            Error::DuplicateLabel { name, line_number } => write!(
                f,
                "line {line_number}: label '{name}' is defined more than once"
            ),
            Error::ExternRedefined { name, line_number } => write!(
                f,
                "line {line_number}: extern label '{name}' is also defined in this file"
            ),
            Error::EntryExternConflict { name, line_number } => write!(
                f,
                "line {line_number}: label '{name}' is declared as both entry and extern"
            ),
            Error::UndefinedEntry { name, line_number } => write!(
                f,
                "line {line_number}: entry label '{name}' is not defined in the current source file"
            ),
            Error::MacroLabelCollision { name, line_number } => write!(
                f,
                "line {line_number}: label and macro with the same name '{name}'"
            ),
            Error::Io { path, source } => {
                write!(f, "cannot access '{}': {}", path.display(), source)
            }
        }
    }
}
