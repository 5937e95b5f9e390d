//! Writing the object, entries, and externals files
//!
//! Only runs on a unit that assembled without a single diagnostic. Each
//! word is printed as its 4-digit decimal address and the 5-digit octal of
//! its 15 bits.

use std::fs::File;
use std::io::{self, Write};

use crate::assembler::{MEMORY_START, Unit};

/// Render the 15 bits of a word as 5 zero-padded octal digits
pub fn octal(word: u16) -> String {
    format!("{:05o}", word & 0x7FFF)
}

/// Write the output files for a fully resolved unit
///
/// `P.ob` is skipped when the file produced no words at all; `P.ent` and
/// `P.ext` are only written when there is something to list.
pub fn write_outputs(prefix: &str, unit: &Unit) -> io::Result<()> {
    if !unit.instructions.is_empty() || !unit.data.is_empty() {
        write_object(prefix, unit)?;
    }
    if unit.symbols.iter().any(|s| s.is_entry) {
        write_entries(prefix, unit)?;
    }
    if !unit.extern_refs.is_empty() {
        write_externals(prefix, unit)?;
    }
    Ok(())
}

/// Write `P.ob`: the code/data sizes, then every word in address order
fn write_object(prefix: &str, unit: &Unit) -> io::Result<()> {
    let mut file = File::create(format!("{prefix}.ob"))?;
    writeln!(file, "{} {}", unit.ic - MEMORY_START, unit.dc)?;
    for code_word in unit.instructions.iter().chain(unit.data.iter()) {
        writeln!(
            file,
            "{:04} {}",
            code_word.address,
            octal(code_word.word.bits())
        )?;
    }
    Ok(())
}

/// Write `P.ent`: one line per exported symbol, in definition order
fn write_entries(prefix: &str, unit: &Unit) -> io::Result<()> {
    let mut file = File::create(format!("{prefix}.ent"))?;
    for symbol in &unit.symbols {
        if !symbol.is_entry {
            continue;
        }
        let Some(address) = symbol.address else {
            continue;
        };
        writeln!(file, "{} {:04}", symbol.name, address)?;
    }
    Ok(())
}

/// Write `P.ext`: one line per extern use site, duplicates preserved
fn write_externals(prefix: &str, unit: &Unit) -> io::Result<()> {
    let mut file = File::create(format!("{prefix}.ext"))?;
    for reference in &unit.extern_refs {
        writeln!(file, "{} {:04}", reference.name, reference.address)?;
    }
    Ok(())
}
