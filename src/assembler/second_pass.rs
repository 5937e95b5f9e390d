//! Second pass: entry merging, consistency checks, symbol resolution
//!
//! Runs after the whole file has been scanned, so every label has its final
//! address. Each step keeps going after a failure to surface as many
//! diagnostics as possible; the emitter never runs on a unit with errors.

use crate::assembler::{ARE_EXTERNAL, ARE_RELOCATABLE, Error, ExternRef, Unit, Word};

/// Check and resolve one scanned unit in place
pub fn run(unit: &mut Unit, errors: &mut Vec<Error>) {
    merge_entries(unit, errors);
    check_entry_extern_conflicts(unit, errors);
    check_duplicate_labels(unit, errors);
    resolve_symbols(unit, errors);
}

/// Fold provisional `.entry` records into the records that define them
///
/// A provisional record has no address. Its defining record gets the entry
/// flag and the provisional one is dropped; with no defining record the
/// entry is undefined and the provisional record stays behind.
fn merge_entries(unit: &mut Unit, errors: &mut Vec<Error>) {
    let mut index = 0;
    while index < unit.symbols.len() {
        if !unit.symbols[index].is_entry || unit.symbols[index].address.is_some() {
            index += 1;
            continue;
        }
        let name = unit.symbols[index].name.clone();
        match unit
            .symbols
            .iter()
            .position(|s| s.name == name && !s.is_entry)
        {
            Some(defining) => {
                unit.symbols[defining].is_entry = true;
                unit.symbols.remove(index);
            }
            None => {
                errors.push(Error::UndefinedEntry {
                    name,
                    line_number: unit.symbols[index].line_number,
                });
                index += 1;
            }
        }
    }
}

/// A name may be exported or imported, never both
fn check_entry_extern_conflicts(unit: &Unit, errors: &mut Vec<Error>) {
    for symbol in &unit.symbols {
        if !symbol.is_entry {
            continue;
        }
        if unit
            .symbols
            .iter()
            .any(|s| s.name == symbol.name && s.is_extern)
        {
            errors.push(Error::EntryExternConflict {
                name: symbol.name.clone(),
                line_number: symbol.line_number,
            });
        }
    }
}

/// Any two records sharing a name are an error
///
/// When one of the pair is extern the file both imports and defines the
/// name, which gets its own message.
fn check_duplicate_labels(unit: &Unit, errors: &mut Vec<Error>) {
    for (index, first) in unit.symbols.iter().enumerate() {
        for second in &unit.symbols[index + 1..] {
            if first.name != second.name {
                continue;
            }
            if first.is_extern || second.is_extern {
                let external = if first.is_extern { first } else { second };
                errors.push(Error::ExternRedefined {
                    name: external.name.clone(),
                    line_number: external.line_number,
                });
            } else {
                errors.push(Error::DuplicateLabel {
                    name: first.name.clone(),
                    line_number: second.line_number,
                });
            }
        }
    }
}

/// Patch every symbol placeholder in the instruction list
///
/// An extern reference becomes a zero address with the external ARE suffix
/// and is recorded for the `.ext` listing; any other symbol becomes its
/// relocatable address.
fn resolve_symbols(unit: &mut Unit, errors: &mut Vec<Error>) {
    for code_word in &mut unit.instructions {
        let name = match &code_word.word {
            Word::Symbol(name) => name.clone(),
            Word::Bits(_) => continue,
        };
        match unit.symbols.iter().find(|s| s.name == name) {
            None => {
                errors.push(Error::UndefinedLabel {
                    name,
                    line_number: code_word.line_number,
                });
            }
            Some(symbol) if symbol.is_extern => {
                unit.extern_refs.push(ExternRef {
                    name,
                    address: code_word.address,
                });
                code_word.word = Word::Bits(ARE_EXTERNAL);
            }
            Some(symbol) => {
                // a provisional record that never merged has no address;
                // that failure is already recorded
                let address = symbol.address.unwrap_or(0);
                code_word.word = Word::Bits((address & 0xFFF) << 3 | ARE_RELOCATABLE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::first_pass;
    use crate::assembler::MEMORY_START;
    use indoc::indoc;

    fn assemble(source: &str) -> (Unit, Vec<Error>) {
        let mut unit = Unit::new();
        let mut errors = Vec::new();
        first_pass::run(source, &mut unit, &mut errors);
        assert!(errors.is_empty(), "first pass failed: {errors:?}");
        run(&mut unit, &mut errors);
        (unit, errors)
    }

    #[test]
    fn entry_merges_into_its_definition() {
        let (unit, errors) = assemble(indoc! {"
            .entry LOOP
            LOOP: dec r1
        "});
        assert!(errors.is_empty());
        let records: Vec<_> = unit.symbols.iter().filter(|s| s.name == "LOOP").collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_entry);
        assert_eq!(records[0].address, Some(MEMORY_START));
    }

    #[test]
    fn undefined_entry_is_an_error() {
        let (_, errors) = assemble(indoc! {"
            .entry FOO
            stop
        "});
        assert!(matches!(errors[..], [Error::UndefinedEntry { .. }]));
    }

    #[test]
    fn entry_extern_conflict_is_an_error() {
        let (_, errors) = assemble(indoc! {"
            .entry FOO
            .extern FOO
            stop
        "});
        assert!(errors
            .iter()
            .any(|e| matches!(e, Error::EntryExternConflict { .. })));
    }

    #[test]
    fn duplicate_labels_are_an_error() {
        let (_, errors) = assemble(indoc! {"
            A: stop
            A: rts
        "});
        assert!(matches!(errors[..], [Error::DuplicateLabel { .. }]));
    }

    #[test]
    fn extern_with_a_local_definition_is_an_error() {
        let (_, errors) = assemble(indoc! {"
            .extern A
            A: stop
        "});
        assert!(matches!(errors[..], [Error::ExternRedefined { .. }]));
    }

    #[test]
    fn local_symbols_resolve_to_relocatable_words() {
        let (unit, errors) = assemble(indoc! {"
            jmp LOOP
            LOOP: stop
        "});
        assert!(errors.is_empty());
        let loop_address = MEMORY_START + 2;
        assert_eq!(
            unit.instructions[1].word,
            Word::Bits(loop_address << 3 | ARE_RELOCATABLE)
        );
        assert!(unit.extern_refs.is_empty());
    }

    #[test]
    fn extern_symbols_resolve_to_zero_with_external_suffix() {
        let (unit, errors) = assemble(indoc! {"
            .extern EXT
            jmp EXT
        "});
        assert!(errors.is_empty());
        assert_eq!(unit.instructions[1].word, Word::Bits(ARE_EXTERNAL));
        assert_eq!(
            unit.extern_refs,
            vec![ExternRef {
                name: "EXT".to_string(),
                address: MEMORY_START + 1,
            }]
        );
    }

    #[test]
    fn every_extern_use_site_is_recorded() {
        let (unit, errors) = assemble(indoc! {"
            .extern EXT
            jmp EXT
            jsr EXT
        "});
        assert!(errors.is_empty());
        let addresses: Vec<_> = unit.extern_refs.iter().map(|r| r.address).collect();
        assert_eq!(addresses, vec![MEMORY_START + 1, MEMORY_START + 3]);
    }

    #[test]
    fn undefined_label_is_an_error() {
        let (_, errors) = assemble("jmp NOWHERE\n");
        assert!(matches!(errors[..], [Error::UndefinedLabel { .. }]));
    }

    #[test]
    fn data_labels_resolve_after_adjustment() {
        let (unit, errors) = assemble(indoc! {"
            lea STR, r1
            STR: .string \"ab\"
        "});
        assert!(errors.is_empty());
        // lea takes three words, so the data section and STR start at 103
        assert_eq!(
            unit.instructions[1].word,
            Word::Bits((MEMORY_START + 3) << 3 | ARE_RELOCATABLE)
        );
    }
}
