//! End-to-end tests driving the file-level pipeline: `.as` in, `.ob`,
//! `.ent` and `.ext` out.

use std::fs;
use std::path::Path;

use asm15::assembler;
use indoc::indoc;
use tempfile::TempDir;

fn write_source(dir: &TempDir, name: &str, source: &str) -> String {
    let prefix = dir.path().join(name).to_str().unwrap().to_string();
    fs::write(format!("{prefix}.as"), source).unwrap();
    prefix
}

fn assemble(source: &str) -> (TempDir, String, Vec<assembler::Error>) {
    let dir = TempDir::new().unwrap();
    let prefix = write_source(&dir, "prog", source);
    let errors = assembler::assemble_prefix(&prefix).unwrap();
    (dir, prefix, errors)
}

fn read(prefix: &str, extension: &str) -> String {
    fs::read_to_string(format!("{prefix}.{extension}")).unwrap()
}

fn exists(prefix: &str, extension: &str) -> bool {
    Path::new(&format!("{prefix}.{extension}")).exists()
}

#[test]
fn comment_only_input_produces_no_output_files() {
    let (_dir, prefix, errors) = assemble("; nothing to assemble\n\n   ; more comments\n");
    assert!(errors.is_empty());
    assert!(exists(&prefix, "am"));
    assert!(!exists(&prefix, "ob"));
    assert!(!exists(&prefix, "ent"));
    assert!(!exists(&prefix, "ext"));
}

#[test]
fn immediate_add_assembles_to_two_words() {
    let (_dir, prefix, errors) = assemble("MAIN: add #-5, r3\n");
    assert!(errors.is_empty());
    assert_eq!(read(&prefix, "ob"), "2 0\n0100 10304\n0101 77734\n");
    assert!(!exists(&prefix, "ent"));
    assert!(!exists(&prefix, "ext"));
}

#[test]
fn register_operands_fuse_into_one_extra_word() {
    let (_dir, prefix, errors) = assemble("mov r1, r2\n");
    assert!(errors.is_empty());
    assert_eq!(read(&prefix, "ob"), "2 0\n0100 02104\n0101 00124\n");
}

#[test]
fn data_words_follow_code_words_contiguously() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        A: mov r1, r2
        NUMS: .data 7, -3
    "});
    assert!(errors.is_empty());
    assert_eq!(
        read(&prefix, "ob"),
        "2 2\n0100 02104\n0101 00124\n0102 00007\n0103 77775\n"
    );
}

#[test]
fn extern_reference_lands_in_the_ext_listing() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        .extern EXT
        jmp EXT
    "});
    assert!(errors.is_empty());
    assert_eq!(read(&prefix, "ob"), "2 0\n0100 44024\n0101 00001\n");
    assert_eq!(read(&prefix, "ext"), "EXT 0101\n");
    assert!(!exists(&prefix, "ent"));
}

#[test]
fn entry_symbol_lands_in_the_ent_listing() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        .entry MAIN
        MAIN: mov r1, r2
        stop
    "});
    assert!(errors.is_empty());
    assert_eq!(read(&prefix, "ent"), "MAIN 0100\n");
    assert_eq!(read(&prefix, "ob"), "3 0\n0100 02104\n0101 00124\n0102 74004\n");
}

#[test]
fn undefined_entry_blocks_every_output_file() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        .entry FOO
        stop
    "});
    assert!(matches!(errors[..], [assembler::Error::UndefinedEntry { .. }]));
    assert!(!exists(&prefix, "ob"));
    assert!(!exists(&prefix, "ent"));
    assert!(!exists(&prefix, "ext"));
}

#[test]
fn any_diagnostic_blocks_every_output_file() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        MAIN: add #-5, r3
        mov r1, #2
    "});
    assert_eq!(errors.len(), 1);
    assert!(!exists(&prefix, "ob"));
}

#[test]
fn diagnostics_accumulate_across_lines_and_passes() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        mov r1, #2
        .data 1,,2
        jmp NOWHERE
    "});
    assert_eq!(errors.len(), 3);
    assert!(!exists(&prefix, "ob"));
}

#[test]
fn macros_expand_before_assembly() {
    let source = indoc! {"
        macr twice
            inc r1
            inc r1
        endmacr
        .entry MAIN
        MAIN: mov #3, r1
        twice
        LIST: .data 4, 5
        stop
    "};
    let (_dir, prefix, errors) = assemble(source);
    assert!(errors.is_empty());
    assert_eq!(
        read(&prefix, "ob"),
        indoc! {"
            7 2
            0100 00304
            0101 00034
            0102 34104
            0103 00014
            0104 34104
            0105 00014
            0106 74004
            0107 00004
            0108 00005
        "}
    );
    assert_eq!(read(&prefix, "ent"), "MAIN 0100\n");
}

#[test]
fn reassembling_the_expanded_file_reproduces_the_outputs() {
    let source = indoc! {"
        macr twice
            inc r1
            inc r1
        endmacr
        .entry MAIN
        .extern OUT
        MAIN: mov #3, r1
        twice
        jsr OUT
        LIST: .data 4, 5
        stop
    "};
    let dir = TempDir::new().unwrap();
    let prefix = write_source(&dir, "prog", source);
    let errors = assembler::assemble_prefix(&prefix).unwrap();
    assert!(errors.is_empty());

    let again = write_source(&dir, "again", &read(&prefix, "am"));
    let errors = assembler::assemble_prefix(&again).unwrap();
    assert!(errors.is_empty());

    assert_eq!(read(&again, "ob"), read(&prefix, "ob"));
    assert_eq!(read(&again, "ent"), read(&prefix, "ent"));
    assert_eq!(read(&again, "ext"), read(&prefix, "ext"));
}

#[test]
fn label_and_macro_with_the_same_name_collide() {
    let (_dir, prefix, errors) = assemble(indoc! {"
        macr m
        stop
        endmacr
        m: .data 5
    "});
    assert!(matches!(
        errors[..],
        [assembler::Error::MacroLabelCollision { .. }]
    ));
    assert!(!exists(&prefix, "ob"));
}

#[test]
fn missing_input_file_is_a_fatal_error() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("absent").to_str().unwrap().to_string();
    assert!(matches!(
        assembler::assemble_prefix(&prefix),
        Err(assembler::Error::Io { .. })
    ));
}
