//! A two-pass assembler for a small 15-bit educational CPU, featuring:
//! - a macro preprocessor
//! - entry and extern label linkage listings
//! - octal object files

pub mod assembler;
pub mod logging;
