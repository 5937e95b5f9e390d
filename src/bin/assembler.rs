use std::env;

use asm15::assembler;
use asm15::logging;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <prefix> [<prefix> ...]", args[0]);
        eprintln!("Assembles <prefix>.as into <prefix>.ob (plus .ent/.ext listings)");
        return;
    }

    for prefix in &args[1..] {
        let errors = match assembler::assemble_prefix(prefix) {
            Ok(errors) => errors,
            Err(fatal) => {
                logging::error(fatal.to_string());
                logging::note(format!("assembly of '{prefix}' was aborted"));
                continue;
            }
        };

        for error in &errors {
            logging::error(error.to_string());
        }
        if !errors.is_empty() {
            logging::note(format!(
                "errors were detected in '{prefix}'; no output files were generated"
            ));
        }
    }
}
