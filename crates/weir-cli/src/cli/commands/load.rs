use crate::cli::args::LoadArgs;
use crate::exit_codes;
use anyhow::Context;
use weir_engine::Engine;
use weir_rules::{install_ruleset, Parser};

pub fn run(engine: &dyn Engine, args: LoadArgs) -> anyhow::Result<i32> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Could not open file: {}", args.file.display()))?;

    // A failed parse aborts the whole load; nothing is partially installed.
    let ruleset = match Parser::new(&source).and_then(Parser::parse) {
        Ok(ruleset) => ruleset,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(exit_codes::FAILURE);
        }
    };

    let summary = install_ruleset(&ruleset, engine);
    println!(
        "Installed {} filters from {} rules.",
        summary.installed, summary.rules
    );

    if summary.failed > 0 {
        eprintln!("Error: {} rules failed to install.", summary.failed);
        return Ok(exit_codes::FAILURE);
    }
    Ok(exit_codes::OK)
}
