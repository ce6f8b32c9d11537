//! Interactive multi-line instruction input.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::core::types::GeneratorKind;

const PROMPT: &str = "> ";

const README_BANNER: &str = "\
Creating a README for this project.

Describe anything you especially want included.
Finish: blank line
Quit: Ctrl+C
";

const RSPEC_BANNER: &str = "\
Describe the RSpec test case in detail.
Example: an administrator creates, edits and deletes books

Finish: blank line after your description
Quit: Ctrl+C
";

pub fn banner(kind: GeneratorKind) -> &'static str {
    match kind {
        GeneratorKind::Readme => README_BANNER,
        GeneratorKind::Rspec => RSPEC_BANNER,
    }
}

/// Read an instruction line by line until a terminating blank line or EOF.
///
/// The README prompt ends on the first blank line, so an empty instruction is
/// accepted. The RSpec prompt ignores blank lines until something has been
/// typed. The result is trimmed.
pub fn read_instruction<R: BufRead, W: Write>(
    kind: GeneratorKind,
    mut input: R,
    out: &mut W,
) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();
    loop {
        out.write_all(PROMPT.as_bytes()).context("write prompt")?;
        out.flush().context("flush prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("read instruction")?;
        if read == 0 {
            // EOF: move past the dangling prompt.
            writeln!(out).context("write newline")?;
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        let blank = line.trim().is_empty();
        let has_content = lines.iter().any(|l| !l.trim().is_empty());
        if blank && (kind == GeneratorKind::Readme || has_content) {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n").trim().to_string())
}
