use std::io::{BufRead, Write};

use crate::error::Result;

/// Ask a yes/no question; only "y" or "yes" counts as agreement.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Two sequential confirmations; the second is only asked after the first
/// is accepted.
pub fn confirm_twice<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    first: &str,
    second: &str,
) -> Result<bool> {
    Ok(confirm(input, out, first)? && confirm(input, out, second)?)
}

/// Interactive variant over stdin/stderr.
pub fn ask(question: &str) -> Result<bool> {
    let stdin = std::io::stdin();
    confirm(&mut stdin.lock(), &mut std::io::stderr(), question)
}
