use std::io::{self, Write};

use serde::Serialize;

use crate::error::AppResult;

/// Pretty-printed document followed by a newline, written in one go.
pub fn print<T: Serialize>(value: &T) -> AppResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
