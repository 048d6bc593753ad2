//! Terminal helpers for the menus

use crate::error::Result;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, stdout, BufRead, Write};

const BANNER: &str = r"
  ____       _       _           _
 |  _ \ ___ | |_   _| |__   ___ | |_
 | |_) / _ \| | | | | '_ \ / _ \| __|
 |  __/ (_) | | |_| | |_) | (_) | |_
 |_|   \___/|_|\__, |_.__/ \___/ \__|
               |___/
";

pub fn clear_screen() -> Result<()> {
    execute!(stdout(), terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    Ok(())
}

/// Clear the screen and print the banner with a section title
pub fn header(title: &str) -> Result<()> {
    clear_screen()?;
    execute!(
        stdout(),
        SetForegroundColor(Color::Cyan),
        Print(BANNER),
        Print(format!("\n  {}\n", title)),
        Print(format!("  {}\n\n", "=".repeat(title.len()))),
        ResetColor
    )?;
    Ok(())
}

pub fn line(text: &str, color: Color) -> Result<()> {
    execute!(
        stdout(),
        SetForegroundColor(color),
        Print(text),
        Print("\n"),
        ResetColor
    )?;
    Ok(())
}

pub fn success(text: &str) -> Result<()> {
    line(text, Color::Green)
}

pub fn warning(text: &str) -> Result<()> {
    line(text, Color::Yellow)
}

pub fn error(text: &str) -> Result<()> {
    line(text, Color::Red)
}

/// Numbered options, starting at 1
pub fn menu(options: &[&str]) -> Result<()> {
    for (i, option) in options.iter().enumerate() {
        execute!(
            stdout(),
            SetForegroundColor(Color::Yellow),
            Print(format!("  {}. ", i + 1)),
            ResetColor,
            Print(option),
            Print("\n")
        )?;
    }
    println!();
    Ok(())
}

/// Print `label` and read one trimmed line.
///
/// End of input is an error so the menu loop cannot spin on a closed stdin.
pub fn prompt(label: &str) -> Result<String> {
    let mut out = stdout();
    execute!(
        out,
        SetForegroundColor(Color::Cyan),
        Print(label),
        ResetColor
    )?;
    out.flush()?;

    // Blocks the runtime thread; the menu runs one handler at a time and
    // nothing else is scheduled while it waits for input.
    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input)?;
    if read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed").into());
    }
    Ok(input.trim().to_string())
}

pub fn pause() -> Result<()> {
    prompt("\nPress Enter to continue...")?;
    Ok(())
}
