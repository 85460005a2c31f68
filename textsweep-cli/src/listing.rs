use anyhow::{bail, Result};
use colored::{Color, Colorize};
use itertools::Itertools;
use std::fs;
use std::path::Path;

use textsweep::filters::{self, DOCX_EXTENSION, PDF_EXTENSION};

/// Columns used by `/ls` until the user picks another number
pub const DEFAULT_COLUMNS: usize = 2;

/// Which directory `/ls` lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    /// The session's working directory (`-t`, `--target`)
    Target,
    /// The directory the shell was started from (`-s`, `--script`)
    Home,
}

/// Parses `/ls [columns] [-t|--target|-s|--script]`. A missing column count keeps
/// `previous`.
pub fn parse_args(args: &str, previous: usize) -> Result<(usize, ListTarget)> {
    let mut columns = previous;
    let mut target = ListTarget::Target;

    for arg in args.split_whitespace() {
        if let Ok(number) = arg.parse::<i64>() {
            if number <= 0 {
                bail!("/ls [column] must be greater than 0");
            }
            columns = number as usize;
            continue;
        }
        target = match arg {
            "-t" | "--target" => ListTarget::Target,
            "-s" | "--script" => ListTarget::Home,
            _ => bail!("Invalid value for /ls [dir]: {}", arg),
        };
    }

    Ok((columns.max(1), target))
}

/// Color of a listed entry, hinting at what `/cv` and searches will do with it
fn entry_color(name: &str, is_dir: bool, plain_text_extensions: &[String]) -> Option<Color> {
    let path = Path::new(name);
    if is_dir {
        Some(Color::Cyan)
    } else if filters::has_extension(path, DOCX_EXTENSION) {
        Some(Color::Blue)
    } else if filters::has_extension(path, PDF_EXTENSION) {
        Some(Color::Red)
    } else if filters::is_searchable(path) {
        Some(Color::Green)
    } else if filters::is_plain_text_fallback(path, plain_text_extensions) {
        Some(Color::Yellow)
    } else {
        None
    }
}

/// Renders the entries of `dir` in `columns` columns. Directories get a trailing
/// separator.
pub fn render(dir: &Path, columns: usize, plain_text_extensions: &[String]) -> Result<String> {
    let mut entries: Vec<(String, bool)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (entry.file_name().to_string_lossy().into_owned(), is_dir)
        })
        .collect();
    entries.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    if entries.is_empty() {
        return Ok(format!("{} is empty\n", dir.display()));
    }

    let label = |(name, is_dir): &(String, bool)| {
        if *is_dir {
            format!("{}{}", name, std::path::MAIN_SEPARATOR)
        } else {
            name.clone()
        }
    };
    let width = entries.iter().map(|e| label(e).chars().count()).max().unwrap_or(0) + 2;
    let mut rendered = String::new();
    for row in &entries.iter().chunks(columns.max(1)) {
        let line = row
            .map(|entry| {
                let text = label(entry);
                let padding = " ".repeat(width - text.chars().count());
                let text = match entry_color(&entry.0, entry.1, plain_text_extensions) {
                    Some(color) => text.as_str().color(color),
                    None => text.as_str().normal(),
                };
                format!("{}{}", text, padding)
            })
            .join("");
        rendered.push_str(line.trim_end());
        rendered.push('\n');
    }
    Ok(rendered)
}
