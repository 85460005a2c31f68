use colored::{ColoredString, Colorize};

/// Marker for a successful match or conversion
pub fn success() -> ColoredString {
    "##".green().bold()
}

/// Marker for a skipped file
pub fn skipped() -> ColoredString {
    "%%".blue().bold()
}

/// Header marker for uncertain results (fuzzy matches, fallback conversions)
pub fn unsure() -> ColoredString {
    "@@".yellow().bold()
}

/// Continuation marker under an uncertain result
pub fn unsure_cont() -> ColoredString {
    "||".yellow().bold()
}

/// Continuation marker under a successful match
pub fn success_cont() -> ColoredString {
    "||".green().bold()
}

/// Header marker for a failure cause
pub fn fail() -> ColoredString {
    "XX".red().bold()
}

/// Continuation marker under a failure
pub fn fail_cont() -> ColoredString {
    "||".red().bold()
}

/// Marker for batch summary lines
pub fn finish() -> ColoredString {
    "$$".cyan().bold()
}

pub fn error_tag() -> ColoredString {
    "[ERROR]".red().bold()
}

pub fn warning_tag() -> ColoredString {
    "[WARNING]".red().bold()
}

/// Highlights a file name or line reference inside a report
pub fn highlight(text: &str) -> ColoredString {
    text.blue().bold()
}

/// Highlights a number in a summary line
pub fn figure(value: impl ToString) -> ColoredString {
    value.to_string().cyan().bold()
}

/// Formats a fuzzy confidence score to five decimals
pub fn score(value: f64) -> ColoredString {
    format!("{:.5}", value).yellow().bold()
}

/// Forces colors on or off for this process, e.g. inside worker processes whose
/// stdout is a pipe but whose reports end up on the user's terminal
pub fn set_color(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Whether this process would currently emit colors
pub fn color_enabled() -> bool {
    colored::control::SHOULD_COLORIZE.should_colorize()
}
