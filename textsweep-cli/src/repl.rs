use anyhow::Result;
use colored::Colorize;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use textsweep::config::MethodSetting;
use textsweep::{output, BatchRunner, ConvertParams, SearchParams, Session, SweepConfig};

use crate::listing::{self, ListTarget};

const COMMANDS: &[&str] = &[
    "Usage: /command [optional parameters]",
    "  or:  <search query>",
    "",
    "/cd [path]          : change the working directory",
    "/ls [column] [dir]  : list the working (-t) or start (-s) directory",
    "/mt [method]        : search for exact (-e) or approximate (-p) matches",
    "/s [score]          : set the minimum score of approximate matches",
    "/t [workers]        : allocate a number (or -a, -h, -q) of workers",
    "/cv [-v|-b]         : convert every document to plain text (deletes originals)",
    "/c                  : refresh the display",
    "/h                  : print out all available commands",
    "/q                  : exit the program",
];

/// What the loop should do after a line was handled
enum Flow {
    Continue,
    Quit,
}

/// Line-oriented interactive shell. Batches run one at a time; a failed command
/// prints one `[ERROR]` line and leaves the session unchanged.
pub struct Repl<R, W> {
    input: R,
    out: W,
    session: Session,
    config: SweepConfig,
    settings_path: Option<PathBuf>,
    runner: BatchRunner,
    columns: usize,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(
        input: R,
        out: W,
        session: Session,
        config: SweepConfig,
        settings_path: Option<PathBuf>,
        runner: BatchRunner,
    ) -> Self {
        Self {
            input,
            out,
            session,
            config,
            settings_path,
            runner,
            columns: listing::DEFAULT_COLUMNS,
        }
    }

    /// Reads commands until `/q` or end of input
    pub fn run(mut self) -> Result<()> {
        self.banner()?;
        loop {
            write!(self.out, "{} ", self.prompt().cyan().bold())?;
            self.out.flush()?;

            let Some(line) = self.read_line()? else {
                writeln!(self.out)?;
                break;
            };
            if let Flow::Quit = self.handle(line.trim())? {
                break;
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        format!("[textsweep {}]$", self.session.prompt_dir())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn handle(&mut self, input: &str) -> Result<Flow> {
        if input.is_empty() {
            return Ok(Flow::Continue);
        }
        if !input.starts_with('/') {
            self.search(input)?;
            return Ok(Flow::Continue);
        }

        let (command, arg) = input
            .split_once(char::is_whitespace)
            .map(|(command, arg)| (command, arg.trim()))
            .unwrap_or((input, ""));
        debug!("Command {} {:?}", command, arg);

        match command {
            "/cd" => {
                let updated = self.session.change_dir(arg);
                if self.apply(updated)? {
                    self.persist()?;
                    self.banner()?;
                }
            }
            "/ls" => self.list(arg)?,
            "/mt" => {
                let updated = self.session.set_method(arg);
                if self.apply(updated)? {
                    self.persist()?;
                    self.banner()?;
                }
            }
            "/s" => {
                let updated = self.session.set_score(arg);
                if self.apply(updated)? {
                    writeln!(
                        self.out,
                        "Set the approximate searcher confidence score to {}",
                        self.session.score()
                    )?;
                }
            }
            "/t" => {
                let updated = self.session.allocate_workers(arg);
                if self.apply(updated)? {
                    writeln!(
                        self.out,
                        "Allocated ({}) workers",
                        output::figure(self.session.workers())
                    )?;
                }
            }
            "/cv" => self.convert(arg)?,
            "/c" => {
                execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
                self.banner()?;
            }
            "/h" => {
                for line in COMMANDS {
                    writeln!(self.out, "{}", line)?;
                }
            }
            "/q" => return Ok(Flow::Quit),
            _ => self.error("Invalid command. Type /h to see a list of available commands")?,
        }
        Ok(Flow::Continue)
    }

    /// Swaps in the updated session, or reports why it was rejected
    fn apply(&mut self, updated: textsweep::SweepResult<Session>) -> Result<bool> {
        match updated {
            Ok(session) => {
                self.session = session;
                Ok(true)
            }
            Err(e) => {
                self.error(&e.to_string())?;
                Ok(false)
            }
        }
    }

    fn error(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{} {}", output::error_tag(), message)?;
        Ok(())
    }

    fn banner(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "{} {}",
            "textsweep".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(
            self.out,
            "Working directory: {}",
            output::highlight(&self.session.directory().display().to_string())
        )?;
        writeln!(
            self.out,
            "Search method: {} | Workers: {}",
            self.session.method_name(),
            self.session.workers()
        )?;
        writeln!(self.out, "Type /h for a list of commands")?;
        Ok(())
    }

    /// Saves directory and method so the next session starts where this one left off
    fn persist(&mut self) -> Result<()> {
        self.config.target_dir = Some(self.session.directory().to_path_buf());
        self.config.search_method = if self.session.is_fuzzy() {
            MethodSetting::Fuzzy
        } else {
            MethodSetting::Exact
        };
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.config.save(path) {
                warn!("Couldn't save settings to {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    fn list(&mut self, arg: &str) -> Result<()> {
        let (columns, target) = match listing::parse_args(arg, self.columns) {
            Ok(parsed) => parsed,
            Err(e) => return self.error(&e.to_string()),
        };
        self.columns = columns;
        let dir = match target {
            ListTarget::Target => self.session.directory().to_path_buf(),
            ListTarget::Home => self.session.home().to_path_buf(),
        };
        match listing::render(&dir, columns, &self.config.plain_text_extensions) {
            Ok(text) => write!(self.out, "{}", text)?,
            Err(e) => self.error(&format!("Couldn't list {}: {}", dir.display(), e))?,
        }
        Ok(())
    }

    fn search(&mut self, query: &str) -> Result<()> {
        let echoed = format!("{} {}", self.prompt(), query);
        writeln!(self.out, "{}", "-".repeat(echoed.chars().count()))?;

        let params = SearchParams::new(query, self.session.search_method());
        let outcome = self.runner.search(
            self.session.directory(),
            self.session.workers(),
            &params,
            &mut self.out,
        );
        if let Err(e) = outcome {
            self.error(&e.to_string())?;
        }
        Ok(())
    }

    fn convert(&mut self, arg: &str) -> Result<()> {
        let verbose = match arg {
            "" => self.config.verbose,
            "-v" | "--verbose" => true,
            "-b" | "--brief" => false,
            other => return self.error(&format!("Invalid argument for /cv: {}", other)),
        };
        if !self.confirm()? {
            writeln!(self.out, "Conversion cancelled")?;
            return Ok(());
        }

        let params = ConvertParams {
            plain_text_extensions: self.config.plain_text_extensions.clone(),
            converter: self.config.converter.clone(),
            verbose,
        };
        let outcome = self.runner.convert(
            self.session.directory(),
            self.session.workers(),
            &params,
            &mut self.out,
        );
        if let Err(e) = outcome {
            self.error(&e.to_string())?;
        }
        Ok(())
    }

    /// Asks until the answer is yes or no; end of input counts as no
    fn confirm(&mut self) -> Result<bool> {
        loop {
            write!(
                self.out,
                "{} Converting will PERMANENTLY DELETE the original files in {}. Continue? [y/n] ",
                output::warning_tag(),
                self.session.directory().display()
            )?;
            self.out.flush()?;

            let Some(answer) = self.read_line()? else {
                writeln!(self.out)?;
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.error("Please answer y or n")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn run_script(dir: &std::path::Path, script: &str) -> String {
        output::set_color(false);
        let session = Session::new(dir, dir, 2);
        let mut out = Vec::new();
        Repl::new(
            Cursor::new(script.to_string()),
            &mut out,
            session,
            SweepConfig::default(),
            None,
            BatchRunner::default(),
        )
        .run()
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_search_and_quit() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello World\n").unwrap();

        let text = run_script(dir.path(), "hello\n/q\nnever reached\n");
        assert!(text.contains("1 match at Line(1) of a.txt"));
        assert!(text.contains("Found 1 results"));
        assert!(!text.contains("never reached"));
    }

    #[test]
    fn test_errors_keep_the_shell_alive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "needle\n").unwrap();

        let text = run_script(dir.path(), "/bogus\n/t 0\n/cd missing\n/s 7\nneedle\n");
        assert!(text.contains("[ERROR] Invalid command"));
        assert!(text.contains("[ERROR] The number of workers must be greater than 0"));
        assert!(text.contains("[ERROR] Directory not found"));
        assert!(text.contains("[ERROR] Confidence score must be between 0 and 1"));
        assert!(text.contains("Found 1 results"));
    }

    #[test]
    fn test_convert_requires_confirmation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.log"), "log\n").unwrap();

        let text = run_script(dir.path(), "/cv\nmaybe\nn\n");
        assert!(text.contains("PERMANENTLY DELETE"));
        assert!(text.contains("[ERROR] Please answer y or n"));
        assert!(text.contains("Conversion cancelled"));
        assert!(dir.path().join("x.log").exists());

        let text = run_script(dir.path(), "/cv -v\ny\n");
        assert!(text.contains("Attempted conversion(s): 1"));
        assert!(!dir.path().join("x.log").exists());
        assert!(dir.path().join("x (LOG).txt").exists());
    }

    #[test]
    fn test_method_and_score() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "help yellow\n").unwrap();

        let text = run_script(dir.path(), "/mt -p\n/s 0.5\nhello\n");
        assert!(text.contains("Search method: proximity match"));
        assert!(text.contains("confidence score to 0.5"));
        assert!(text.contains("0.72727"));
    }

    #[test]
    fn test_cd_and_ls() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("inner.txt"), "x").unwrap();

        let text = run_script(dir.path(), "/cd docs\n/ls 1\n/ls 0\n");
        assert!(text.contains("[textsweep ~/docs]$") || cfg!(windows));
        assert!(text.contains("inner.txt"));
        assert!(text.contains("[ERROR] /ls [column] must be greater than 0"));
    }
}
