/// Eligibility rules deciding which directory entries become work items.
///
/// Extensions are compared case-sensitively: the fallback list may carry both `.c` and
/// `.C`, and only `name.txt` is searched, never `NAME.TXT`.
use std::path::Path;

/// Name suffix of files considered by the searchers
pub const SEARCH_SUFFIX: &str = ".txt";

/// Office documents handed to the external converter
pub const DOCX_EXTENSION: &str = "docx";

/// Documents whose embedded text layer is extracted
pub const PDF_EXTENSION: &str = "pdf";

/// Returns the extension of `path` with its leading dot (`.log`), if any
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
}

/// Checks if a file has exactly the given extension
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(extension)
}

/// Checks if a file should be searched: its name ends in `.txt`, which also
/// covers a file named just `.txt`
pub fn is_searchable(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(SEARCH_SUFFIX))
}

/// Checks if a file's extension is in the plain-text fallback list.
/// List entries carry a leading dot (`.log`, `.md`).
pub fn is_plain_text_fallback(path: &Path, plain_text_extensions: &[String]) -> bool {
    match dotted_extension(path) {
        Some(ext) => plain_text_extensions.iter().any(|e| *e == ext),
        None => false,
    }
}

/// Checks if a file should be handed to the converter
pub fn is_convertible(path: &Path, plain_text_extensions: &[String]) -> bool {
    has_extension(path, DOCX_EXTENSION)
        || has_extension(path, PDF_EXTENSION)
        || is_plain_text_fallback(path, plain_text_extensions)
}

/// Parses the plain-text extension list format: `#` starts a comment line,
/// everything else is whitespace-separated extensions.
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Default fallback list: formats that are plain text in disguise
pub fn default_plain_text_extensions() -> Vec<String> {
    parse_extension_list(DEFAULT_PLAIN_TEXT_EXTENSIONS)
}

const DEFAULT_PLAIN_TEXT_EXTENSIONS: &str = "
# Web Development
.css .sass .html .htm .js .jsm .mjs .json

# Markdown & Org Mode
.markdown .md .mkd .org

# Plain
.v .asc .log .conf

# Office
.doc

# Programming Languages
.py .py3 .pyi .pyx .py3x .wsgi
.rs .vbs .lua .p .pas .kt .java
.c .C .cs .c++ .cc .cpp .cxx
.lisp .go .hs
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_searchable() {
        assert!(is_searchable(Path::new("notes.txt")));
        assert!(is_searchable(Path::new("dir/notes.txt")));
        assert!(!is_searchable(Path::new("notes.TXT")));
        assert!(!is_searchable(Path::new("notes.txt.bak")));
        assert!(!is_searchable(Path::new("notes")));
        assert!(!is_searchable(Path::new("txt")));
    }

    #[test]
    fn test_bare_dot_txt_is_searchable() {
        assert!(is_searchable(Path::new(".txt")));
        assert!(is_searchable(Path::new("dir/.txt")));
        assert!(!is_searchable(Path::new(".txt.swp")));
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension(Path::new("x.log")), Some(".log".to_string()));
        assert_eq!(dotted_extension(Path::new("a.tar.gz")), Some(".gz".to_string()));
        assert_eq!(dotted_extension(Path::new("Makefile")), None);
        assert_eq!(dotted_extension(Path::new(".bashrc")), None);
    }

    #[test]
    fn test_is_convertible() {
        let plain = vec![".log".to_string(), ".md".to_string()];

        assert!(is_convertible(Path::new("report.docx"), &plain));
        assert!(is_convertible(Path::new("paper.pdf"), &plain));
        assert!(is_convertible(Path::new("x.log"), &plain));
        assert!(!is_convertible(Path::new("x.LOG"), &plain));
        assert!(!is_convertible(Path::new("report (DOCX).txt"), &plain));
        assert!(!is_convertible(Path::new("image.png"), &plain));
    }

    #[test]
    fn test_parse_extension_list() {
        let raw = "# comment\n.a .b\n\n  .c  \n# .d\n";
        assert_eq!(parse_extension_list(raw), vec![".a", ".b", ".c"]);
    }

    #[test]
    fn test_default_list_is_case_sensitive() {
        let defaults = default_plain_text_extensions();
        assert!(defaults.contains(&".c".to_string()));
        assert!(defaults.contains(&".C".to_string()));
        assert!(defaults.contains(&".log".to_string()));
        assert!(!defaults.contains(&".txt".to_string()));
    }
}
