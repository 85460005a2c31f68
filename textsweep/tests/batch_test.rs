use anyhow::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use textsweep::{
    BatchRunner, ConvertParams, OutcomeKind, SearchMethod, SearchParams, SweepError,
};

fn create_test_files(dir: &Path, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        fs::write(dir.join(name), content)?;
    }
    Ok(())
}

fn create_numbered_files(dir: &Path, file_count: usize, lines_per_file: usize) -> Result<()> {
    for i in 0..file_count {
        let mut file = File::create(dir.join(format!("test_{}.txt", i)))?;
        for j in 0..lines_per_file {
            writeln!(file, "Line {} in file {}: TODO implement this", j, i)?;
            writeln!(file, "Another line {} in file {}: nothing special", j, i)?;
        }
    }
    Ok(())
}

/// Builds a one-page PDF showing `text` in Helvetica, with a valid xref table
fn single_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}

fn exact(query: &str) -> SearchParams {
    SearchParams::new(query, SearchMethod::Exact)
}

fn plain_text_params(verbose: bool) -> ConvertParams {
    ConvertParams {
        plain_text_extensions: vec![".log".to_string(), ".md".to_string()],
        verbose,
        ..ConvertParams::default()
    }
}

#[test]
fn test_search_scenario() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        dir.path(),
        &[
            ("a.txt", "Hello World\nbye\n"),
            ("b.txt", "nothing\n"),
            ("c.md", "hello markdown\n"),
        ],
    )?;

    let mut out = Vec::new();
    let summary = BatchRunner::default().search(dir.path(), 2, &exact("hello"), &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.matches, 1);
    assert_eq!(summary.count(OutcomeKind::Matched), 1);
    assert_eq!(summary.count(OutcomeKind::NotMatched), 1);
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.worker_count, 2);
    assert!(text.contains("1 match at"));
    assert!(text.contains("Line(1)"));
    assert!(text.contains("Hello World"));
    assert!(!text.contains("b.txt"));
    assert!(text.contains("Found"));
    assert!(text.contains("Finished in"));
    Ok(())
}

#[test]
fn test_counts_independent_of_worker_count() -> Result<()> {
    let dir = tempdir()?;
    create_numbered_files(dir.path(), 40, 5)?;
    create_test_files(dir.path(), &[("empty.txt", ""), ("other.txt", "no match here\n")])?;

    let runner = BatchRunner::default();
    let baseline = runner.search(dir.path(), 1, &exact("todo"), &mut std::io::sink())?;
    assert_eq!(baseline.matches, 200);
    assert_eq!(baseline.count(OutcomeKind::Matched), 40);
    assert_eq!(baseline.count(OutcomeKind::NotMatched), 2);

    for workers in [2, 4, 8] {
        let summary = runner.search(dir.path(), workers, &exact("todo"), &mut std::io::sink())?;
        assert_eq!(summary.counts, baseline.counts);
        assert_eq!(summary.matches, baseline.matches);
        assert_eq!(summary.worker_count, workers);
    }
    Ok(())
}

#[test]
fn test_search_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    create_numbered_files(dir.path(), 5, 3)?;

    let runner = BatchRunner::default();
    let first = runner.search(dir.path(), 3, &exact("TODO"), &mut std::io::sink())?;
    let second = runner.search(dir.path(), 3, &exact("TODO"), &mut std::io::sink())?;

    assert_eq!(first.counts, second.counts);
    assert_eq!(first.matches, second.matches);
    for i in 0..5 {
        assert!(dir.path().join(format!("test_{}.txt", i)).exists());
    }
    Ok(())
}

#[test]
fn test_fuzzy_search_batch() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), &[("notes.txt", "help yellow\n")])?;

    let runner = BatchRunner::default();
    let strict = SearchParams::new("hello", SearchMethod::Fuzzy { cutoff: 0.9 });
    let summary = runner.search(dir.path(), 1, &strict, &mut std::io::sink())?;
    assert_eq!(summary.matches, 0);
    assert_eq!(summary.count(OutcomeKind::NotMatched), 1);

    let loose = SearchParams::new("hello", SearchMethod::Fuzzy { cutoff: 0.5 });
    let mut out = Vec::new();
    let summary = runner.search(dir.path(), 1, &loose, &mut out)?;
    assert_eq!(summary.matches, 1);
    let text = String::from_utf8(out)?;
    assert!(text.contains("potential match"));
    assert!(text.contains("0.72727"));
    Ok(())
}

#[test]
fn test_unreadable_file_is_counted_as_failure() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), &[("good.txt", "needle\n")])?;
    fs::write(dir.path().join("binary.txt"), [0xff, 0xfe, b'\n'])?;

    let mut out = Vec::new();
    let summary = BatchRunner::default().search(dir.path(), 2, &exact("needle"), &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.count(OutcomeKind::Matched), 1);
    assert_eq!(summary.count(OutcomeKind::Failed), 1);
    assert_eq!(summary.total(), 2);
    assert!(text.contains("Failed to search binary.txt"));
    Ok(())
}

#[test]
fn test_empty_directory() -> Result<()> {
    let dir = tempdir()?;

    let mut out = Vec::new();
    let summary = BatchRunner::default().search(dir.path(), 4, &exact("anything"), &mut out)?;
    assert_eq!(summary.total(), 0);
    assert_eq!(summary.matches, 0);
    assert!(String::from_utf8(out)?.contains("Found"));

    let summary =
        BatchRunner::default().convert(dir.path(), 4, &plain_text_params(false), &mut std::io::sink())?;
    assert_eq!(summary.total(), 0);
    Ok(())
}

#[test]
fn test_missing_directory_is_a_setup_error() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing");

    let mut out = Vec::new();
    let err = BatchRunner::default()
        .search(&missing, 2, &exact("q"), &mut out)
        .unwrap_err();
    assert!(matches!(err, SweepError::DirectoryNotFound(_)));
    assert!(err.is_setup_error());
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn test_zero_workers_rejected_before_dispatch() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), &[("x.log", "keep me\n")])?;

    let err = BatchRunner::default()
        .convert(dir.path(), 0, &plain_text_params(false), &mut std::io::sink())
        .unwrap_err();
    assert!(matches!(err, SweepError::InvalidWorkerCount));
    assert!(dir.path().join("x.log").exists());
    Ok(())
}

#[test]
fn test_plain_text_conversion() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        dir.path(),
        &[
            ("x.log", "log line\n"),
            ("readme.md", "# title\n"),
            ("image.png", "not text"),
            ("keep.txt", "already text\n"),
        ],
    )?;

    let mut out = Vec::new();
    let summary =
        BatchRunner::default().convert(dir.path(), 2, &plain_text_params(false), &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.count(OutcomeKind::Unsure), 2);
    assert_eq!(summary.count(OutcomeKind::Skipped), 0);
    assert_eq!(summary.total(), 2);
    assert!(text.contains("(.log) is an unsupported file format"));
    assert!(text.contains("Operation result(s):"));

    assert!(!dir.path().join("x.log").exists());
    assert_eq!(fs::read_to_string(dir.path().join("x (LOG).txt"))?, "log line\n");
    assert_eq!(fs::read_to_string(dir.path().join("readme (MD).txt"))?, "# title\n");
    assert!(dir.path().join("image.png").exists());
    assert_eq!(fs::read_to_string(dir.path().join("keep.txt"))?, "already text\n");
    Ok(())
}

#[test]
fn test_conversion_never_overwrites() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), &[("x.log", "first\n")])?;

    let runner = BatchRunner::default();
    runner.convert(dir.path(), 1, &plain_text_params(false), &mut std::io::sink())?;

    // A second batch finds nothing left to convert
    let summary = runner.convert(dir.path(), 1, &plain_text_params(false), &mut std::io::sink())?;
    assert_eq!(summary.total(), 0);

    // A new file with the same stem gets a disambiguated name
    create_test_files(dir.path(), &[("x.log", "second\n")])?;
    runner.convert(dir.path(), 1, &plain_text_params(true), &mut std::io::sink())?;

    assert_eq!(fs::read_to_string(dir.path().join("x (LOG).txt"))?, "first\n");
    assert_eq!(fs::read_to_string(dir.path().join("x (LOG) (1).txt"))?, "second\n");
    Ok(())
}

#[test]
fn test_pdf_conversion() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("x.pdf"), single_page_pdf("Quarterly"))?;

    let mut out = Vec::new();
    let summary =
        BatchRunner::default().convert(dir.path(), 1, &plain_text_params(false), &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.count(OutcomeKind::Success), 1);
    assert_eq!(summary.total(), 1);
    assert!(text.contains("Successfully converted x.pdf"));
    assert!(!dir.path().join("x.pdf").exists());
    assert!(fs::read_to_string(dir.path().join("x (PDF).txt"))?.contains("Quarterly"));
    Ok(())
}

#[test]
fn test_missing_converter_fails_every_document() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), &[("a.docx", "one"), ("b.docx", "two")])?;

    let params = ConvertParams {
        converter: "textsweep-no-such-converter".to_string(),
        verbose: true,
        ..plain_text_params(true)
    };
    let mut out = Vec::new();
    let summary = BatchRunner::default().convert(dir.path(), 2, &params, &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.count(OutcomeKind::Failed), 2);
    assert_eq!(text.matches("couldn't be found").count(), 2);
    assert!(text.contains("Failed conversion(s):"));
    assert!(dir.path().join("a.docx").exists());
    assert!(dir.path().join("b.docx").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_docx_scenario_with_stand_in_converter() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tools = tempdir()?;
    let converter = tools.path().join("pandoc");
    fs::write(&converter, "#!/bin/sh\ncp \"$7\" \"$6\"\n")?;
    fs::set_permissions(&converter, fs::Permissions::from_mode(0o755))?;

    let dir = tempdir()?;
    create_test_files(dir.path(), &[("report.docx", "quarterly numbers")])?;

    let params = ConvertParams {
        converter: converter.to_string_lossy().into_owned(),
        ..plain_text_params(false)
    };
    let mut out = Vec::new();
    let summary = BatchRunner::default().convert(dir.path(), 1, &params, &mut out)?;
    let text = String::from_utf8(out)?;

    assert_eq!(summary.count(OutcomeKind::Success), 1);
    assert!(text.contains("Successfully converted report.docx"));
    assert!(!dir.path().join("report.docx").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("report (DOCX).txt"))?,
        "quarterly numbers"
    );

    // The converted file is searchable
    let summary = BatchRunner::default().search(
        dir.path(),
        1,
        &exact("quarterly"),
        &mut std::io::sink(),
    )?;
    assert_eq!(summary.matches, 1);
    Ok(())
}
