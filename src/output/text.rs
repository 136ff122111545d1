//! Human-readable text report.

use std::io::{self, Write};

use bytesize::ByteSize;

use super::report::{Report, RemovableReport};

/// Plain-text rendering of a [`Report`].
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    report: &'a Report,
}

impl<'a> TextOutput<'a> {
    /// Wrap a report.
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;

        if report.dry_run {
            writeln!(writer, "DRY RUN: no files were changed")?;
            writeln!(writer)?;
        }

        for (i, plan) in report.plans.iter().enumerate() {
            let wasted = plan.size * plan.removable.len() as u64;
            writeln!(
                writer,
                "Group {} ({} each, {} wasted)",
                i + 1,
                ByteSize::b(plan.size),
                ByteSize::b(wasted)
            )?;
            writeln!(writer, "  {} {}", report.algorithm.digest_name(), plan.digest_hex)?;
            writeln!(writer, "  [KEEP]      {}", plan.keeper)?;
            for removable in &plan.removable {
                writeln!(
                    writer,
                    "  [DUPLICATE] {}{}",
                    removable.path,
                    status_suffix(removable, &report.action)
                )?;
            }
            writeln!(writer)?;
        }

        if !report.warnings.is_empty() {
            writeln!(writer, "Warnings:")?;
            for warning in &report.warnings {
                writeln!(writer, "  {}", warning.message)?;
            }
            writeln!(writer)?;
        }

        let s = &report.summary;
        writeln!(writer, "Summary")?;
        writeln!(writer, "  Files scanned:     {}", s.files_scanned)?;
        if s.aliases_skipped > 0 {
            writeln!(writer, "  Aliases skipped:   {}", s.aliases_skipped)?;
        }
        writeln!(writer, "  Duplicate groups:  {}", s.groups_found)?;
        writeln!(writer, "  Duplicate files:   {}", s.duplicate_files)?;
        writeln!(writer, "  Reclaimable:       {}", ByteSize::b(s.bytes_reclaimable))?;
        writeln!(writer, "  Reclaimed:         {}", ByteSize::b(s.bytes_reclaimed))?;
        writeln!(writer, "  Errors:            {}", s.error_count)?;
        if report.interrupted {
            writeln!(writer, "  Interrupted: results are partial")?;
        }
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn status_suffix(removable: &RemovableReport, action: &str) -> String {
    if let Some(ref error) = removable.error {
        return format!("  (failed: {error})");
    }
    if removable.declined {
        return "  (declined)".to_string();
    }
    if !removable.succeeded {
        return "  (not processed)".to_string();
    }
    match (action, &removable.destination) {
        ("report-only", _) => String::new(),
        (_, Some(dest)) => format!("  -> {dest}"),
        ("delete", None) => "  (deleted)".to_string(),
        _ => String::new(),
    }
}
