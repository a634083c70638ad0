//! This module is in charge of outputting the final analysis results to the
//! standard output and to disk

use crate::{
    histogram::Histogram,
    numeric::{floats, Float},
    resfin::FinalResults,
    Result,
};
use eyre::WrapErr;
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::Duration,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;

/// Number of significant digits in summary output
const SIG_DIGITS: usize = (floats::DIGITS - 1) as usize;

/// Serialized form of the histogram container
#[derive(Serialize)]
struct Container<'res> {
    /// When the container was written
    created: &'res str,

    /// Number of processed events
    events: usize,

    /// Histograms, hypothesis by hypothesis
    histograms: Vec<&'res Histogram>,
}

/// Output the analysis results to the console and to disk
pub fn dump_results(
    res_fin: &FinalResults,
    elapsed_time: Duration,
    output: &Path,
    summary: Option<&Path>,
) -> Result<()> {
    // Print out the cutflow tables on stdout
    res_fin.print();

    // Compute a timestamp of when the run ended
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;

    // Write the histogram container
    let file =
        File::create(output).wrap_err_with(|| format!("Failed to create {}", output.display()))?;
    write_container(BufWriter::new(file), res_fin, &timestamp)
        .wrap_err_with(|| format!("Failed to write histograms to {}", output.display()))?;
    info!("Wrote histograms to {}", output.display());

    // Write the text summary, if requested
    if let Some(path) = summary {
        let file =
            File::create(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        write_summary(&mut BufWriter::new(file), res_fin, elapsed_time, &timestamp)
            .wrap_err_with(|| format!("Failed to write summary to {}", path.display()))?;
        info!("Wrote cutflow summary to {}", path.display());
    }

    Ok(())
}

/// Serialize the histograms as JSON
fn write_container(mut writer: impl Write, res_fin: &FinalResults, timestamp: &str) -> Result<()> {
    let container = Container {
        created: timestamp,
        events: res_fin.processed_events,
        histograms: res_fin.histograms().collect(),
    };
    serde_json::to_writer_pretty(&mut writer, &container)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the cutflow summary in key/value text form
fn write_summary(
    file: &mut impl Write,
    res_fin: &FinalResults,
    elapsed_time: Duration,
    timestamp: &str,
) -> io::Result<()> {
    writeln_kv(file, timestamp)?;
    writeln_kv(file, "---------------------------------------------")?;
    let elapsed_secs = elapsed_time.as_secs_f64() as Float;
    writeln_kv(file, ("Elapsed time (s)", elapsed_secs))?;
    writeln_kv(file, ("Processed events", res_fin.processed_events))?;
    if res_fin.processed_events > 0 {
        let secs_per_ev = elapsed_secs / (res_fin.processed_events as Float);
        writeln_kv(file, ("Time per event (s)", secs_per_ev))?;
    }
    for summary in &res_fin.hypotheses {
        writeln_kv(file, "---------------------------------------------")?;
        writeln_kv(file, summary.book.hypothesis().prefix())?;
        for hist in summary.cutflow() {
            writeln_kv(file, (hist.name.as_str(), hist.entries))?;
        }
        writeln_kv(file, ("Tau pairs from selected leptons", summary.paths.clean))?;
        let fallback = summary.paths.closest_to_met;
        writeln_kv(file, ("Tau pairs from leading leptons", fallback))?;
    }
    Ok(())
}

/// Summary output facility, one indented item per line
fn writeln_kv(file: &mut impl Write, data: impl WriteSummary) -> io::Result<()> {
    write!(file, " ")?;
    data.write(file)?;
    writeln!(file)
}

/// Trait implemented by things which can be printed in the summary file
trait WriteSummary: Sized {
    /// Write down `self` to the summary file
    fn write(self, file: &mut impl Write) -> io::Result<()>;
}

impl WriteSummary for &str {
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{self}")
    }
}

impl WriteSummary for usize {
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{self}")
    }
}

impl WriteSummary for u64 {
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{self}")
    }
}

impl WriteSummary for Float {
    // Close to the %g format of printf
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{}", format_general(self, SIG_DIGITS))
    }
}

impl<T: WriteSummary> WriteSummary for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, file: &mut impl Write) -> io::Result<()> {
        write!(file, "{:<31}: ", self.0)?;
        self.1.write(file)
    }
}

/// Format a number with a fixed number of significant digits, switching to
/// scientific notation for very small or very large magnitudes
fn format_general(x: Float, sig_digits: usize) -> String {
    if x == 0. || !x.is_finite() {
        return format!("{x}");
    }
    let magnitude = x.abs().log10().floor();
    if magnitude < -4. || magnitude >= sig_digits as Float {
        return format!("{:.*e}", sig_digits - 1, x);
    }
    let decimals = (sig_digits as isize - 1 - magnitude as isize).max(0) as usize;
    let fixed = format!("{x:.decimals$}");
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        fixed
    }
}
