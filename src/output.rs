//! This module is in charge of outputting the final cutflow to the standard
//! output and to disk

use crate::{
    cutflow::{Cutflow, Yield},
    numeric::{floats, Float},
    Result,
};

use eyre::WrapErr;
use time::{format_description, OffsetDateTime};

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Name of the cutflow report, in the output directory
pub const REPORT_NAME: &str = "cutflow.txt";

// Number of significant digits in floating-point output
const SIG_DIGITS: usize = (floats::DIGITS - 1) as usize;

/// Output the cutflow to the console and to the output directory
///
/// Returns the path of the report file.
///
pub fn dump_results(output_dir: &Path, cutflow: &Cutflow, elapsed_time: Duration) -> Result<PathBuf> {
    // Compute a timestamp of when the run ended
    let format = format_description::parse("[day]-[month repr:short]-[year repr:last_two]   [hour]:[minute]:[second]")?;
    let timestamp = OffsetDateTime::now_utc().format(&format)?;

    // Print out the report on stdout
    {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_report(&mut lock, &timestamp, cutflow, elapsed_time)?;
    }

    // Write it to disk
    fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = output_dir.join(REPORT_NAME);
    let mut report_file =
        File::create(&path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    write_report(&mut report_file, &timestamp, cutflow, elapsed_time)
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the cutflow report
fn write_report(
    out: &mut impl Write,
    timestamp: &str,
    cutflow: &Cutflow,
    elapsed_time: Duration,
) -> io::Result<()> {
    // Write a timestamp of when the run ended
    writeln_wc(out, timestamp)?;

    // Write program performance stats
    let elapsed_secs = elapsed_time.as_secs_f64();
    let num_events = cutflow.total_processed();
    writeln_wc(out, "---------------------------------------------")?;
    writeln_wc(out, ("Elapsed time (s)", elapsed_secs))?;
    writeln_wc(out, ("Processed events", num_events))?;
    writeln_wc(out, ("Written events", cutflow.total_selected()))?;
    if num_events > 0 {
        let secs_per_ev = elapsed_secs / (num_events as Float);
        writeln_wc(out, ("Time per event (s)", secs_per_ev))?;
    }

    // Write the yields of each dataset
    for (name, dataset) in cutflow.datasets() {
        writeln_wc(out, "---------------------------------------------")?;
        writeln_wc(out, ("Dataset", name.as_str()))?;
        writeln_wc(out, ("Chunks", dataset.num_chunks))?;
        writeln_wc(out, ("Processed", dataset.processed))?;
        writeln_wc(out, ("Trigger skim", dataset.skim))?;
        writeln_wc(out, ("Preselection", dataset.preselection))?;
        for (category, yields) in &dataset.categories {
            writeln_wc(out, (category.as_str(), *yields))?;
        }
    }
    Ok(())
}

/// Text output facility with a consistent report styling
fn writeln_wc(out: &mut impl Write, data: impl WriteWc) -> io::Result<()> {
    write!(out, " ")?;
    data.write(out)?;
    writeln!(out)
}

/// Trait implemented by things which can be printed in the cutflow report
trait WriteWc: Sized {
    /// Write down `self` to the report
    fn write(self, out: &mut impl Write) -> io::Result<()>;
}

impl WriteWc for &str {
    // Strings work in the usual way
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

impl WriteWc for usize {
    // Integers work in the usual way too
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

impl WriteWc for u64 {
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

impl WriteWc for Float {
    // Close approximation of C's %g
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write_engineering(out, self, SIG_DIGITS)
    }
}

impl WriteWc for Yield {
    // Event count, followed by the sum of the generator weight signs
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{:>12}   (sum of weight signs: ", self.events)?;
        write_engineering(out, self.sum_sign_weights, SIG_DIGITS)?;
        write!(out, ")")
    }
}

impl<T: WriteWc> WriteWc for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{:<31}: ", self.0)?;
        self.1.write(out)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Analogous to the %g format of the C printf function, this method switches
/// between naive and scientific notation for floating-point numbers when the
/// number being printed becomes so small that printing leading zeroes could end
/// up larger than the scientific notation, or so large that we would be forced
/// to print more significant digits than requested.
///
fn write_engineering(writer: &mut impl Write, x: Float, sig_digits: usize) -> io::Result<()> {
    let mut precision = sig_digits - 1;
    if x == 0. {
        // Zero is special because you can't take its log
        write!(writer, "0")
    } else {
        // Otherwise, use log to evaluate order of magnitude
        let log_x = x.abs().log10();
        if log_x >= -3. && log_x <= (sig_digits as Float) {
            // Print using naive notation, adjusting the number of digits after
            // the decimal point to keep a constant number of significant digits
            precision = (precision as isize - log_x.trunc() as isize).max(0) as usize;

            // The leading zero of numbers smaller than 1 is not significant
            if log_x < 0. {
                precision += 1
            }

            // No trailing zeros or decimal point in naive notation
            let str_with_zeros = format!("{:.1$}", x, precision);
            if str_with_zeros.contains('.') {
                write!(
                    writer,
                    "{}",
                    str_with_zeros.trim_end_matches('0').trim_end_matches('.')
                )
            } else {
                write!(writer, "{}", str_with_zeros)
            }
        } else {
            // Print using scientific notation
            write!(writer, "{:.1$e}", x, precision)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;

    fn engineering(x: Float, sig_digits: usize) -> String {
        let mut buffer = Vec::new();
        write_engineering(&mut buffer, x, sig_digits).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn engineering_notation() {
        assert_eq!(engineering(0., 6), "0");
        assert_eq!(engineering(1.5, 6), "1.5");
        assert_eq!(engineering(100., 6), "100");
        assert_eq!(engineering(-0.25, 6), "-0.25");
        assert_eq!(engineering(1.5e-7, 3), "1.50e-7");
        assert_eq!(engineering(1.5e12, 3), "1.50e12");
        assert_eq!(engineering(1000., 3), "1000");
        assert_eq!(engineering(-1000., 3), "-1000");
    }

    #[test]
    fn report_lists_every_dataset_and_category() {
        let mut cutflow = Cutflow::new();
        cutflow.record_chunk(
            "WJets",
            &[1., -1., 1.],
            &Mask::all(3),
            &Mask::from(vec![true, true, false]),
            &[("baseline".to_owned(), Mask::from(vec![true, false, false]))],
        );
        let mut buffer = Vec::new();
        write_report(&mut buffer, "now", &cutflow, Duration::from_millis(1500)).unwrap();
        let report = String::from_utf8(buffer).unwrap();

        assert!(report.starts_with(" now\n"));
        assert!(report.contains(&format!(" {:<31}: 1.5\n", "Elapsed time (s)")));
        assert!(report.contains(&format!(" {:<31}: WJets\n", "Dataset")));
        assert!(report.contains(&format!(" {:<31}: {:>12}", "Preselection", 2)));
        assert!(report.contains(&format!(" {:<31}: {:>12}", "baseline", 1)));
    }

    #[test]
    fn report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dump_results(dir.path(), &Cutflow::new(), Duration::from_secs(1)).unwrap();
        assert_eq!(path, dir.path().join(REPORT_NAME));
        let report = fs::read_to_string(path).unwrap();
        assert!(report.contains("Processed events"));
    }
}
