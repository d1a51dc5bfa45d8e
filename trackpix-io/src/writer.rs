//! CSV writers for measurements and cell labels.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use trackpix_core::{CellCollection, Measurement};

/// Buffered CSV output file.
pub struct CsvFileWriter {
    writer: BufWriter<File>,
}

impl CsvFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes measurements, one row per measurement.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_measurements(&mut self, measurements: &[Measurement]) -> Result<()> {
        writeln!(
            self.writer,
            "surface_link,measurement_id,local0,local1,var_local0,var_local1"
        )?;

        for m in measurements {
            writeln!(
                self.writer,
                "{},{},{},{},{},{}",
                m.surface_link,
                m.measurement_id,
                m.local[0],
                m.local[1],
                m.variance[0],
                m.variance[1]
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the cluster label of every cell.
    ///
    /// # Errors
    /// Returns an error if `labels` does not match `cells` or writing fails.
    pub fn write_labels(&mut self, cells: &CellCollection, labels: &[i32]) -> Result<()> {
        if labels.len() != cells.len() {
            return Err(Error::InvalidFormat(format!(
                "{} labels for {} cells",
                labels.len(),
                cells.len()
            )));
        }

        writeln!(self.writer, "cell,module_index,channel0,channel1,label")?;
        for (i, (cell, label)) in cells.iter().zip(labels).enumerate() {
            writeln!(
                self.writer,
                "{},{},{},{},{}",
                i, cell.module_index, cell.channel0, cell.channel1, label
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes measurements to a new CSV file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_measurements_csv<P: AsRef<Path>>(path: P, measurements: &[Measurement]) -> Result<()> {
    CsvFileWriter::create(path)?.write_measurements(measurements)
}

/// Writes per-cell labels to a new CSV file.
///
/// # Errors
/// Returns an error if `labels` does not match `cells` or the file cannot be
/// written.
pub fn write_labels_csv<P: AsRef<Path>>(
    path: P,
    cells: &CellCollection,
    labels: &[i32],
) -> Result<()> {
    CsvFileWriter::create(path)?.write_labels(cells, labels)
}
