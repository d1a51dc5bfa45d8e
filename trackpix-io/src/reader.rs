//! Memory-mapped file readers.
//!

use crate::{Error, Result};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use trackpix_core::ordering::sort_cells;
use trackpix_core::{Cell, CellCollection, DetectorDescription};

/// A memory-mapped file reader.
///
/// Uses memmap2 to efficiently access file contents without
/// loading the entire file into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file contents as UTF-8 text.
    ///
    /// # Errors
    /// Returns an error if the file is not valid UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| {
            Error::InvalidFormat(format!("{} is not UTF-8: {e}", self.path.display()))
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Clone, Copy)]
enum ModuleColumn {
    Index(usize),
    GeometryId(usize),
}

/// Column positions resolved from the header row.
struct CellColumns {
    module: ModuleColumn,
    channel0: usize,
    channel1: usize,
    activation: usize,
    time: Option<usize>,
    width: usize,
}

impl CellColumns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |candidates: &[&str]| {
            names
                .iter()
                .position(|name| candidates.iter().any(|c| name.eq_ignore_ascii_case(c)))
        };
        let missing = |what: &str| Error::Parse {
            line: 1,
            message: format!("missing column {what}"),
        };

        let module = match (find(&["module_index"]), find(&["geometry_id"])) {
            (Some(i), _) => ModuleColumn::Index(i),
            (None, Some(i)) => ModuleColumn::GeometryId(i),
            (None, None) => return Err(missing("module_index or geometry_id")),
        };
        Ok(Self {
            module,
            channel0: find(&["channel0"]).ok_or_else(|| missing("channel0"))?,
            channel1: find(&["channel1"]).ok_or_else(|| missing("channel1"))?,
            activation: find(&["activation", "value"])
                .ok_or_else(|| missing("activation or value"))?,
            time: find(&["time", "timestamp"]),
            width: names.len(),
        })
    }
}

fn field<T: std::str::FromStr>(fields: &[&str], index: usize, name: &str, line: usize) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    fields[index].parse().map_err(|e| Error::Parse {
        line,
        message: format!("invalid {name} {:?}: {e}", fields[index]),
    })
}

/// Parses cells from CSV text and sorts them into clustering order.
///
/// The header names the columns: `channel0`, `channel1`, one of
/// `module_index` or `geometry_id`, one of `activation` or `value`, and
/// optionally `time` or `timestamp`. Geometry ids are resolved through
/// `detector`. Blank lines and lines starting with `#` are skipped.
///
/// # Errors
/// Returns an error for a missing header column, a malformed row, or an
/// unknown geometry id.
pub fn parse_cells_csv(text: &str, detector: &DetectorDescription) -> Result<CellCollection> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let Some((_, header)) = lines.next() else {
        return Ok(CellCollection::new());
    };
    let columns = CellColumns::from_header(header)?;

    let mut cells = CellCollection::new();
    for (line, row) in lines {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() != columns.width {
            return Err(Error::Parse {
                line,
                message: format!("expected {} fields, found {}", columns.width, fields.len()),
            });
        }

        let module_index = match columns.module {
            ModuleColumn::Index(i) => field(&fields, i, "module_index", line)?,
            ModuleColumn::GeometryId(i) => {
                let geometry_id: u64 = field(&fields, i, "geometry_id", line)?;
                detector
                    .module_index_of(geometry_id)
                    .ok_or_else(|| Error::Parse {
                        line,
                        message: format!("unknown geometry id {geometry_id}"),
                    })?
            }
        };
        let mut cell = Cell::new(
            module_index,
            field(&fields, columns.channel0, "channel0", line)?,
            field(&fields, columns.channel1, "channel1", line)?,
            field(&fields, columns.activation, "activation", line)?,
        );
        if let Some(i) = columns.time {
            cell = cell.with_time(field(&fields, i, "time", line)?);
        }
        cells.push(cell);
    }

    sort_cells(&mut cells);
    Ok(cells)
}

/// Reads a cells CSV file; see [`parse_cells_csv`].
///
/// # Errors
/// Returns an error if the file cannot be mapped or parsed.
pub fn read_cells_csv<P: AsRef<Path>>(
    path: P,
    detector: &DetectorDescription,
) -> Result<CellCollection> {
    let reader = MappedFileReader::open(&path)?;
    let cells = parse_cells_csv(reader.as_str()?, detector)?;
    debug!(
        "read {} cells from {} ({} bytes)",
        cells.len(),
        reader.path().display(),
        reader.len()
    );
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use trackpix_core::ModuleDescription;

    fn detector() -> DetectorDescription {
        DetectorDescription::new(vec![ModuleDescription::new(500), ModuleDescription::new(600)])
            .unwrap()
    }

    #[test]
    fn test_mapped_file_reader() {
        let mut file = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..64).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 64);
        assert!(!reader.is_empty());
        assert_eq!(reader.as_bytes(), &data[..]);
    }

    #[test]
    fn test_parse_sorts_cells() {
        let text = "module_index,channel0,channel1,activation\n\
                    1,4,0,2.5\n\
                    0,3,2,1.0\n\
                    0,3,1,1.5\n";
        let cells = parse_cells_csv(text, &detector()).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells.module_index, vec![0, 0, 1]);
        assert_eq!(cells.channel1, vec![1, 2, 0]);
        assert!((cells.activation[0] - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_geometry_id_and_aliases() {
        let text = "# exported cells\n\
                    geometry_id, timestamp, channel0, channel1, value\n\
                    600, 12.5, 7, 8, 3\n";
        let cells = parse_cells_csv(text, &detector()).unwrap();
        let cell = cells.get(0);
        assert_eq!(cell.module_index, 1);
        assert_eq!((cell.channel0, cell.channel1), (7, 8));
        assert!((cell.time - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_errors() {
        let d = detector();
        assert!(matches!(
            parse_cells_csv("channel0,channel1,activation\n", &d),
            Err(Error::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_cells_csv("module_index,channel0,channel1,activation\n0,1,x,1.0\n", &d),
            Err(Error::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_cells_csv("geometry_id,channel0,channel1,activation\n\n9,1,1,1.0\n", &d),
            Err(Error::Parse { line: 3, .. })
        ));
        assert!(matches!(
            parse_cells_csv("module_index,channel0,channel1,activation\n0,1,1\n", &d),
            Err(Error::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_cells_csv_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "module_index,channel0,channel1,activation").unwrap();
        writeln!(file, "0,1,1,4.0").unwrap();
        file.flush().unwrap();

        let cells = read_cells_csv(file.path(), &detector()).unwrap();
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let cells = read_cells_csv(file.path(), &detector()).unwrap();
        assert!(cells.is_empty());
    }
}
