//! A workbook is a directory holding one `<sheet>.csv` file per sheet.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::export::sheet::{Sheet, SheetLayout};
use crate::logging::{self, Stage};
use crate::model::{Result, TempError};

pub const SHEET_EXTENSION: &str = "csv";

#[derive(Debug, Clone)]
pub struct Workbook {
    dir: PathBuf,
}

impl Workbook {
    /// Opens a workbook directory. Nothing is created until a sheet is written.
    pub fn open(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// File backing a sheet. Path separators in the name are replaced.
    pub fn sheet_path(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.{}", file, SHEET_EXTENSION))
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_path(name).is_file()
    }

    /// Fails with `SheetExists` if `name` is taken and `force` is off.
    pub fn ensure_writable(&self, name: &str, force: bool) -> Result<()> {
        if self.has_sheet(name) && !force {
            return Err(TempError::SheetExists(name.to_string()));
        }
        Ok(())
    }

    /// Writes `sheet`, replacing an existing sheet of the same name only
    /// when `force` is set. Returns the file written.
    pub fn write_sheet(&self, sheet: &Sheet, layout: &SheetLayout, force: bool) -> Result<PathBuf> {
        self.ensure_writable(sheet.name(), force)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.sheet_path(sheet.name());
        if path.exists() {
            logging::warn(Stage::Export, Some(sheet.name()), "Replacing existing sheet");
        }
        let file = File::create(&path)?;
        sheet.write_csv(BufWriter::new(file), layout)?;

        logging::info(
            Stage::Export,
            Some(sheet.name()),
            &format!("Wrote {} rows to {}", sheet.rows().len(), path.display()),
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sheet::Cell;

    fn sample(name: &str, value: f64) -> Sheet {
        let mut sheet = Sheet::new(name);
        sheet.push_row(vec![Cell::Label("Year".into()), Cell::Label("Perth".into())]);
        sheet.push_row(vec![Cell::Integer(2000), Cell::Number(value)]);
        sheet
    }

    #[test]
    fn test_write_then_refuse_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let book = Workbook::open(&dir.path().join("World Temperature"));
        let layout = SheetLayout::new("", None);

        assert!(!book.has_sheet("Cities"));
        let path = book.write_sheet(&sample("Cities", 18.5), &layout, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Year,Perth\n2000,18.5\n");
        assert!(book.has_sheet("Cities"));

        let err = book.write_sheet(&sample("Cities", 19.0), &layout, false).unwrap_err();
        assert!(matches!(err, TempError::SheetExists(ref name) if name == "Cities"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Year,Perth\n2000,18.5\n");

        book.write_sheet(&sample("Cities", 19.0), &layout, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Year,Perth\n2000,19\n");
    }

    #[test]
    fn test_sheet_names_with_separators_stay_in_the_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let book = Workbook::open(dir.path());
        let layout = SheetLayout::new("", None);
        let path = book.write_sheet(&sample("A/B", 1.0), &layout, false).unwrap();

        assert_eq!(path, dir.path().join("A_B.csv"));
        assert!(book.has_sheet("A/B"));
    }
}
