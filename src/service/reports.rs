use crate::Result;
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use strum::Display;
use tracing::{error, info, warn};

/// Extensions the portal is known to export, in lookup priority order
pub const CANDIDATE_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReportKind {
    Prospectos,
    Ventas,
    Separaciones,
    Visitas,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Prospectos,
        ReportKind::Ventas,
        ReportKind::Separaciones,
        ReportKind::Visitas,
    ];

    /// Canonical file name prefix in the download directory
    pub fn file_prefix(self) -> &'static str {
        match self {
            ReportKind::Prospectos => "reporteProspectos",
            ReportKind::Ventas => "ReporteVenta",
            ReportKind::Separaciones => "Separacion",
            ReportKind::Visitas => "ReporteVisitas",
        }
    }
}

/// One loaded report. Column names in the exports drift between runs in case
/// and surrounding whitespace, so lookups go through a normalized header
/// index built once per load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

impl ReportTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> ReportTable {
        let mut index = HashMap::new();
        for (position, column) in columns.iter().enumerate() {
            index.entry(normalize(column)).or_insert(position);
        }
        ReportTable { index, rows }
    }

    pub fn empty() -> ReportTable {
        ReportTable::new(vec![], vec![])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Resolves a logical column name to its position, ignoring case and
    /// surrounding whitespace
    pub fn column(&self, logical: &str) -> Option<usize> {
        self.index.get(&normalize(logical)).copied()
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|it| it.get(column))
            .map(|it| it.as_str())
            .unwrap_or_default()
    }
}

/// Loads the latest export of every report. A missing or unreadable file
/// yields an empty table for that report, never a failure.
pub fn load_all(dir: &Path) -> HashMap<ReportKind, ReportTable> {
    let mut tables = HashMap::new();
    for kind in ReportKind::ALL {
        let table = match latest_file(dir, kind.file_prefix()) {
            Some(path) => match load_table(&path) {
                Ok(table) => {
                    info!(
                        report = kind.to_string(),
                        file = %path.display(),
                        rows = table.len(),
                        "Loaded report table"
                    );
                    table
                }
                Err(e) => {
                    error!(
                        report = kind.to_string(),
                        file = %path.display(),
                        error = e.to_string(),
                        "Failed to parse report file"
                    );
                    ReportTable::empty()
                }
            },
            None => {
                warn!(report = kind.to_string(), "No report file found");
                ReportTable::empty()
            }
        };
        tables.insert(kind, table);
    }
    tables
}

/// Finds the newest file whose name starts with the given prefix. Extensions
/// are tried in priority order and only the first extension with any match is
/// considered.
pub fn latest_file(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().collect::<Vec<_>>(),
        Err(e) => {
            warn!(dir = %dir.display(), error = e.to_string(), "Can't read download directory");
            return None;
        }
    };
    for ext in CANDIDATE_EXTENSIONS {
        let candidates: Vec<PathBuf> = entries
            .iter()
            .map(|it| it.path())
            .filter(|it| {
                it.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(prefix))
                    .unwrap_or(false)
                    && it
                        .extension()
                        .and_then(|it| it.to_str())
                        .map(|it| it.eq_ignore_ascii_case(ext))
                        .unwrap_or(false)
            })
            .collect();
        if let Some(newest) = candidates.into_iter().max_by_key(|it| file_created(it)) {
            return Some(newest);
        }
    }
    None
}

// Creation time is unavailable on some filesystems, fall back to mtime
fn file_created(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|it| it.created().or_else(|_| it.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

pub fn load_table(path: &Path) -> Result<ReportTable> {
    let is_csv = path
        .extension()
        .and_then(|it| it.to_str())
        .map(|it| it.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        load_csv(path)
    } else {
        load_workbook(path)
    }
}

fn load_csv(path: &Path) -> Result<ReportTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(|it| it.to_string()).collect();
    let mut rows = vec![];
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|it| it.to_string()).collect());
    }
    Ok(ReportTable::new(columns, rows))
}

fn load_workbook(path: &Path) -> Result<ReportTable> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(ReportTable::empty());
    };
    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(ReportTable::empty());
    };
    let columns: Vec<String> = header.iter().map(cell_to_string).collect();
    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(ReportTable::new(columns, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::{ReportKind, ReportTable};
    use crate::Result;
    use std::fs;

    #[test]
    fn column_lookup_ignores_case_and_whitespace() {
        let table = ReportTable::new(
            vec![" proyecto ".into(), "LeadUnicoxMesProyecto".into()],
            vec![vec!["SUNNY".into(), "SI".into()]],
        );
        assert_eq!(Some(0), table.column("PROYECTO"));
        assert_eq!(Some(1), table.column("leadunicoxmesproyecto"));
        assert_eq!(None, table.column("SubEstado"));
    }

    #[test]
    fn value_is_empty_out_of_bounds() {
        let table = ReportTable::new(vec!["Proyecto".into()], vec![vec!["SUNNY".into()]]);
        assert_eq!("SUNNY", table.value(0, 0));
        assert_eq!("", table.value(0, 7));
        assert_eq!("", table.value(3, 0));
    }

    #[test]
    fn load_csv_table() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reporteProspectos.csv");
        fs::write(
            &path,
            "Proyecto , SubEstado\nSUNNY,CONTACTADO\n\"LITORAL 900\",PENDIENTE\n",
        )?;
        let table = super::load_table(&path)?;
        assert_eq!(2, table.len());
        assert_eq!(Some(0), table.column("proyecto"));
        assert_eq!("LITORAL 900", table.value(1, 0));
        Ok(())
    }

    #[test]
    fn corrupt_file_yields_empty_table() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ReporteVenta.xlsx");
        fs::write(&path, b"not a workbook")?;
        let tables = super::load_all(dir.path());
        assert!(tables[&ReportKind::Ventas].is_empty());
        Ok(())
    }

    #[test]
    fn load_all_with_empty_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tables = super::load_all(dir.path());
        assert_eq!(4, tables.len());
        assert!(tables.values().all(|it| it.is_empty()));
        Ok(())
    }

    #[test]
    fn latest_file_prefers_xlsx_over_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("ReporteVisitas.csv"), "Proyecto\n")?;
        fs::write(dir.path().join("ReporteVisitas.xlsx"), "stub")?;
        let found = super::latest_file(dir.path(), "ReporteVisitas").unwrap();
        assert_eq!(Some("xlsx"), found.extension().and_then(|it| it.to_str()));
        Ok(())
    }

    #[test]
    fn latest_file_picks_newest_match() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("Separacion.csv"), "Proyecto\n")?;
        std::thread::sleep(std::time::Duration::from_millis(50));
        fs::write(dir.path().join("Separacion_120000.csv"), "Proyecto\n")?;
        let found = super::latest_file(dir.path(), "Separacion").unwrap();
        assert_eq!(
            "Separacion_120000.csv",
            found.file_name().unwrap().to_str().unwrap()
        );
        Ok(())
    }

    #[test]
    fn latest_file_ignores_other_prefixes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("ReporteVenta.csv"), "Proyecto\n")?;
        assert!(super::latest_file(dir.path(), "ReporteVisitas").is_none());
        Ok(())
    }
}
