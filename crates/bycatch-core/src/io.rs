//! Input readers
//!
//! Semicolon-separated landscape, haul-count and effort files. Each file
//! starts with a header line. Malformed numbers are fatal; rows that parse
//! but fall outside the configured ranges are skipped and counted.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use bycatch_events::{Season, DAYS_PER_YEAR};

use crate::error::LandscapeError;
use crate::gear::{HistoricalEffort, MeshType};
use crate::grid::{CellDescriptor, LandscapeDescriptor};

const LANDSCAPE_HEADER_COLUMNS: usize = 12;
const LANDSCAPE_ROW_COLUMNS: usize = 10;
const HAUL_COLUMNS: usize = 6;
const EFFORT_COLUMNS: usize = 5;
const HOURS_PER_DAY: f32 = 24.0;

/// Rows accepted and skipped by a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub accepted: usize,
    pub skipped: usize,
}

fn read_file(path: &Path) -> Result<String, LandscapeError> {
    fs::read_to_string(path).map_err(|source| LandscapeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.display().to_string()
}

/// One split line with enough context to report parse errors.
struct Row<'a> {
    file: &'a str,
    line: usize,
    columns: Vec<&'a str>,
}

impl<'a> Row<'a> {
    fn new(file: &'a str, line: usize, text: &'a str) -> Self {
        let columns = text
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        Self { file, line, columns }
    }

    fn error(&self, reason: impl Into<String>) -> LandscapeError {
        LandscapeError::Parse {
            file: self.file.to_string(),
            line: self.line,
            reason: reason.into(),
        }
    }

    fn expect_columns(&self, wanted: usize) -> Result<(), LandscapeError> {
        if self.columns.len() == wanted {
            Ok(())
        } else {
            Err(self.error(format!(
                "wanted {} columns, got {}",
                wanted,
                self.columns.len()
            )))
        }
    }

    fn get<T: FromStr>(&self, idx: usize, name: &str) -> Result<T, LandscapeError> {
        let raw = self
            .columns
            .get(idx)
            .ok_or_else(|| self.error(format!("missing {}", name)))?;
        raw.parse()
            .map_err(|_| self.error(format!("bad {} `{}`", name, raw)))
    }
}

/// Non-empty lines with their 1-based line numbers.
fn lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty())
}

/// One-based index from the input, where 0 or less means "none".
fn one_based(value: i64) -> Option<u32> {
    (value >= 1).then(|| (value - 1) as u32)
}

pub fn read_landscape(path: impl AsRef<Path>) -> Result<LandscapeDescriptor, LandscapeError> {
    let path = path.as_ref();
    parse_landscape(&read_file(path)?, &file_name(path))
}

/// Parses a landscape file.
///
/// Header: width; height; regions; fishery zones; blocks; traversable
/// cells; block size; patches; mean abundance for each of four seasons.
/// Derived counts in the header are ignored. Cell rows, row-major from the
/// top-left: bathymetry; distance to coast; region; fishery zone; block;
/// food capacity; four seasonal abundances. Indices are one-based.
pub fn parse_landscape(content: &str, file: &str) -> Result<LandscapeDescriptor, LandscapeError> {
    let mut lines = lines(content);
    let (line, text) = lines.next().ok_or_else(|| LandscapeError::Parse {
        file: file.to_string(),
        line: 0,
        reason: "empty file".to_string(),
    })?;
    let header = Row::new(file, line, text);
    header.expect_columns(LANDSCAPE_HEADER_COLUMNS)?;

    let width: u32 = header.get(0, "width")?;
    let height: u32 = header.get(1, "height")?;
    let mut mean_abundance = [0.0; 4];
    for (s, mean) in mean_abundance.iter_mut().enumerate() {
        *mean = header.get(8 + s, "mean abundance")?;
    }

    let mut cells = Vec::with_capacity(width as usize * height as usize);
    for (line, text) in lines {
        let row = Row::new(file, line, text);
        row.expect_columns(LANDSCAPE_ROW_COLUMNS)?;
        let mut abundance = [0.0; 4];
        for (s, a) in abundance.iter_mut().enumerate() {
            *a = row.get(6 + s, "abundance")?;
        }
        cells.push(CellDescriptor {
            bathymetry: row.get(0, "bathymetry")?,
            distance_to_coast: row.get(1, "distance to coast")?,
            region: one_based(row.get(2, "region")?),
            fishery_zone: one_based(row.get(3, "fishery zone")?),
            block: one_based(row.get(4, "block")?),
            food_capacity: row.get(5, "food capacity")?,
            abundance,
        });
    }

    Ok(LandscapeDescriptor {
        width,
        height,
        regions: header.get(2, "region count")?,
        fishery_zones: header.get(3, "fishery zone count")?,
        blocks: header.get(4, "block count")?,
        mean_abundance,
        cells,
    })
}

pub fn read_hauls(
    path: impl AsRef<Path>,
    zones: u32,
    effort: &mut HistoricalEffort,
) -> Result<ReadSummary, LandscapeError> {
    let path = path.as_ref();
    parse_hauls(&read_file(path)?, &file_name(path), zones, effort)
}

/// Parses haul counts: zone; sample year; day (zero-based); mesh type;
/// count; pinger flag. Rows with a zero count are ignored.
pub fn parse_hauls(
    content: &str,
    file: &str,
    zones: u32,
    effort: &mut HistoricalEffort,
) -> Result<ReadSummary, LandscapeError> {
    let mut summary = ReadSummary::default();
    for (line, text) in lines(content).skip(1) {
        let row = Row::new(file, line, text);
        row.expect_columns(HAUL_COLUMNS)?;
        let zone: i64 = row.get(0, "zone")?;
        let year: i64 = row.get(1, "sample year")?;
        let day: i64 = row.get(2, "day")?;
        let mesh: i64 = row.get(3, "mesh type")?;
        let count: i64 = row.get(4, "count")?;
        let pinger: i64 = row.get(5, "pinger")?;
        if count <= 0 {
            continue;
        }

        let mesh = usize::try_from(mesh).ok().and_then(MeshType::from_index);
        let accepted = match mesh {
            Some(mesh)
                if (0..zones as i64).contains(&zone)
                    && (0..DAYS_PER_YEAR as i64).contains(&day)
                    && year >= 0 =>
            {
                effort.add_hauls(
                    zone as u32,
                    year as usize,
                    day as u16,
                    mesh,
                    count as u32,
                    pinger != 0,
                )
            }
            _ => false,
        };
        if accepted {
            summary.accepted += 1;
        } else {
            summary.skipped += 1;
        }
    }
    if summary.skipped > 0 {
        tracing::warn!(
            file,
            skipped = summary.skipped,
            "haul rows out of range, please verify data and settings"
        );
    }
    Ok(summary)
}

pub fn read_effort(
    path: impl AsRef<Path>,
    zones: u32,
    effort: &mut HistoricalEffort,
) -> Result<ReadSummary, LandscapeError> {
    let path = path.as_ref();
    parse_effort(&read_file(path)?, &file_name(path), zones, effort)
}

/// Parses effort samples: zone; season (0-3); mesh type; soak time in
/// hours; length in map units.
pub fn parse_effort(
    content: &str,
    file: &str,
    zones: u32,
    effort: &mut HistoricalEffort,
) -> Result<ReadSummary, LandscapeError> {
    let mut summary = ReadSummary::default();
    for (line, text) in lines(content).skip(1) {
        let row = Row::new(file, line, text);
        row.expect_columns(EFFORT_COLUMNS)?;
        let zone: i64 = row.get(0, "zone")?;
        let season: i64 = row.get(1, "season")?;
        let mesh: i64 = row.get(2, "mesh type")?;
        let soak_hours: f32 = row.get(3, "soak time")?;
        let length: f32 = row.get(4, "length")?;

        let season = usize::try_from(season).ok().and_then(|s| Season::ALL.get(s).copied());
        let mesh = usize::try_from(mesh).ok().and_then(MeshType::from_index);
        match (season, mesh) {
            (Some(season), Some(mesh))
                if (0..zones as i64).contains(&zone) && soak_hours >= 0.0 && length > 0.0 =>
            {
                effort.add_effort(zone as u32, season, mesh, soak_hours / HOURS_PER_DAY, length);
                summary.accepted += 1;
            }
            _ => summary.skipped += 1,
        }
    }
    if summary.skipped > 0 {
        tracing::warn!(file, skipped = summary.skipped, "effort rows out of range");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use crate::gear::EffortSampler;
    use tempfile::tempdir;

    const LANDSCAPE: &str = "\
3;2;1;1;2;5;1;4;1.0;2.0;1.0;1.0
-10;5;1;1;1;1.0;1;2;1;1
-12;6;1;1;1;0.5;1;2;1;1
2;0;0;0;0;0;0;0;0;0

-20;8;0;1;2;1.0;1;2;1;1
-20;8;0;2;2;1.0;1;2;1;1
-5;3;1;0;2;0;1;2;1;1
";

    #[test]
    fn test_parse_landscape() {
        let desc = parse_landscape(LANDSCAPE, "land.csv").unwrap();
        assert_eq!((desc.width, desc.height), (3, 2));
        assert_eq!((desc.regions, desc.fishery_zones, desc.blocks), (1, 1, 2));
        assert_eq!(desc.mean_abundance, [1.0, 2.0, 1.0, 1.0]);
        assert_eq!(desc.cells.len(), 6);
        assert_eq!(desc.cells[0].region, Some(0));
        assert_eq!(desc.cells[0].block, Some(0));
        assert_eq!(desc.cells[2].block, None);
        assert_eq!(desc.cells[3].region, None);
        assert_eq!(desc.cells[4].fishery_zone, Some(1));
        assert_eq!(desc.cells[1].abundance, [1.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_landscape_bad_header() {
        let err = parse_landscape("3;2;1\n", "land.csv").unwrap_err();
        assert!(matches!(err, LandscapeError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_landscape_bad_number_reports_line() {
        let text = LANDSCAPE.replace("-12;6", "-12;six");
        let err = parse_landscape(&text, "land.csv").unwrap_err();
        match err {
            LandscapeError::Parse { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("distance to coast"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_hauls_and_effort() {
        let mut effort = HistoricalEffort::new(2);
        let hauls = "zone;year;day;type;n;pinger\n\
                     0;0;0;1;3;1\n\
                     0;1;0;1;5;0\n\
                     0;4;0;1;5;0\n\
                     2;0;0;1;5;0\n\
                     0;0;0;1;0;0\n";
        let summary = parse_hauls(hauls, "hauls.csv", 1, &mut effort).unwrap();
        assert_eq!(summary, ReadSummary { accepted: 2, skipped: 2 });

        let samples = "zone;season;type;soak;length\n\
                       0;0;1;48;0.5\n\
                       0;7;1;48;0.5\n\
                       0;0;1;24;-1\n";
        let summary = parse_effort(samples, "effort.csv", 1, &mut effort).unwrap();
        assert_eq!(summary, ReadSummary { accepted: 1, skipped: 2 });

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..20 {
            let sets = effort.sample_sets(0, 1, Season::Winter, MeshType::Medium, &mut rng);
            assert!(sets.len() == 3 || sets.len() == 5);
            for set in &sets {
                assert_eq!(set.soak_days, 2.0);
                assert_eq!(set.length, 0.5);
                assert_eq!(set.pinger, sets.len() == 3);
            }
        }
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_landscape(dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, LandscapeError::Io { .. }));
    }

    #[test]
    fn test_read_landscape_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("land.csv");
        fs::write(&path, LANDSCAPE).unwrap();
        let desc = read_landscape(&path).unwrap();
        assert_eq!(desc.cells.len(), 6);
    }
}
