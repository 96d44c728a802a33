//! Plain-text form of a distribution.
//!
//! ```text
//! <name>
//! Created Date: 2026-01-01T10:00:00Z
//! Last Modified Date: 2026-01-02T08:30:00Z
//! ham	salami
//! brie	null
//! ```
//!
//! One line per grid row, cells separated by a tab, empty cells written as
//! `null`. Reading always rebuilds the coordinate index from the grid.

use chrono::{DateTime, SecondsFormat, Utc};
use shelfx_core::{Distribution, Error, Grid, Result};

pub const EMPTY_MARKER: &str = "null";
pub const CREATED_PREFIX: &str = "Created Date:";
pub const MODIFIED_PREFIX: &str = "Last Modified Date:";

fn check_writable(value: &str, what: &str) -> Result<()> {
    if value.is_empty() || value.contains(['\t', '\n', '\r']) {
        return Err(Error::Persistence(format!(
            "{} {:?} cannot be written as text",
            what, value
        )));
    }
    Ok(())
}

pub fn write_distribution(distribution: &Distribution) -> Result<String> {
    check_writable(distribution.name(), "distribution name")?;

    let mut out = String::new();
    out.push_str(distribution.name());
    out.push('\n');
    out.push_str(&format!(
        "{} {}\n",
        CREATED_PREFIX,
        distribution.created_at().to_rfc3339_opts(SecondsFormat::Nanos, true)
    ));
    out.push_str(&format!(
        "{} {}\n",
        MODIFIED_PREFIX,
        distribution.modified_at().to_rfc3339_opts(SecondsFormat::Nanos, true)
    ));

    for row in distribution.render_as_names() {
        let mut cells = Vec::with_capacity(row.len());
        for cell in &row {
            match cell {
                Some(name) if name == EMPTY_MARKER => {
                    return Err(Error::Persistence(format!(
                        "product name {:?} collides with the empty-cell marker",
                        name
                    )));
                }
                Some(name) => {
                    check_writable(name, "product name")?;
                    cells.push(name.as_str());
                }
                None => cells.push(EMPTY_MARKER),
            }
        }
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    Ok(out)
}

fn parse_date(line: Option<&str>, prefix: &str, line_no: usize) -> Result<DateTime<Utc>> {
    let line = line.ok_or_else(|| Error::Parse {
        line: line_no,
        message: format!("missing '{}' line", prefix),
    })?;
    let value = line
        .strip_prefix(prefix)
        .ok_or_else(|| Error::Parse {
            line: line_no,
            message: format!("expected '{}'", prefix),
        })?
        .trim();
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::Parse {
            line: line_no,
            message: format!("invalid date {:?}: {}", value, e),
        })
}

pub fn read_distribution(text: &str) -> Result<Distribution> {
    let mut lines = text.lines();

    let name = lines
        .next()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| Error::Parse {
            line: 1,
            message: "missing distribution name".to_string(),
        })?
        .to_string();
    let created_at = parse_date(lines.next(), CREATED_PREFIX, 2)?;
    let modified_at = parse_date(lines.next(), MODIFIED_PREFIX, 3)?;

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let row: Vec<Option<String>> = line
            .split('\t')
            .map(|cell| {
                if cell == EMPTY_MARKER {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(Error::Parse {
                    line: offset + 4,
                    message: format!("expected {} cells, found {}", first.len(), row.len()),
                });
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::Parse {
            line: 4,
            message: "distribution has no grid rows".to_string(),
        });
    }

    let grid = Grid::from_rows(rows)?;
    Distribution::restore(name, grid, created_at, modified_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfx_core::Coord;

    fn sample() -> Distribution {
        let grid = Grid::from_rows(vec![
            vec![Some("ham".to_string()), Some("salami".to_string())],
            vec![Some("brie".to_string()), None],
        ])
        .unwrap();
        Distribution::from_grid("morning", grid).unwrap()
    }

    #[test]
    fn test_layout_of_text() {
        let text = write_distribution(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "morning");
        assert!(lines[1].starts_with("Created Date: "));
        assert!(lines[2].starts_with("Last Modified Date: "));
        assert_eq!(lines[3], "ham\tsalami");
        assert_eq!(lines[4], "brie\tnull");
    }

    #[test]
    fn test_restore_preserves_grid_dates_and_index() {
        let mut original = sample();
        original.swap(Coord::new(0, 0), Coord::new(1, 1)).unwrap();
        let restored = read_distribution(&write_distribution(&original).unwrap()).unwrap();

        assert_eq!(restored.name(), "morning");
        assert_eq!(restored.grid(), original.grid());
        assert_eq!(restored.created_at(), original.created_at());
        assert_eq!(restored.modified_at(), original.modified_at());
        assert_eq!(restored.coordinates_of("ham").unwrap(), Coord::new(1, 1));
        assert!(restored.check_invariants().is_ok());
    }

    #[test]
    fn test_several_empty_cells_survive() {
        let grid = Grid::from_rows(vec![vec![None, Some("a".to_string()), None], vec![None, None, None]]).unwrap();
        let d = Distribution::from_grid("sparse", grid).unwrap();
        let restored = read_distribution(&write_distribution(&d).unwrap()).unwrap();
        assert_eq!(restored.grid().empty_cells().count(), 5);
        assert_eq!(restored.product_count(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(read_distribution(""), Err(Error::Parse { line: 1, .. })));
        assert!(matches!(
            read_distribution("d\nCreated: x\n"),
            Err(Error::Parse { line: 2, .. })
        ));
        assert!(matches!(
            read_distribution("d\nCreated Date: yesterday\n"),
            Err(Error::Parse { line: 2, .. })
        ));

        let header = "d\nCreated Date: 2026-01-01T00:00:00Z\nLast Modified Date: 2026-01-01T00:00:00Z\n";
        assert!(matches!(read_distribution(header), Err(Error::Parse { line: 4, .. })));
        let ragged = format!("{}a\tb\nc\n", header);
        assert!(matches!(read_distribution(&ragged), Err(Error::Parse { line: 5, .. })));
        let duplicate = format!("{}a\ta\n", header);
        assert!(matches!(read_distribution(&duplicate), Err(Error::DuplicateProduct(_))));
    }

    #[test]
    fn test_unwritable_names() {
        let grid = Grid::from_rows(vec![vec![Some("null".to_string())]]).unwrap();
        let d = Distribution::from_grid("d", grid).unwrap();
        assert!(matches!(write_distribution(&d), Err(Error::Persistence(_))));

        let grid = Grid::from_rows(vec![vec![Some("a\tb".to_string())]]).unwrap();
        let d = Distribution::from_grid("d", grid).unwrap();
        assert!(matches!(write_distribution(&d), Err(Error::Persistence(_))));
    }
}
