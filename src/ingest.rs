//! CSV map exports into [`TileMap`]s.
//!
//! Exports vary: some use semicolons, some lack a header row, and column names
//! drift between game versions. Reading is lenient about all of that, while
//! still refusing files that lack coordinates or terrain.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::map::TileMap;
use crate::tile::{Appeal, Tile};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read map export from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("map export contains no usable tile rows")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    X,
    Y,
    Terrain,
    Feature,
    Resource,
    ResourceType,
    Continent,
    Rivers,
    Appeal,
    GoodyHut,
    StartingPlot,
}

impl Column {
    const COUNT: usize = 11;

    /// Column order of exports written without a header row.
    const ALL: [Column; Column::COUNT] = [
        Column::X,
        Column::Y,
        Column::Terrain,
        Column::Feature,
        Column::Resource,
        Column::ResourceType,
        Column::Continent,
        Column::Rivers,
        Column::Appeal,
        Column::GoodyHut,
        Column::StartingPlot,
    ];

    fn name(self) -> &'static str {
        match self {
            Column::X => "X",
            Column::Y => "Y",
            Column::Terrain => "Terrain",
            Column::Feature => "Feature",
            Column::Resource => "Resource",
            Column::ResourceType => "ResourceType",
            Column::Continent => "Continent",
            Column::Rivers => "Rivers",
            Column::Appeal => "Appeal",
            Column::GoodyHut => "GoodyHut",
            Column::StartingPlot => "StartingPlot",
        }
    }

    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(|c| !matches!(*c, '_' | ' ' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        let column = match key.as_str() {
            "x" => Column::X,
            "y" => Column::Y,
            "terrain" | "terraintype" => Column::Terrain,
            "feature" | "featuretype" => Column::Feature,
            "resource" => Column::Resource,
            "resourcetype" | "resourceclass" => Column::ResourceType,
            "continent" => Column::Continent,
            "rivers" | "river" => Column::Rivers,
            "appeal" => Column::Appeal,
            "goodyhut" | "goody" => Column::GoodyHut,
            "startingplot" | "startplot" => Column::StartingPlot,
            _ => return None,
        };
        Some(column)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Where each known column sits in a record.
#[derive(Debug, Clone, Default)]
struct ColumnLayout {
    index: [Option<usize>; Column::COUNT],
}

impl ColumnLayout {
    fn headerless() -> Self {
        let mut layout = Self::default();
        for (position, column) in Column::ALL.into_iter().enumerate() {
            layout.index[column.slot()] = Some(position);
        }
        layout
    }

    fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        let mut layout = Self::default();
        for (position, header) in headers.iter().enumerate() {
            match Column::from_header(header) {
                Some(column) if layout.get(column).is_none() => {
                    layout.index[column.slot()] = Some(position);
                }
                Some(_) => debug!(
                    target: "civtiles::ingest",
                    header,
                    "duplicate column ignored"
                ),
                None => {}
            }
        }

        for (column, needle) in [(Column::X, 'x'), (Column::Y, 'y')] {
            if layout.get(column).is_some() {
                continue;
            }
            let candidate = headers.iter().enumerate().find(|(position, header)| {
                !layout.index.contains(&Some(*position))
                    && header.to_lowercase().contains(needle)
            });
            if let Some((position, header)) = candidate {
                warn!(
                    target: "civtiles::ingest",
                    from = header,
                    to = column.name(),
                    "renaming column"
                );
                layout.index[column.slot()] = Some(position);
            }
        }

        let missing: Vec<&'static str> = [Column::X, Column::Y, Column::Terrain]
            .into_iter()
            .filter(|column| layout.get(*column).is_none())
            .map(Column::name)
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }
        Ok(layout)
    }

    fn get(&self, column: Column) -> Option<usize> {
        self.index[column.slot()]
    }

    /// Trimmed cell text, or `None` for missing and null-like cells.
    fn cell<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        let value = record.get(self.get(column)?)?.trim();
        if value.is_empty() || is_null_token(value) {
            None
        } else {
            Some(value)
        }
    }

    fn tile(&self, record: &StringRecord) -> Option<Tile> {
        let x = self.cell(record, Column::X).and_then(parse_coordinate)?;
        let y = self.cell(record, Column::Y).and_then(parse_coordinate)?;
        let text = |column| self.cell(record, column).map(str::to_string);

        let mut tile = Tile::new(x, y, text(Column::Terrain).unwrap_or_default());
        tile.feature = text(Column::Feature);
        tile.resource = text(Column::Resource);
        tile.resource_type = text(Column::ResourceType);
        tile.continent = text(Column::Continent);
        tile.rivers = text(Column::Rivers);
        tile.appeal = self.cell(record, Column::Appeal).map(Appeal::parse);
        tile.goody_hut = parse_flag(self.cell(record, Column::GoodyHut));
        tile.starting_plot = parse_flag(self.cell(record, Column::StartingPlot));
        Some(tile)
    }
}

fn is_null_token(value: &str) -> bool {
    ["nan", "none", "null"]
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}

fn parse_coordinate(value: &str) -> Option<i32> {
    if let Ok(parsed) = value.parse::<i32>() {
        return Some(parsed);
    }
    let parsed = value.parse::<f64>().ok()?;
    let in_range = parsed.is_finite()
        && parsed.fract() == 0.0
        && parsed >= f64::from(i32::MIN)
        && parsed <= f64::from(i32::MAX);
    in_range.then_some(parsed as i32)
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        ["true", "1", "yes"]
            .iter()
            .any(|token| value.eq_ignore_ascii_case(token))
    })
}

/// Picks `;` or a tab over `,` when it dominates the first line.
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let count = |needle: char| first_line.matches(needle).count();
    let (commas, semicolons, tabs) = (count(','), count(';'), count('\t'));
    if semicolons > commas && semicolons >= tabs {
        b';'
    } else if tabs > commas && tabs > semicolons {
        b'\t'
    } else {
        b','
    }
}

fn looks_like_data(record: &StringRecord) -> bool {
    let numeric = |position| {
        record
            .get(position)
            .map(str::trim)
            .and_then(parse_coordinate)
            .is_some()
    };
    numeric(0) && numeric(1)
}

/// Parses a map export already held in memory.
pub fn parse_map(name: &str, text: &str) -> Result<TileMap, IngestError> {
    let delimiter = sniff_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let first = records.next().ok_or(IngestError::Empty)??;
    let (layout, pending) = if looks_like_data(&first) {
        info!(
            target: "civtiles::ingest",
            map = name,
            "no header row; using the fixed export column order"
        );
        (ColumnLayout::headerless(), Some(first))
    } else {
        (ColumnLayout::from_headers(&first)?, None)
    };

    let mut tiles = Vec::new();
    let mut skipped = 0_usize;
    for record in pending.into_iter().map(Ok).chain(records) {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        match layout.tile(&record) {
            Some(tile) => tiles.push(tile),
            None => {
                skipped += 1;
                warn!(
                    target: "civtiles::ingest",
                    map = name,
                    line = record.position().map(|p| p.line()),
                    "skipping row without usable coordinates"
                );
            }
        }
    }

    if tiles.is_empty() {
        return Err(IngestError::Empty);
    }

    let map = TileMap::new(name, tiles);
    if let Some(bounds) = map.bounds() {
        info!(
            target: "civtiles::ingest",
            map = name,
            rows = map.len(),
            skipped,
            delimiter = %char::from(delimiter).escape_default(),
            x_range = %format!("{}..={}", bounds.min_x, bounds.max_x),
            y_range = %format!("{}..={}", bounds.min_y, bounds.max_y),
            "map export loaded"
        );
    }
    Ok(map)
}

/// Reads a map export from disk; the map is named after the file stem.
pub fn read_map(path: impl AsRef<Path>) -> Result<TileMap, IngestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    parse_map(&name, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headed_csv() {
        let text = "\
X,Y,Terrain,Feature,Resource,ResourceType,Continent,Rivers,Appeal,GoodyHut,StartingPlot
0,0,TERRAIN_GRASS,FEATURE_FOREST,,,CONTINENT_AFRICA,,2,false,
1,0,TERRAIN_PLAINS,,RESOURCE_WHEAT,RESOURCETYPE_BONUS,,EAST,Breathtaking,TRUE,1
";
        let map = parse_map("headed", text).unwrap();
        assert_eq!(map.len(), 2);

        let first = &map.tiles()[0];
        assert_eq!(first.terrain, "TERRAIN_GRASS");
        assert_eq!(first.feature.as_deref(), Some("FEATURE_FOREST"));
        assert_eq!(first.resource, None);
        assert_eq!(first.continent.as_deref(), Some("CONTINENT_AFRICA"));
        assert_eq!(first.appeal, Some(Appeal::Numeric(2.0)));
        assert!(!first.goody_hut);

        let second = &map.tiles()[1];
        assert_eq!(second.resource.as_deref(), Some("RESOURCE_WHEAT"));
        assert_eq!(second.rivers.as_deref(), Some("EAST"));
        assert_eq!(second.appeal, Some(Appeal::Label("Breathtaking".into())));
        assert!(second.goody_hut);
        assert!(second.starting_plot);
    }

    #[test]
    fn sniffs_semicolons_and_repairs_headers() {
        let text = "\
plot_x;plot_y;terrain;goody_hut
3;4;TERRAIN_DESERT;yes
5.0;6;TERRAIN_TUNDRA;no
";
        let map = parse_map("semi", text).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!((map.tiles()[0].x, map.tiles()[0].y), (3, 4));
        assert!(map.tiles()[0].goody_hut);
        assert_eq!((map.tiles()[1].x, map.tiles()[1].y), (5, 6));
        assert!(!map.tiles()[1].goody_hut);
    }

    #[test]
    fn reads_headerless_rows_in_export_order() {
        let text = "\
2,7,TERRAIN_COAST,FEATURE_REEF,RESOURCE_FISH,,,,-1,0,0
";
        let map = parse_map("bare", text).unwrap();
        let tile = &map.tiles()[0];
        assert_eq!((tile.x, tile.y), (2, 7));
        assert_eq!(tile.feature.as_deref(), Some("FEATURE_REEF"));
        assert_eq!(tile.resource.as_deref(), Some("RESOURCE_FISH"));
        assert_eq!(tile.appeal, Some(Appeal::Numeric(-1.0)));
    }

    #[test]
    fn null_tokens_and_short_rows_are_absent() {
        let text = "\
X,Y,Terrain,Feature,Resource,Appeal
0,1,TERRAIN_GRASS,NaN,None
0,2,TERRAIN_GRASS,null,,nan
";
        let map = parse_map("nulls", text).unwrap();
        for tile in map.tiles() {
            assert_eq!(tile.feature, None);
            assert_eq!(tile.resource, None);
            assert_eq!(tile.appeal, None);
        }
    }

    #[test]
    fn rows_without_coordinates_are_skipped() {
        let text = "\
X,Y,Terrain
a,1,TERRAIN_GRASS
1.5,1,TERRAIN_GRASS
2,2,TERRAIN_PLAINS

";
        let map = parse_map("skips", text).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.tiles()[0].terrain, "TERRAIN_PLAINS");
    }

    #[test]
    fn missing_terrain_column_is_an_error() {
        let err = parse_map("broken", "X,Y,Feature\n0,0,FEATURE_FOREST\n").unwrap_err();
        match err {
            IngestError::MissingColumns(columns) => assert_eq!(columns, ["Terrain"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_map("empty", ""), Err(IngestError::Empty)));
        assert!(matches!(
            parse_map("header", "X,Y,Terrain\n"),
            Err(IngestError::Empty)
        ));
    }

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(sniff_delimiter("X,Y,Terrain"), b',');
        assert_eq!(sniff_delimiter("X;Y;Terrain"), b';');
        assert_eq!(sniff_delimiter("X\tY\tTerrain"), b'\t');
        assert_eq!(sniff_delimiter("\n\nX;Y;A,B"), b';');
    }
}
