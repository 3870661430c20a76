//! The tabular form of FIRMS detections, backed by a Polars `DataFrame`.
//!
//! Every column is read as a string so that tables from different chunks
//! always share a schema and row identity is plain textual equality of the
//! values the provider sent.

use crate::fire_data::error::FireDataError;
use crate::types::date_range::DateRange;
use chrono::NaiveDate;
use polars::prelude::*;
use std::io::Cursor;

/// Columns every FIRMS area response must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["longitude", "latitude", "acq_date"];

/// Optional intensity column (fire radiative power, MW).
pub const FRP_COLUMN: &str = "frp";

/// A table of fire detections.
#[derive(Debug, Clone)]
pub struct FireTable {
    pub frame: DataFrame,
}

/// The fields of one detection needed for spatial filtering and rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirePoint {
    pub lon: f64,
    pub lat: f64,
    pub date: NaiveDate,
    pub frp: Option<f64>,
}

impl FireTable {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// A table with no columns and no rows ("zero detections").
    pub fn empty() -> Self {
        Self {
            frame: DataFrame::empty(),
        }
    }

    /// Parses a FIRMS CSV response. Fails if the text is not CSV or lacks one
    /// of [`REQUIRED_COLUMNS`].
    pub fn from_csv(text: &str) -> Result<Self, FireDataError> {
        let cursor = Cursor::new(text.as_bytes().to_vec());
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(cursor)
            .finish()
            .map_err(FireDataError::CsvParse)?;

        for column in REQUIRED_COLUMNS {
            if frame.get_column_index(column).is_none() {
                return Err(FireDataError::MissingColumn(column.to_string()));
            }
        }
        Ok(Self { frame })
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Concatenates tables in order and drops rows that are identical across
    /// all columns, keeping the first occurrence.
    pub fn concat_unique(tables: Vec<FireTable>) -> Result<FireTable, FireDataError> {
        let frames: Vec<LazyFrame> = tables
            .into_iter()
            .filter(|t| t.frame.width() > 0)
            .map(|t| t.frame.lazy())
            .collect();
        if frames.is_empty() {
            return Ok(FireTable::empty());
        }

        let frame = concat_lf_diagonal(frames, UnionArgs::default())?
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        Ok(FireTable { frame })
    }

    /// Rows whose acquisition date falls inside `range` (inclusive).
    pub fn between(&self, range: DateRange) -> Result<FireTable, FireDataError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let start = range.start().format("%Y-%m-%d").to_string();
        let end = range.end().format("%Y-%m-%d").to_string();

        let frame = self
            .frame
            .clone()
            .lazy()
            .filter(
                col("acq_date")
                    .gt_eq(lit(start))
                    .and(col("acq_date").lt_eq(lit(end))),
            )
            .collect()?;
        Ok(FireTable { frame })
    }

    /// Keeps the rows where `mask` is true. `mask` must have one entry per row.
    pub fn retain(&self, mask: &[bool]) -> Result<FireTable, FireDataError> {
        if self.frame.width() == 0 {
            return Ok(self.clone());
        }
        let mask = BooleanChunked::from_slice("keep".into(), mask);
        Ok(FireTable {
            frame: self.frame.filter(&mask)?,
        })
    }

    /// Extracts one [`FirePoint`] per row. Rows whose coordinates or date do
    /// not parse are reported as `None` so indices stay aligned with the table.
    pub fn row_points(&self) -> Result<Vec<Option<FirePoint>>, FireDataError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let lons = self.str_column("longitude")?;
        let lats = self.str_column("latitude")?;
        let dates = self.str_column("acq_date")?;
        let frps = self
            .frame
            .column(FRP_COLUMN)
            .ok()
            .and_then(|c| c.str().ok());

        let points = (0..self.frame.height())
            .map(|idx| {
                let lon = parse_f64(lons.get(idx))?;
                let lat = parse_f64(lats.get(idx))?;
                let date = NaiveDate::parse_from_str(dates.get(idx)?.trim(), "%Y-%m-%d").ok()?;
                let frp = frps.and_then(|ca| parse_f64(ca.get(idx)));
                Some(FirePoint { lon, lat, date, frp })
            })
            .collect();
        Ok(points)
    }

    /// All parseable detections.
    pub fn points(&self) -> Result<Vec<FirePoint>, FireDataError> {
        Ok(self.row_points()?.into_iter().flatten().collect())
    }

    /// Serialises the table as CSV with a header row. Deterministic for equal tables.
    pub fn to_csv_string(&self) -> Result<String, FireDataError> {
        if self.frame.width() == 0 {
            return Ok(String::new());
        }
        let mut buffer = Vec::new();
        let mut frame = self.frame.clone();
        CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(&mut frame)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn str_column(&self, name: &str) -> Result<&StringChunked, FireDataError> {
        self.frame
            .column(name)
            .map_err(|_| FireDataError::MissingColumn(name.to_string()))?
            .str()
            .map_err(FireDataError::FrameProcessing)
    }
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str =
        "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight,type";

    pub(crate) fn csv(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    pub(crate) const ROW_A: &str =
        "37.5,-121.2,320.1,1.0,1.0,2023-08-01,1030,T,MODIS,80,6.03,290.5,12.5,D,0";
    pub(crate) const ROW_B: &str =
        "37.6,-121.3,330.4,1.1,1.0,2023-08-02,2115,A,MODIS,65,6.03,291.0,30.0,N,0";
    pub(crate) const ROW_C: &str =
        "37.7,-121.1,310.0,1.2,1.1,2023-08-15,0945,T,MODIS,90,6.03,288.2,7.25,D,0";

    #[test]
    fn parses_values_verbatim() {
        let table = FireTable::from_csv(&csv(&[ROW_A, ROW_B])).unwrap();
        assert_eq!(table.height(), 2);
        let acq_time = table.frame.column("acq_time").unwrap().str().unwrap();
        assert_eq!(acq_time.get(0), Some("1030"));
        assert_eq!(table.frame.column("latitude").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn rejects_body_without_required_columns() {
        let err = FireTable::from_csv("Invalid MAP_KEY.\n").unwrap_err();
        assert!(matches!(err, FireDataError::MissingColumn(_)));
    }

    #[test]
    fn header_only_response_has_no_rows() {
        let table = FireTable::from_csv(&csv(&[])).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn concat_unique_drops_full_row_duplicates_in_order() {
        let first = FireTable::from_csv(&csv(&[ROW_A, ROW_B])).unwrap();
        let second = FireTable::from_csv(&csv(&[ROW_B, ROW_C, ROW_A])).unwrap();
        let combined = FireTable::concat_unique(vec![first, second]).unwrap();
        assert_eq!(combined.height(), 3);

        let dates = combined.frame.column("acq_date").unwrap().str().unwrap();
        let dates: Vec<Option<&str>> = dates.into_iter().collect();
        assert_eq!(
            dates,
            [Some("2023-08-01"), Some("2023-08-02"), Some("2023-08-15")]
        );
    }

    #[test]
    fn concat_unique_keeps_rows_differing_in_one_column() {
        let near_duplicate = ROW_A.replace("12.5,D", "12.6,D");
        let table = FireTable::from_csv(&csv(&[ROW_A, &near_duplicate])).unwrap();
        let combined = FireTable::concat_unique(vec![table]).unwrap();
        assert_eq!(combined.height(), 2);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let combined = FireTable::concat_unique(Vec::new()).unwrap();
        assert!(combined.is_empty());
        assert_eq!(combined.to_csv_string().unwrap(), "");
    }

    #[test]
    fn between_filters_by_acquisition_date() {
        let table = FireTable::from_csv(&csv(&[ROW_A, ROW_B, ROW_C])).unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 8, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 8, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(table.between(range).unwrap().height(), 2);
    }

    #[test]
    fn points_parse_coordinates_and_frp() {
        let table = FireTable::from_csv(&csv(&[ROW_A])).unwrap();
        let points = table.points().unwrap();
        assert_eq!(
            points,
            [FirePoint {
                lon: -121.2,
                lat: 37.5,
                date: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
                frp: Some(12.5),
            }]
        );
    }

    #[test]
    fn retain_applies_mask() {
        let table = FireTable::from_csv(&csv(&[ROW_A, ROW_B, ROW_C])).unwrap();
        let kept = table.retain(&[true, false, true]).unwrap();
        assert_eq!(kept.height(), 2);
    }

    #[test]
    fn csv_export_is_stable() {
        let table = FireTable::from_csv(&csv(&[ROW_A, ROW_B])).unwrap();
        let first = table.to_csv_string().unwrap();
        let again = FireTable::from_csv(&first).unwrap().to_csv_string().unwrap();
        assert_eq!(first, again);
        assert!(first.starts_with("latitude,longitude,"));
    }
}
