use crate::fire_data::fire_table::FireTable;
use crate::spatial::aoi::Aoi;
use crate::spatial::error::SpatialError;
use log::info;

/// Detections of the request box, and the subset inside the AOI polygon.
#[derive(Debug, Clone)]
pub struct ClippedFires {
    pub all: FireTable,
    pub within_aoi: FireTable,
}

/// Clips `table` to the exact AOI polygon. Points on the boundary count as
/// inside; rows with unparsable coordinates are dropped from the subset.
pub fn clip_to_aoi(table: &FireTable, aoi: &Aoi) -> Result<ClippedFires, SpatialError> {
    if table.is_empty() {
        return Ok(ClippedFires {
            all: table.clone(),
            within_aoi: table.clone(),
        });
    }

    let mask: Vec<bool> = table
        .row_points()?
        .into_iter()
        .map(|point| point.is_some_and(|p| aoi.contains_point(p.lon, p.lat)))
        .collect();
    let within_aoi = table.retain(&mask)?;

    info!(
        "Fire points within AOI: {} (from {} total)",
        within_aoi.height(),
        table.height()
    );
    Ok(ClippedFires {
        all: table.clone(),
        within_aoi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fire_data::fire_table::tests::csv;
    use crate::spatial::aoi::tests::square;

    fn row(lat: &str, lon: &str) -> String {
        format!("{lat},{lon},320.1,1.0,1.0,2023-08-01,1030,T,MODIS,80,6.03,290.5,12.5,D,0")
    }

    #[test]
    fn keeps_interior_and_boundary_points() {
        let rows = [
            row("37.5", "-121.5"),
            row("38.0", "-121.2"),
            row("37.5", "-120.5"),
            row("n/a", "-121.5"),
        ];
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let table = FireTable::from_csv(&csv(&rows)).unwrap();

        let clipped = clip_to_aoi(&table, &square()).unwrap();
        assert_eq!(clipped.all.height(), 4);
        assert_eq!(clipped.within_aoi.height(), 2);
    }

    #[test]
    fn empty_input_stays_empty() {
        let clipped = clip_to_aoi(&FireTable::empty(), &square()).unwrap();
        assert!(clipped.all.is_empty());
        assert!(clipped.within_aoi.is_empty());
    }
}
