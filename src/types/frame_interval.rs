//! Time grouping of detections into frames, and the per-frame weighting signal.

use crate::types::date_range::DateRange;
use chrono::{Datelike, Days, Months, NaiveDate};
use clap::ValueEnum;

/// How detections are grouped into video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum FrameInterval {
    /// One frame per calendar day.
    Daily,
    /// One frame per calendar month, with a monthly bar chart underneath.
    #[default]
    Monthly,
}

/// One frame's date window and its label (`YYYY-MM-DD` or `YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub range: DateRange,
    pub label: String,
}

impl Period {
    /// File name of the rendered frame for this period.
    pub fn frame_file_name(&self, interval: FrameInterval) -> String {
        match interval {
            FrameInterval::Monthly => format!("frame_{}.png", self.label),
            FrameInterval::Daily => format!("frame_{}.png", self.range.start().format("%Y%m%d")),
        }
    }
}

impl FrameInterval {
    /// Splits `range` into frame periods in chronological order.
    /// Monthly periods are clamped to the requested range on both sides.
    pub fn periods(&self, range: DateRange) -> Vec<Period> {
        let mut periods = Vec::new();
        match self {
            FrameInterval::Daily => {
                for day in range.start().iter_days().take(range.span_days() as usize) {
                    if let Some(day_range) = DateRange::new(day, day) {
                        periods.push(Period {
                            range: day_range,
                            label: day.format("%Y-%m-%d").to_string(),
                        });
                    }
                }
            }
            FrameInterval::Monthly => {
                let mut month_start = first_of_month(range.start());
                while month_start <= range.end() {
                    let next_month = month_start + Months::new(1);
                    let month_end = next_month - Days::new(1);
                    let start = month_start.max(range.start());
                    let end = month_end.min(range.end());
                    if let Some(period_range) = DateRange::new(start, end) {
                        periods.push(Period {
                            range: period_range,
                            label: month_start.format("%Y-%m").to_string(),
                        });
                    }
                    month_start = next_month;
                }
            }
        }
        periods
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// What a detection contributes to the heat layer and the frame statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum WeightBy {
    /// Every detection counts once.
    #[default]
    Count,
    /// Detections are weighted by their fire radiative power (MW).
    Frp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn daily_periods_cover_every_day() {
        let periods = FrameInterval::Daily.periods(range((2023, 12, 30), (2024, 1, 2)));
        let labels: Vec<&str> = periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            ["2023-12-30", "2023-12-31", "2024-01-01", "2024-01-02"]
        );
        assert_eq!(
            periods[2].frame_file_name(FrameInterval::Daily),
            "frame_20240101.png"
        );
    }

    #[test]
    fn monthly_periods_are_clamped_to_range() {
        let periods = FrameInterval::Monthly.periods(range((2023, 11, 15), (2024, 2, 10)));
        let labels: Vec<&str> = periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(periods[0].range.start(), NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        assert_eq!(periods[0].range.end(), NaiveDate::from_ymd_opt(2023, 11, 30).unwrap());
        assert_eq!(periods[3].range.end(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(
            periods[1].frame_file_name(FrameInterval::Monthly),
            "frame_2023-12.png"
        );
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!(FrameInterval::from_str("Monthly", true), Ok(FrameInterval::Monthly));
        assert_eq!(WeightBy::from_str("frp", false), Ok(WeightBy::Frp));
        assert!(FrameInterval::from_str("weekly", true).is_err());
    }
}
