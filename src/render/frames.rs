//! Renders one PNG per frame period: heat layer, detections, AOI outline, a
//! stats box and (monthly) a labelled bar strip of per-month activity.

use crate::fire_data::fire_table::FirePoint;
use crate::render::basemap::Basemap;
use crate::render::canvas::FrameCanvas;
use crate::render::colormap::Colormap;
use crate::render::error::RenderError;
use crate::render::heatmap::{density, draw_heat_layer, WeightedPoint};
use crate::render::text::{group_thousands, FrameFont};
use crate::render::viewport::{FrameLayout, PixelArea, Projection, Viewport, DEFAULT_DPI};
use crate::spatial::aoi::{Aoi, DEFAULT_BUFFER_KM};
use crate::types::date_range::DateRange;
use crate::types::frame_interval::{FrameInterval, Period, WeightBy};
use crate::utils::progress_bar;
use ab_glyph::PxScale;
use bon::bon;
use image::{DynamicImage, Rgba};
use log::{debug, info};
use std::path::{Path, PathBuf};

const OUTLINE: Rgba<u8> = Rgba([0xe0, 0xe0, 0xe0, 255]);
const DETECTION: Rgba<u8> = Rgba([255, 0, 0, 153]);
const BAR_CURRENT: Rgba<u8> = Rgba([0xe7, 0x4c, 0x3c, 255]);
const BAR_OTHER: Rgba<u8> = Rgba([0x95, 0xa5, 0xa6, 217]);
const BAR_HIGHLIGHT: Rgba<u8> = Rgba([0xe7, 0x4c, 0x3c, 38]);
const AXIS: Rgba<u8> = Rgba([0x66, 0x66, 0x66, 255]);
const TEXT: Rgba<u8> = Rgba([0xe0, 0xe0, 0xe0, 255]);
const STATS_FACE: Rgba<u8> = Rgba([0x3d, 0x3d, 0x3d, 242]);

/// Font sizes in points.
const STATS_PT: f32 = 12.0;
const TICK_PT: f32 = 9.0;
const BAR_AXIS_PT: f32 = 11.0;
const AXIS_PT: f32 = 12.0;

/// Stats box border width in points, and its padding in font sizes.
const STATS_EDGE_PT: f32 = 2.5;
const STATS_PAD: f32 = 0.6;

/// Space between an axis and its labels, in points.
const LABEL_GAP_PT: f32 = 3.0;

/// Outline width in points.
const OUTLINE_PT: f32 = 2.5;

/// A density layer needs at least this many detections.
const MIN_HEAT_POINTS: usize = 3;

/// A frame written to disk, with the AOI statistics of its period.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub path: PathBuf,
    pub label: String,
    pub detections: usize,
    pub frp_total: f64,
}

pub struct FrameRenderer {
    aoi: Aoi,
    layout: FrameLayout,
    map_view: Viewport,
    interval: FrameInterval,
    weight_by: WeightBy,
    colormap: Colormap,
    dpi: u32,
    output_dir: PathBuf,
    basemap: Option<Basemap>,
    /// Longitude/latitude axis titles, drawn when the map is in plain degrees.
    axis_labels: bool,
    show_progress: bool,
}

/// The frame font and the sizes it is set in.
struct Labels {
    font: FrameFont,
    stats: PxScale,
    tick: PxScale,
    bar_axis: PxScale,
    axis: PxScale,
}

impl Labels {
    fn new(dpi: u32) -> Result<Self, RenderError> {
        let font = FrameFont::load(dpi)?;
        Ok(Self {
            stats: font.scale(STATS_PT)?,
            tick: font.scale(TICK_PT)?,
            bar_axis: font.scale(BAR_AXIS_PT)?,
            axis: font.scale(AXIS_PT)?,
            font,
        })
    }
}

#[bon]
impl FrameRenderer {
    #[builder]
    pub fn new(
        aoi: Aoi,
        #[builder(into)] output_dir: PathBuf,
        #[builder(default = Projection::LonLat)] projection: Projection,
        #[builder(default = DEFAULT_BUFFER_KM)] buffer_km: f64,
        #[builder(default)] interval: FrameInterval,
        #[builder(default)] weight_by: WeightBy,
        #[builder(default)] colormap: Colormap,
        #[builder(default = DEFAULT_DPI)] dpi: u32,
        basemap: Option<Basemap>,
        #[builder(default = true)] show_progress: bool,
    ) -> Self {
        let layout = FrameLayout::new(dpi, interval);
        let map_view = Viewport::around(&aoi, projection, buffer_km)
            .fit_aspect(layout.map.width, layout.map.height);
        Self {
            aoi,
            layout,
            map_view,
            interval,
            weight_by,
            colormap,
            dpi: dpi.max(1),
            output_dir,
            basemap,
            axis_labels: projection == Projection::LonLat,
            show_progress,
        }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// The projected extent drawn into the map area.
    pub fn map_viewport(&self) -> &Viewport {
        &self.map_view
    }

    pub fn with_basemap(mut self, basemap: Option<Basemap>) -> Self {
        self.basemap = basemap;
        self
    }

    /// Renders one frame per period of `range`, in chronological order.
    ///
    /// `all` are the detections of the request box (drawn), `within_aoi` the
    /// clipped subset (counted).
    pub fn render_all(
        &self,
        all: &[FirePoint],
        within_aoi: &[FirePoint],
        range: DateRange,
    ) -> Result<Vec<RenderedFrame>, RenderError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| RenderError::FrameDirCreation(self.output_dir.clone(), e))?;

        let labels = Labels::new(self.dpi)?;
        let periods = self.interval.periods(range);
        info!("Generating {} {:?} frames...", periods.len(), self.interval);
        let bar_values = match self.interval {
            FrameInterval::Monthly => period_values(&periods, within_aoi, self.weight_by),
            FrameInterval::Daily => Vec::new(),
        };

        let progress = progress_bar(periods.len() as u64, "frames", self.show_progress);
        let mut frames = Vec::with_capacity(periods.len());
        for (index, period) in periods.iter().enumerate() {
            progress.set_message(period.label.clone());
            let visible = in_period(all, period);
            let counted = in_period(within_aoi, period);
            let drawn = if visible.is_empty() { &counted } else { &visible };

            let detections = counted.len();
            let frp_total = counted.iter().filter_map(|p| p.frp).sum();

            let path = self.output_dir.join(period.frame_file_name(self.interval));
            let mut canvas = FrameCanvas::new(self.layout.width, self.layout.height);
            self.draw_map(&mut canvas, drawn);
            if self.axis_labels {
                self.draw_axis_labels(&mut canvas, &labels);
            }
            let stats = stats_text(self.interval, self.weight_by, period, detections, frp_total);
            self.draw_stats_box(&mut canvas, &labels, &stats);
            if let Some(bars) = self.layout.bars {
                draw_bars(&mut canvas, &bars, &bar_values, index);
                self.draw_bar_labels(&mut canvas, &labels, &bars, &periods);
            }
            save(canvas, &path)?;

            let frame = RenderedFrame {
                path,
                label: period.label.clone(),
                detections,
                frp_total,
            };
            debug!(
                "Frame {}: {} detections in AOI, {:.0} MW",
                frame.label, frame.detections, frame.frp_total
            );
            frames.push(frame);
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(frames)
    }

    fn draw_map(&self, canvas: &mut FrameCanvas, points: &[FirePoint]) {
        let area = self.layout.map;
        if let Some(basemap) = &self.basemap {
            canvas.paste(basemap.image(), &area);
        }

        let pixels: Vec<(f32, f32)> = points
            .iter()
            .map(|p| self.map_view.lonlat_to_pixel(&area, p.lon, p.lat))
            .collect();
        let weights = self.normalised_weights(points);

        let dense = points.len() >= MIN_HEAT_POINTS;
        if dense {
            let heat_points: Vec<WeightedPoint> = pixels
                .iter()
                .zip(weights.iter())
                .map(|(&(x, y), &w)| WeightedPoint {
                    x: (x - area.x as f32) as f64,
                    y: (y - area.y as f32) as f64,
                    weight: w.unwrap_or(1.0),
                })
                .collect();
            let grid = density(&heat_points, area.width, area.height);
            draw_heat_layer(canvas.image_mut(), area.x, area.y, &grid, self.colormap);
        }

        for (&center, weight) in pixels.iter().zip(weights) {
            let size = marker_size(dense, weight);
            if inside(&area, center) {
                canvas.dot(center, self.points_to_px(size.sqrt() / 2.0), DETECTION);
            }
        }

        let outline = self.points_to_px(OUTLINE_PT);
        for polygon in self.aoi.geometry() {
            let ring: Vec<(f32, f32)> = polygon
                .exterior()
                .coords()
                .map(|c| self.map_view.lonlat_to_pixel(&area, c.x, c.y))
                .collect();
            canvas.ring(&ring, outline, OUTLINE);
        }
    }

    /// Boxed period statistics in the top-left corner of the map.
    fn draw_stats_box(&self, canvas: &mut FrameCanvas, labels: &Labels, text: &str) {
        let area = self.layout.map;
        let font = &labels.font;
        let lines: Vec<&str> = text.lines().collect();
        let line_height = font.line_height(labels.stats);
        let text_width = lines
            .iter()
            .map(|line| font.text_width(labels.stats, line))
            .max()
            .unwrap_or(0);
        let pad = self.points_to_px(STATS_PAD * STATS_PT).round() as u32;
        let edge = self.points_to_px(STATS_EDGE_PT).round().max(1.0) as u32;

        let x = area.x + (area.width as f32 * 0.05).round() as u32;
        let y = area.y + (area.height as f32 * 0.05).round() as u32;
        let width = text_width + 2 * pad;
        let height = line_height * lines.len() as u32 + 2 * pad;
        canvas.fill_rect(x as i32, y as i32, width, height, STATS_FACE);
        canvas.frame_rect(x as i32, y as i32, width, height, edge, BAR_CURRENT);

        for (row, line) in lines.iter().enumerate() {
            let top = y + pad + row as u32 * line_height;
            font.draw(
                canvas.image_mut(),
                ((x + pad) as i32, top as i32),
                labels.stats,
                TEXT,
                line,
            );
        }
    }

    /// Month ticks under the bars and the weighting title to their left.
    fn draw_bar_labels(
        &self,
        canvas: &mut FrameCanvas,
        labels: &Labels,
        area: &PixelArea,
        periods: &[Period],
    ) {
        if periods.is_empty() || area.width == 0 {
            return;
        }
        let font = &labels.font;
        let gap = self.points_to_px(LABEL_GAP_PT).round() as i32;
        let slot = area.width as f32 / periods.len() as f32;
        let top = (area.y + area.height) as i32 + gap;
        for index in (0..periods.len()).step_by(tick_step(periods.len())) {
            let tick = month_tick(&periods[index]);
            let width = font.text_width(labels.tick, &tick) as f32;
            let x = area.x as f32 + (index as f32 + 0.5) * slot - width / 2.0;
            font.draw(canvas.image_mut(), (x.round() as i32, top), labels.tick, TEXT, &tick);
        }

        let title = bar_axis_title(self.weight_by);
        let length = font.text_width(labels.bar_axis, title) as i32;
        let thickness = font.line_height(labels.bar_axis) as i32;
        let x = (area.x as i32 - thickness - gap).max(0);
        let y = area.y as i32 + (area.height as i32 - length) / 2;
        font.draw_vertical(canvas.image_mut(), (x, y), labels.bar_axis, TEXT, title);
    }

    fn draw_axis_labels(&self, canvas: &mut FrameCanvas, labels: &Labels) {
        let area = self.layout.map;
        let font = &labels.font;
        let gap = self.points_to_px(LABEL_GAP_PT).round() as i32;

        let width = font.text_width(labels.axis, "Longitude") as i32;
        let x = area.x as i32 + (area.width as i32 - width) / 2;
        let y = (area.y + area.height) as i32 + gap;
        font.draw(canvas.image_mut(), (x, y), labels.axis, TEXT, "Longitude");

        let length = font.text_width(labels.axis, "Latitude") as i32;
        let thickness = font.line_height(labels.axis) as i32;
        let x = (area.x as i32 - thickness - gap).max(0);
        let y = area.y as i32 + (area.height as i32 - length) / 2;
        font.draw_vertical(canvas.image_mut(), (x, y), labels.axis, TEXT, "Latitude");
    }

    /// FRP scaled to `[0, 1]` by the period maximum when weighting by FRP;
    /// `None` everywhere otherwise.
    fn normalised_weights(&self, points: &[FirePoint]) -> Vec<Option<f64>> {
        if self.weight_by != WeightBy::Frp {
            return vec![None; points.len()];
        }
        let max = points.iter().filter_map(|p| p.frp).fold(0.0, f64::max);
        points
            .iter()
            .map(|p| (max > 0.0).then(|| p.frp.unwrap_or(0.0) / max))
            .collect()
    }

    fn points_to_px(&self, points: f32) -> f32 {
        points * self.dpi as f32 / 72.0
    }
}

/// Marker area in square points, following the density of the frame and the
/// detection's normalised FRP.
fn marker_size(dense: bool, weight: Option<f64>) -> f32 {
    match (dense, weight) {
        (true, Some(w)) => 5.0 + (w * 45.0) as f32,
        (true, None) => 15.0,
        (false, Some(w)) => 20.0 + (w * 130.0) as f32,
        (false, None) => 50.0,
    }
}

fn inside(area: &PixelArea, (x, y): (f32, f32)) -> bool {
    x >= area.x as f32
        && y >= area.y as f32
        && x < (area.x + area.width) as f32
        && y < (area.y + area.height) as f32
}

fn in_period(points: &[FirePoint], period: &Period) -> Vec<FirePoint> {
    points
        .iter()
        .filter(|p| period.range.contains(p.date))
        .copied()
        .collect()
}

/// Detection count or FRP sum of every period.
pub fn period_values(periods: &[Period], points: &[FirePoint], weight_by: WeightBy) -> Vec<f64> {
    periods
        .iter()
        .map(|period| {
            let inside = points.iter().filter(|p| period.range.contains(p.date));
            match weight_by {
                WeightBy::Count => inside.count() as f64,
                WeightBy::Frp => inside.filter_map(|p| p.frp).sum(),
            }
        })
        .collect()
}

/// Stats box text: month and total for monthly frames, the total alone for
/// daily ones.
pub fn stats_text(
    interval: FrameInterval,
    weight_by: WeightBy,
    period: &Period,
    detections: usize,
    frp_total: f64,
) -> String {
    let total = match weight_by {
        WeightBy::Count => format!("{} Detections", group_thousands(detections as u64)),
        WeightBy::Frp => format!("{} MW", group_thousands(frp_total.max(0.0).round() as u64)),
    };
    match (interval, weight_by) {
        (FrameInterval::Daily, _) => total,
        (FrameInterval::Monthly, WeightBy::Count) => {
            format!("{}\n{}", period.range.start().format("%B %Y"), total)
        }
        (FrameInterval::Monthly, WeightBy::Frp) => format!(
            "{}\n{} Fire Radiative Power",
            period.range.start().format("%B %Y"),
            total
        ),
    }
}

/// Every how many months a tick is labelled.
pub fn tick_step(months: usize) -> usize {
    match months {
        0..=12 => 1,
        13..=24 => 2,
        25..=36 => 3,
        _ => 6,
    }
}

/// `Aug '23`.
fn month_tick(period: &Period) -> String {
    period.range.start().format("%b '%y").to_string()
}

fn bar_axis_title(weight_by: WeightBy) -> &'static str {
    match weight_by {
        WeightBy::Count => "Detections",
        WeightBy::Frp => "FRP (MW)",
    }
}

fn draw_bars(canvas: &mut FrameCanvas, area: &PixelArea, values: &[f64], current: usize) {
    if values.is_empty() || area.width == 0 || area.height == 0 {
        return;
    }
    let slot = area.width as f32 / values.len() as f32;
    let max = values.iter().copied().fold(0.0, f64::max);
    let baseline = (area.y + area.height) as i32;

    canvas.fill_rect(
        (area.x as f32 + current as f32 * slot).round() as i32,
        area.y as i32,
        slot.round().max(1.0) as u32,
        area.height,
        BAR_HIGHLIGHT,
    );

    for (index, value) in values.iter().enumerate() {
        let height = if max > 0.0 {
            (value / max * area.height as f64 * 0.9).round() as u32
        } else {
            0
        };
        let x = area.x as f32 + index as f32 * slot + slot * 0.1;
        let color = if index == current { BAR_CURRENT } else { BAR_OTHER };
        canvas.fill_rect(
            x.round() as i32,
            baseline - height as i32,
            (slot * 0.8).round().max(1.0) as u32,
            height,
            color,
        );
    }
    canvas.fill_rect(area.x as i32, baseline, area.width, 1, AXIS);
}

fn save(canvas: FrameCanvas, path: &Path) -> Result<(), RenderError> {
    DynamicImage::ImageRgba8(canvas.into_image())
        .into_rgb8()
        .save(path)
        .map_err(|e| RenderError::FrameWrite(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::aoi::tests::square;
    use chrono::NaiveDate;

    fn fire(lon: f64, lat: f64, (m, d): (u32, u32), frp: f64) -> FirePoint {
        FirePoint {
            lon,
            lat,
            date: NaiveDate::from_ymd_opt(2023, m, d).unwrap(),
            frp: Some(frp),
        }
    }

    fn range(from: (u32, u32), to: (u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, from.0, from.1).unwrap(),
            NaiveDate::from_ymd_opt(2023, to.0, to.1).unwrap(),
        )
        .unwrap()
    }

    fn fires() -> Vec<FirePoint> {
        vec![
            fire(-121.5, 37.5, (8, 3), 10.0),
            fire(-121.45, 37.52, (8, 4), 30.0),
            fire(-121.55, 37.48, (8, 20), 5.0),
            fire(-121.4, 37.6, (9, 2), 50.0),
        ]
    }

    #[test]
    fn monthly_frames_are_written_with_even_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FrameRenderer::builder()
            .aoi(square())
            .output_dir(dir.path().join("frames"))
            .dpi(25)
            .show_progress(false)
            .build();

        let all = fires();
        let frames = renderer
            .render_all(&all, &all[..3], range((8, 1), (9, 30)))
            .unwrap();

        let names: Vec<String> = frames
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame_2023-08.png", "frame_2023-09.png"]);
        assert_eq!(frames[0].detections, 3);
        assert_eq!(frames[1].detections, 0);
        assert_eq!(frames[0].frp_total, 45.0);

        let image = image::open(&frames[0].path).unwrap();
        assert_eq!(image.width() % 2, 0);
        assert_eq!(image.height() % 2, 0);
        assert_eq!((image.width(), image.height()), (300, 250));
    }

    #[test]
    fn daily_frames_cover_each_day() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FrameRenderer::builder()
            .aoi(square())
            .output_dir(dir.path())
            .interval(FrameInterval::Daily)
            .weight_by(WeightBy::Frp)
            .colormap(Colormap::Fire)
            .dpi(20)
            .show_progress(false)
            .build();
        let all = fires();
        let frames = renderer.render_all(&all, &all, range((8, 3), (8, 5))).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[2].path.ends_with("frame_20230805.png"));
        assert!(frames.iter().all(|f| f.path.exists()));
    }

    #[test]
    fn period_values_count_or_sum_frp() {
        let periods = FrameInterval::Monthly.periods(range((8, 1), (9, 30)));
        let points = fires();
        assert_eq!(period_values(&periods, &points, WeightBy::Count), [3.0, 1.0]);
        assert_eq!(period_values(&periods, &points, WeightBy::Frp), [45.0, 50.0]);
    }

    #[test]
    fn stats_text_names_the_month_and_total() {
        let august = &FrameInterval::Monthly.periods(range((8, 1), (8, 31)))[0];
        assert_eq!(
            stats_text(FrameInterval::Monthly, WeightBy::Count, august, 1234, 0.0),
            "August 2023\n1,234 Detections"
        );
        assert_eq!(
            stats_text(FrameInterval::Monthly, WeightBy::Frp, august, 3, 45210.6),
            "August 2023\n45,211 MW Fire Radiative Power"
        );
        let day = &FrameInterval::Daily.periods(range((8, 3), (8, 3)))[0];
        let daily = |weight_by, frp| stats_text(FrameInterval::Daily, weight_by, day, 7, frp);
        assert_eq!(daily(WeightBy::Count, 0.0), "7 Detections");
        assert_eq!(daily(WeightBy::Frp, 99.5), "100 MW");
        assert_eq!(month_tick(august), "Aug '23");
    }

    #[test]
    fn month_ticks_thin_out_on_long_runs() {
        assert_eq!(tick_step(12), 1);
        assert_eq!(tick_step(13), 2);
        assert_eq!(tick_step(36), 3);
        assert_eq!(tick_step(37), 6);
    }

    #[test]
    fn stats_box_ticks_and_titles_are_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FrameRenderer::builder()
            .aoi(square())
            .output_dir(dir.path())
            .dpi(72)
            .show_progress(false)
            .build();
        let layout = *renderer.layout();
        let all = fires();
        let frames = renderer
            .render_all(&all, &all, range((8, 1), (9, 30)))
            .unwrap();
        let image = image::open(&frames[0].path).unwrap().to_rgb8();

        let lit = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>| {
            ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
                .filter(|&(x, y)| image.get_pixel(x, y).0.iter().all(|&c| c > 0x80))
                .count()
        };

        // stats box: red border at its corner, light text inside
        let map = layout.map;
        let x = map.x + (map.width as f32 * 0.05).round() as u32;
        let y = map.y + (map.height as f32 * 0.05).round() as u32;
        assert_eq!(image.get_pixel(x, y).0, [0xe7, 0x4c, 0x3c]);
        assert!(lit(x..x + 150, y..y + 60) > 30);

        // month ticks under the bars, weighting title left of them
        let bars = layout.bars.unwrap();
        let baseline = bars.y + bars.height;
        assert!(lit(bars.x..bars.x + bars.width, baseline + 1..layout.height) > 20);
        assert!(lit(0..bars.x, bars.y..baseline) > 20);
        // latitude title left of the map
        assert!(lit(0..map.x, map.y..map.y + map.height) > 20);
    }

    #[test]
    fn markers_grow_with_frp() {
        assert!(marker_size(true, Some(1.0)) > marker_size(true, Some(0.1)));
        assert_eq!(marker_size(false, None), 50.0);
    }
}
