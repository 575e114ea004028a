//! Visualization utilities for voxel_planner
//!
//! Draws 2D projections of 3D paths, obstacles and search snapshots with
//! gnuplot. Series are collected first and rendered into a single set of axes
//! when the plot is shown or saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::WorldPoint;
use crate::path_planning::voxel_astar::SearchReport;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    pub const OBSTACLE: &str = BLACK;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const RAW_PATH: &str = ORANGE;
    pub const OPEN: &str = "#9ECAE1";
    pub const CLOSED: &str = GRAY;
}

/// Plane a 3D scene is projected onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Top view
    Xy,
    /// Side view
    Xz,
    Yz,
}

impl Projection {
    fn project(&self, p: &WorldPoint) -> (f64, f64) {
        match self {
            Projection::Xy => (p.x, p.y),
            Projection::Xz => (p.x, p.z),
            Projection::Yz => (p.y, p.z),
        }
    }

    fn labels(&self) -> (&'static str, &'static str) {
        match self {
            Projection::Xy => ("X [m]", "Y [m]"),
            Projection::Xz => ("X [m]", "Z [m]"),
            Projection::Yz => ("Y [m]", "Z [m]"),
        }
    }
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Path")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Projected plot of a voxel planning scene
#[derive(Debug, Clone)]
pub struct VoxelPlot {
    projection: Projection,
    title: String,
    series: Vec<Series>,
}

impl VoxelPlot {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            title: String::new(),
            series: Vec::new(),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    fn split(&self, points: &[WorldPoint]) -> (Vec<f64>, Vec<f64>) {
        points.iter().map(|p| self.projection.project(p)).unzip()
    }

    pub fn plot_path(&mut self, path: &[WorldPoint], style: &PathStyle) -> &mut Self {
        let (x, y) = self.split(path);
        self.series.push(Series::Lines {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    pub fn plot_points(&mut self, points: &[WorldPoint], style: &PointStyle) -> &mut Self {
        if points.is_empty() {
            return self;
        }
        let (x, y) = self.split(points);
        self.series.push(Series::Points {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    pub fn plot_obstacles(&mut self, obstacles: &[WorldPoint]) -> &mut Self {
        let style = PointStyle::new(colors::OBSTACLE, "Obstacles")
            .with_symbol('S')
            .with_size(0.5);
        self.plot_points(obstacles, &style)
    }

    pub fn plot_start(&mut self, point: WorldPoint) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, point: WorldPoint) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    /// Open and closed list snapshots of a search run in debug mode
    pub fn plot_search(&mut self, report: &SearchReport) -> &mut Self {
        let closed = PointStyle::new(colors::CLOSED, "Closed").with_symbol('.');
        let open = PointStyle::new(colors::OPEN, "Open").with_symbol('.');
        self.plot_points(&report.closed_snapshot, &closed);
        self.plot_points(&report.open_snapshot, &open)
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let (x_label, y_label) = self.projection.labels();
        let axes = figure.axes2d();
        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(x_label, &[]);
        axes.set_y_label(y_label, &[]);
        axes.set_aspect_ratio(AutoOption::Fix(1.0));

        for series in self.series.iter() {
            match series {
                Series::Lines { x, y, style } => {
                    axes.lines(
                        x,
                        y,
                        &[
                            Caption(style.caption.as_str()),
                            Color(style.color.as_str()),
                            LineWidth(style.line_width),
                        ],
                    );
                }
                Series::Points { x, y, style } => {
                    axes.points(
                        x,
                        y,
                        &[
                            Caption(style.caption.as_str()),
                            Color(style.color.as_str()),
                            PointSymbol(style.symbol),
                            PointSize(style.size),
                        ],
                    );
                }
            }
        }
        figure
    }

    /// Finalize and show the plot
    pub fn show(&self) -> Result<(), String> {
        self.render().show().map_err(|e| e.to_string()).map(|_| ())
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render()
            .save_to_png(path, width, height)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection() {
        let p = WorldPoint::new(1.0, 2.0, 3.0);
        assert_eq!(Projection::Xy.project(&p), (1.0, 2.0));
        assert_eq!(Projection::Xz.project(&p), (1.0, 3.0));
        assert_eq!(Projection::Yz.project(&p), (2.0, 3.0));
    }

    #[test]
    fn test_series_collection() {
        let mut plot = VoxelPlot::new(Projection::Xz);
        let path = vec![WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 0.0, 1.0)];
        plot.set_title("test")
            .plot_path(&path, &PathStyle::default())
            .plot_obstacles(&[])
            .plot_start(path[0])
            .plot_goal(path[1]);
        assert_eq!(plot.series_count(), 3);
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RAW_PATH, "Raw").with_line_width(1.0);
        assert_eq!(style.line_width, 1.0);
        assert_eq!(style.color, colors::RAW_PATH);
    }
}
