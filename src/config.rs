use std::{collections::HashSet, fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{common, error::PipelineError, geom::Crs};

/// Everything the two stages need to know before they start.
///
/// Relative paths in a config file are resolved against the directory containing that file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub boundaries: Boundaries,
    /// Directory holding the period measurement tables.
    pub input_dir: PathBuf,
    /// One entry per averaging period, in the order they are processed.
    pub periods: Vec<PeriodFile>,
    /// Source column names, renamed to the canonical point schema on load.
    pub columns: ColumnMapping,
    pub output_dir: PathBuf,
    pub outputs: OutputNames,
    /// Number of period files the run is expected to process.
    pub expected_period_count: usize,
    /// Geographic CRS every boundary layer is normalized to.
    pub target_crs: String,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Boundaries {
    pub city: BoundaryConfig,
    pub province: BoundaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    /// GeoJSON (`.json`, `.geojson`) or shapefile (`.shp`).
    pub path: PathBuf,
    /// Attribute holding the region name; the join key for both stages.
    #[serde(default = "default_name_column")]
    pub name_column: String,
    /// Source CRS override (`EPSG:nnnn` or a PROJ.4 string) for files that don't declare one.
    #[serde(default)]
    pub crs: Option<String>,
    /// Warn instead of failing when two polygons share a name.
    #[serde(default)]
    pub allow_duplicate_names: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodFile {
    pub label: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub value: String,
    pub longitude: String,
    pub latitude: String,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputNames {
    pub city_panel: String,
    pub province_panel: String,
    pub city_map: String,
    pub province_map: String,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub rows: usize,
    pub cols: usize,
    /// Pixel size of one small-multiple cell.
    pub cell_width: u32,
    pub cell_height: u32,
    /// Polygon edge width in pixels.
    pub edge_width: f64,
    /// Physical unit shown on legends and axes.
    pub unit: String,
}

fn default_name_column() -> String { "name".to_string() }

impl Default for Config {
    fn default() -> Self {
        let periods = ["2005-2008", "2009-2012", "2013-2016", "2017-2020"]
            .into_iter()
            .map(|label| PeriodFile {
                label: label.to_string(),
                file: PathBuf::from(format!("UV.{label}.average.csv")),
            })
            .collect::<Vec<_>>();

        Self {
            boundaries: Boundaries::default(),
            input_dir: PathBuf::from("data/UV"),
            expected_period_count: periods.len(),
            periods,
            columns: ColumnMapping::default(),
            output_dir: PathBuf::from("result"),
            outputs: OutputNames::default(),
            target_crs: "EPSG:4326".to_string(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            city: BoundaryConfig::new("data/CHN-Atlas/2. prefectures.json"),
            province: BoundaryConfig::new("data/CHN-Atlas/1. provinces.json"),
        }
    }
}

impl BoundaryConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name_column: default_name_column(),
            crs: None,
            allow_duplicate_names: false,
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            value: "UV radiation (W m-2)".to_string(),
            longitude: "longitude".to_string(),
            latitude: "latitude".to_string(),
            period: "year".to_string(),
        }
    }
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            city_panel: "01_China_City_Level_UV_Panel_2005_2020.csv".to_string(),
            province_panel: "01_China_Province_Level_UV_Panel_2005_2020.csv".to_string(),
            city_map: "02_Map_UV_Distribution_Panel_City_Level".to_string(),
            province_map: "02_Map_UV_Distribution_Panel_Province_Level".to_string(),
            trend: "03_Trend_UV_Boxplot".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            cell_width: 800,
            cell_height: 600,
            edge_width: 0.1,
            unit: "W/m²".to_string(),
        }
    }
}

impl Config {
    /// Read a JSON config file, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] failed to read {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&text)
            .with_context(|| format!("[config] failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Read `path` if it exists, otherwise use the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("[config] loading {}", path.display());
            Self::from_file(path)
        } else {
            info!("[config] {} not found; using built-in defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for boundary in [&mut self.boundaries.city, &mut self.boundaries.province] {
            boundary.path = common::resolve_against(base, &boundary.path);
        }
        self.input_dir = common::resolve_against(base, &self.input_dir);
        self.output_dir = common::resolve_against(base, &self.output_dir);
    }

    /// Startup checks: fail fast on assumptions the run depends on.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> anyhow::Error { PipelineError::InvalidConfig(msg).into() }

        if self.expected_period_count == 0 {
            return Err(invalid("expected_period_count must be at least 1".to_string()));
        }
        if self.periods.len() != self.expected_period_count {
            return Err(invalid(format!(
                "{} period file(s) configured but expected_period_count is {}",
                self.periods.len(),
                self.expected_period_count,
            )));
        }

        let mut labels = HashSet::new();
        for period in &self.periods {
            if period.label.trim().is_empty() {
                return Err(invalid(format!("period file {} has an empty label", period.file.display())));
            }
            if !labels.insert(period.label.as_str()) {
                return Err(invalid(format!("period label {:?} is configured twice", period.label)));
            }
        }

        for (what, boundary) in [("city", &self.boundaries.city), ("province", &self.boundaries.province)] {
            if boundary.name_column.trim().is_empty() {
                return Err(invalid(format!("{what} boundary name_column is empty")));
            }
            if let Some(crs) = &boundary.crs {
                Crs::parse(crs).map_err(|e| invalid(format!("{what} boundary crs: {e}")))?;
            }
        }

        for (what, name) in [
            ("value", &self.columns.value),
            ("longitude", &self.columns.longitude),
            ("latitude", &self.columns.latitude),
            ("period", &self.columns.period),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(format!("source column for {what} is empty")));
            }
        }

        let target = self.target_crs()?;
        if !target.is_geographic() {
            return Err(invalid(format!("target_crs {} is not a geographic CRS", target.label())));
        }

        let cells = self.render.rows * self.render.cols;
        if cells < self.expected_period_count {
            return Err(invalid(format!(
                "a {}x{} grid has {} cells but {} periods are expected",
                self.render.rows, self.render.cols, cells, self.expected_period_count,
            )));
        }
        if self.render.cell_width < 200 || self.render.cell_height < 150 {
            return Err(invalid("render cells must be at least 200x150 pixels".to_string()));
        }

        Ok(())
    }

    /// Parsed target CRS.
    pub fn target_crs(&self) -> Result<Crs> {
        Crs::parse(&self.target_crs)
            .map_err(|e| PipelineError::InvalidConfig(format!("target_crs: {e}")).into())
    }

    /// Location of a period's measurement table.
    pub fn period_path(&self, period: &PeriodFile) -> PathBuf {
        self.input_dir.join(&period.file)
    }

    /// Location of an output file inside the output directory.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}
