//! Shared fixtures: a tiny two-region atlas and period tables in a temp directory.

#![allow(dead_code)]

use std::{fs, path::{Path, PathBuf}};

use serde_json::json;
use tempfile::TempDir;
use uvatlas::{BoundaryConfig, Boundaries, Config, PeriodFile};

pub const BEIJING: &str = "北京市";
pub const SHANGHAI: &str = "上海市";

/// Closed lon/lat ring of an axis-aligned box.
pub fn ring(x0: f64, y0: f64, x1: f64, y1: f64) -> serde_json::Value {
    json!([[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]])
}

/// A FeatureCollection of named polygons, optionally with a legacy `crs` member.
pub fn feature_collection(features: &[(&str, serde_json::Value)], crs: Option<&str>) -> String {
    let features = features.iter()
        .map(|(name, coordinates)| json!({
            "type": "Feature",
            "properties": { "name": name, "adcode": 0 },
            "geometry": { "type": "Polygon", "coordinates": coordinates },
        }))
        .collect::<Vec<_>>();
    let mut collection = json!({ "type": "FeatureCollection", "features": features });
    if let Some(crs) = crs {
        collection["crs"] = json!({ "type": "name", "properties": { "name": crs } });
    }
    collection.to_string()
}

/// Beijing and Shanghai as unit-ish boxes in EPSG:4326.
pub fn two_city_layer() -> String {
    feature_collection(
        &[
            (BEIJING, ring(116.0, 39.5, 117.0, 40.5)),
            (SHANGHAI, ring(121.0, 30.7, 122.0, 31.7)),
        ],
        None,
    )
}

/// A period table with the raw source column names.
pub fn period_table(period: &str, rows: &[(f64, f64, f64)]) -> String {
    let mut out = String::from("longitude,latitude,UV radiation (W m-2),year\n");
    for (lon, lat, value) in rows {
        out.push_str(&format!("{lon},{lat},{value},{period}\n"));
    }
    out
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    /// Empty workspace whose config expects the given period labels.
    pub fn new(labels: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("boundaries")).unwrap();
        fs::create_dir_all(root.join("uv")).unwrap();

        let config = Config {
            boundaries: Boundaries {
                city: BoundaryConfig::new(root.join("boundaries/cities.geojson")),
                province: BoundaryConfig::new(root.join("boundaries/provinces.geojson")),
            },
            input_dir: root.join("uv"),
            periods: labels.iter()
                .map(|label| PeriodFile {
                    label: label.to_string(),
                    file: PathBuf::from(format!("UV.{label}.average.csv")),
                })
                .collect(),
            expected_period_count: labels.len(),
            output_dir: root.join("result"),
            ..Config::default()
        };
        Self { dir, config }
    }

    pub fn root(&self) -> &Path { self.dir.path() }

    pub fn write_boundaries(&self, city: &str, province: &str) {
        fs::write(&self.config.boundaries.city.path, city).unwrap();
        fs::write(&self.config.boundaries.province.path, province).unwrap();
    }

    pub fn write_period(&self, label: &str, rows: &[(f64, f64, f64)]) {
        self.write_period_raw(label, &period_table(label, rows));
    }

    pub fn write_period_raw(&self, label: &str, contents: &str) {
        let path = self.config.input_dir.join(format!("UV.{label}.average.csv"));
        fs::write(path, contents).unwrap();
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    /// Two periods over Beijing, one point in Shanghai, one point outside both.
    pub fn standard() -> Self {
        let fixture = Self::new(&["2005-2008", "2009-2012"]);
        fixture.write_boundaries(&two_city_layer(), &two_city_layer());
        fixture.write_period("2005-2008", &[
            (116.4, 39.9, 0.20),
            (116.5, 40.0, 0.30),
            (121.5, 31.2, 0.50),
            (100.0, 25.0, 9.90),
        ]);
        fixture.write_period("2009-2012", &[(116.4, 39.9, 0.40)]);
        fixture
    }
}
