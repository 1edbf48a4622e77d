use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use super::{aggregate, attribute, load_period_points, Panel, PanelRecord};
use crate::{
    boundary::{BoundaryLayer, Granularity},
    common,
    config::Config,
};

/// What the aggregation stage produced.
#[derive(Debug, Clone)]
pub struct AggregationOutput {
    pub city: Panel,
    pub province: Panel,
    pub city_path: PathBuf,
    pub province_path: PathBuf,
    /// Labels of periods whose file was missing or unreadable.
    pub skipped: Vec<String>,
}

/// Attribute every period's points to both boundary layers and write the two panels.
///
/// A missing or malformed period file only skips that period; boundary problems and
/// an empty result are fatal, in which case no panel is written.
pub fn run_aggregation(config: &Config) -> Result<AggregationOutput> {
    config.validate()?;
    let target = config.target_crs()?;

    let city_layer = BoundaryLayer::load(Granularity::City, &config.boundaries.city, &target)?;
    let province_layer = BoundaryLayer::load(Granularity::Province, &config.boundaries.province, &target)?;

    let mut city_batches: Vec<Vec<PanelRecord>> = Vec::with_capacity(config.periods.len());
    let mut province_batches: Vec<Vec<PanelRecord>> = Vec::with_capacity(config.periods.len());
    let mut skipped = Vec::new();

    for period in &config.periods {
        let path = config.period_path(period);
        if !path.is_file() {
            warn!("[aggregate] period {} skipped: {} not found", period.label, path.display());
            skipped.push(period.label.clone());
            continue;
        }

        info!("[aggregate] processing period {} ({})", period.label, path.display());
        let points = match load_period_points(&path, &period.label, &config.columns) {
            Ok(points) => points,
            Err(e) => {
                error!("[aggregate] period {} skipped: {e:#}", period.label);
                skipped.push(period.label.clone());
                continue;
            }
        };

        let city_points = attribute(&points, &city_layer);
        let province_points = attribute(&points, &province_layer);
        let tested = points.len();
        drop(points);

        info!(
            "[aggregate] period {}: {tested} points, {} in cities, {} in provinces",
            period.label, city_points.len(), province_points.len(),
        );
        city_batches.push(aggregate(&city_points));
        province_batches.push(aggregate(&province_points));
    }

    if !skipped.is_empty() {
        warn!("[aggregate] {} of {} period(s) skipped: {skipped:?}", skipped.len(), config.periods.len());
    }

    let city = Panel::build(Granularity::City, city_batches)?;
    let province = Panel::build(Granularity::Province, province_batches)?;

    common::ensure_dir_exists(&config.output_dir)
        .context("[aggregate] cannot prepare the output directory")?;
    let city_path = config.output_path(&config.outputs.city_panel);
    let province_path = config.output_path(&config.outputs.province_panel);
    for (panel, path) in [(&city, &city_path), (&province, &province_path)] {
        panel.write_csv(path)?;
        if let Some((min, max)) = panel.value_range() {
            info!("[aggregate] {} panel value range min={min:.4} max={max:.4}", panel.granularity());
        }
    }

    Ok(AggregationOutput { city, province, city_path, province_path, skipped })
}
