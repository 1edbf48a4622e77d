use std::{collections::{BTreeSet, HashSet}, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use polars::{frame::DataFrame, prelude::{Column, DataType}};
use tracing::info;

use super::{points::{PERIOD, VALUE}, Period};
use crate::{boundary::Granularity, error::PipelineError, io};

/// Header of the region-name column in a panel file.
pub(crate) const NAME: &str = "name";

/// Mean value of one region over one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRecord {
    pub region: Arc<str>,
    pub period: Period,
    pub value: f64,
}

/// Long-format table of per-region, per-period means for one granularity.
///
/// Always sorted by region name, then period, with no repeated (region, period) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    granularity: Granularity,
    records: Vec<PanelRecord>,
}

impl Panel {
    /// Concatenate per-period batches into one sorted panel.
    pub fn build(granularity: Granularity, batches: Vec<Vec<PanelRecord>>) -> Result<Self> {
        let rows = batches.iter().map(Vec::len).sum::<usize>();
        if batches.is_empty() || rows == 0 {
            return Err(PipelineError::NoResults { granularity }.into());
        }

        Self::from_records(granularity, batches.into_iter().flatten().collect())
    }

    fn from_records(granularity: Granularity, mut records: Vec<PanelRecord>) -> Result<Self> {
        records.sort_by(|a, b| a.region.cmp(&b.region).then_with(|| a.period.cmp(&b.period)));

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert((record.region.as_ref(), &record.period)) {
                bail!(
                    "[panel] {granularity} panel has more than one row for ({}, {})",
                    record.region, record.period
                );
            }
        }
        Ok(Self { granularity, records })
    }

    #[inline] pub fn granularity(&self) -> Granularity { self.granularity }
    #[inline] pub fn records(&self) -> &[PanelRecord] { &self.records }
    #[inline] pub fn len(&self) -> usize { self.records.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Distinct periods in natural order.
    pub fn periods(&self) -> Vec<Period> {
        self.records.iter()
            .map(|record| &record.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    /// (min, max) over every value, or `None` for an empty panel.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.records.iter().map(|record| record.value).fold(None, |range, value| match range {
            None => Some((value, value)),
            Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
        })
    }

    /// Records of a single period, in region order.
    pub fn values_for<'a>(&'a self, period: &'a Period) -> impl Iterator<Item = &'a PanelRecord> + 'a {
        self.records.iter().filter(move |record| &record.period == period)
    }

    pub(crate) fn to_dataframe(&self) -> Result<DataFrame> {
        let names = self.records.iter().map(|r| r.region.as_ref()).collect::<Vec<_>>();
        let periods = self.records.iter().map(|r| r.period.label()).collect::<Vec<_>>();
        let values = self.records.iter().map(|r| r.value).collect::<Vec<_>>();

        Ok(DataFrame::new(vec![
            Column::new(NAME.into(), names),
            Column::new(PERIOD.into(), periods),
            Column::new(VALUE.into(), values),
        ])?)
    }

    /// Write as comma-separated UTF-8 with a BOM, header `name,year,UV_Value`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.to_dataframe()?;
        io::csv::write_csv_with_bom(&mut df, path)?;
        info!("[panel] wrote {} {} rows to {}", self.len(), self.granularity, path.display());
        Ok(())
    }

    /// Read a panel written by [`Panel::write_csv`].
    pub fn read_csv(granularity: Granularity, path: &Path) -> Result<Self> {
        let df = io::csv::read_csv_with_text_columns(path, &[NAME, PERIOD])?;
        Self::from_dataframe(granularity, &df)
            .with_context(|| format!("[panel] invalid panel file {}", path.display()))
    }

    fn from_dataframe(granularity: Granularity, df: &DataFrame) -> Result<Self> {
        let names = df.column(NAME)?.cast(&DataType::String)?;
        let periods = df.column(PERIOD)?.cast(&DataType::String)?;
        let values = df.column(VALUE)?.cast(&DataType::Float64)?;

        let mut records = Vec::with_capacity(df.height());
        let rows = names.str()?.into_iter()
            .zip(periods.str()?.into_iter())
            .zip(values.f64()?.into_iter());
        for ((name, period), value) in rows {
            let (Some(name), Some(period), Some(value)) = (name, period, value) else { continue };
            records.push(PanelRecord { region: Arc::from(name), period: Period::new(period), value });
        }
        Self::from_records(granularity, records)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record(region: &str, period: &str, value: f64) -> PanelRecord {
        PanelRecord { region: Arc::from(region), period: Period::new(period), value }
    }

    #[test]
    fn build_sorts_by_region_then_period() {
        let panel = Panel::build(Granularity::City, vec![
            vec![record("b", "2009-2012", 1.0), record("a", "2009-2012", 2.0)],
            vec![record("b", "2005-2008", 3.0), record("a", "2005-2008", 4.0)],
        ]).unwrap();

        let keys = panel.records().iter()
            .map(|r| (r.region.as_ref(), r.period.label()))
            .collect::<Vec<_>>();
        assert_eq!(keys, [("a", "2005-2008"), ("a", "2009-2012"), ("b", "2005-2008"), ("b", "2009-2012")]);
        assert_eq!(panel.periods(), [Period::new("2005-2008"), Period::new("2009-2012")]);
        assert_eq!(panel.value_range(), Some((1.0, 4.0)));
        assert_eq!(panel.values_for(&Period::new("2005-2008")).count(), 2);
    }

    #[test]
    fn empty_batches_are_no_results() {
        for batches in [vec![], vec![vec![], vec![]]] {
            let err = Panel::build(Granularity::Province, batches).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::NoResults { granularity: Granularity::Province })
            ));
        }
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let result = Panel::build(Granularity::City, vec![
            vec![record("a", "2005-2008", 1.0)],
            vec![record("a", "2005-2008", 2.0)],
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn csv_round_trip_keeps_non_ascii_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("panel.csv");
        let panel = Panel::build(Granularity::City, vec![vec![
            record("北京市", "2005-2008", 0.25),
            record("乌鲁木齐市", "2005-2008", 0.125),
            record("上海市", "2009-2012", 0.5),
        ]]).unwrap();

        panel.write_csv(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBFname,year,UV_Value"));

        let read = Panel::read_csv(Granularity::City, &path).unwrap();
        assert_eq!(read, panel);
    }
}
