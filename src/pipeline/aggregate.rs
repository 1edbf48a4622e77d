use std::{collections::BTreeMap, sync::Arc};

use super::{AttributedPoint, PanelRecord, Period};

/// Arithmetic mean per (region, period) group.
///
/// Values are summed in sorted order, so the result does not depend on input order.
/// Output is sorted by region name, then period.
pub fn aggregate(points: &[AttributedPoint]) -> Vec<PanelRecord> {
    let mut groups: BTreeMap<(Arc<str>, Period), Vec<f64>> = BTreeMap::new();
    for point in points {
        groups.entry((point.region.clone(), point.period.clone()))
            .or_default()
            .push(point.value);
    }

    groups.into_iter()
        .map(|((region, period), mut values)| {
            values.sort_by(f64::total_cmp);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            PanelRecord { region, period, value: mean }
        })
        .collect()
}
