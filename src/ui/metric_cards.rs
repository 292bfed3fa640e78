use crate::core::metrics::Metrics;

/// Render the metric cards as one row of `Title: count` cells.
pub fn view(metrics: &Metrics) -> String {
    metrics
        .cards()
        .iter()
        .map(|(title, count)| format!("[{title}: {count}]"))
        .collect::<Vec<_>>()
        .join(" ")
}
