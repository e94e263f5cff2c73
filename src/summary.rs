//! Per-category summaries of a read, for display.

use crate::sample::{CanonicalSample, Category};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Summary statistics over a category's primary values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    /// Number of samples, including ones without a numeric value
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; needs at least two values
    pub std_dev: Option<f64>,
}

/// Summarize `samples` per category in canonical order, skipping empty categories.
pub fn summarize(samples: &[CanonicalSample]) -> Vec<CategorySummary> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            let in_category: Vec<&CanonicalSample> = samples
                .iter()
                .filter(|s| s.category() == category)
                .collect();
            if in_category.is_empty() {
                return None;
            }

            let values: Vec<f64> = in_category
                .iter()
                .filter_map(|s| s.primary_value())
                .collect();

            let (mean, min, max) = if values.is_empty() {
                (None, None, None)
            } else {
                (
                    Some(Statistics::mean(values.iter())),
                    Some(Statistics::min(values.iter())),
                    Some(Statistics::max(values.iter())),
                )
            };
            let std_dev = (values.len() > 1).then(|| Statistics::std_dev(values.iter()));

            Some(CategorySummary {
                category,
                count: in_category.len(),
                mean,
                min,
                max,
                std_dev,
            })
        })
        .collect()
}
