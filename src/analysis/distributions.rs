use indexmap::IndexMap;

use crate::backend::types::Defect;
use crate::insights::Distributions;

pub fn calculate_distributions(defects: &[Defect]) -> Distributions {
    Distributions {
        status: count_values(defects.iter().map(|d| Some(d.status.as_str()))),
        priority: count_values(defects.iter().map(|d| d.priority.as_deref())),
        project: count_values(defects.iter().map(|d| d.project.as_deref())),
    }
}

/// Frequency table ordered by count, most frequent first. Ties keep the
/// order in which values were first seen. Missing values are not counted.
fn count_values<'a, I>(values: I) -> IndexMap<String, usize>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut counts = values
        .flatten()
        .fold(IndexMap::new(), |mut acc: IndexMap<String, usize>, value| {
            *acc.entry(value.to_string()).or_insert(0) += 1;
            acc
        });

    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts
}
