//! The dashboard's menu of views and the chart data behind each one.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dataset::{AgeBracket, PreparedTable};

/// Number of states shown by [`Insight::TopStates`].
pub const TOP_STATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Insight {
    AgeDistribution,
    GenderProportion,
    TopStates,
    MeanTimeToJobByCompanyType,
    MostCommonContractType,
    EmploymentPrediction,
}

impl Insight {
    pub const ALL: [Insight; 6] = [
        Insight::AgeDistribution,
        Insight::GenderProportion,
        Insight::TopStates,
        Insight::MeanTimeToJobByCompanyType,
        Insight::MostCommonContractType,
        Insight::EmploymentPrediction,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Insight::AgeDistribution => "Age Distribution",
            Insight::GenderProportion => "Gender Proportion",
            Insight::TopStates => "Top States",
            Insight::MeanTimeToJobByCompanyType => "Mean Time-to-Job by Company Type",
            Insight::MostCommonContractType => "Most Common Contract Type",
            Insight::EmploymentPrediction => "Employment Prediction",
        }
    }

    /// Short name used on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Insight::AgeDistribution => "age",
            Insight::GenderProportion => "gender",
            Insight::TopStates => "states",
            Insight::MeanTimeToJobByCompanyType => "time-to-job",
            Insight::MostCommonContractType => "contract",
            Insight::EmploymentPrediction => "prediction",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Insight> {
        Insight::ALL.into_iter().find(|i| i.slug() == slug)
    }

    pub fn index(&self) -> usize {
        Insight::ALL
            .iter()
            .position(|i| i == self)
            .unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<Insight> {
        Insight::ALL.get(index).copied()
    }

    pub fn next(&self) -> Insight {
        Insight::ALL[(self.index() + 1) % Insight::ALL.len()]
    }

    pub fn previous(&self) -> Insight {
        Insight::ALL[(self.index() + Insight::ALL.len() - 1) % Insight::ALL.len()]
    }

    /// Chart for a descriptive view; `None` for the prediction view.
    pub fn chart(&self, table: &PreparedTable) -> Option<Chart> {
        let handler: fn(&PreparedTable) -> Chart = match self {
            Insight::AgeDistribution => age_distribution,
            Insight::GenderProportion => gender_proportion,
            Insight::TopStates => top_states,
            Insight::MeanTimeToJobByCompanyType => mean_time_to_job,
            Insight::MostCommonContractType => contract_types,
            Insight::EmploymentPrediction => return None,
        };
        Some(handler(table))
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Pie,
    HorizontalBar,
    VerticalBar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(String, f64)>,
}

impl Chart {
    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, v)| v).sum()
    }

    /// Percentage share of each point, one decimal place.
    pub fn shares(&self) -> Vec<(String, f64)> {
        let total = self.total();
        self.points
            .iter()
            .map(|(label, value)| {
                let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
                (label.clone(), (share * 10.0).round() / 10.0)
            })
            .collect()
    }
}

/// Occurrences of each present value, most frequent first, ties by label.
fn value_counts<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<(String, f64)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    // Stable sort keeps the BTreeMap's label order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count as f64))
        .collect()
}

fn age_distribution(table: &PreparedTable) -> Chart {
    let mut counts = [0usize; AgeBracket::ALL.len()];
    for bracket in table.rows().iter().filter_map(|r| r.age_bracket) {
        counts[bracket as usize] += 1;
    }
    Chart {
        title: "Candidate age distribution (by bracket)".to_string(),
        kind: ChartKind::Pie,
        x_label: "Age bracket".to_string(),
        y_label: "Candidates".to_string(),
        points: AgeBracket::ALL
            .iter()
            .zip(counts)
            .map(|(bracket, count)| (bracket.label().to_string(), count as f64))
            .collect(),
    }
}

fn gender_proportion(table: &PreparedTable) -> Chart {
    Chart {
        title: "Proportion by gender".to_string(),
        kind: ChartKind::Pie,
        x_label: "Gender".to_string(),
        y_label: "Candidates".to_string(),
        points: value_counts(table.rows().iter().map(|r| r.gender.as_deref())),
    }
}

fn top_states(table: &PreparedTable) -> Chart {
    let mut points = value_counts(table.rows().iter().map(|r| r.state.as_deref()));
    points.truncate(TOP_STATES);
    Chart {
        title: "States with the most candidates".to_string(),
        kind: ChartKind::HorizontalBar,
        x_label: "Number of candidates".to_string(),
        y_label: "State".to_string(),
        points,
    }
}

fn mean_time_to_job(table: &PreparedTable) -> Chart {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in table.rows() {
        if let (Some(company), Some(months)) = (row.company_type.as_deref(), row.time_to_job_months) {
            let entry = groups.entry(company).or_insert((0.0, 0));
            entry.0 += months;
            entry.1 += 1;
        }
    }
    let mut points: Vec<(String, f64)> = groups
        .into_iter()
        .map(|(company, (sum, n))| (company.to_string(), sum / n as f64))
        .collect();
    points.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    Chart {
        title: "Mean time to land a job by company type".to_string(),
        kind: ChartKind::HorizontalBar,
        x_label: "Months until hired".to_string(),
        y_label: "Company type".to_string(),
        points,
    }
}

fn contract_types(table: &PreparedTable) -> Chart {
    Chart {
        title: "Most common contract type".to_string(),
        kind: ChartKind::VerticalBar,
        x_label: "Contract type".to_string(),
        y_label: "Number of candidates".to_string(),
        points: value_counts(table.rows().iter().map(|r| r.contract_type.as_deref())),
    }
}
