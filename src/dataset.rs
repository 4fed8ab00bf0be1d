//! Prepared survey table: yes/no fields normalized, derived columns added.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::csv_reader::Record;

/// Text used by the survey for an affirmative answer.
pub const YES: &str = "Sim";
/// Text used by the survey for a negative answer.
pub const NO: &str = "Não";

/// Maps the survey's two-valued answer onto `{0, 1}`.
///
/// Anything other than the two recognized strings is missing, never `0`.
pub fn normalize_flag(value: &str) -> Option<u8> {
    match value {
        YES => Some(1),
        NO => Some(0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeBracket {
    From18To24,
    From25To30,
    From31To35,
    From36To40,
    Over40,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 5] = [
        AgeBracket::From18To24,
        AgeBracket::From25To30,
        AgeBracket::From31To35,
        AgeBracket::From36To40,
        AgeBracket::Over40,
    ];

    /// Buckets by the half-open edges (17,24], (24,30], (30,35], (35,40], (40,100].
    pub fn from_age(age: i64) -> Option<AgeBracket> {
        match age {
            18..=24 => Some(AgeBracket::From18To24),
            25..=30 => Some(AgeBracket::From25To30),
            31..=35 => Some(AgeBracket::From31To35),
            36..=40 => Some(AgeBracket::From36To40),
            41..=100 => Some(AgeBracket::Over40),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::From18To24 => "18-24",
            AgeBracket::From25To30 => "25-30",
            AgeBracket::From31To35 => "31-35",
            AgeBracket::From36To40 => "36-40",
            AgeBracket::Over40 => "41+",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record plus the columns derived during preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub raw: Record,
    pub got_job: Option<u8>,
    pub completed_training_program: Option<u8>,
    pub has_internship_experience: Option<u8>,
    pub felt_prepared: Option<u8>,
    pub has_extra_courses: u8,
    pub age_bracket: Option<AgeBracket>,
}

impl Deref for PreparedRecord {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.raw
    }
}

/// Immutable output of [`prepare`]. Same rows, same order as the input.
#[derive(Debug, Clone, Default)]
pub struct PreparedTable {
    rows: Vec<PreparedRecord>,
    unmapped_flags: usize,
}

impl PreparedTable {
    pub fn rows(&self) -> &[PreparedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count of yes/no cells that held an unrecognized value and became missing.
    pub fn unmapped_flags(&self) -> usize {
        self.unmapped_flags
    }
}

pub fn prepare(records: Vec<Record>) -> PreparedTable {
    let mut unmapped_flags = 0usize;
    let mut flag = |value: &Option<String>| -> Option<u8> {
        let value = value.as_deref()?;
        let mapped = normalize_flag(value);
        if mapped.is_none() {
            unmapped_flags += 1;
        }
        mapped
    };

    let rows: Vec<PreparedRecord> = records
        .into_iter()
        .map(|raw| PreparedRecord {
            got_job: flag(&raw.got_job),
            completed_training_program: flag(&raw.completed_training_program),
            has_internship_experience: flag(&raw.has_internship_experience),
            felt_prepared: flag(&raw.felt_prepared),
            has_extra_courses: u8::from(raw.extra_courses.as_deref().is_some_and(|s| !s.is_empty())),
            age_bracket: raw.age.and_then(AgeBracket::from_age),
            raw,
        })
        .collect();

    if unmapped_flags > 0 {
        tracing::warn!(
            "{} yes/no cells held a value other than {:?}/{:?}; treated as missing",
            unmapped_flags,
            YES,
            NO
        );
    }
    tracing::debug!("Prepared {} rows", rows.len());

    PreparedTable {
        rows,
        unmapped_flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: Option<i64>, got_job: Option<&str>, courses: Option<&str>) -> Record {
        Record {
            age,
            got_job: got_job.map(str::to_string),
            extra_courses: courses.map(str::to_string),
            ..Record::default()
        }
    }

    #[test]
    fn flag_mapping_is_total_only_over_yes_and_no() {
        assert_eq!(normalize_flag("Sim"), Some(1));
        assert_eq!(normalize_flag("Não"), Some(0));
        for other in ["sim", "Nao", "NÃO", " Sim", "", "Talvez", "0"] {
            assert_eq!(normalize_flag(other), None, "{:?} should be missing", other);
        }
    }

    #[test]
    fn age_brackets_at_edges() {
        assert_eq!(AgeBracket::from_age(-1), None);
        assert_eq!(AgeBracket::from_age(17), None);
        assert_eq!(AgeBracket::from_age(18), Some(AgeBracket::From18To24));
        assert_eq!(AgeBracket::from_age(24), Some(AgeBracket::From18To24));
        assert_eq!(AgeBracket::from_age(25), Some(AgeBracket::From25To30));
        assert_eq!(AgeBracket::from_age(30), Some(AgeBracket::From25To30));
        assert_eq!(AgeBracket::from_age(35), Some(AgeBracket::From31To35));
        assert_eq!(AgeBracket::from_age(40), Some(AgeBracket::From36To40));
        assert_eq!(AgeBracket::from_age(41), Some(AgeBracket::Over40));
        assert_eq!(AgeBracket::from_age(100), Some(AgeBracket::Over40));
        assert_eq!(AgeBracket::from_age(101), None);
    }

    #[test]
    fn age_brackets_cover_declared_range_once() {
        for age in 18..=100 {
            assert!(AgeBracket::from_age(age).is_some(), "age {} unclassified", age);
        }
        let labels: Vec<&str> = AgeBracket::ALL.iter().map(AgeBracket::label).collect();
        assert_eq!(labels, ["18-24", "25-30", "31-35", "36-40", "41+"]);
    }

    #[test]
    fn prepare_preserves_rows_and_derives_columns() {
        let table = prepare(vec![
            record(Some(24), Some("Sim"), Some("Rust")),
            record(Some(101), Some("Talvez"), Some("")),
            record(None, None, None),
        ]);

        assert_eq!(table.len(), 3);
        let rows = table.rows();
        assert_eq!(rows[0].got_job, Some(1));
        assert_eq!(rows[0].has_extra_courses, 1);
        assert_eq!(rows[0].age_bracket, Some(AgeBracket::From18To24));

        assert_eq!(rows[1].got_job, None);
        assert_eq!(rows[1].has_extra_courses, 0);
        assert_eq!(rows[1].age_bracket, None);
        assert_eq!(rows[1].age, Some(101));

        assert_eq!(rows[2].got_job, None);
        assert_eq!(rows[2].has_extra_courses, 0);
        assert_eq!(table.unmapped_flags(), 1);
    }
}
