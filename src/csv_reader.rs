use std::fs::File;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::error::{InsightsError, Result};

/// Column headers the survey export must carry, in file order.
pub const COLUMNS: &[&str] = &[
    "idade",
    "genero",
    "estado",
    "conseguiu_emprego",
    "participou_programas_treinamento",
    "possui_estagio",
    "sentiu_preparado",
    "cursos_extras",
    "contatos_profissionais",
    "trabalhos_freelancer",
    "feedbacks_recebidos",
    "tipo_empresa",
    "tempo_ate_emprego",
    "tipo_contrato",
];

/// One survey respondent as it appears in the file. Empty cells are `None`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Record {
    #[serde(rename = "idade")]
    pub age: Option<i64>,
    #[serde(rename = "genero")]
    pub gender: Option<String>,
    #[serde(rename = "estado")]
    pub state: Option<String>,
    #[serde(rename = "conseguiu_emprego")]
    pub got_job: Option<String>,
    #[serde(rename = "participou_programas_treinamento")]
    pub completed_training_program: Option<String>,
    #[serde(rename = "possui_estagio")]
    pub has_internship_experience: Option<String>,
    #[serde(rename = "sentiu_preparado")]
    pub felt_prepared: Option<String>,
    #[serde(rename = "cursos_extras")]
    pub extra_courses: Option<String>,
    #[serde(rename = "contatos_profissionais")]
    pub professional_contacts: Option<u32>,
    #[serde(rename = "trabalhos_freelancer")]
    pub freelance_jobs: Option<u32>,
    #[serde(rename = "feedbacks_recebidos")]
    pub feedback_received: Option<u32>,
    #[serde(rename = "tipo_empresa")]
    pub company_type: Option<String>,
    #[serde(rename = "tempo_ate_emprego")]
    pub time_to_job_months: Option<f64>,
    #[serde(rename = "tipo_contrato")]
    pub contract_type: Option<String>,
}

pub fn read_data(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).map_err(|source| InsightsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(file, path)?;
    tracing::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads comma-delimited UTF-8 records with a header row.
pub fn read_from<R: io::Read>(reader: R) -> Result<Vec<Record>> {
    read_records(reader, Path::new("<reader>"))
}

fn read_records<R: io::Read>(reader: R, origin: &Path) -> Result<Vec<Record>> {
    let csv_error = |err| InsightsError::from_csv(err, origin);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    if let Some(missing) = COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(InsightsError::MalformedInput(format!(
            "required column `{}` is absent",
            missing
        )));
    }

    let mut records = Vec::<Record>::new();
    for result in rdr.deserialize() {
        let record: Record = result.map_err(csv_error)?;
        if let Some(months) = record.time_to_job_months {
            if months < 0.0 || !months.is_finite() {
                return Err(InsightsError::MalformedInput(format!(
                    "record {}: `tempo_ate_emprego` must be a non-negative number, got {}",
                    records.len() + 1,
                    months
                )));
            }
        }
        records.push(record);
    }
    Ok(records)
}
