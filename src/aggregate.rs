#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Cohort-level collection and export of grades.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use uuid::Uuid;

use crate::{
    constants::{CSV_FEEDBACK_TRUNCATE, GRADES_CSV_FILENAME, GRADES_SUMMARY_FILENAME},
    error::GraderError,
    grade::GradeResult,
    util::{find_files, truncate_chars, write_json},
};

/// Summary statistics over a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    /// Mean total score.
    pub average_score:        f64,
    /// Maximum possible score.
    pub max_possible:         f64,
    /// Best total score.
    pub highest_score:        f64,
    /// Worst total score.
    pub lowest_score:         f64,
    /// Number of submissions whose tests passed.
    pub tests_passed_count:   usize,
    /// Share of submissions whose tests passed, in percent.
    pub tests_passed_percent: f64,
}

impl CohortStatistics {
    /// Statistics over `grades`, or `None` for an empty cohort.
    pub fn compute(grades: &[GradeResult]) -> Option<Self> {
        let first = grades.first()?;
        let count = grades.len() as f64;
        let scores = grades.iter().map(|g| g.total_score);
        let passed = grades.iter().filter(|g| g.code_execution_passed).count();

        Some(Self {
            average_score:        scores.clone().sum::<f64>() / count,
            max_possible:         first.max_score,
            highest_score:        scores.clone().fold(f64::NEG_INFINITY, f64::max),
            lowest_score:         scores.fold(f64::INFINITY, f64::min),
            tests_passed_count:   passed,
            tests_passed_percent: passed as f64 / count * 100.0,
        })
    }
}

/// Writes `None` as `{}`.
fn statistics_or_empty<S: Serializer>(
    stats: &Option<CohortStatistics>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match stats {
        Some(stats) => stats.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Reads `{}` as `None`.
fn empty_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<CohortStatistics>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// The cohort summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradesSummary {
    /// When the run started.
    pub timestamp:      String,
    /// Identifier of the run that wrote the summary.
    #[serde(default)]
    pub run_id:         Option<Uuid>,
    /// Number of records.
    pub total_students: usize,
    /// Cohort statistics; `{}` when there are no records.
    #[serde(serialize_with = "statistics_or_empty", deserialize_with = "empty_as_none", default)]
    pub statistics:     Option<CohortStatistics>,
    /// All records in canonical order.
    pub grades:         Vec<GradeResult>,
}

/// Files written by [`Aggregator::finalize`].
#[derive(Debug, Clone, Default)]
pub struct SavedFiles {
    /// Per-student records that were written.
    pub records: Vec<PathBuf>,
    /// The cohort summary.
    pub summary: PathBuf,
    /// The CSV export, absent for an empty cohort.
    pub csv:     Option<PathBuf>,
}

/// Collects grades during a run and writes them out at the end.
#[derive(Debug)]
pub struct Aggregator {
    /// Destination directory.
    output_dir: PathBuf,
    /// Grades appended so far.
    grades:     Vec<GradeResult>,
    /// Run start time, ISO 8601.
    timestamp:  String,
    /// Run identifier.
    run_id:     Uuid,
}

/// Orders records by repository, then student id. Stable.
pub fn sort_grades(grades: &mut [GradeResult]) {
    grades.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

impl Aggregator {
    /// An empty aggregator writing to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_grades(output_dir, Vec::new())
    }

    /// An aggregator seeded with existing records, e.g. after a manual edit.
    pub fn with_grades(output_dir: impl Into<PathBuf>, grades: Vec<GradeResult>) -> Self {
        Self {
            output_dir: output_dir.into(),
            grades,
            timestamp: Local::now().to_rfc3339(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Appends one grade.
    pub fn add(&mut self, grade: GradeResult) {
        self.grades.push(grade);
    }

    /// Grades appended so far, in insertion order until finalized.
    pub fn grades(&self) -> &[GradeResult] {
        &self.grades
    }

    /// Destination directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Statistics over the current grades.
    pub fn statistics(&self) -> Option<CohortStatistics> {
        CohortStatistics::compute(&self.grades)
    }

    /// The summary as it would be written now.
    pub fn summary(&self) -> GradesSummary {
        GradesSummary {
            timestamp:      self.timestamp.clone(),
            run_id:         Some(self.run_id),
            total_students: self.grades.len(),
            statistics:     self.statistics(),
            grades:         self.grades.clone(),
        }
    }

    /// Sorts the grades and writes per-student records, the summary and
    /// the CSV export.
    ///
    /// A record that cannot be written is logged and skipped; the summary
    /// and CSV are still attempted.
    pub fn finalize(&mut self) -> Result<SavedFiles> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Could not create grades directory {}", self.output_dir.display())
        })?;
        sort_grades(&mut self.grades);

        let mut records = Vec::with_capacity(self.grades.len());
        for grade in &self.grades {
            match save_record(&self.output_dir, grade) {
                Ok(path) => records.push(path),
                Err(e) => tracing::warn!(student = %grade.student_id, "{e}"),
            }
        }

        let summary = self.output_dir.join(GRADES_SUMMARY_FILENAME);
        write_json(&summary, &self.summary())?;

        let csv = if self.grades.is_empty() {
            None
        } else {
            let path = self.output_dir.join(GRADES_CSV_FILENAME);
            write_csv(&path, &self.grades)?;
            Some(path)
        };

        Ok(SavedFiles {
            records,
            summary,
            csv,
        })
    }
}

/// Writes `<dir>/<student_id>.json`.
pub fn save_record(dir: &Path, grade: &GradeResult) -> Result<PathBuf, GraderError> {
    let path = dir.join(format!("{}.json", grade.student_id));
    match write_json(&path, grade) {
        Ok(()) => Ok(path),
        Err(source) => Err(GraderError::Persistence { path, source }),
    }
}

/// Writes the tabular export. Section columns follow the first record.
pub fn write_csv(path: &Path, grades: &[GradeResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Could not create {}", path.display()))?;

    let mut header: Vec<String> =
        ["student_id", "total_score", "max_score", "percentage", "tests_passed", "github_repo"]
            .into_iter()
            .map(String::from)
            .collect();
    if let Some(first) = grades.first() {
        header.extend(first.sections.iter().map(|s| s.section_name.clone()));
    }
    header.push("overall_feedback".to_string());
    writer.write_record(&header)?;

    for grade in grades {
        let percentage = if grade.max_score > 0.0 {
            format!("{:.1}%", grade.percentage())
        } else {
            "0%".to_string()
        };

        let mut row = vec![
            grade.student_id.clone(),
            grade.total_score.to_string(),
            grade.max_score.to_string(),
            percentage,
            if grade.code_execution_passed { "Yes" } else { "No" }.to_string(),
            grade.github_repo.clone().unwrap_or_default(),
        ];
        row.extend(
            grade
                .sections
                .iter()
                .map(|s| format!("{}/{}", s.points_earned, s.max_points)),
        );
        row.push(truncate_chars(&grade.overall_feedback, CSV_FEEDBACK_TRUNCATE).to_string());
        writer.write_record(&row)?;
    }

    writer
        .flush()
        .with_context(|| format!("Could not write {}", path.display()))
}

/// Reads one record file.
fn read_record(path: &Path) -> Result<GradeResult> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Could not parse {}", path.display()))
}

/// Loads previously written grades in canonical order.
///
/// The summary file is authoritative when present; otherwise every record
/// file in the directory is read and unreadable ones are skipped.
pub fn load_grades_from_dir(dir: &Path) -> Result<Vec<GradeResult>> {
    let summary_path = dir.join(GRADES_SUMMARY_FILENAME);

    let mut grades = if summary_path.is_file() {
        let text = fs::read_to_string(&summary_path)
            .with_context(|| format!("Could not read {}", summary_path.display()))?;
        let summary: GradesSummary = serde_json::from_str(&text)
            .with_context(|| format!("Could not parse {}", summary_path.display()))?;
        summary.grades
    } else {
        find_files("json", 0, dir)?
            .into_iter()
            .filter(|path| path.file_name().is_some_and(|n| n != GRADES_SUMMARY_FILENAME))
            .filter_map(|path| match read_record(&path) {
                Ok(grade) => Some(grade),
                Err(e) => {
                    tracing::warn!("Skipping {}: {e:#}", path.display());
                    None
                }
            })
            .collect()
    };

    sort_grades(&mut grades);
    Ok(grades)
}
