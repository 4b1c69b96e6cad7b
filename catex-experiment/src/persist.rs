//! Incremental result persistence.
//!
//! The runner hands each finished segment to a [`ResultSink`]. The CSV sink
//! appends one row per trial and writes the header only when the file is
//! new or empty, so a session that crashes after segment 3 keeps segments
//! 1-3 on disk.

use crate::config::ExperimentConfig;
use crate::error::ExperimentError;
use crate::participant::Participant;
use catex_core::TrialResult;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub trait ResultSink {
    fn write_segment(&mut self, segment: u32, rows: &[TrialResult]) -> Result<(), ExperimentError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn write_segment(&mut self, segment: u32, rows: &[TrialResult]) -> Result<(), ExperimentError> {
        (**self).write_segment(segment, rows)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn write_segment(&mut self, segment: u32, rows: &[TrialResult]) -> Result<(), ExperimentError> {
        (**self).write_segment(segment, rows)
    }
}

/// Discards everything (practice sessions).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn write_segment(
        &mut self,
        _segment: u32,
        _rows: &[TrialResult],
    ) -> Result<(), ExperimentError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    include_distractor: bool,
    rows_written: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, include_distractor: bool) -> Self {
        Self {
            path: path.into(),
            include_distractor,
            rows_written: 0,
        }
    }

    /// `<output_dir>/<name>_<number><suffix>.csv`, with both identity parts
    /// reduced to filename-safe characters.
    pub fn for_participant(config: &ExperimentConfig, participant: &Participant) -> Self {
        let file = format!("{}{}.csv", participant.file_stem(), config.output_suffix);
        Self::new(config.output_dir.join(file), config.is_flanker())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn header(&self) -> String {
        let mut cols = vec!["segment", "trial", "correct_category"];
        if self.include_distractor {
            cols.push("distractor_category");
        }
        cols.extend(["observed_category", "reaction_time_s", "outcome"]);
        cols.join(",")
    }

    fn row(&self, r: &TrialResult) -> String {
        let mut fields = vec![
            r.segment.to_string(),
            r.trial_id.to_string(),
            csv_field(r.correct_category.as_str()),
        ];
        if self.include_distractor {
            fields.push(
                r.distractor_category
                    .as_ref()
                    .map(|c| csv_field(c.as_str()))
                    .unwrap_or_default(),
            );
        }
        fields.push(csv_field(r.observed.label()));
        fields.push(
            r.reaction_time()
                .map(|d| format!("{:.6}", d.as_secs_f64()))
                .unwrap_or_default(),
        );
        fields.push(r.outcome.label().to_string());
        fields.join(",")
    }

    fn append(&self, rows: &[TrialResult]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if needs_header {
            writeln!(writer, "{}", self.header())?;
        }
        for r in rows {
            writeln!(writer, "{}", self.row(r))?;
        }
        writer.flush()
    }
}

impl ResultSink for CsvSink {
    fn write_segment(&mut self, segment: u32, rows: &[TrialResult]) -> Result<(), ExperimentError> {
        self.append(rows).map_err(|source| ExperimentError::Persist {
            path: self.path.clone(),
            source,
        })?;
        self.rows_written += rows.len();
        info!(segment, rows = rows.len(), path = %self.path.display(), "segment saved");
        Ok(())
    }
}

/// Quotes a field when it would otherwise break the row.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catex_core::{AssetRef, Category, Key, Observed, Trial};
    use tempfile::TempDir;

    fn result(
        id: usize,
        segment: u32,
        correct: &str,
        observed: Observed,
        rt_ms: Option<u64>,
    ) -> TrialResult {
        let trial = Trial {
            id,
            category: Category::new(correct),
            distractor_category: Some(Category::new("angry")),
            stimulus: AssetRef::new(Category::new(correct), "x.png"),
            distractor: None,
        };
        TrialResult::new(&trial, segment, observed, rt_ms.map(|ms| ms * 1_000_000))
    }

    #[test]
    fn header_written_once_across_segments() {
        let tmp = TempDir::new().unwrap();
        let mut sink = CsvSink::new(tmp.path().join("p_1_results.csv"), false);

        let happy = Observed::Category(Category::new("happy"));
        sink.write_segment(1, &[result(0, 1, "happy", happy, Some(300))])
            .unwrap();
        sink.write_segment(2, &[result(1, 2, "neutral", Observed::NoResponse, None)])
            .unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "segment,trial,correct_category,observed_category,reaction_time_s,outcome",
                "1,0,happy,happy,0.300000,Correct",
                "2,1,neutral,No Response,,No Response",
            ]
        );
        assert_eq!(sink.rows_written(), 2);
    }

    #[test]
    fn existing_file_is_appended_without_new_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("r.csv");
        let rows = [result(0, 1, "circle", Observed::Unmapped(Key::Char('q')), Some(120))];

        CsvSink::new(&path, true).write_segment(1, &rows).unwrap();
        CsvSink::new(&path, true).write_segment(1, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("segment,").count(), 1);
        assert!(text.lines().next().unwrap().contains("distractor_category"));
        assert_eq!(text.lines().nth(1).unwrap(), "1,0,circle,angry,Unmapped,0.120000,Incorrect");
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn participant_file_name_is_sanitised() {
        let mut config = ExperimentConfig::flanker();
        config.output_dir = PathBuf::from("data");
        let participant = Participant::new("../Ann Lee", "07/b");
        let sink = CsvSink::for_participant(&config, &participant);
        assert_eq!(sink.path(), Path::new("data/___Ann_Lee_07_b_exp2_results.csv"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
