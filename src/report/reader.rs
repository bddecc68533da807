use std::{
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::Context;
use log::debug;
use serde_json::Value;

use super::model::{ReportSnapshot, StressStatus};

/// How a single read resolved.
#[derive(Debug)]
pub enum ReadOutcome {
    Loaded(Value),
    Missing,
    Failed(anyhow::Error),
}

impl ReadOutcome {
    pub fn into_value(self) -> Option<Value> {
        match self {
            ReadOutcome::Loaded(value) => Some(value),
            ReadOutcome::Missing | ReadOutcome::Failed(_) => None,
        }
    }
}

/// Reads the measurement tool's latest report. Every call goes back to disk.
pub struct ReportSource {
    path: PathBuf,
    last_status: Mutex<Option<StressStatus>>,
}

impl ReportSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_status: Mutex::new(None),
        }
    }

    pub fn read_latest(&self) -> Option<Value> {
        self.read_detailed().into_value()
    }

    pub fn read_detailed(&self) -> ReadOutcome {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(err) => {
                let err = anyhow::Error::new(err)
                    .context(format!("Failed to read report {}", self.path.display()));
                debug!("{err:#}");
                return ReadOutcome::Failed(err);
            }
        };

        match serde_json::from_str::<Value>(&contents)
            .with_context(|| format!("Invalid report JSON in {}", self.path.display()))
        {
            Ok(value) => {
                self.note_status(&value);
                ReadOutcome::Loaded(value)
            }
            Err(err) => {
                debug!("{err:#}");
                ReadOutcome::Failed(err)
            }
        }
    }

    /// Logs a summary whenever the stress classification moves.
    fn note_status(&self, value: &Value) {
        let Some(report) = ReportSnapshot::from_value(value) else {
            return;
        };
        let status = report.status();

        let mut last = match self.last_status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *last != Some(status) {
            debug!(
                "Report status {} (score {:.1}, {} alerts{})",
                status.label(),
                report.stress_score(),
                report.alerts.len(),
                if status.pulses() { ", pulsing" } else { "" }
            );
            *last = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_report_is_none() {
        let dir = TempDir::new().unwrap();
        let source = ReportSource::new(dir.path().join("latest.json"));

        assert!(matches!(source.read_detailed(), ReadOutcome::Missing));
        assert!(source.read_latest().is_none());
    }

    #[test]
    fn malformed_reports_are_none() {
        for garbage in ["", "{", "{\"system\": }", "\u{0}\u{1}"] {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("latest.json");
            fs::write(&path, garbage).unwrap();
            let source = ReportSource::new(path);

            assert!(matches!(source.read_detailed(), ReadOutcome::Failed(_)));
            assert!(source.read_latest().is_none());
        }
    }

    #[test]
    fn directory_in_place_of_report_is_none() {
        let dir = TempDir::new().unwrap();
        let source = ReportSource::new(dir.path().to_path_buf());
        assert!(source.read_latest().is_none());
    }

    #[test]
    fn valid_report_is_returned_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latest.json");
        fs::write(&path, r#"{"system":{"stress_score":82.3},"extra":[1]}"#).unwrap();
        let source = ReportSource::new(path);

        let value = source.read_latest().unwrap();
        assert_eq!(value["system"]["stress_score"], 82.3);
        assert_eq!(value["extra"][0], 1);
    }

    #[test]
    fn each_read_sees_the_latest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latest.json");
        let source = ReportSource::new(path.clone());

        fs::write(&path, r#"{"system":{"stress_score":10}}"#).unwrap();
        assert_eq!(source.read_latest().unwrap()["system"]["stress_score"], 10);

        fs::write(&path, r#"{"system":{"stress_score":90}}"#).unwrap();
        assert_eq!(source.read_latest().unwrap()["system"]["stress_score"], 90);

        fs::remove_file(&path).unwrap();
        assert!(source.read_latest().is_none());
    }
}
