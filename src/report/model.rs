use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lenient typed view over a `stress_control` report. Every field is optional
/// so older or partial reports still deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSnapshot {
    pub time: Option<String>,
    pub report_version: Option<String>,
    pub sampling: Option<Sampling>,
    pub host: Option<HostFacts>,
    pub system: Option<SystemSummary>,
    pub top_processes: Vec<ProcessStats>,
    pub alerts: Vec<ProcessAlert>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sampling {
    pub samples: Option<u64>,
    pub interval_sec: Option<f64>,
    pub method: Option<String>,
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFacts {
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_cores: Option<u32>,
    pub memory_total: Option<u64>,
    pub is_wsl: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSummary {
    pub cpu_avg: Option<f64>,
    pub mem_avg: Option<f64>,
    pub stress_score: Option<f64>,
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessStats {
    pub pid: Option<u32>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub cpu_avg: Option<f64>,
    pub cpu_peak: Option<f64>,
    pub mem_avg: Option<f64>,
    pub mem_peak: Option<f64>,
    pub samples: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessAlert {
    pub pid: Option<u32>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub cpu_avg: Option<f64>,
    pub mem_avg: Option<f64>,
    pub cpu_peak: Option<f64>,
    pub mem_peak: Option<f64>,
    pub reasons: Vec<String>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trend {
    pub summary: Option<String>,
}

impl ReportSnapshot {
    /// `None` when the value does not have the report's shape at all.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Missing scores count as zero, matching the empty dynamic panel.
    pub fn stress_score(&self) -> f64 {
        self.system
            .as_ref()
            .and_then(|system| system.stress_score)
            .unwrap_or(0.0)
    }

    pub fn status(&self) -> StressStatus {
        StressStatus::classify(self.stress_score())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StressStatus {
    Ok,
    Caution,
    Warn,
    Danger,
}

impl StressStatus {
    pub fn classify(score: f64) -> Self {
        if score <= 30.0 {
            StressStatus::Ok
        } else if score <= 55.0 {
            StressStatus::Caution
        } else if score <= 75.0 {
            StressStatus::Warn
        } else {
            StressStatus::Danger
        }
    }

    /// Whether the dynamic panel should draw attention to itself.
    pub fn pulses(self) -> bool {
        matches!(self, StressStatus::Warn | StressStatus::Danger)
    }

    pub fn label(self) -> &'static str {
        match self {
            StressStatus::Ok => "OK",
            StressStatus::Caution => "CAUTION",
            StressStatus::Warn => "WARN",
            StressStatus::Danger => "DANGER",
        }
    }
}
