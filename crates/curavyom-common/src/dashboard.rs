//! Canned data behind the "Mission Control" dashboard and the use-case report.
//! Nothing here is computed; the numbers are the demo's sample series.

use serde::{Deserialize, Serialize};

use crate::confidence::{canned_radar, RadarAxis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialPoint {
    pub month: String,
    pub trials: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentPoint {
    pub year: String,
    pub granted: u32,
    pub pending: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemGauge {
    pub label: String,
    pub value: String,
}

/// A repurposing indication with its headline confidence (use-case page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indication {
    pub name: String,
    pub confidence_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub active_analysis: String,
    pub metrics: Vec<Metric>,
    pub gauges: Vec<SystemGauge>,
    pub trials: Vec<TrialPoint>,
    pub radar: Vec<RadarAxis>,
    pub patents: Vec<PatentPoint>,
    pub indications: Vec<Indication>,
}

impl DashboardData {
    pub fn canned() -> Self {
        let trials = [("Jan", 4), ("Feb", 7), ("Mar", 5), ("Apr", 12), ("May", 18), ("Jun", 25)]
            .iter()
            .map(|(month, trials)| TrialPoint { month: month.to_string(), trials: *trials })
            .collect();

        let patents = [("2020", 12, 5), ("2021", 18, 8), ("2022", 25, 12), ("2023", 35, 15), ("2024", 42, 20)]
            .iter()
            .map(|(year, granted, pending)| PatentPoint {
                year: year.to_string(),
                granted: *granted,
                pending: *pending,
            })
            .collect();

        let metrics = [
            ("Clinical Trials Scanned", "50,240", "+12% this week"),
            ("Patents Analyzed", "12,890", "Updated 2h ago"),
            ("Confidence Score", "94.2%", "High Potential"),
            ("Risk Factor", "Low", "Safety Profile: A"),
        ]
        .iter()
        .map(|(label, value, trend)| Metric {
            label: label.to_string(),
            value: value.to_string(),
            trend: trend.to_string(),
        })
        .collect();

        let gauges = [("CPU Load", "12%"), ("Tokens", "8.4k/s"), ("Latency", "24ms")]
            .iter()
            .map(|(label, value)| SystemGauge { label: label.to_string(), value: value.to_string() })
            .collect();

        let indications = [
            ("Neuroprotection / Alzheimer's", 92),
            ("Anti-Aging / Longevity", 85),
            ("Oncology Adjunct", 78),
        ]
        .iter()
        .map(|(name, pct)| Indication { name: name.to_string(), confidence_pct: *pct })
        .collect();

        Self {
            active_analysis: "Metformin (C4H11N5)".to_string(),
            metrics,
            gauges,
            trials,
            radar: canned_radar(),
            patents,
            indications,
        }
    }

    pub fn total_trials(&self) -> u32 {
        self.trials.iter().map(|p| p.trials).sum()
    }
}
