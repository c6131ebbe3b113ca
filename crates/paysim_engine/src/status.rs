//! Static health and stage-profile payloads.
//!
//! Neither payload looks at the store; both describe the simulated
//! deployment as a whole.

use chrono::{DateTime, Utc};
use paysim_model::{StageMetrics, TransactionStatus};
use serde::Serialize;

const PIPELINE_VERSION: &str = "1.0.0";
const PIPELINE_UPTIME: &str = "99.9%";

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Always `ok`.
    pub status: &'static str,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Per-service state.
    pub services: ServiceHealth,
}

/// Per-service state in a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    /// The simulation itself.
    pub pipeline: &'static str,
    /// Backing store, which is only simulated.
    pub database: &'static str,
    /// Cache, which is only simulated.
    pub cache: &'static str,
}

/// Builds the health report.
#[must_use]
pub const fn health(now: DateTime<Utc>) -> HealthReport {
    HealthReport {
        status: "ok",
        timestamp: now,
        services: ServiceHealth {
            pipeline: "healthy",
            database: "simulated",
            cache: "simulated",
        },
    }
}

/// Nominal latency and success rate of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProfile {
    /// Nominal latency in milliseconds.
    pub avg_latency: u64,
    /// Nominal success rate in percent.
    pub success_rate: u8,
}

impl StageProfile {
    fn nominal(stage: TransactionStatus) -> Self {
        let metrics = StageMetrics::nominal(stage);
        Self {
            avg_latency: metrics.avg_latency,
            success_rate: metrics.success_rate,
        }
    }
}

/// Stage profiles keyed by stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageProfiles {
    /// Intake.
    pub initiated: StageProfile,
    /// Fraud scoring.
    pub fraud_check: StageProfile,
    /// Balance verification.
    pub balance_verify: StageProfile,
    /// Processing.
    pub processing: StageProfile,
    /// Settlement.
    pub settlement: StageProfile,
}

/// Deployment summary in a [`StageProfileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    /// Always `healthy`.
    pub status: &'static str,
    /// Advertised uptime.
    pub uptime: &'static str,
    /// Advertised version.
    pub version: &'static str,
}

/// Nominal per-stage figures of the simulated deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageProfileReport {
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Deployment summary.
    pub pipeline: PipelineSummary,
    /// Per-stage figures.
    pub stages: StageProfiles,
}

/// Builds the stage-profile report.
#[must_use]
pub fn stage_profile(now: DateTime<Utc>) -> StageProfileReport {
    StageProfileReport {
        timestamp: now,
        pipeline: PipelineSummary {
            status: "healthy",
            uptime: PIPELINE_UPTIME,
            version: PIPELINE_VERSION,
        },
        stages: StageProfiles {
            initiated: StageProfile::nominal(TransactionStatus::Initiated),
            fraud_check: StageProfile::nominal(TransactionStatus::FraudCheck),
            balance_verify: StageProfile::nominal(TransactionStatus::BalanceVerify),
            processing: StageProfile::nominal(TransactionStatus::Processing),
            settlement: StageProfile::nominal(TransactionStatus::Settlement),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn health_payload() {
        let value = serde_json::to_value(health(now())).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "ok",
                "timestamp": "2023-11-14T22:13:20Z",
                "services": {
                    "pipeline": "healthy",
                    "database": "simulated",
                    "cache": "simulated",
                },
            })
        );
    }

    #[test]
    fn stage_profile_payload() {
        let value = serde_json::to_value(stage_profile(now())).unwrap();
        assert_eq!(value["pipeline"]["uptime"], "99.9%");
        assert_eq!(value["pipeline"]["version"], "1.0.0");
        assert_eq!(
            value["stages"],
            json!({
                "initiated": { "avgLatency": 100, "successRate": 100 },
                "fraud_check": { "avgLatency": 500, "successRate": 92 },
                "balance_verify": { "avgLatency": 250, "successRate": 95 },
                "processing": { "avgLatency": 650, "successRate": 98 },
                "settlement": { "avgLatency": 1250, "successRate": 99 },
            })
        );
    }

    #[test]
    fn stage_keys_keep_pipeline_order() {
        let text = serde_json::to_string(&stage_profile(now()).stages).unwrap();
        let keys = [
            "initiated",
            "fraud_check",
            "balance_verify",
            "processing",
            "settlement",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .filter_map(|key| text.find(&format!("\"{key}\"")))
            .collect();
        assert_eq!(positions.len(), 5);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
