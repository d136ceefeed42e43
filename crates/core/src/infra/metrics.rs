use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::error::ErrorCode;

const MAX_LATENCIES: usize = 500;

/// プロセス内メトリクス
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    presets_saved: u64,
    presets_loaded: u64,
    presets_deleted: u64,
    sync_direct: u64,
    sync_fallback: u64,
    sync_failed: u64,
    errors_folder: u64,
    errors_storage: u64,
    errors_other: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub request: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub presets_saved: u64,
    pub presets_loaded: u64,
    pub presets_deleted: u64,
    pub sync: SyncCounts,
    pub error_counts: ErrorCounts,
    pub avg_request_ms: Option<f64>,
    pub recent_requests: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncCounts {
    pub direct: u64,
    pub fallback: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub folder: u64,
    pub storage: u64,
    pub other: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_presets_saved(&self) {
        self.counters.lock().presets_saved += 1;
    }

    pub fn inc_presets_loaded(&self) {
        self.counters.lock().presets_loaded += 1;
    }

    pub fn inc_presets_deleted(&self, count: u64) {
        self.counters.lock().presets_deleted += count;
    }

    /// 同期ブロードキャスト1回分の配信結果
    pub fn record_sync(&self, direct: u64, fallback: u64, failed: u64) {
        let mut c = self.counters.lock();
        c.sync_direct += direct;
        c.sync_fallback += fallback;
        c.sync_failed += failed;
    }

    pub fn inc_error(&self, code: ErrorCode) {
        let mut c = self.counters.lock();
        match code {
            ErrorCode::Folder => c.errors_folder += 1,
            ErrorCode::Storage => c.errors_storage += 1,
            _ => c.errors_other += 1,
        }
    }

    pub fn record_latency(&self, request: &str, duration_ms: u64) {
        let record = LatencyRecord {
            request: request.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        if latencies.len() > MAX_LATENCIES {
            let excess = latencies.len() - MAX_LATENCIES;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg_request_ms = if latencies.is_empty() {
            None
        } else {
            let total: u64 = latencies.iter().map(|r| r.duration_ms).sum();
            Some(total as f64 / latencies.len() as f64)
        };

        MetricsSummary {
            presets_saved: c.presets_saved,
            presets_loaded: c.presets_loaded,
            presets_deleted: c.presets_deleted,
            sync: SyncCounts {
                direct: c.sync_direct,
                fallback: c.sync_fallback,
                failed: c.sync_failed,
            },
            error_counts: ErrorCounts {
                folder: c.errors_folder,
                storage: c.errors_storage,
                other: c.errors_other,
            },
            avg_request_ms,
            recent_requests: latencies.iter().rev().take(20).cloned().collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
