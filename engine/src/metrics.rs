use crate::{error::AppError, types::MetricsResponse};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

pub struct Metrics {
    latency: Mutex<Histogram<u64>>, // micros
    started: Instant,
    total_requests: AtomicU64,
    phishing_verdicts: AtomicU64,
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let histogram = Histogram::new(3).map_err(|e| AppError::Internal(format!("latency histogram: {}", e)))?;
        Ok(Self {
            latency: Mutex::new(histogram),
            started: Instant::now(),
            total_requests: AtomicU64::new(0),
            phishing_verdicts: AtomicU64::new(0),
        })
    }

    pub fn observe_request(&self, dur: Duration, is_phishing: bool) {
        let micros = dur.as_micros().min(u64::MAX as u128) as u64;
        // auto-resizing histogram, recording cannot go out of range
        let _ = self.latency.lock().record(micros.max(1));
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_phishing {
            self.phishing_verdicts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsResponse {
        let h = self.latency.lock();
        let quantile_ms = |q: f64| h.value_at_quantile(q) as f64 / 1000.0;

        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed().as_secs_f64().max(1.0);

        MetricsResponse {
            total_requests,
            phishing_verdicts: self.phishing_verdicts.load(Ordering::Relaxed),
            qps: total_requests as f64 / elapsed,
            p50_ms: quantile_ms(0.50),
            p95_ms: quantile_ms(0.95),
            p99_ms: quantile_ms(0.99),
        }
    }
}
