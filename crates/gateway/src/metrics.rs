use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Request counters and latency for `POST /predict`.
///
/// Backed by the global meter provider, so recording is a no-op until
/// `common::TelemetryGuard` installs an exporter.
#[derive(Clone)]
pub struct PredictMetrics {
    requests: Counter<u64>,
    detections: Counter<u64>,
    duration: Histogram<f64>,
}

impl PredictMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0, 10.0, 15.0,
        ];

        let requests = meter
            .u64_counter("predict_requests_total")
            .with_description("Prediction requests by outcome")
            .build();
        let detections = meter
            .u64_counter("predict_detections_total")
            .with_description("Total detections returned")
            .build();
        let duration = meter
            .f64_histogram("predict_duration_seconds")
            .with_description("Time to serve a prediction request end to end")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();

        Self {
            requests,
            detections,
            duration,
        }
    }

    /// `outcome` is `ok` or the failed stage.
    pub fn record(&self, outcome: &'static str, elapsed: Duration, detections: usize) {
        let attributes = [KeyValue::new("outcome", outcome)];
        self.requests.add(1, &attributes);
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        if detections > 0 {
            self.detections.add(detections as u64, &[]);
        }
    }
}
