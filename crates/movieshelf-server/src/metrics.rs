use movieshelf_core::Result;
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};
use std::future::Future;

pub static OPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "movieshelf_ops_total",
        "Catalog operations by result",
        &["op", "result"]
    )
    .unwrap()
});

pub static OP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "movieshelf_op_duration_seconds",
        "Catalog operation latency",
        &["op"]
    )
    .unwrap()
});

/// Time `fut` and count its outcome under `op`.
pub async fn track<T>(op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let timer = OP_DURATION.with_label_values(&[op]).start_timer();
    let out = fut.await;
    timer.observe_duration();
    let result = match &out {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    OPS_TOTAL.with_label_values(&[op, result]).inc();
    out
}
