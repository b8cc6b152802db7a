use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Cross-cutting sink for per-frame pipeline events.
///
/// Keeps orchestration code free of any particular output mechanism.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame measurement (e.g. landmark confidence).
    fn metric(&mut self, name: &str, value: f64);

    /// Count how a frame ended (`rendered`, `no_face`, ...).
    fn outcome(&mut self, outcome: &str);

    fn info(&mut self, message: &str);

    /// Emit an end-of-stream summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn outcome(&mut self, _outcome: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates stage timings, metrics and outcome counts and reports
/// them through `log` at the end of a stream.
pub struct StdoutPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    outcomes: BTreeMap<String, usize>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            outcomes: BTreeMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn frames(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Returns the formatted summary, or `None` if no frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        let frames = self.frames();
        if frames == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!("Try-on summary ({frames} frames, {elapsed_s:.2}s):")];

        let counts: Vec<String> = self
            .outcomes
            .iter()
            .map(|(name, n)| format!("{name} {n}"))
            .collect();
        lines.push(format!("  outcomes: {}", counts.join(", ")));

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, durations) in stages {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!("  {stage:10}: avg {avg_ms:7.2}ms  total {total_ms:8.1}ms"));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, values) in metrics {
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            lines.push(format!("  {name}: avg {avg:.3}  max {max:.3}"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn outcome_count(&self, outcome: &str) -> usize {
        self.outcomes.get(outcome).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn outcome(&mut self, outcome: &str) {
        *self.outcomes.entry(outcome.to_string()).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
