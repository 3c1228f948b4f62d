use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::{Registry, Unit},
};
use tokio::time;

#[derive(Clone, Debug)]
pub struct AdmissionMetrics {
    requests: Family<OutcomeLabels, Counter>,
    duration: Histogram,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub(crate) enum Outcome {
    /// Init containers were injected.
    Patched,
    /// The pod was admitted unchanged.
    Unchanged,
    /// The request was not a pod creation.
    Skipped,
    /// The request could not be decoded.
    Invalid,
    /// A lookup, the deadline, or patch encoding failed.
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: Outcome,
}

// === impl AdmissionMetrics ===

impl AdmissionMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::<OutcomeLabels, Counter>::default();
        reg.register(
            "requests",
            "Total number of admission requests handled, by outcome",
            requests.clone(),
        );

        // Decisions are bounded by the decision timeout, 10s by default.
        let duration = Histogram::new([0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 10.0]);
        reg.register_with_unit(
            "decision_duration",
            "Histogram of the time taken to decide on pod creations",
            Unit::Seconds,
            duration.clone(),
        );

        Self { requests, duration }
    }

    pub(crate) fn observe(&self, outcome: Outcome) {
        self.requests.get_or_create(&OutcomeLabels { outcome }).inc();
    }

    pub(crate) fn observe_decision(&self, start: time::Instant) {
        self.duration.observe(start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_outcomes() {
        let mut reg = Registry::default();
        let metrics = AdmissionMetrics::register(reg.sub_registry_with_prefix("admission"));
        metrics.observe(Outcome::Patched);
        metrics.observe(Outcome::Patched);
        metrics.observe(Outcome::Error);

        let mut out = String::new();
        prometheus_client::encoding::text::encode(&mut out, &reg).expect("metrics must encode");
        assert!(
            out.contains(r#"admission_requests_total{outcome="Patched"} 2"#),
            "{out}"
        );
        assert!(
            out.contains(r#"admission_requests_total{outcome="Error"} 1"#),
            "{out}"
        );
    }
}
