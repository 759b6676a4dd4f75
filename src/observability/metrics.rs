use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assign_requests_total: IntCounterVec,
    pub orders_assigned_total: IntCounter,
    pub evictions_total: IntCounterVec,
    pub completions_total: IntCounterVec,
    pub operation_latency_seconds: HistogramVec,
    pub courier_free_weight: GaugeVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assign_requests_total = IntCounterVec::new(
            Opts::new("assign_requests_total", "Assign requests by outcome"),
            &["outcome"],
        )
        .expect("valid assign_requests_total metric");

        let orders_assigned_total =
            IntCounter::new("orders_assigned_total", "Orders handed to couriers")
                .expect("valid orders_assigned_total metric");

        let evictions_total = IntCounterVec::new(
            Opts::new("evictions_total", "Active assignments dropped by sweeps"),
            &["reason"],
        )
        .expect("valid evictions_total metric");

        let completions_total = IntCounterVec::new(
            Opts::new("completions_total", "Completion requests by outcome"),
            &["outcome"],
        )
        .expect("valid completions_total metric");

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of dispatch operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid operation_latency_seconds metric");

        let courier_free_weight = GaugeVec::new(
            Opts::new("courier_free_weight", "Unused carrying capacity per courier"),
            &["courier_id"],
        )
        .expect("valid courier_free_weight metric");

        registry
            .register(Box::new(assign_requests_total.clone()))
            .expect("register assign_requests_total");
        registry
            .register(Box::new(orders_assigned_total.clone()))
            .expect("register orders_assigned_total");
        registry
            .register(Box::new(evictions_total.clone()))
            .expect("register evictions_total");
        registry
            .register(Box::new(completions_total.clone()))
            .expect("register completions_total");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("register operation_latency_seconds");
        registry
            .register(Box::new(courier_free_weight.clone()))
            .expect("register courier_free_weight");

        Self {
            registry,
            assign_requests_total,
            orders_assigned_total,
            evictions_total,
            completions_total,
            operation_latency_seconds,
            courier_free_weight,
        }
    }

    pub fn outcome<T, E>(result: &Result<T, E>) -> &'static str {
        if result.is_ok() { "success" } else { "error" }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
