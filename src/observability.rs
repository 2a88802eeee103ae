use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("converse.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("converse.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("converse.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("converse.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("converse.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("converse.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("converse.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("converse.session.turns");
pub(crate) static SESSION_RESETS: Counter = Counter::new("converse.session.resets");

pub(crate) static CAPABILITY_CALLS: Counter = Counter::new("converse.capability.calls");
pub(crate) static CAPABILITY_ERRORS: Counter = Counter::new("converse.capability.errors");
pub(crate) static CAPABILITY_DURATION: Moments =
    Moments::new("converse.capability.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_RESETS);

    collector.register_counter(&CAPABILITY_CALLS);
    collector.register_counter(&CAPABILITY_ERRORS);
    collector.register_moments(&CAPABILITY_DURATION);
}
