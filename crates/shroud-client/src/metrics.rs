//! Client metrics
//!
//! Labels carry type tags and outcomes only, never values or request ids.
//! No exporter is installed here; the embedding application picks one.

use metrics::{counter, histogram};
use std::time::Duration;

use shroud_core::TypeTag;

pub const OUTCOME_RESOLVED: &str = "resolved";
pub const OUTCOME_TIMED_OUT: &str = "timed_out";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_INVALID: &str = "invalid_plaintext";

pub fn record_key_fetch() {
    counter!("shroud_public_key_fetches_total").increment(1);
}

pub fn record_engine_init(duration: Duration) {
    histogram!("shroud_engine_init_seconds").record(duration.as_secs_f64());
}

pub fn record_encrypt(tag: TypeTag, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("shroud_encrypt_total", "type" => tag.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_input_batch(values: usize, duration: Duration) {
    counter!("shroud_input_batches_total").increment(1);
    histogram!("shroud_input_batch_size").record(values as f64);
    histogram!("shroud_input_batch_seconds").record(duration.as_secs_f64());
}

pub fn record_poll_attempt(transient_error: bool) {
    let kind = if transient_error { "transient_error" } else { "ok" };
    counter!("shroud_decrypt_polls_total", "result" => kind).increment(1);
}

pub fn record_decryption(outcome: &'static str, duration: Duration) {
    counter!("shroud_decryptions_total", "outcome" => outcome).increment(1);
    histogram!("shroud_decryption_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}
