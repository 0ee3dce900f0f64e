// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - transport: The HTTP seam (reqwest in production, scripted in tests)
// - retry: Exponential backoff schedule with jitter
// - http: Probes one link and decides live / not found / unreachable
//
// This file (mod.rs) is the module root - it re-exports the public API so
// callers can write `checker::Prober` instead of `checker::http::Prober`.
// =============================================================================

mod http;
mod retry;
mod transport;

#[cfg(test)]
pub mod testing;

pub use http::{ProbeDetail, ProbeOutcome, Prober, Verdict};
pub use retry::{jitter, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use transport::{HttpResponse, Method, ReqwestTransport, Transport, TransportError};
