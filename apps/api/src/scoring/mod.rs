// Resume scoring: fingerprinting, the AI scorer seam, and the cache-then-bill gateway.
// All model calls go through llm_client; handlers only talk to the gateway.

pub mod fingerprint;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod scorer;

#[cfg(test)]
pub mod testing;
