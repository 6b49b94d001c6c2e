//! Remote lookup client split across focused submodules:
//! - `record`: population codes and response record parsing
//! - `options`: HTTP/retry tunables
//! - `retry`: bounded exponential-backoff loop
//! - `http`: reqwest client plus the `FrequencyClient` trait

pub mod http;
pub mod options;
pub mod record;
pub mod retry;
