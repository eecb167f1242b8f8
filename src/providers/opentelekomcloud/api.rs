//! Typed calls against the individual Open Telekom Cloud services.
//!
//! Each submodule extends [`OtcClient`](super::OtcClient) with the requests
//! of one service and unwraps that service's response envelopes.

mod compute;
mod identity;
mod ims;
mod kms;
mod lbaas;
mod lts;
mod networking;
mod sfs;
