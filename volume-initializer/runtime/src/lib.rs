#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use volume_initializer_core as core;
pub use volume_initializer_k8s_api as k8s;

mod admission;
mod args;
mod lookup;
mod metrics;

pub use self::{
    admission::Admission, args::Args, lookup::KubeLookup, metrics::AdmissionMetrics,
};
