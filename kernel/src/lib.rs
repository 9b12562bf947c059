// Tagguard Kernel
//
// Compliance evaluation and remediation for compute instances tracked
// by the configuration service.

pub mod adapters;
pub mod compliance;
pub mod credentials;
pub mod evaluation;
pub mod event;
pub mod handler;
pub mod item;
pub mod normalize;
pub mod remediation;
pub mod services;
pub mod settings;
