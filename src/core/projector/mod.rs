//! Change projector
//!
//! [`projection`] decides what each change record means for the index;
//! [`service::Projector`] applies a batch of those decisions in phase order.

pub mod projection;
pub mod service;

pub use projection::{
    composite_id, index_name, plan_action, resolve_tenant, ProjectionAction, ProjectionPhase,
};
pub use service::{ProjectionReport, Projector};
