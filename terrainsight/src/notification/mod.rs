//! Webhook notifications for detected findings.
//!
//! Resolution picks the endpoint for an environment mode, the orchestrator
//! decides whether a finding is sent, and the delivery engine performs the
//! bounded, retried POST.

pub mod delivery;
pub mod destination;
pub mod orchestrator;
pub mod payload;

pub use delivery::{
    DeliveryEngine, DeliveryOutcome, DeliveryRequest, ReqwestTransport, TransportError,
    TransportResponse, WebhookTransport, is_retriable,
};
pub use destination::{Destination, DestinationConfig, EnvironmentMode, resolve};
pub use orchestrator::{Notifier, NotifyResult, NotifyState};
pub use payload::{NotificationPayload, NotifyContext};
