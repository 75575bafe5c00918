//! Ports - the contracts the application layer depends on.
//!
//! Storage ports return `DomainError`; collaborator ports use their own
//! result types (`GatewayResult`, `EmailError`).

mod capability_grantor;
mod directory;
mod email_sender;
mod event_sink;
mod grace_policy;
mod membership_repository;
mod notification_log;
mod order_repository;
mod payment_gateway;
mod processed_event_store;
mod webhook_verifier;

pub use capability_grantor::CapabilityGrantor;
pub use directory::{LevelCatalog, UserDirectory};
pub use email_sender::{EmailError, EmailMessage, EmailSender};
pub use event_sink::{EventListener, EventSink};
pub use grace_policy::{FixedGracePolicy, GracePeriodPolicy};
pub use membership_repository::MembershipRepository;
pub use notification_log::{NotificationKind, NotificationLog};
pub use order_repository::OrderRepository;
pub use payment_gateway::{GatewayRegistry, GatewayResolver, PaymentGateway};
pub use processed_event_store::{ProcessedEvent, ProcessedEventStore, SaveResult};
pub use webhook_verifier::{SignatureError, WebhookVerifier};
