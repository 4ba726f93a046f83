//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SubscriptionStore` - Per-user subscription record persistence
//! - `PaymentProvider` - Payment platform API (webhook verification,
//!   subscription fetch, portal sessions)

mod payment_provider;
mod subscription_store;

pub use payment_provider::{PaymentError, PaymentProvider, PortalSession};
pub use subscription_store::SubscriptionStore;
