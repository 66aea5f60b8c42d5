//! Wait/notify plumbing between name-server receive paths and resolvers
//! blocked on a cache miss.

pub mod bus;

pub use bus::{NotificationBus, Subscription, SUBSCRIPTION_BUFFER};
