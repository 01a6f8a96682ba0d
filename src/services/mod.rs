mod bridge;
mod identity;

pub use bridge::{Mirrors, Scope, StoreBridge, Subscriptions};
pub use identity::{
    provider_from_config, resolve_identity, AnonymousIdentity, ConfiguredIdentity,
    IdentityProvider,
};
