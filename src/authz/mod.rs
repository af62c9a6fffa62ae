/// Grant-Based Authorization
///
/// Mutating operations arrive as signed tokens; whether the signer may
/// perform them is decided here, against permission grants stored per DID
/// and per (DID, aggregation) pairing. Identity records are the exception:
/// they answer to their own published permission rules rather than the
/// grant store.

pub mod engine;
pub mod grants;

pub use engine::{authorize_identity_record, ActorGrant, AuthzEngine};
pub use grants::{Aggregation, AggregationKind, Grant, GrantLevel, GrantListing, GrantStore};
