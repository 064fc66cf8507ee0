/// Router Module Index
///
/// Organizes the routing logic into modules segregated by the role policy
/// that applies to them. Access control itself happens per handler: the
/// `TokenClaims` extractor authenticates, then `authorize` enforces the
/// operation's fixed allowed-role set. The module split keeps the policy
/// surface readable at a glance.

/// Unauthenticated plumbing (health probe).
pub mod public;

/// Grade management for teachers and administrators, targeting a
/// caller-supplied tenant/student.
pub mod staff;

/// Student self-service, scoped exclusively to the caller's own claims.
pub mod student;
