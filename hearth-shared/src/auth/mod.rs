/// Authentication primitives for the back office
///
/// - [`password`]: Argon2id hashing and verification of administrator passwords
///
/// Session handling lives in the web crate; this module only deals with credentials.

pub mod password;
