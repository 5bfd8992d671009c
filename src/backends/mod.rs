//! Collaborator implementations.

pub mod onepassword;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
