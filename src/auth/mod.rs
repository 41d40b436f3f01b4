//! Client-credential tokens and the authorized clients built from them.

pub mod client;
pub mod credential;
pub mod identity;
pub mod token;
