//! Secret records and the table they are loaded into.

pub mod record;
pub mod store;
