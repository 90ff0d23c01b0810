pub mod branch;
pub mod query;
pub mod ticket;
