//! Row structs matching the database tables.
//!
//! Each row converts into the storage record type the core service works
//! with.

pub mod lower_third;
