mod airtable;

pub use airtable::*;
