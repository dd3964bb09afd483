mod donation_session;

pub use donation_session::*;
