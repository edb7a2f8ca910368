//! Calendar gateway integration (Google Calendar REST contract)

pub mod client;

pub use client::CalendarClient;
