//! Source adapters that discover notice candidates

pub mod mail;
pub mod portal;

pub use mail::MailAdapter;
pub use portal::PortalAdapter;
