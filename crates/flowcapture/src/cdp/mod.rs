//! Chrome DevTools Protocol backend for [`crate::session::BrowserSession`]

mod connection;
mod launcher;
mod page;

pub use connection::CdpConnection;
pub use launcher::BrowserProcess;
pub use page::CdpSession;
