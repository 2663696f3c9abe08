//! HTTP gateway over the analysis, mint and chat flows

pub mod http;
pub mod session;

pub use http::{route, run, AppState};
pub use session::{Session, SessionFactory, SessionStore};
