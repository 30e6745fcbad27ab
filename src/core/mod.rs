pub mod config;
pub mod error;
pub mod session;

pub use config::GroundwireConfig;
pub use error::{GroundwireError, Result};
pub use session::{ResponseCache, SessionStore};
