mod manager;
mod state;

pub use manager::{LoginError, SessionManager};
pub use state::{PremiumAccess, SessionState};
