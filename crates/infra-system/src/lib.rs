// Arcade Queue Infrastructure - System Adapters
// Implements: TimeAuthority (HTTP), AuthService (local session file)

pub mod session_auth;
pub mod world_time;

pub use session_auth::LocalSessionAuth;
pub use world_time::WorldTimeAuthority;
