pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};
pub mod role_cache;
pub use role_cache::RoleCache;
pub mod session_cache;
pub use session_cache::{MemoryStorage, SessionCache, SessionStorage};
pub mod single_flight;
pub use single_flight::{Join, SingleFlight};
pub mod ttl;
pub use ttl::TtlCache;
