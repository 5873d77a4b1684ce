pub mod announcements;
pub use announcements::AnnouncementAdapter;
pub mod packages;
pub use packages::PackageAdapter;
pub mod polls;
pub use polls::PollAdapter;
pub mod profiles;
pub use profiles::ProfileDirectory;
pub mod residents;
pub use residents::ResidentAdapter;
pub mod scope;
pub mod sos_alerts;
pub use sos_alerts::SosAdapter;
pub mod units;
pub use units::UnitDirectory;
pub mod visitors;
pub use visitors::VisitorAdapter;
