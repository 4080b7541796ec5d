//! RGC (Resource Governance Center) resources

pub mod resource_account;
pub mod resource_best_practice;
pub mod resource_control;
pub mod resource_landing_zone;
pub mod resource_organizational_unit;

pub use resource_account::RgcAccountResource;
pub use resource_best_practice::RgcBestPracticeResource;
pub use resource_control::RgcControlResource;
pub use resource_landing_zone::RgcLandingZoneResource;
pub use resource_organizational_unit::RgcOrganizationalUnitResource;
