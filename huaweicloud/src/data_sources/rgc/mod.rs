//! RGC data sources

pub mod data_source_accounts;
pub mod data_source_controls;
pub mod data_source_organizational_units;

pub use data_source_accounts::RgcAccountsDataSource;
pub use data_source_controls::RgcControlsDataSource;
pub use data_source_organizational_units::RgcOrganizationalUnitsDataSource;
