//! SFS Turbo data sources

pub mod data_source_perm_rules;
pub mod data_source_sfs_turbos;

pub use data_source_perm_rules::SfsTurboPermRulesDataSource;
pub use data_source_sfs_turbos::SfsTurbosDataSource;
