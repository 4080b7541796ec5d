//! Identity Center data sources

pub mod data_source_groups;
pub mod data_source_instance;
pub mod data_source_permission_sets;
pub mod data_source_users;

pub use data_source_groups::IdentityCenterGroupsDataSource;
pub use data_source_instance::IdentityCenterInstanceDataSource;
pub use data_source_permission_sets::IdentityCenterPermissionSetsDataSource;
pub use data_source_users::IdentityCenterUsersDataSource;
