//! Data source implementations

pub mod identitycenter;
pub mod rgc;
pub mod sfsturbo;

pub use identitycenter::{
    IdentityCenterGroupsDataSource, IdentityCenterInstanceDataSource,
    IdentityCenterPermissionSetsDataSource, IdentityCenterUsersDataSource,
};
pub use rgc::{RgcAccountsDataSource, RgcControlsDataSource, RgcOrganizationalUnitsDataSource};
pub use sfsturbo::{SfsTurboPermRulesDataSource, SfsTurbosDataSource};
