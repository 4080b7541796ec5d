//! SFS Turbo resources

pub mod resource_dir;
pub mod resource_dir_quota;
pub mod resource_perm_rule;
pub mod resource_sfs_turbo;

pub use resource_dir::SfsTurboDirResource;
pub use resource_dir_quota::SfsTurboDirQuotaResource;
pub use resource_perm_rule::SfsTurboPermRuleResource;
pub use resource_sfs_turbo::SfsTurboResource;
