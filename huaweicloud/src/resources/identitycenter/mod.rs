//! Identity Center resources

pub mod resource_account_assignment;
pub mod resource_group;
pub mod resource_group_membership;
pub mod resource_permission_set;
pub mod resource_system_policy_attachment;
pub mod resource_user;

pub use resource_account_assignment::IdentityCenterAccountAssignmentResource;
pub use resource_group::IdentityCenterGroupResource;
pub use resource_group_membership::IdentityCenterGroupMembershipResource;
pub use resource_permission_set::IdentityCenterPermissionSetResource;
pub use resource_system_policy_attachment::IdentityCenterSystemPolicyAttachmentResource;
pub use resource_user::IdentityCenterUserResource;
