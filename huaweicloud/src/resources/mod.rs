//! Resource implementations

pub mod identitycenter;
pub mod rgc;
pub mod sfsturbo;

pub use identitycenter::{
    IdentityCenterAccountAssignmentResource, IdentityCenterGroupMembershipResource,
    IdentityCenterGroupResource, IdentityCenterPermissionSetResource,
    IdentityCenterSystemPolicyAttachmentResource, IdentityCenterUserResource,
};
pub use rgc::{
    RgcAccountResource, RgcBestPracticeResource, RgcControlResource, RgcLandingZoneResource,
    RgcOrganizationalUnitResource,
};
pub use sfsturbo::{SfsTurboDirQuotaResource, SfsTurboDirResource, SfsTurboPermRuleResource, SfsTurboResource};
