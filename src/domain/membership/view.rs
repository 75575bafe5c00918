//! Read model combining a membership with display fields.

use serde::{Deserialize, Serialize};

use super::Membership;

/// A membership hydrated with level and user display fields at read time.
///
/// Display fields are `None` when the level or user no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipView {
    #[serde(flatten)]
    pub membership: Membership,
    pub level_name: Option<String>,
    pub user_login: Option<String>,
    pub user_email: Option<String>,
    pub display_name: Option<String>,
}
