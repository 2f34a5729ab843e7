//! Directory entity types.

pub mod grant;
pub mod permission;
pub mod role;
pub mod user;
pub mod view;

pub use grant::Grant;
pub use permission::Permission;
pub use role::{Role, RoleBuilder, RoleKind, UnknownRoleKind};
pub use user::User;
pub use view::View;
