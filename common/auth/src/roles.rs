pub const ROLE_ADMIN: &str = "admin";

pub const PERMISSION_READ: &str = "read";
pub const PERMISSION_CREATE: &str = "create";
pub const PERMISSION_DELETE: &str = "delete";
pub const PERMISSION_UPDATE: &str = "update";

pub const BASELINE_PERMISSIONS: &[&str] = &[PERMISSION_READ, PERMISSION_CREATE];
pub const ADMIN_PERMISSIONS: &[&str] = &[
    PERMISSION_READ,
    PERMISSION_CREATE,
    PERMISSION_DELETE,
    PERMISSION_UPDATE,
];
