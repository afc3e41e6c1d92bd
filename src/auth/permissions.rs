use anyhow::Error;
use once_cell::sync::Lazy;
use rocket::serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewTrainings,
    ViewOwnProfile,
    EditOwnProfile,
    RegisterSelf,
    WithdrawSelf,
    ViewOwnRegistrations,

    CreateTrainings,
    EditOwnTrainings,
    MarkAttendance,

    EditAllTrainings,
    ManageUsers,
    EditUserRoles,
    DeleteUsers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Role {
    Player,
    Coach,
    Admin,
}

static PLAYER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewTrainings);
    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::EditOwnProfile);
    permissions.insert(Permission::RegisterSelf);
    permissions.insert(Permission::WithdrawSelf);
    permissions.insert(Permission::ViewOwnRegistrations);

    permissions
});

static COACH_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(PLAYER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::CreateTrainings);
    permissions.insert(Permission::EditOwnTrainings);
    permissions.insert(Permission::MarkAttendance);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(COACH_PERMISSIONS.iter().copied());

    permissions.insert(Permission::EditAllTrainings);
    permissions.insert(Permission::ManageUsers);
    permissions.insert(Permission::EditUserRoles);
    permissions.insert(Permission::DeleteUsers);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Player => &PLAYER_PERMISSIONS,
            Role::Coach => &COACH_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Player => "player",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "player" => Ok(Role::Player),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => write!(f, "player"),
            Role::Coach => write!(f, "coach"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
