use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::normalize_key;

/// Campus departments that own approval steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "IT")]
    It,
    Facilities,
    #[serde(rename = "Student Affairs")]
    StudentAffairs,
    Finance,
    #[serde(rename = "Academic Affairs")]
    AcademicAffairs,
}

impl Department {
    pub const ALL: [Department; 5] = [
        Department::It,
        Department::Facilities,
        Department::StudentAffairs,
        Department::Finance,
        Department::AcademicAffairs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::It => "IT",
            Self::Facilities => "Facilities",
            Self::StudentAffairs => "Student Affairs",
            Self::Finance => "Finance",
            Self::AcademicAffairs => "Academic Affairs",
        }
    }

    /// Accepts display names as well as snake/kebab spellings, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_key(value).as_str() {
            "it" => Some(Self::It),
            "facilities" => Some(Self::Facilities),
            "student affairs" => Some(Self::StudentAffairs),
            "finance" => Some(Self::Finance),
            "academic affairs" => Some(Self::AcademicAffairs),
            _ => None,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Faculty,
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Faculty => "faculty",
            Self::Student => "student",
            Self::Staff => "staff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_key(value).as_str() {
            "admin" => Some(Self::Admin),
            "faculty" => Some(Self::Faculty),
            "student" => Some(Self::Student),
            "staff" | "user" => Some(Self::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity attempting an operation, as supplied by the session provider.
///
/// The engine performs no credential checks; an actor is taken at face value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<Department>,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        department: Option<Department>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), role, department }
    }

    /// Builds an actor from a free-text department; names outside the fixed set map to none.
    pub fn from_department_name(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        department: &str,
    ) -> Self {
        Self::new(id, name, email, role, Department::parse(department))
    }
}
