//! # Directory Records
//!
//! Users and teams as the directory stores them. A user belongs to exactly
//! one team and is never deleted; only the activity flag changes over time.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{validated_text, TeamName, UserId};

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub team_name: TeamName,
    pub is_active: bool,
}

/// A team member as listed by [`Team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,
}

impl TeamMember {
    /// Create a member with a validated display name.
    pub fn new(id: UserId, username: &str, is_active: bool) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            username: validated_text("username", username)?,
            is_active,
        })
    }

    /// The full user record for this member of `team`.
    pub fn into_user(self, team: &TeamName) -> User {
        User {
            id: self.id,
            username: self.username,
            team_name: team.clone(),
            is_active: self.is_active,
        }
    }
}

impl From<User> for TeamMember {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_active: user.is_active,
        }
    }
}

/// A team and its members. Member order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: TeamName,
    pub members: Vec<TeamMember>,
}

impl Team {
    /// Members whose activity flag is set.
    pub fn active_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.is_active)
    }

    /// Identifiers of all members, active or not.
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// Whether `id` is currently an active member of this team.
    pub fn is_active_member(&self, id: &UserId) -> bool {
        self.members.iter().any(|m| m.id == *id && m.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        Team {
            name: TeamName::new("backend").unwrap(),
            members: vec![
                TeamMember::new(UserId::new(), "alice", true).unwrap(),
                TeamMember::new(UserId::new(), "bob", false).unwrap(),
                TeamMember::new(UserId::new(), "carol", true).unwrap(),
            ],
        }
    }

    #[test]
    fn active_members_skips_inactive() {
        let t = team();
        let names: Vec<&str> = t.active_members().map(|m| m.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn is_active_member_checks_flag() {
        let t = team();
        assert!(t.is_active_member(&t.members[0].id));
        assert!(!t.is_active_member(&t.members[1].id));
        assert!(!t.is_active_member(&UserId::new()));
    }

    #[test]
    fn member_requires_username() {
        assert!(TeamMember::new(UserId::new(), " ", true).is_err());
    }

    #[test]
    fn member_into_user_carries_team() {
        let t = team();
        let user = t.members[2].clone().into_user(&t.name);
        assert_eq!(user.team_name.as_str(), "backend");
        assert_eq!(TeamMember::from(user), t.members[2]);
    }
}
