pub mod account;
pub mod client;
pub mod document_list;
pub mod ownership;
pub mod request;
pub mod slot;

use uuid::Uuid;

use self::account::Role;

/// Identity on whose behalf a service operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_professional(&self) -> bool {
        matches!(self.role, Role::Professional | Role::Admin)
    }

    /// True when the actor owns a record carrying `owner`, or is an admin.
    pub fn owns(&self, owner: Option<Uuid>) -> bool {
        self.is_admin() || owner == Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_requires_matching_owner_field() {
        let id = Uuid::new_v4();
        let actor = Actor::new(id, "pro@example.com", Role::Professional);

        assert!(actor.owns(Some(id)));
        assert!(!actor.owns(Some(Uuid::new_v4())));
        assert!(!actor.owns(None));
    }

    #[test]
    fn admins_own_everything() {
        let admin = Actor::new(Uuid::new_v4(), "root@example.com", Role::Admin);
        assert!(admin.owns(None));
        assert!(admin.owns(Some(Uuid::new_v4())));
        assert!(admin.is_professional());
    }
}
