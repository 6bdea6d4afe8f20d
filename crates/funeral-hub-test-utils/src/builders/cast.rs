use funeral_hub_core::{Actor, GroupId, Role, UserId};

/// The people taking part in one protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCast {
    pub intake: Actor,
    pub funeral_home: Actor,
    pub notary: Actor,
    pub declarant: Actor,
    pub admin: Actor,
    pub group: GroupId,
}

impl Default for TestCast {
    fn default() -> Self {
        Self::with_offset(0)
    }
}

impl TestCast {
    /// Cast with user ids `offset + 1 ..= offset + 5` and group `offset + 7`
    pub fn with_offset(offset: i64) -> Self {
        let group = GroupId(offset + 7);
        Self {
            intake: Actor::new(UserId(offset + 1), Role::Intake).in_group(group),
            funeral_home: Actor::new(UserId(offset + 2), Role::FuneralHome),
            notary: Actor::new(UserId(offset + 3), Role::Notary),
            declarant: Actor::new(UserId(offset + 4), Role::Declarant),
            admin: Actor::new(UserId(offset + 5), Role::Admin),
            group,
        }
    }

    /// Another actor with the same role, bound to nothing
    pub fn stranger(role: Role) -> Actor {
        Actor::new(UserId(9_999), role)
    }

    pub fn all(&self) -> [Actor; 5] {
        [
            self.intake,
            self.funeral_home,
            self.notary,
            self.declarant,
            self.admin,
        ]
    }

    /// Token the user directories accept for `actor`
    pub fn token(actor: &Actor) -> String {
        actor.id.to_string()
    }
}
