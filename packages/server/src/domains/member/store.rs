//! In-memory member repository.
//!
//! The persistence engine is an external collaborator; this store exposes
//! the filter/sort/create primitives the core needs and keeps everything
//! else out of scope.

use std::collections::HashMap;
use std::sync::RwLock;

use super::models::Member;
use crate::common::MemberId;

pub struct MemberStore {
    members: RwLock<HashMap<MemberId, Member>>,
}

impl MemberStore {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, member: Member) -> MemberId {
        let id = member.id;
        self.members
            .write()
            .expect("member store lock poisoned")
            .insert(id, member);
        id
    }

    pub fn get(&self, id: MemberId) -> Option<Member> {
        self.members
            .read()
            .expect("member store lock poisoned")
            .get(&id)
            .cloned()
    }

    /// All members, newest first.
    pub fn all(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .members
            .read()
            .expect("member store lock poisoned")
            .values()
            .cloned()
            .collect();
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        members
    }

    /// Soft-deactivate; members with history are never hard-deleted.
    pub fn set_active(&self, id: MemberId, active: bool) -> Option<Member> {
        let mut members = self.members.write().expect("member store lock poisoned");
        members.get_mut(&id).map(|m| {
            m.active = active;
            m.clone()
        })
    }

    /// Hard-remove a record. Only valid while rolling back a unit of work
    /// for a member that never became visible.
    pub fn remove(&self, id: MemberId) -> Option<Member> {
        self.members
            .write()
            .expect("member store lock poisoned")
            .remove(&id)
    }

    pub fn len(&self) -> usize {
        self.members.read().expect("member store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemberStore {
    fn default() -> Self {
        Self::new()
    }
}
