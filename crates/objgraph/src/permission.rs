use moor_common::{PermissionError, PropertyAccess};
use moor_store::model::{Object, PlayerFlag};

/// Flag-bit access checks on principals (spec.md §4.8). Stateless — every
/// check takes the objects it needs as arguments rather than holding a
/// reference to the world, so it composes freely with both ObjectGraph and
/// the script runtime's builtins.
pub struct PermissionModel;

impl PermissionModel {
    pub fn is_admin(actor: &Object) -> bool {
        actor.has_flag(PlayerFlag::Admin)
    }

    pub fn is_moderator(actor: &Object) -> bool {
        actor.has_flag(PlayerFlag::Moderator)
    }

    pub fn is_programmer(actor: &Object) -> bool {
        actor.has_flag(PlayerFlag::Programmer)
    }

    fn owns(actor: &Object, target: &Object) -> bool {
        target.owner == actor.id
    }

    /// Property read check (§4.2 `get_property` contract).
    pub fn check_property_read(
        actor: &Object,
        owning_object: &Object,
        access: Option<PropertyAccess>,
        same_class_lineage: bool,
    ) -> Result<(), PermissionError> {
        match access {
            Some(PropertyAccess::Private)
                if !Self::owns(actor, owning_object) && !Self::is_admin(actor) =>
            {
                Err(deny(actor, "read", owning_object))
            }
            Some(PropertyAccess::Protected) if !same_class_lineage => {
                Err(deny(actor, "read", owning_object))
            }
            _ => Ok(()),
        }
    }

    /// Property write check (§4.2 `set_property` contract, §4.8).
    pub fn check_property_write(
        actor: &Object,
        owning_object: &Object,
        access: Option<PropertyAccess>,
        property_name: &str,
    ) -> Result<(), PermissionError> {
        if matches!(access, Some(PropertyAccess::ReadOnly)) {
            return Err(PermissionError::ReadOnlyProperty(property_name.to_string()));
        }
        let allowed = Self::owns(actor, owning_object) || Self::is_admin(actor);
        if !allowed {
            return Err(deny(actor, "write", owning_object));
        }
        Ok(())
    }

    /// Verb/function creation, modification, destruction (§4.8).
    pub fn check_verb_mutation(actor: &Object, target: &Object) -> Result<(), PermissionError> {
        if Self::is_programmer(actor) || Self::owns(actor, target) || Self::is_admin(actor) {
            Ok(())
        } else {
            Err(deny(actor, "program", target))
        }
    }

    /// `execute_script`, `force`, direct store access (§4.8: Admin only).
    pub fn require_admin(actor: &Object) -> Result<(), PermissionError> {
        if Self::is_admin(actor) {
            Ok(())
        } else {
            Err(PermissionError::Denied {
                actor: actor.id.clone(),
                action: "perform an admin-only operation".to_string(),
                target: actor.id.clone(),
            })
        }
    }
}

fn deny(actor: &Object, action: &str, target: &Object) -> PermissionError {
    PermissionError::Denied {
        actor: actor.id.clone(),
        action: action.to_string(),
        target: target.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use moor_common::ObjectId;
    use moor_store::model::PlayerData;
    use std::collections::{BTreeMap, BTreeSet};

    fn obj(id: &str, owner: &str, flags: &[PlayerFlag]) -> Object {
        Object {
            id: ObjectId::from_str(id),
            dbref: moor_common::Dbref(1),
            class_id: None,
            name: id.into(),
            aliases: vec![],
            instance_properties: BTreeMap::new(),
            property_access: BTreeMap::new(),
            location: None,
            owner: ObjectId::from_str(owner),
            player: if flags.is_empty() {
                None
            } else {
                Some(PlayerData {
                    password_hash: String::new(),
                    session_id: None,
                    last_login: None,
                    flags: flags.iter().copied().collect::<BTreeSet<_>>(),
                })
            },
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn private_property_requires_ownership_or_admin() {
        let owner = obj("owner", "owner", &[]);
        let stranger = obj("stranger", "stranger", &[]);
        assert!(PermissionModel::check_property_read(
            &stranger,
            &owner,
            Some(PropertyAccess::Private),
            false
        )
        .is_err());
        assert!(PermissionModel::check_property_read(
            &owner,
            &owner,
            Some(PropertyAccess::Private),
            false
        )
        .is_ok());
    }

    #[test]
    fn readonly_rejects_all_script_writes_even_by_owner() {
        let owner = obj("owner", "owner", &[]);
        assert!(PermissionModel::check_property_write(
            &owner,
            &owner,
            Some(PropertyAccess::ReadOnly),
            "k"
        )
        .is_err());
    }

    #[test]
    fn admin_bypasses_ownership() {
        let admin = obj("admin", "admin", &[PlayerFlag::Admin]);
        let someone_elses = obj("thing", "someone-else", &[]);
        assert!(
            PermissionModel::check_property_write(&admin, &someone_elses, None, "k").is_ok()
        );
    }
}
