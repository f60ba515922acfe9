use std::sync::Arc;

use uuid::Uuid;

use iam_storage::RoleStore;

use crate::error::Result;

/// Checks a required `resource:action` permission string against a user's
/// effective permission set. A granted permission of `*:*` matches anything;
/// `resource:*` matches any action on that resource; an exact match matches
/// only itself.
pub fn matches(granted: &str, required: &str) -> bool {
    if granted == required || granted == "*:*" {
        return true;
    }
    let (Some((granted_resource, granted_action)), Some((required_resource, required_action))) =
        (granted.split_once(':'), required.split_once(':'))
    else {
        return false;
    };
    if granted_resource != required_resource && granted_resource != "*" {
        return false;
    }
    granted_action == required_action || granted_action == "*"
}

pub struct PermissionChecker<S: RoleStore> {
    store: Arc<S>,
}

impl<S: RoleStore> PermissionChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn has_permission(&self, user_id: Uuid, required: &str) -> Result<bool> {
        let granted = self.store.get_user_permissions(user_id).await?;
        Ok(granted
            .iter()
            .any(|permission| matches(&permission.as_string(), required)))
    }
}
