use crate::domain::user::Role;
use crate::error::{Error, Result};

/// What a request is trying to do, as far as roles are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    ManageCatalog,
    TakeOrders,
    PrepareOrders,
    DeliverOrders,
    Read,
}

impl Action {
    pub fn allowed_for(&self, role: Role) -> bool {
        use Role::*;

        match self {
            Action::ManageUsers => matches!(role, Admin),
            Action::ManageCatalog => matches!(role, Admin | Manager),
            Action::TakeOrders => matches!(role, Admin | Manager | Greeter),
            Action::PrepareOrders => matches!(role, Admin | Manager | OrderPicker),
            Action::DeliverOrders => matches!(role, Admin | Manager | Greeter),
            Action::Read => true,
        }
    }
}

pub fn authorize(role: Role, action: Action) -> Result<()> {
    if action.allowed_for(role) {
        Ok(())
    } else {
        tracing::warn!(role = %role, action = ?action, "Access denied");
        Err(Error::Forbidden("Access denied.".to_string()))
    }
}
