use crate::entity::{ComponentRef, EntityId, Transform};
use crate::session::{ConnectionId, Role};
use crate::wire::{Category, Value};

/// Side effects requested by a handler. They run after the handler returns,
/// on the tick thread, in the order they were queued.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    Rpc {
        component: ComponentRef,
        method: String,
        args: Vec<Value>,
    },
    TargetRpc {
        connection: ConnectionId,
        component: ComponentRef,
        method: String,
        args: Vec<Value>,
    },
    SyncVar {
        component: ComponentRef,
        field: String,
    },
    Command {
        component: ComponentRef,
        method: String,
        args: Vec<Value>,
    },
    Spawn {
        prefab: usize,
        owner: Option<ConnectionId>,
        server_authority: bool,
        transform: Transform,
    },
    Destroy {
        entity: EntityId,
        requester: Option<ConnectionId>,
        server_authority: bool,
    },
}

/// Passed to every invoked method.
#[derive(Debug)]
pub struct CallContext {
    component: ComponentRef,
    caller: Option<ConnectionId>,
    category: Category,
    role: Role,
    has_authority: bool,
    actions: Vec<Action>,
}

impl CallContext {
    pub(crate) fn new(
        component: ComponentRef,
        caller: Option<ConnectionId>,
        category: Category,
        role: Role,
        has_authority: bool,
    ) -> Self {
        Self {
            component,
            caller,
            category,
            role,
            has_authority,
            actions: Vec::new(),
        }
    }

    pub fn component(&self) -> ComponentRef {
        self.component
    }

    pub fn entity(&self) -> EntityId {
        self.component.entity
    }

    /// Connection that sent the call. `None` for server-originated calls.
    pub fn caller(&self) -> Option<ConnectionId> {
        self.caller
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_server(&self) -> bool {
        self.role.contains(Role::SERVER)
    }

    pub fn has_authority(&self) -> bool {
        self.has_authority
    }

    pub fn send_rpc(&mut self, method: &str, args: Vec<Value>) {
        self.actions.push(Action::Rpc {
            component: self.component,
            method: method.to_string(),
            args,
        });
    }

    pub fn send_target_rpc(&mut self, connection: ConnectionId, method: &str, args: Vec<Value>) {
        self.actions.push(Action::TargetRpc {
            connection,
            component: self.component,
            method: method.to_string(),
            args,
        });
    }

    /// Replies to the connection that issued the current command.
    pub fn reply(&mut self, method: &str, args: Vec<Value>) {
        if let Some(connection) = self.caller {
            self.send_target_rpc(connection, method, args);
        }
    }

    pub fn send_sync_var(&mut self, field: &str) {
        self.actions.push(Action::SyncVar {
            component: self.component,
            field: field.to_string(),
        });
    }

    pub fn send_command(&mut self, method: &str, args: Vec<Value>) {
        self.actions.push(Action::Command {
            component: self.component,
            method: method.to_string(),
            args,
        });
    }

    pub fn spawn(
        &mut self,
        prefab: usize,
        owner: Option<ConnectionId>,
        server_authority: bool,
        transform: Transform,
    ) {
        self.actions.push(Action::Spawn {
            prefab,
            owner,
            server_authority,
            transform,
        });
    }

    /// Destroys `entity` on behalf of the caller; a command can only destroy
    /// what its connection owns.
    pub fn destroy(&mut self, entity: EntityId) {
        self.actions.push(Action::Destroy {
            entity,
            requester: self.caller,
            server_authority: self.caller.is_none(),
        });
    }

    pub(crate) fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}
