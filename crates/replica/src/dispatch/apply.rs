use log::{debug, warn};

use crate::behaviour::{Action, CallContext};
use crate::entity::ComponentRef;
use crate::error::{ReplicationError, Result};
use crate::events::NetworkEvent;
use crate::session::{ConnectionId, Network};
use crate::transport::Transport;
use crate::wire::{Category, RpcCall};

impl<T: Transport> Network<T> {
    /// Resolves `(entity, component, method)` and runs the registered invoker.
    /// Deferred actions queued by the handler run only if it succeeds.
    pub(crate) fn invoke(
        &mut self,
        category: Category,
        call: &RpcCall,
        caller: Option<ConnectionId>,
    ) -> Result<()> {
        let role = self.role();
        let target = ComponentRef::new(call.entity_id, call.component_index);
        let slot = self.world.component_mut(target)?;
        let method = self
            .registry
            .resolve_method(slot.behaviour(), &call.method, category, &call.args)?;

        let mut ctx = CallContext::new(target, caller, category, role, slot.has_authority());
        method
            .invoke(slot.behaviour_mut(), &mut ctx, &call.args)
            .map_err(|e| ReplicationError::resolution(&call.method, e.to_string()))?;

        debug!("Applied {} {} on {}", category, call.method, target);
        self.run_actions(ctx.into_actions());
        Ok(())
    }

    pub(crate) fn run_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            let result = match action {
                Action::Rpc {
                    component,
                    method,
                    args,
                } => self.send_rpc(component, &method, args),
                Action::TargetRpc {
                    connection,
                    component,
                    method,
                    args,
                } => self.send_target_rpc(connection, component, &method, args),
                Action::SyncVar { component, field } => self.send_sync_var(component, &field),
                Action::Command {
                    component,
                    method,
                    args,
                } => self.send_command(component, &method, args),
                Action::Spawn {
                    prefab,
                    owner,
                    server_authority,
                    transform,
                } => self
                    .spawn_at(prefab, owner, server_authority, transform)
                    .map(|_| ()),
                Action::Destroy {
                    entity,
                    requester,
                    server_authority,
                } => self.destroy(entity, requester, server_authority),
            };
            if let Err(e) = result {
                warn!("Deferred action failed: {}", e);
            }
        }
    }

    /// Records a rejected call. The apply loop carries on with the next one.
    pub(crate) fn reject(
        &mut self,
        category: Category,
        connection: Option<ConnectionId>,
        error: ReplicationError,
    ) {
        self.stats.calls_rejected += 1;
        match connection {
            Some(from) => warn!("Rejected {} from {}: {}", category, from, error),
            None => warn!("Rejected {} from server: {}", category, error),
        }

        let kick = error.is_authority_violation() && self.config.disconnect_on_violation;
        self.emit(NetworkEvent::CallRejected {
            category,
            connection,
            error,
        });

        if let (true, Some(from)) = (kick, connection) {
            if let Err(e) = self.disconnect_client(from) {
                warn!("Failed to disconnect {}: {}", from, e);
            }
        }
    }
}
