use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::action::{Action, ActionType};
use super::action_store::{ActionStore, TreeNode};
use super::handlers::{
    ActionHandler, MidiSendHandler, ScriptHandler, ShellHandler, SleepHandler,
};
use crate::error::ActionError;
use crate::midi::midi::MessageSender;

/// Resolves action and group ids against the store and runs them.
///
/// Every top-level run is spawned onto the captured runtime, so callers such
/// as MIDI input callbacks never block on execution.
pub struct ActionExecutor {
    store: Arc<RwLock<ActionStore>>,
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
    runtime: Handle,
}

impl ActionExecutor {
    /// Executor with the four built-in handlers.
    pub fn new(
        store: Arc<RwLock<ActionStore>>,
        sender: Arc<dyn MessageSender>,
        runtime: Handle,
    ) -> Self {
        let mut executor = Self::without_handlers(store, runtime);
        executor.register_handler(Arc::new(ScriptHandler));
        executor.register_handler(Arc::new(ShellHandler));
        executor.register_handler(Arc::new(SleepHandler));
        executor.register_handler(Arc::new(MidiSendHandler::new(sender)));
        executor
    }

    pub fn without_handlers(store: Arc<RwLock<ActionStore>>, runtime: Handle) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            runtime,
        }
    }

    /// Install `handler` for its action type, replacing any previous one.
    pub fn register_handler(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type(), handler);
    }

    pub fn store(&self) -> &Arc<RwLock<ActionStore>> {
        &self.store
    }

    /// The runtime every detached run is spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Run the action or group with this id in the background.
    ///
    /// Unknown ids are ignored and return `None`; a pad or mapping may still
    /// point at something that has since been deleted. The returned handle
    /// finishes with the sequence itself; non-waiting actions it started keep
    /// running on the runtime.
    pub fn resolve_and_run(self: &Arc<Self>, id: &str) -> Option<JoinHandle<()>> {
        let node = self.resolve(id)?;
        let this = Arc::clone(self);
        Some(self.runtime.spawn(async move {
            this.run_node(node).await;
        }))
    }

    /// Run the action or group with this id and wait for everything it
    /// started, non-waiting actions included. Returns false for unknown ids.
    pub async fn run_to_completion(self: &Arc<Self>, id: &str) -> bool {
        let Some(node) = self.resolve(id) else {
            return false;
        };

        for handle in self.run_node(node).await {
            if let Err(e) = handle.await {
                log::error!("Detached action did not finish: {}", e);
            }
        }
        true
    }

    /// Run one action, blocking only if it is marked wait-for-completion.
    /// Returns the handle of the detached task otherwise.
    pub async fn run_action(self: &Arc<Self>, action: Action) -> Option<JoinHandle<()>> {
        if action.wait_for_completion {
            self.execute_logged(&action).await;
            None
        } else {
            let this = Arc::clone(self);
            Some(self.runtime.spawn(async move {
                this.execute_logged(&action).await;
            }))
        }
    }

    /// Run a group's children in ascending order, recursing into subgroups.
    /// Resolves to the handles of every non-waiting action started on the way.
    ///
    /// The child list is snapshotted up front so edits made while the group
    /// runs do not affect the current pass.
    pub fn run_group(
        self: &Arc<Self>,
        group_id: String,
    ) -> Pin<Box<dyn Future<Output = Vec<JoinHandle<()>>> + Send>> {
        let this = Arc::clone(self);
        Box::pin(async move {
            let children = this.store.read().children(&group_id);
            let mut detached = Vec::new();
            for child in children {
                match child {
                    TreeNode::Action(action) => detached.extend(this.run_action(action).await),
                    TreeNode::Group(group) => detached.extend(this.run_group(group.id).await),
                }
            }
            detached
        })
    }

    /// Run one action to completion and return its output.
    pub async fn execute(&self, action: &Action) -> Result<String, ActionError> {
        let handler = self.handler(action.action_type)?;
        handler.execute(&action.payload).await
    }

    /// Check a payload for the given type without running it.
    pub async fn validate(
        &self,
        action_type: ActionType,
        payload: &str,
    ) -> Result<(), ActionError> {
        let handler = self.handler(action_type)?;
        handler.validate(payload).await
    }

    pub fn is_supported(&self, action_type: ActionType) -> bool {
        self.handlers
            .get(&action_type)
            .map(|h| h.is_supported())
            .unwrap_or(false)
    }

    pub fn shell_name(&self) -> &'static str {
        ShellHandler::shell_name()
    }

    fn resolve(&self, id: &str) -> Option<TreeNode> {
        if id.is_empty() {
            return None;
        }

        let store = self.store.read();
        if let Some(action) = store.action(id) {
            Some(TreeNode::Action(action.clone()))
        } else if let Some(group) = store.group(id) {
            Some(TreeNode::Group(group.clone()))
        } else {
            log::debug!("Ignoring trigger for unknown id {}", id);
            None
        }
    }

    async fn run_node(self: &Arc<Self>, node: TreeNode) -> Vec<JoinHandle<()>> {
        match node {
            TreeNode::Action(action) => self.run_action(action).await.into_iter().collect(),
            TreeNode::Group(group) => {
                log::info!("Running group '{}'", group.name);
                self.run_group(group.id).await
            }
        }
    }

    fn handler(&self, action_type: ActionType) -> Result<Arc<dyn ActionHandler>, ActionError> {
        let handler = self
            .handlers
            .get(&action_type)
            .cloned()
            .ok_or(ActionError::NoHandler(action_type))?;

        if !handler.is_supported() {
            return Err(ActionError::Unsupported(format!(
                "'{}' actions are not supported on this platform",
                action_type
            )));
        }
        Ok(handler)
    }

    async fn execute_logged(&self, action: &Action) {
        log::info!("Running action '{}' ({})", action.name, action.action_type);
        match self.execute(action).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => log::debug!("Action '{}' output: {}", action.name, output),
            Err(e) => log::error!("Action '{}' failed: {}", action.name, e),
        }
    }
}
