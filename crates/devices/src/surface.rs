//! Wires configured devices to layouts and the action executor.

use std::sync::{Arc, Weak};

use padctl_core::{matching_actions, ActionExecutor, Config, DeviceConfig, MidiMessage};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::midi::{DeviceKind, GridEvent};
use crate::ports::{ListenerHandle, PortManager};
use crate::registry::device_for;

/// Input delivered by a listener, handled off the MIDI delivery thread.
#[derive(Debug)]
enum Inbound {
    Pad { menu: String, event: GridEvent },
    Message(MidiMessage),
}

pub struct SurfaceManager {
    ports: Arc<PortManager>,
    executor: Arc<ActionExecutor>,
    config: Arc<RwLock<Config>>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl SurfaceManager {
    pub fn new(
        ports: Arc<PortManager>,
        executor: Arc<ActionExecutor>,
        config: Arc<RwLock<Config>>,
    ) -> Self {
        Self {
            ports,
            executor,
            config,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Activate every device, paint its menu and start listening.
    pub fn initialize_devices(self: &Arc<Self>) {
        for device in self.devices() {
            if device.out_port.is_empty() {
                continue;
            }
            let kind = device_for(&device.kind);
            match self.ports.activate(&device.out_port, kind) {
                Ok(()) => log::info!("Activated {} ({})", device.name, kind),
                Err(e) => log::warn!("Failed to activate {}: {}", device.name, e),
            }
        }

        self.paint_layouts();
        self.start_listeners();
    }

    /// Send each device's assigned menu to its output.
    pub fn paint_layouts(&self) {
        let (devices, menus) = {
            let mut config = self.config.write();
            for menu in config.menus.iter_mut() {
                menu.ensure_default_linking();
            }
            (config.devices.clone(), config.menus.clone())
        };

        for device in devices {
            if device.out_port.is_empty() || device.main_menu.is_empty() {
                continue;
            }
            let Some(menu) = menus.iter().find(|m| m.name == device.main_menu) else {
                log::warn!("Menu '{}' not found for device {}", device.main_menu, device.name);
                continue;
            };

            let kind = device_for(&device.kind);
            if !kind.has_grid() {
                continue;
            }

            let mut failures = 0;
            for (row, col, pad) in menu.cells() {
                let color = pad.color_for(kind.is_classic(), false);
                let result = self
                    .ports
                    .set_pad_color(&device.out_port, kind, row as u8, col as u8, color);
                if let Err(e) = result {
                    failures += 1;
                    log::debug!("Failed to set pad ({}, {}) on {}: {}", row, col, device.name, e);
                }
            }

            if failures == 0 {
                log::info!("Sent layout '{}' to {}", menu.name, device.name);
            } else {
                log::warn!(
                    "Sent layout '{}' to {} with {} failed pad(s)",
                    menu.name,
                    device.name,
                    failures
                );
            }
        }
    }

    /// (Re)start one listener per device input. Existing listeners are
    /// stopped first so no message is delivered twice.
    pub fn start_listeners(self: &Arc<Self>) {
        self.stop_listeners();

        let inbound = self.dispatcher();
        let mut started = Vec::new();
        for device in self.devices() {
            if device.in_port.is_empty() {
                continue;
            }

            let kind = device_for(&device.kind);
            let tx = inbound.clone();

            let result = if kind == DeviceKind::Generic {
                self.ports.start_generic_listening(&device.in_port, move |message| {
                    let _ = tx.send(Inbound::Message(message));
                })
            } else {
                let menu = device.main_menu.clone();
                self.ports.start_listening(&device.in_port, kind, move |event| {
                    let _ = tx.send(Inbound::Pad {
                        menu: menu.clone(),
                        event,
                    });
                })
            };

            match result {
                Ok(handle) => started.push(handle),
                Err(e) => log::warn!("Failed to start listener for {}: {}", device.name, e),
            }
        }

        self.listeners.lock().extend(started);
    }

    /// Spawn the task that handles listener input on the executor's runtime.
    ///
    /// The task holds only a weak reference, so the surface is never dropped
    /// on a MIDI delivery thread, where closing that thread's own connection
    /// would deadlock. It ends once every sender is gone or the surface is.
    fn dispatcher(self: &Arc<Self>) -> mpsc::UnboundedSender<Inbound> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let surface: Weak<Self> = Arc::downgrade(self);

        self.executor.runtime().spawn(async move {
            while let Some(inbound) = rx.recv().await {
                let Some(surface) = surface.upgrade() else {
                    break;
                };
                match inbound {
                    Inbound::Pad { menu, event } => surface.handle_pad_event(&menu, event),
                    Inbound::Message(message) => surface.handle_generic_message(&message),
                }
            }
        });
        tx
    }

    pub fn stop_listeners(&self) {
        let listeners: Vec<ListenerHandle> = self.listeners.lock().drain(..).collect();
        for listener in listeners {
            listener.stop();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Show press feedback on every device sharing `menu_name`, and run the
    /// pad's action on press.
    pub fn handle_pad_event(&self, menu_name: &str, event: GridEvent) {
        if menu_name.is_empty() {
            return;
        }

        let (pad, devices) = {
            let config = self.config.read();
            let Some(pad) = config
                .menu_by_name(menu_name)
                .and_then(|menu| menu.pad(event.row as usize, event.col as usize))
                .cloned()
            else {
                return;
            };
            let devices: Vec<DeviceConfig> = config
                .devices
                .iter()
                .filter(|d| !d.out_port.is_empty() && d.main_menu == menu_name)
                .cloned()
                .collect();
            (pad, devices)
        };

        for device in devices {
            let kind = device_for(&device.kind);
            let color = pad.color_for(kind.is_classic(), event.pressed);
            if let Err(e) = self
                .ports
                .set_pad_color(&device.out_port, kind, event.row, event.col, color)
            {
                log::warn!("Failed to set pad color on {}: {}", device.name, e);
            }
        }

        if event.pressed && !pad.action_id.is_empty() {
            log::debug!("Pad ({}, {}) on '{}' pressed", event.row, event.col, menu_name);
            self.executor.resolve_and_run(&pad.action_id);
        }
    }

    /// Run every action whose message mapping matches `message`.
    pub fn handle_generic_message(&self, message: &MidiMessage) {
        let ids: Vec<String> = {
            let config = self.config.read();
            matching_actions(&config.message_mappings, message)
                .map(str::to_string)
                .collect()
        };

        for id in ids {
            log::debug!("Message [{}] triggered {}", message, id);
            self.executor.resolve_and_run(&id);
        }
    }

    /// Stop listening and turn every grid off.
    pub fn shutdown(&self) {
        self.stop_listeners();
        for device in self.devices() {
            let kind = device_for(&device.kind);
            if let Err(e) = self.ports.clear_all(&device.out_port, kind) {
                log::debug!("Failed to clear {}: {}", device.name, e);
            }
        }
    }

    fn devices(&self) -> Vec<DeviceConfig> {
        self.config.read().devices.clone()
    }
}

impl Drop for SurfaceManager {
    fn drop(&mut self) {
        self.stop_listeners();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use padctl_core::{
        Action, ActionError, ActionHandler, ActionStore, ActionType, MappingKind, MenuLayout,
        MessageMapping, ANY_CHANNEL,
    };
    use tokio::runtime::Handle;

    use super::*;

    struct Counter {
        hits: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ActionHandler for Counter {
        fn action_type(&self) -> ActionType {
            ActionType::Shell
        }

        async fn execute(&self, payload: &str) -> Result<String, ActionError> {
            self.hits.lock().push(payload.to_string());
            Ok(String::new())
        }

        async fn validate(&self, _payload: &str) -> Result<(), ActionError> {
            Ok(())
        }

        fn is_supported(&self) -> bool {
            true
        }
    }

    fn surface(config: Config) -> (Arc<SurfaceManager>, Arc<Mutex<Vec<String>>>) {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(RwLock::new(config.action_store()));
        let mut executor = ActionExecutor::without_handlers(store, Handle::current());
        executor.register_handler(Arc::new(Counter { hits: hits.clone() }));

        let surface = SurfaceManager::new(
            Arc::new(PortManager::new("padctl_test")),
            Arc::new(executor),
            Arc::new(RwLock::new(config)),
        );
        (Arc::new(surface), hits)
    }

    fn config_with_action(payload: &str) -> (Config, String) {
        let mut store = ActionStore::new();
        let id = store
            .add_action(Action::new("hit", ActionType::Shell).with_payload(payload).waiting(true))
            .unwrap();
        let mut config = Config::default();
        config.sync_action_store(&store);
        (config, id)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_pad_press_runs_assigned_action() {
        let (mut config, id) = config_with_action("pad");
        let mut menu = MenuLayout::new("Main");
        menu.pad_mut(2, 3).unwrap().action_id = id;
        config.menus = vec![menu];

        let (surface, hits) = surface(config);
        surface.handle_pad_event("Main", GridEvent::new(2, 3, true));
        surface.handle_pad_event("Main", GridEvent::new(2, 3, false));
        surface.handle_pad_event("Main", GridEvent::new(1, 1, true));
        surface.handle_pad_event("Other", GridEvent::new(2, 3, true));
        settle().await;

        assert_eq!(*hits.lock(), vec!["pad".to_string()]);
    }

    #[tokio::test]
    async fn test_generic_message_dispatches_matches() {
        let (mut config, id) = config_with_action("mapped");
        config.message_mappings.push(MessageMapping {
            message_type: MappingKind::Cc,
            channel: ANY_CHANNEL,
            number: 20,
            action_id: id,
            ..MessageMapping::new()
        });

        let (surface, hits) = surface(config);
        surface.handle_generic_message(&MidiMessage::control_change(4, 20, 127));
        surface.handle_generic_message(&MidiMessage::control_change(4, 20, 0));
        surface.handle_generic_message(&MidiMessage::control_change(4, 21, 127));
        settle().await;

        assert_eq!(*hits.lock(), vec!["mapped".to_string()]);
    }

    #[tokio::test]
    async fn test_listener_input_is_handled_on_the_runtime() {
        let (mut config, id) = config_with_action("queued");
        let mut menu = MenuLayout::new("Main");
        menu.pad_mut(4, 4).unwrap().action_id = id;
        config.menus = vec![menu];

        let (surface, hits) = surface(config);
        let inbound = surface.dispatcher();
        inbound
            .send(Inbound::Pad {
                menu: "Main".to_string(),
                event: GridEvent::new(4, 4, true),
            })
            .unwrap();
        settle().await;
        assert_eq!(*hits.lock(), vec!["queued".to_string()]);

        // Input arriving after the owner let go is dropped, not handled
        let weak = Arc::downgrade(&surface);
        drop(surface);
        assert!(weak.upgrade().is_none());
        let _ = inbound.send(Inbound::Message(MidiMessage::control_change(0, 1, 1)));
        settle().await;
        assert_eq!(hits.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_devices_without_ports_are_skipped() {
        let mut config = Config::default();
        config.add_device(DeviceConfig {
            kind: "classic".to_string(),
            main_menu: "Main Menu".to_string(),
            ..Default::default()
        });

        let (surface, _) = surface(config);
        surface.initialize_devices();
        assert_eq!(surface.listener_count(), 0);
        surface.shutdown();
    }
}
