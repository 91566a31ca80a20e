//! MIDI endpoint discovery, output and input listeners.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
};
use padctl_core::{MessageSender, MidiMessage, PadColor, PortError};
use parking_lot::{Mutex, RwLock};

use crate::midi::{DeviceKind, GridEvent};

/// Owns output connections and opens input listeners by port name.
///
/// Enumeration and sends share the driver lock; [`PortManager::reset`] takes
/// it exclusively. Output connections are opened on first use and cached.
pub struct PortManager {
    client_name: String,
    driver: RwLock<()>,
    outputs: Mutex<HashMap<String, MidiOutputConnection>>,
}

impl PortManager {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            driver: RwLock::new(()),
            outputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn list_inputs(&self) -> Result<Vec<String>, PortError> {
        let _driver = self.driver.read();
        let midi_in = self.input_client()?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect())
    }

    pub fn list_outputs(&self) -> Result<Vec<String>, PortError> {
        let _driver = self.driver.read();
        let midi_out = self.output_client()?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect())
    }

    /// Close every cached output so the next send reopens it.
    pub fn reset(&self) {
        let _driver = self.driver.write();
        let closed = self.outputs.lock().drain().count();
        if closed > 0 {
            log::debug!("Closed {} cached MIDI output(s)", closed);
        }
    }

    /// Deliver one message to the named output.
    ///
    /// A failed send drops the cached connection, so retrying after the port
    /// comes back works.
    pub fn send_message(&self, port: &str, message: &MidiMessage) -> Result<(), PortError> {
        let _driver = self.driver.read();
        let mut outputs = self.outputs.lock();

        let connection = match outputs.entry(port.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.open_output(port)?),
        };

        log::trace!("{} <- {}", port, message);
        if let Err(e) = connection.send(&message.to_bytes()) {
            outputs.remove(port);
            return Err(PortError::Send {
                port: port.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// Send the activation sequence for `kind`. No-op without a port.
    pub fn activate(&self, port: &str, kind: DeviceKind) -> Result<(), PortError> {
        self.send_all(port, &kind.activation())
    }

    pub fn clear_all(&self, port: &str, kind: DeviceKind) -> Result<(), PortError> {
        self.send_all(port, &kind.clear_all())
    }

    pub fn set_pad_color(
        &self,
        port: &str,
        kind: DeviceKind,
        row: u8,
        col: u8,
        color: PadColor,
    ) -> Result<(), PortError> {
        match kind.set_pad_color(row, col, color) {
            Some(message) if !port.is_empty() => self.send_message(port, &message),
            _ => Ok(()),
        }
    }

    /// Listen on a grid device, delivering decoded presses and releases.
    pub fn start_listening<F>(
        &self,
        port: &str,
        kind: DeviceKind,
        on_event: F,
    ) -> Result<ListenerHandle, PortError>
    where
        F: Fn(GridEvent) + Send + 'static,
    {
        self.listen(port, Ignore::All, move |message| {
            if let Some(event) = kind.decode(&message) {
                on_event(event);
            }
        })
    }

    /// Listen on any device, delivering every parsed message.
    pub fn start_generic_listening<F>(
        &self,
        port: &str,
        on_message: F,
    ) -> Result<ListenerHandle, PortError>
    where
        F: Fn(MidiMessage) + Send + 'static,
    {
        self.listen(port, Ignore::TimeAndActiveSense, on_message)
    }

    fn listen<F>(
        &self,
        port: &str,
        ignore: Ignore,
        on_message: F,
    ) -> Result<ListenerHandle, PortError>
    where
        F: Fn(MidiMessage) + Send + 'static,
    {
        let _driver = self.driver.read();
        let mut midi_in = self.input_client()?;
        midi_in.ignore(ignore);

        let input_port = find_input(&midi_in, port)?;
        let connection = midi_in
            .connect(
                &input_port,
                "padctl-input",
                move |_timestamp, bytes, _| {
                    if let Some(message) = MidiMessage::from_bytes(bytes) {
                        on_message(message);
                    }
                },
                (),
            )
            .map_err(|e| PortError::Connect {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Listening on {}", port);
        Ok(ListenerHandle {
            port: port.to_string(),
            connection: Mutex::new(Some(connection)),
        })
    }

    fn send_all(&self, port: &str, messages: &[MidiMessage]) -> Result<(), PortError> {
        if port.is_empty() {
            return Ok(());
        }
        messages
            .iter()
            .try_for_each(|message| self.send_message(port, message))
    }

    fn open_output(&self, port: &str) -> Result<MidiOutputConnection, PortError> {
        let midi_out = self.output_client()?;
        let output_port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).map(|n| n == port).unwrap_or(false))
            .ok_or_else(|| PortError::NotFound(port.to_string()))?;

        log::debug!("Opening MIDI output {}", port);
        midi_out
            .connect(&output_port, "padctl-output")
            .map_err(|e| PortError::Connect {
                port: port.to_string(),
                reason: e.to_string(),
            })
    }

    fn input_client(&self) -> Result<MidiInput, PortError> {
        MidiInput::new(&format!("{}_in", self.client_name))
            .map_err(|e| PortError::Init(e.to_string()))
    }

    fn output_client(&self) -> Result<MidiOutput, PortError> {
        MidiOutput::new(&format!("{}_out", self.client_name))
            .map_err(|e| PortError::Init(e.to_string()))
    }
}

impl MessageSender for PortManager {
    fn send(&self, port_name: &str, message: &MidiMessage) -> Result<(), PortError> {
        self.send_message(port_name, message)
    }
}

fn find_input(midi_in: &MidiInput, name: &str) -> Result<MidiInputPort, PortError> {
    midi_in
        .ports()
        .into_iter()
        .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| PortError::NotFound(name.to_string()))
}

/// Keeps an input listener alive. Dropping it stops the listener.
pub struct ListenerHandle {
    port: String,
    connection: Mutex<Option<MidiInputConnection<()>>>,
}

impl ListenerHandle {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_active(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Detach the input stream. Returns once the driver has stopped
    /// delivering; calling it again does nothing.
    pub fn stop(&self) {
        if let Some(connection) = self.connection.lock().take() {
            connection.close();
            log::info!("Stopped listening on {}", self.port);
        }
    }

    #[cfg(test)]
    fn inactive(port: &str) -> Self {
        Self {
            port: port.to_string(),
            connection: Mutex::new(None),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let handle = ListenerHandle::inactive("Pad In");
        assert!(!handle.is_active());
        handle.stop();
        handle.stop();
        assert_eq!(handle.port(), "Pad In");
    }

    #[test]
    fn test_empty_port_is_a_no_op() {
        let ports = PortManager::new("padctl_test");
        assert_ok!(ports.activate("", DeviceKind::Colorful));
        assert_ok!(ports.set_pad_color("", DeviceKind::Classic, 1, 1, PadColor::new(127, 0, 0)));
    }

    #[test]
    fn test_generic_device_sends_nothing() {
        let ports = PortManager::new("padctl_test");
        // No messages means the port is never resolved
        assert_ok!(ports.activate("no such port", DeviceKind::Generic));
        assert_ok!(ports.clear_all("no such port", DeviceKind::Generic));
    }

    #[test]
    fn test_unknown_port_is_recoverable() {
        let ports = PortManager::new("padctl_test");
        let err = ports
            .send_message("padctl no such port", &MidiMessage::note_on(0, 60, 100))
            .unwrap_err();
        // Hosts without a MIDI backend fail at client creation instead
        assert!(matches!(err, PortError::NotFound(_) | PortError::Init(_)));

        let err = ports
            .start_generic_listening("padctl no such port", |_| {})
            .err()
            .unwrap();
        assert!(matches!(err, PortError::NotFound(_) | PortError::Init(_)));
    }
}
