pub use actions::action::{Action, ActionGroup, ActionType};
pub use actions::action_store::{ActionStore, TreeItem, TreeNode};
pub use actions::executor::ActionExecutor;
pub use actions::handlers::{
    ActionHandler, MidiSendHandler, MidiSendKind, MidiSendPayload, ScriptHandler, ShellHandler,
    SleepHandler,
};
pub use config::{Config, ConfigError, ConfigManager, DeviceConfig, DEVICE_KINDS};
pub use error::{ActionError, PortError, TreeError};
pub use layout::{
    classic_levels, classic_preview, intensity_level, level_127_to_4, level_to_127, MenuLayout,
    PadColor, PadColorConfig, GRID_SIZE, NEAR_BLACK,
};
pub use midi::message_mapping::{matching_actions, MappingKind, MessageMapping, ANY_CHANNEL};
pub use midi::midi::{MessageSender, MidiMessage};

mod actions;
mod config;
mod error;
mod layout;
mod midi;
