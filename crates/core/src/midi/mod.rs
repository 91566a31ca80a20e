pub mod message_mapping;
pub mod midi;
