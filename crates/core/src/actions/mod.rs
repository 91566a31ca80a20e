pub mod action;
pub mod action_store;
pub mod executor;
pub mod handlers;
