//! Application services - Business logic orchestration

pub mod autoresponder_service;
pub mod command_service;
pub mod dehoist_service;
pub mod interval_service;
pub mod message_service;
pub mod poller;

pub use autoresponder_service::AutoresponderService;
pub use command_service::{AdminPolicy, CommandService};
pub use dehoist_service::DehoistService;
pub use interval_service::IntervalService;
pub use message_service::MessageService;
pub use poller::ChannelPoller;
