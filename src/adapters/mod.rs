pub mod email;
pub mod gateway_client;
pub mod webhook;
