pub mod common;
pub mod server;
pub mod servers;

pub use server::{
    new_handle, with_env, with_network, with_network_alias, Config, LaunchRequest, RequestOption,
    RequestOptions, Server,
};
pub use test::{Test, TestInstance};
