use quill_common::pagination::PageSize;
use serde::Deserialize;
use std::net::IpAddr;

/// Process configuration, read from the environment (and `.env`).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    /// Without a database URL posts are kept in memory only.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

/// The part of the configuration request handlers see.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Settings {
    pub page_size: PageSize,
    /// Where anonymous visitors of login-only pages are sent.
    pub login_url: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_login_url() -> String {
    "/auth/login/".to_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            login_url: default_login_url(),
        }
    }
}

impl From<&Env> for Settings {
    fn from(env: &Env) -> Self {
        Self {
            page_size: env.page_size,
            login_url: env.login_url.clone(),
        }
    }
}
