use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
};

use crate::engine::ihash;

/// Bind address override for the coordinator.
pub const COORDINATOR_ADDR_ENV: &str = "MR_COORDINATOR_ADDR";
/// Base URL override for workers and the client.
pub const COORDINATOR_URL_ENV: &str = "MR_COORDINATOR_URL";

const PORT_BASE: u16 = 20_000;
const PORT_SPAN: u32 = 20_000;

/// Port derived from the user name, so two users on one host get different
/// coordinators while every process of the same user agrees on it.
pub fn port_for_user(user: &str) -> u16 {
    PORT_BASE + (ihash(user) % PORT_SPAN) as u16
}

pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port_for_user(&whoami::username())))
}

/// URL the workers and the client talk to.
/// - `MR_COORDINATOR_URL` if set
/// - otherwise `http://127.0.0.1:<per-user port>`
pub fn coordinator_base_url() -> String {
    env::var(COORDINATOR_URL_ENV).unwrap_or_else(|_| format!("http://{}", default_listen_addr()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_stable_and_in_range() {
        let a = port_for_user("alice");
        assert_eq!(a, port_for_user("alice"));
        assert!((20_000..40_000).contains(&a));
        assert_ne!(port_for_user("alice"), port_for_user("bob"));
    }

    #[test]
    fn port_follows_the_partition_hash() {
        assert_eq!(port_for_user("alice"), 39_175);
        assert_eq!(port_for_user("bob"), 39_412);
    }
}
