use colored::*;
use pnet::datalink::{self, NetworkInterface};
use sonar_common::config::Config;
use sonar_common::network::interface::is_viable_multicast_interface;

use crate::mprint;
use crate::terminal::network_fmt;

pub fn interfaces(cfg: &Config) {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    for (idx, interface) in interfaces.iter().enumerate() {
        let status: ColoredString = match is_viable_multicast_interface(interface) {
            Ok(()) => "usable".green().bold(),
            Err(reason) => reason.to_string().dimmed(),
        };
        network_fmt::print_interface(interface, idx, status);
        if cfg.quiet == 0 && idx + 1 != interfaces.len() {
            mprint!();
        }
    }
}
