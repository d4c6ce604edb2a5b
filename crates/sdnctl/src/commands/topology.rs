//! Link and host listings.

use tabled::Tabled;

use sdnctl_core::{Controller, Host, Link, PortRef};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn port(p: &PortRef) -> String {
    match &p.name {
        Some(name) => format!("{}:{} ({name})", p.dpid.to_hex(), p.port_no),
        None => format!("{}:{}", p.dpid.to_hex(), p.port_no),
    }
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Source")]
    src: String,
    #[tabled(rename = "Destination")]
    dst: String,
}

impl From<&Link> for LinkRow {
    fn from(l: &Link) -> Self {
        Self {
            src: port(&l.src),
            dst: port(&l.dst),
        }
    }
}

#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IPv4")]
    ipv4: String,
    #[tabled(rename = "IPv6")]
    ipv6: String,
    #[tabled(rename = "Port")]
    port: String,
}

impl From<&Host> for HostRow {
    fn from(h: &Host) -> Self {
        let join = |addrs: Vec<String>| addrs.join(", ");
        Self {
            mac: h.mac.to_string(),
            ipv4: join(h.ipv4.iter().map(ToString::to_string).collect()),
            ipv6: join(h.ipv6.iter().map(ToString::to_string).collect()),
            port: port(&h.port),
        }
    }
}

pub fn links(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let topology = controller.topology();
    let out = output::render_list(&global.output, &topology.links, |l| LinkRow::from(l), |l| {
        format!("{} {}", port(&l.src), port(&l.dst))
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn hosts(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let topology = controller.topology();
    let out = output::render_list(&global.output, &topology.hosts, |h| HostRow::from(h), |h| {
        h.mac.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
