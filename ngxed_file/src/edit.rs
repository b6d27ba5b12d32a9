//! In-place mutation of a parsed [`Config`].
//!
//! Every insertion goes through [`order::insert_ordered`]; missing keys are
//! [`Error::NotFound`] and duplicate keys [`Error::AlreadyExists`].

use tracing::debug;

use crate::{
    error::{Error, Result},
    order,
    types::{Config, HostPort, Location, ProxyTarget, Server, Upstream},
};

impl Config {
    pub fn upstream(&self, name: &str) -> Result<&Upstream> {
        self.upstreams
            .iter()
            .find(|upstream| upstream.name == name)
            .ok_or_else(|| Error::not_found("upstream", name))
    }

    pub fn upstream_mut(&mut self, name: &str) -> Result<&mut Upstream> {
        self.upstreams
            .iter_mut()
            .find(|upstream| upstream.name == name)
            .ok_or_else(|| Error::not_found("upstream", name))
    }

    pub fn add_upstream(&mut self, upstream: Upstream) -> Result<()> {
        if self.upstream(&upstream.name).is_ok() {
            return Err(Error::already_exists("upstream", &upstream.name));
        }
        debug!(name = %upstream.name, "adding upstream");
        order::insert_ordered(&mut self.upstreams, upstream, order::by_upstream_name);
        Ok(())
    }

    pub fn remove_upstream(&mut self, name: &str) -> Result<Upstream> {
        let index = self
            .upstreams
            .iter()
            .position(|upstream| upstream.name == name)
            .ok_or_else(|| Error::not_found("upstream", name))?;
        debug!(name, "removing upstream");
        Ok(self.upstreams.remove(index))
    }

    pub fn server(&self, name: &str) -> Result<&Server> {
        self.servers
            .iter()
            .find(|server| server.name == name)
            .ok_or_else(|| Error::not_found("server", name))
    }

    pub fn server_mut(&mut self, name: &str) -> Result<&mut Server> {
        self.servers
            .iter_mut()
            .find(|server| server.name == name)
            .ok_or_else(|| Error::not_found("server", name))
    }

    pub fn add_server(&mut self, server: Server) -> Result<()> {
        if self.server(&server.name).is_ok() {
            return Err(Error::already_exists("server", &server.name));
        }
        debug!(name = %server.name, listen = server.listen, "adding server");
        order::insert_ordered(&mut self.servers, server, order::by_server_name);
        Ok(())
    }

    pub fn remove_server(&mut self, name: &str) -> Result<Server> {
        let index = self
            .servers
            .iter()
            .position(|server| server.name == name)
            .ok_or_else(|| Error::not_found("server", name))?;
        debug!(name, "removing server");
        Ok(self.servers.remove(index))
    }

    /// Sorts every collection, nested ones included, by its named ordering.
    pub fn sort_all(&mut self) {
        self.upstreams.sort_by(order::by_upstream_name);
        for upstream in &mut self.upstreams {
            upstream.host_ports.sort_by(order::by_host_then_port);
        }
        self.servers.sort_by(order::by_server_name);
        for server in &mut self.servers {
            server.locations.sort_by(order::by_location_path);
        }
    }
}

impl Upstream {
    /// Sets or clears the balancing method, e.g. `least_conn`.
    pub fn set_method(&mut self, method: Option<String>) {
        self.method = method;
    }

    pub fn add_host_port(&mut self, host_port: HostPort) -> Result<()> {
        if self.host_ports.contains(&host_port) {
            return Err(Error::already_exists("server", &host_port));
        }
        debug!(upstream = %self.name, %host_port, "adding upstream server");
        order::insert_ordered(&mut self.host_ports, host_port, order::by_host_then_port);
        Ok(())
    }

    pub fn remove_host_port(&mut self, host_port: &HostPort) -> Result<HostPort> {
        let index = self
            .host_ports
            .iter()
            .position(|existing| existing == host_port)
            .ok_or_else(|| Error::not_found("server", host_port))?;
        debug!(upstream = %self.name, %host_port, "removing upstream server");
        Ok(self.host_ports.remove(index))
    }

    /// Moves `host_port` to `port`, re-inserting it at its ordered position.
    pub fn replace_port(&mut self, host_port: &HostPort, port: u16) -> Result<()> {
        let replacement = HostPort::new(host_port.host.clone(), port);
        if replacement != *host_port && self.host_ports.contains(&replacement) {
            return Err(Error::already_exists("server", &replacement));
        }
        self.remove_host_port(host_port)?;
        order::insert_ordered(&mut self.host_ports, replacement, order::by_host_then_port);
        Ok(())
    }
}

impl Server {
    pub fn set_listen(&mut self, listen: u16) {
        self.listen = listen;
    }

    pub fn location(&self, path: &str) -> Result<&Location> {
        self.locations
            .iter()
            .find(|location| location.path == path)
            .ok_or_else(|| Error::not_found("location", path))
    }

    pub fn location_mut(&mut self, path: &str) -> Result<&mut Location> {
        self.locations
            .iter_mut()
            .find(|location| location.path == path)
            .ok_or_else(|| Error::not_found("location", path))
    }

    pub fn add_location(&mut self, location: Location) -> Result<()> {
        if self.location(&location.path).is_ok() {
            return Err(Error::already_exists("location", &location.path));
        }
        debug!(server = %self.name, path = %location.path, "adding location");
        order::insert_ordered(&mut self.locations, location, order::by_location_path);
        Ok(())
    }

    pub fn remove_location(&mut self, path: &str) -> Result<Location> {
        let index = self
            .locations
            .iter()
            .position(|location| location.path == path)
            .ok_or_else(|| Error::not_found("location", path))?;
        debug!(server = %self.name, path, "removing location");
        Ok(self.locations.remove(index))
    }
}

impl Location {
    pub fn set_proxy_target(&mut self, target: ProxyTarget) {
        self.proxy_target = Some(target);
    }
}
