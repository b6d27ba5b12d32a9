use std::fmt;

use ngxed_file::{read_config, Config, Locator, Location, Result, Server, Upstream};
use tracing::{debug, info};

use crate::cli::{Commands, EditTarget};

pub(crate) fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { config } => {
            let locator = Locator::parse(&config)?;
            read_config(&locator)?;
            println!("✅ Specified config is valid.");
            Ok(())
        }
        Commands::Print { config } => {
            let config = read_config(&Locator::parse(&config)?)?;
            print!("{config}");
            Ok(())
        }
        Commands::List { config } => {
            let config = read_config(&Locator::parse(&config)?)?;
            print!("{}", Summary(&config));
            Ok(())
        }
        Commands::AddUpstream {
            target,
            name,
            method,
            servers,
        } => edit(&target, |config| {
            let mut upstream = Upstream::new(name);
            upstream.set_method(method);
            for host_port in servers {
                upstream.add_host_port(host_port)?;
            }
            config.add_upstream(upstream)
        }),
        Commands::RemoveUpstream { target, name } => edit(&target, |config| {
            config.remove_upstream(&name).map(drop)
        }),
        Commands::AddUpstreamServer {
            target,
            upstream,
            server,
        } => edit(&target, |config| {
            config.upstream_mut(&upstream)?.add_host_port(server)
        }),
        Commands::RemoveUpstreamServer {
            target,
            upstream,
            server,
        } => edit(&target, |config| {
            config
                .upstream_mut(&upstream)?
                .remove_host_port(&server)
                .map(drop)
        }),
        Commands::SetUpstreamPort {
            target,
            upstream,
            server,
            port,
        } => edit(&target, |config| {
            config.upstream_mut(&upstream)?.replace_port(&server, port)
        }),
        Commands::SetMethod {
            target,
            upstream,
            method,
        } => edit(&target, |config| {
            config.upstream_mut(&upstream)?.set_method(method);
            Ok(())
        }),
        Commands::AddServer {
            target,
            name,
            listen,
            location,
            proxy_pass,
        } => edit(&target, |config| {
            let mut server = Server::new(name, listen);
            if let (Some(path), Some(proxy_pass)) = (location, proxy_pass) {
                server.add_location(Location::proxied(path, proxy_pass))?;
            }
            config.add_server(server)
        }),
        Commands::RemoveServer { target, name } => edit(&target, |config| {
            config.remove_server(&name).map(drop)
        }),
        Commands::AddLocation {
            target,
            server,
            path,
            proxy_pass,
        } => edit(&target, |config| {
            let location = match proxy_pass {
                Some(proxy_pass) => Location::proxied(path, proxy_pass),
                None => Location::new(path),
            };
            config.server_mut(&server)?.add_location(location)
        }),
        Commands::SetListen {
            target,
            server,
            listen,
        } => edit(&target, |config| {
            config.server_mut(&server)?.set_listen(listen);
            Ok(())
        }),
        Commands::SetProxyPass {
            target,
            server,
            path,
            proxy_pass,
        } => edit(&target, |config| {
            config
                .server_mut(&server)?
                .location_mut(&path)?
                .set_proxy_target(proxy_pass);
            Ok(())
        }),
    }
}

/// Loads the config, applies `change` and delivers the result.
///
/// The result is printed for `--dry-run` and for remote sources without
/// `--output`; otherwise it replaces `--output` or the source file.
fn edit(target: &EditTarget, change: impl FnOnce(&mut Config) -> Result<()>) -> Result<()> {
    let locator = Locator::parse(&target.config)?;
    let mut config = read_config(&locator)?;
    change(&mut config)?;

    if target.dry_run {
        debug!("dry run, printing result");
        print!("{config}");
        return Ok(());
    }

    match target.output.as_deref().or_else(|| locator.as_path()) {
        Some(path) => {
            config.write_to(path)?;
            info!(path = %path.display(), "config updated");
        }
        None => print!("{config}"),
    }
    Ok(())
}

/// One line per upstream, server and their entries.
struct Summary<'a>(&'a Config);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for upstream in self.0.upstreams() {
            write!(f, "upstream {}", upstream.name())?;
            if let Some(method) = upstream.method() {
                write!(f, " ({method})")?;
            }
            writeln!(f)?;
            for host_port in upstream.host_ports() {
                writeln!(f, "    {host_port}")?;
            }
        }

        for server in self.0.servers() {
            writeln!(f, "server {}:{}", server.name(), server.listen())?;
            for location in server.locations() {
                write!(f, "    location {}", location.path())?;
                if let Some(target) = location.proxy_target() {
                    write!(f, " -> {target}")?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}
