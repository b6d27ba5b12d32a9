//! Renders the model back into configuration text.
//!
//! Each entity has a fixed template. Free text is emitted on its own line at
//! the entity's directive indentation and only when non-empty. A file laid
//! out the same way parses and renders back byte for byte.

use std::fmt::{self, Display, Formatter, Write};

use crate::types::{Config, HostPort, Location, ProxyTarget, Server, Upstream};

/// Indentation of `upstream` and `server` blocks inside `http`.
const CHILD_INDENT: &str = "    ";
/// Indentation of directives inside `upstream` and `server` blocks.
const DIRECTIVE_INDENT: &str = "        ";
/// Indentation of directives inside `location` blocks.
const LOCATION_INDENT: &str = "            ";

fn write_free_text(f: &mut Formatter<'_>, indent: &str, text: &str) -> fmt::Result {
    if text.is_empty() {
        return Ok(());
    }
    writeln!(f, "{indent}{text}")
}

/// Writes what `before` lacks for the first child to start on its own line
/// at `CHILD_INDENT`, e.g. after an `http` block that had no children.
fn write_first_child_lead(f: &mut Formatter<'_>, before: &str) -> fmt::Result {
    if before.is_empty() {
        return Ok(());
    }
    let gap = &before[before.trim_end().len()..];
    if gap.ends_with('\n') {
        f.write_str(CHILD_INDENT)
    } else if gap.contains('\n') {
        Ok(())
    } else {
        f.write_char('\n')?;
        f.write_str(CHILD_INDENT)
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.before)?;
        if !self.upstreams.is_empty() || !self.servers.is_empty() {
            write_first_child_lead(f, &self.before)?;
        }

        let upstreams = self.upstreams.iter().map(|upstream| upstream as &dyn Display);
        let servers = self.servers.iter().map(|server| server as &dyn Display);
        for (index, child) in upstreams.chain(servers).enumerate() {
            if index > 0 {
                f.write_char('\n')?;
                f.write_str(CHILD_INDENT)?;
            }
            write!(f, "{child}")?;
        }

        f.write_str(&self.after)
    }
}

impl Display for Upstream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "upstream {} {{", self.name)?;
        write_free_text(f, DIRECTIVE_INDENT, &self.before)?;
        if let Some(method) = &self.method {
            writeln!(f, "{DIRECTIVE_INDENT}{method};")?;
            if !self.host_ports.is_empty() {
                writeln!(f)?;
            }
        }
        for host_port in &self.host_ports {
            writeln!(f, "{DIRECTIVE_INDENT}server {host_port};")?;
        }
        write_free_text(f, DIRECTIVE_INDENT, &self.after)?;
        writeln!(f, "{CHILD_INDENT}}}")
    }
}

impl Display for HostPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Display for Server {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "server {{")?;
        writeln!(f, "{DIRECTIVE_INDENT}server_name {};", self.name)?;
        writeln!(f, "{DIRECTIVE_INDENT}listen {};", self.listen)?;
        write_free_text(f, DIRECTIVE_INDENT, &self.before)?;
        for location in &self.locations {
            write!(f, "{location}")?;
        }
        write_free_text(f, DIRECTIVE_INDENT, &self.after)?;
        writeln!(f, "{CHILD_INDENT}}}")
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{DIRECTIVE_INDENT}location {} {{", self.path)?;
        write_free_text(f, LOCATION_INDENT, &self.before)?;
        if let Some(target) = &self.proxy_target {
            writeln!(f, "{LOCATION_INDENT}proxy_pass {target};")?;
        }
        write_free_text(f, LOCATION_INDENT, &self.after)?;
        writeln!(f, "{DIRECTIVE_INDENT}}}")
    }
}

impl Display for ProxyTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, HostPort, Location, Server, Upstream};

    #[test]
    fn test_render_new_upstream() {
        let mut upstream = Upstream::new("backend");
        upstream.set_method(Some("least_conn".to_string()));
        upstream.add_host_port(HostPort::new("h1", 8180)).unwrap();
        upstream.add_host_port(HostPort::new("h2", 8280)).unwrap();

        assert_eq!(
            upstream.to_string(),
            "upstream backend {\n        least_conn;\n\n        server h1:8180;\n        server h2:8280;\n    }\n"
        );
    }

    #[test]
    fn test_render_upstream_without_method_or_servers() {
        assert_eq!(Upstream::new("empty").to_string(), "upstream empty {\n    }\n");
    }

    #[test]
    fn test_render_new_server() {
        let mut server = Server::new("worker03", 8080);
        server
            .add_location(Location::proxied("/", "http://localhost:8380/".parse().unwrap()))
            .unwrap();

        assert_eq!(
            server.to_string(),
            "server {\n        server_name worker03;\n        listen 8080;\n        location / {\n            proxy_pass http://localhost:8380/;\n        }\n    }\n"
        );
    }

    #[test]
    fn test_render_location_without_target() {
        assert_eq!(
            Location::new("/static").to_string(),
            "        location /static {\n        }\n"
        );
    }

    #[test]
    fn test_render_first_child_after_inline_open_brace() {
        let mut config = Config {
            before: "http {".to_string(),
            after: "}\n".to_string(),
            ..Config::default()
        };
        config.add_upstream(Upstream::new("a")).unwrap();

        assert_eq!(config.to_string(), "http {\n    upstream a {\n    }\n}\n");
    }

    #[test]
    fn test_render_config_separates_children() {
        let mut config = Config {
            before: "http {\n    ".to_string(),
            after: "}\n".to_string(),
            ..Config::default()
        };
        config.add_upstream(Upstream::new("a")).unwrap();
        config.add_server(Server::new("w", 80)).unwrap();

        assert_eq!(
            config.to_string(),
            "http {\n    upstream a {\n    }\n\n    server {\n        server_name w;\n        listen 80;\n    }\n}\n"
        );
    }
}
