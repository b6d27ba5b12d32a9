//! Context-sensitive parser turning tokenizer events into a [`Config`].
//!
//! The parser keeps an explicit stack of block contexts. Every context
//! consumes the four tokenizer events and answers with a [`Step`]; a popped
//! context is finished into an entity and handed to its parent. Keywords are
//! only recognized at the start of a directive. Anything not recognized is
//! kept verbatim as free text.

use std::mem;

use tracing::{debug, trace};

use crate::{
    error::{BlockKind, Error, Result},
    tokenizer::{Event, Tokenizer},
    types::{Config, HostPort, Location, ProxyTarget, Server, Upstream},
    values::{self, is_comment, terminated_value, BALANCING_METHODS},
};

/// Parses a whole configuration. Any error aborts the parse; no partial
/// tree is returned.
pub(crate) fn parse(chars: impl Iterator<Item = char>) -> Result<Config> {
    let mut tokenizer = Tokenizer::new(chars);
    let mut parser = Parser::new();

    while let Some(event) = tokenizer.next() {
        let line = tokenizer.line();
        trace!(?event, line, "event");
        parser.feed(event, line)?;
    }

    parser.finish(tokenizer.end_line())
}

enum Step {
    Stay,
    Push(Context),
    Pop,
}

/// What a closed block hands to its parent.
enum Finished {
    Http(HttpParts),
    Upstream(Upstream),
    Server(Server),
    Location(Location),
    Opaque(String),
}

struct Parser {
    stack: Vec<Context>,
}

impl Parser {
    fn new() -> Self {
        Self {
            stack: vec![Context::Root(RootContext::new())],
        }
    }

    fn feed(&mut self, event: Event, line: usize) -> Result<()> {
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::unexpected(BlockKind::Root, line, "parser stack is empty"))?;

        let step = match event {
            Event::Whitespace(run) => {
                top.whitespace(&run);
                Step::Stay
            }
            Event::Token(token) => top.token(token, line)?,
            Event::BlockOpen => top.block_open(line)?,
            Event::BlockClose => top.block_close(line)?,
        };

        match step {
            Step::Stay => Ok(()),
            Step::Push(context) => {
                self.stack.push(context);
                Ok(())
            }
            Step::Pop => self.pop(line),
        }
    }

    fn pop(&mut self, line: usize) -> Result<()> {
        let context = self
            .stack
            .pop()
            .ok_or_else(|| Error::unexpected(BlockKind::Root, line, "parser stack is empty"))?;
        let kind = context.kind();
        let finished = context.finish(line)?;

        match self.stack.last_mut() {
            Some(parent) => parent.adopt(finished, line),
            None => Err(Error::unexpected(kind, line, "block closed twice")),
        }
    }

    fn finish(mut self, line: usize) -> Result<Config> {
        if let Some(open) = self.stack.iter().rev().find_map(Context::recognized_block) {
            let (kind, opened) = open;
            return Err(Error::unexpected(
                kind,
                line,
                format!("end of input inside the {kind} block opened on line {opened}"),
            ));
        }
        if self.stack.len() > 1 {
            return Err(Error::unexpected(
                BlockKind::Root,
                line,
                "end of input inside an unclosed block",
            ));
        }

        match self.stack.pop() {
            Some(Context::Root(root)) => root.finish(line),
            _ => Err(Error::unexpected(BlockKind::Root, line, "parser stack is empty")),
        }
    }
}

enum Context {
    Root(RootContext),
    Http(HttpContext),
    Upstream(UpstreamContext),
    Server(ServerContext),
    Location(LocationContext),
    Opaque(OpaqueBlock),
}

impl Context {
    fn kind(&self) -> BlockKind {
        match self {
            Context::Root(_) | Context::Opaque(_) => BlockKind::Root,
            Context::Http(_) => BlockKind::Http,
            Context::Upstream(_) => BlockKind::Upstream,
            Context::Server(_) => BlockKind::Server,
            Context::Location(_) => BlockKind::Location,
        }
    }

    /// Kind and opening line of a recognized block.
    fn recognized_block(&self) -> Option<(BlockKind, usize)> {
        match self {
            Context::Root(_) | Context::Opaque(_) => None,
            Context::Http(http) => Some((BlockKind::Http, http.line)),
            Context::Upstream(upstream) => Some((BlockKind::Upstream, upstream.line)),
            Context::Server(server) => Some((BlockKind::Server, server.line)),
            Context::Location(location) => Some((BlockKind::Location, location.line)),
        }
    }

    fn whitespace(&mut self, run: &str) {
        match self {
            Context::Root(root) => root.whitespace(run),
            Context::Http(http) => http.whitespace(run),
            Context::Upstream(upstream) => upstream.whitespace(run),
            Context::Server(server) => server.whitespace(run),
            Context::Location(location) => location.whitespace(run),
            Context::Opaque(opaque) => opaque.text.push_str(run),
        }
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        match self {
            Context::Root(root) => root.token(token, line),
            Context::Http(http) => http.token(token, line),
            Context::Upstream(upstream) => upstream.token(token, line),
            Context::Server(server) => server.token(token, line),
            Context::Location(location) => location.token(token, line),
            Context::Opaque(opaque) => {
                opaque.text.push_str(&token);
                Ok(Step::Stay)
            }
        }
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        match self {
            Context::Root(root) => root.block_open(line),
            Context::Http(http) => http.block_open(line),
            Context::Upstream(upstream) => upstream.block_open(line),
            Context::Server(server) => server.block_open(line),
            Context::Location(location) => location.block_open(line),
            Context::Opaque(opaque) => {
                opaque.open();
                Ok(Step::Stay)
            }
        }
    }

    fn block_close(&mut self, line: usize) -> Result<Step> {
        match self {
            Context::Root(_) => Err(Error::unexpected(
                BlockKind::Root,
                line,
                "'}' without a matching '{'",
            )),
            Context::Http(http) => http.block_close(line),
            Context::Upstream(upstream) => upstream.block_close(line),
            Context::Server(server) => server.block_close(line),
            Context::Location(location) => location.block_close(line),
            Context::Opaque(opaque) => Ok(opaque.close()),
        }
    }

    fn finish(self, line: usize) -> Result<Finished> {
        match self {
            Context::Root(_) => Err(Error::unexpected(BlockKind::Root, line, "top level closed")),
            Context::Http(http) => Ok(Finished::Http(http.finish())),
            Context::Upstream(upstream) => Ok(Finished::Upstream(upstream.finish())),
            Context::Server(server) => server.finish().map(Finished::Server),
            Context::Location(location) => Ok(Finished::Location(location.finish())),
            Context::Opaque(opaque) => Ok(Finished::Opaque(opaque.text)),
        }
    }

    fn adopt(&mut self, child: Finished, line: usize) -> Result<()> {
        match (self, child) {
            (Context::Root(root), Finished::Http(parts)) => {
                root.adopt_http(parts);
                Ok(())
            }
            (Context::Root(root), Finished::Opaque(text)) => {
                root.push_text(&text);
                root.at_start = true;
                Ok(())
            }
            (Context::Http(http), Finished::Upstream(upstream)) => http.adopt_upstream(upstream, line),
            (Context::Http(http), Finished::Server(server)) => http.adopt_server(server, line),
            (Context::Http(http), Finished::Opaque(text)) => {
                http.opaque(&text);
                http.at_start = true;
                Ok(())
            }
            (Context::Upstream(upstream), Finished::Opaque(text)) => {
                upstream.text.push(&text);
                upstream.at_start = true;
                Ok(())
            }
            (Context::Server(server), Finished::Location(location)) => {
                server.adopt_location(location, line)
            }
            (Context::Server(server), Finished::Opaque(text)) => {
                server.text.push(&text);
                server.at_start = true;
                Ok(())
            }
            (Context::Location(location), Finished::Opaque(text)) => {
                location.text.push(&text);
                location.at_start = true;
                Ok(())
            }
            (parent, _) => Err(Error::unexpected(
                parent.kind(),
                line,
                "block closed in an unexpected place",
            )),
        }
    }
}

/// Whether the directive boundary state changes after `token`: comments keep
/// it, `;` ends a directive, anything else is in the middle of one.
fn next_at_start(at_start: bool, token: &str) -> bool {
    if is_comment(token) {
        at_start
    } else {
        token.ends_with(';')
    }
}

/// Free text of a block, split into the part before and after a point.
#[derive(Default)]
struct FreeText {
    before: String,
    after: String,
    split: bool,
}

impl FreeText {
    fn current(&mut self) -> &mut String {
        if self.split {
            &mut self.after
        } else {
            &mut self.before
        }
    }

    fn push(&mut self, text: &str) {
        self.current().push_str(text);
    }

    /// Drops the whitespace run leading up to a recognized directive.
    fn trim_directive_gap(&mut self) {
        let text = self.current();
        let kept = text.trim_end().len();
        text.truncate(kept);
    }

    fn split(&mut self) {
        self.split = true;
    }

    fn finish(self) -> (String, String) {
        (
            self.before.trim().to_string(),
            self.after.trim().to_string(),
        )
    }
}

/// An unrecognized `{ ... }` block, captured verbatim.
struct OpaqueBlock {
    text: String,
    depth: usize,
}

impl OpaqueBlock {
    fn new() -> Self {
        Self {
            text: "{".to_string(),
            depth: 0,
        }
    }

    fn open(&mut self) {
        self.depth += 1;
        self.text.push('{');
    }

    fn close(&mut self) -> Step {
        self.text.push('}');
        if self.depth == 0 {
            Step::Pop
        } else {
            self.depth -= 1;
            Step::Stay
        }
    }
}

struct HttpParts {
    before: String,
    after: String,
    upstreams: Vec<Upstream>,
    servers: Vec<Server>,
}

struct RootContext {
    before: String,
    after: String,
    http: Option<(Vec<Upstream>, Vec<Server>)>,
    awaiting_open: bool,
    at_start: bool,
}

impl RootContext {
    fn new() -> Self {
        Self {
            before: String::new(),
            after: String::new(),
            http: None,
            awaiting_open: false,
            at_start: true,
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.http.is_some() {
            self.after.push_str(text);
        } else {
            self.before.push_str(text);
        }
    }

    fn whitespace(&mut self, run: &str) {
        self.push_text(run);
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        if self.awaiting_open {
            return Err(Error::unexpected(
                BlockKind::Root,
                line,
                format!("expected '{{' after `http`, found '{token}'"),
            ));
        }

        if self.at_start && token == "http" {
            if self.http.is_some() {
                return Err(Error::unexpected(
                    BlockKind::Root,
                    line,
                    "more than one `http` block",
                ));
            }
            self.awaiting_open = true;
        } else {
            self.at_start = next_at_start(self.at_start, &token);
        }

        self.push_text(&token);
        Ok(Step::Stay)
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        if self.awaiting_open {
            self.awaiting_open = false;
            self.before.push('{');
            debug!(line, "entering http block");
            return Ok(Step::Push(Context::Http(HttpContext::new(line))));
        }
        Ok(Step::Push(Context::Opaque(OpaqueBlock::new())))
    }

    fn adopt_http(&mut self, parts: HttpParts) {
        self.before.push_str(&parts.before);
        self.after.push_str(&parts.after);
        self.http = Some((parts.upstreams, parts.servers));
        self.at_start = true;
    }

    fn finish(self, line: usize) -> Result<Config> {
        if self.awaiting_open {
            return Err(Error::unexpected(
                BlockKind::Root,
                line,
                "end of input after `http`",
            ));
        }
        let Some((upstreams, servers)) = self.http else {
            return Err(Error::unexpected(BlockKind::Root, line, "no `http` block found"));
        };

        debug!(
            upstreams = upstreams.len(),
            servers = servers.len(),
            "parsed config"
        );
        Ok(Config {
            before: self.before,
            after: self.after,
            upstreams,
            servers,
        })
    }
}

enum HttpAwait {
    Directive,
    UpstreamName,
    UpstreamOpen(String),
    ServerOpen,
}

struct HttpContext {
    line: usize,
    before: String,
    after: String,
    pending: String,
    children_seen: bool,
    upstreams: Vec<Upstream>,
    servers: Vec<Server>,
    awaiting: HttpAwait,
    at_start: bool,
}

impl HttpContext {
    fn new(line: usize) -> Self {
        Self {
            line,
            before: String::new(),
            after: String::new(),
            pending: String::new(),
            children_seen: false,
            upstreams: Vec::new(),
            servers: Vec::new(),
            awaiting: HttpAwait::Directive,
            at_start: true,
        }
    }

    fn whitespace(&mut self, run: &str) {
        if let HttpAwait::Directive = self.awaiting {
            self.pending.push_str(run);
        }
    }

    /// Unrecognized text: part of `before` until the first child block, of
    /// `after` from then on.
    fn opaque(&mut self, text: &str) {
        let target = if self.children_seen {
            &mut self.after
        } else {
            &mut self.before
        };
        target.push_str(&self.pending);
        target.push_str(text);
        self.pending.clear();
    }

    /// The whitespace before the first child belongs to `before`; between
    /// children the renderer supplies the separator.
    fn enter_child(&mut self) {
        if !self.children_seen {
            self.before.push_str(&self.pending);
            self.children_seen = true;
        }
        self.pending.clear();
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        match mem::replace(&mut self.awaiting, HttpAwait::Directive) {
            HttpAwait::Directive => {
                if self.at_start && token == "upstream" {
                    self.enter_child();
                    self.awaiting = HttpAwait::UpstreamName;
                } else if self.at_start && token == "server" {
                    self.enter_child();
                    self.awaiting = HttpAwait::ServerOpen;
                } else {
                    self.at_start = next_at_start(self.at_start, &token);
                    self.opaque(&token);
                }
                Ok(Step::Stay)
            }
            HttpAwait::UpstreamName => {
                if is_comment(&token) || token.ends_with(';') {
                    return Err(Error::unexpected(
                        BlockKind::Http,
                        line,
                        format!("expected an upstream name, found '{token}'"),
                    ));
                }
                self.awaiting = HttpAwait::UpstreamOpen(token);
                Ok(Step::Stay)
            }
            HttpAwait::UpstreamOpen(name) => Err(Error::unexpected(
                BlockKind::Http,
                line,
                format!("expected '{{' after `upstream {name}`, found '{token}'"),
            )),
            HttpAwait::ServerOpen => Err(Error::unexpected(
                BlockKind::Http,
                line,
                format!("expected '{{' after `server`, found '{token}'"),
            )),
        }
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        match mem::replace(&mut self.awaiting, HttpAwait::Directive) {
            HttpAwait::Directive => Ok(Step::Push(Context::Opaque(OpaqueBlock::new()))),
            HttpAwait::UpstreamName => Err(Error::unexpected(
                BlockKind::Http,
                line,
                "`upstream` without a name",
            )),
            HttpAwait::UpstreamOpen(name) => {
                self.at_start = true;
                Ok(Step::Push(Context::Upstream(UpstreamContext::new(name, line))))
            }
            HttpAwait::ServerOpen => {
                self.at_start = true;
                Ok(Step::Push(Context::Server(ServerContext::new(line))))
            }
        }
    }

    fn block_close(&mut self, line: usize) -> Result<Step> {
        match self.awaiting {
            HttpAwait::Directive => Ok(Step::Pop),
            HttpAwait::UpstreamName | HttpAwait::UpstreamOpen(_) => Err(Error::unexpected(
                BlockKind::Http,
                line,
                "'}' inside an `upstream` header",
            )),
            HttpAwait::ServerOpen => Err(Error::unexpected(
                BlockKind::Http,
                line,
                "'}' after `server`",
            )),
        }
    }

    fn adopt_upstream(&mut self, upstream: Upstream, line: usize) -> Result<()> {
        if self.upstreams.iter().any(|existing| existing.name == upstream.name) {
            return Err(Error::unexpected(
                BlockKind::Http,
                line,
                format!("duplicate upstream '{}'", upstream.name),
            ));
        }
        self.upstreams.push(upstream);
        Ok(())
    }

    fn adopt_server(&mut self, server: Server, line: usize) -> Result<()> {
        if self.servers.iter().any(|existing| existing.name == server.name) {
            return Err(Error::unexpected(
                BlockKind::Http,
                line,
                format!("duplicate server '{}'", server.name),
            ));
        }
        self.servers.push(server);
        Ok(())
    }

    /// The closing brace and whatever precedes it go to `after`, minus the
    /// newline that the last child's template already ends with.
    fn finish(mut self) -> HttpParts {
        let after = if self.children_seen {
            let mut after = mem::take(&mut self.after);
            after.push_str(&self.pending);
            if after.starts_with('\n') {
                after.remove(0);
            }
            after.push('}');
            after
        } else {
            self.before.push_str(&self.pending);
            "}".to_string()
        };

        HttpParts {
            before: self.before,
            after,
            upstreams: self.upstreams,
            servers: self.servers,
        }
    }
}

struct UpstreamContext {
    line: usize,
    upstream: Upstream,
    text: FreeText,
    awaiting_server: bool,
    at_start: bool,
}

impl UpstreamContext {
    fn new(name: String, line: usize) -> Self {
        Self {
            line,
            upstream: Upstream::new(name),
            text: FreeText::default(),
            awaiting_server: false,
            at_start: true,
        }
    }

    fn whitespace(&mut self, run: &str) {
        if !self.awaiting_server {
            self.text.push(run);
        }
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        if self.awaiting_server {
            self.awaiting_server = false;
            return self.server_value(&token, line);
        }

        if self.at_start {
            if token == "server" {
                self.text.trim_directive_gap();
                self.awaiting_server = true;
                return Ok(Step::Stay);
            }
            if let Some(method) = BALANCING_METHODS.iter().find(|method| {
                token == **method || token.strip_suffix(';') == Some(**method)
            }) {
                let method = *method;
                if terminated_value(&token).is_none() {
                    return Err(Error::malformed(
                        BlockKind::Upstream,
                        method,
                        &token,
                        line,
                        "missing `;` terminator",
                    ));
                }
                self.text.trim_directive_gap();
                debug!(upstream = %self.upstream.name, method, "balancing method");
                self.upstream.method = Some(method.to_string());
                return Ok(Step::Stay);
            }
        }

        self.at_start = next_at_start(self.at_start, &token);
        self.text.push(&token);
        Ok(Step::Stay)
    }

    fn server_value(&mut self, token: &str, line: usize) -> Result<Step> {
        let value = terminated_value(token).ok_or_else(|| {
            Error::malformed(
                BlockKind::Upstream,
                "server",
                token,
                line,
                "missing `;` terminator (server parameters are not supported)",
            )
        })?;
        let (host, port) = values::host_port(value)
            .map_err(|reason| Error::malformed(BlockKind::Upstream, "server", value, line, reason))?;
        let host_port = HostPort::new(host, port);

        if self.upstream.host_ports.contains(&host_port) {
            return Err(Error::unexpected(
                BlockKind::Upstream,
                line,
                format!("duplicate server '{host_port}' in upstream '{}'", self.upstream.name),
            ));
        }

        debug!(upstream = %self.upstream.name, %host_port, "upstream server");
        self.upstream.host_ports.push(host_port);
        self.text.split();
        self.at_start = true;
        Ok(Step::Stay)
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        if self.awaiting_server {
            return Err(Error::unexpected(
                BlockKind::Upstream,
                line,
                "'{' where the `server` address was expected",
            ));
        }
        Ok(Step::Push(Context::Opaque(OpaqueBlock::new())))
    }

    fn block_close(&mut self, line: usize) -> Result<Step> {
        if self.awaiting_server {
            return Err(Error::unexpected(
                BlockKind::Upstream,
                line,
                "'}' where the `server` address was expected",
            ));
        }
        Ok(Step::Pop)
    }

    fn finish(self) -> Upstream {
        let (before, after) = self.text.finish();
        debug!(name = %self.upstream.name, servers = self.upstream.host_ports.len(), "upstream");
        Upstream {
            before,
            after,
            ..self.upstream
        }
    }
}

enum ServerAwait {
    Directive,
    Name,
    Listen,
    LocationPath(Vec<String>),
}

struct ServerContext {
    line: usize,
    name: Option<String>,
    listen: Option<u16>,
    locations: Vec<Location>,
    text: FreeText,
    awaiting: ServerAwait,
    at_start: bool,
}

impl ServerContext {
    fn new(line: usize) -> Self {
        Self {
            line,
            name: None,
            listen: None,
            locations: Vec::new(),
            text: FreeText::default(),
            awaiting: ServerAwait::Directive,
            at_start: true,
        }
    }

    fn whitespace(&mut self, run: &str) {
        if let ServerAwait::Directive = self.awaiting {
            self.text.push(run);
        }
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        match mem::replace(&mut self.awaiting, ServerAwait::Directive) {
            ServerAwait::Directive => {
                if self.at_start {
                    let awaiting = match token.as_str() {
                        "server_name" => Some(ServerAwait::Name),
                        "listen" => Some(ServerAwait::Listen),
                        "location" => Some(ServerAwait::LocationPath(Vec::new())),
                        _ => None,
                    };
                    if let Some(awaiting) = awaiting {
                        self.text.trim_directive_gap();
                        self.awaiting = awaiting;
                        return Ok(Step::Stay);
                    }
                }
                self.at_start = next_at_start(self.at_start, &token);
                self.text.push(&token);
                Ok(Step::Stay)
            }
            ServerAwait::Name => {
                let value = self.value("server_name", &token, line)?;
                if self.name.is_some() {
                    return Err(Error::unexpected(
                        BlockKind::Server,
                        line,
                        "more than one `server_name` directive",
                    ));
                }
                debug!(name = value, "server_name");
                self.name = Some(value.to_string());
                Ok(Step::Stay)
            }
            ServerAwait::Listen => {
                let value = self.value("listen", &token, line)?;
                let port = values::listen_port(value).map_err(|reason| {
                    Error::malformed(BlockKind::Server, "listen", value, line, reason)
                })?;
                if self.listen.is_some() {
                    return Err(Error::unexpected(
                        BlockKind::Server,
                        line,
                        "more than one `listen` directive",
                    ));
                }
                debug!(port, "listen");
                self.listen = Some(port);
                Ok(Step::Stay)
            }
            ServerAwait::LocationPath(mut parts) => {
                if is_comment(&token) || token.ends_with(';') || parts.len() == 2 {
                    return Err(Error::unexpected(
                        BlockKind::Server,
                        line,
                        format!("expected a location path followed by '{{', found '{token}'"),
                    ));
                }
                parts.push(token);
                self.awaiting = ServerAwait::LocationPath(parts);
                Ok(Step::Stay)
            }
        }
    }

    /// The `;`-stripped value of a single-valued directive; ends the directive.
    fn value<'a>(&mut self, directive: &'static str, token: &'a str, line: usize) -> Result<&'a str> {
        self.at_start = true;
        let value = terminated_value(token).ok_or_else(|| {
            Error::malformed(
                BlockKind::Server,
                directive,
                token,
                line,
                "missing `;` terminator (only a single value is supported)",
            )
        })?;
        if value.is_empty() {
            return Err(Error::malformed(BlockKind::Server, directive, token, line, "empty value"));
        }
        Ok(value)
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        match mem::replace(&mut self.awaiting, ServerAwait::Directive) {
            ServerAwait::Directive => Ok(Step::Push(Context::Opaque(OpaqueBlock::new()))),
            ServerAwait::LocationPath(parts) if !parts.is_empty() => {
                self.at_start = true;
                Ok(Step::Push(Context::Location(LocationContext::new(
                    parts.join(" "),
                    line,
                ))))
            }
            ServerAwait::LocationPath(_) => Err(Error::unexpected(
                BlockKind::Server,
                line,
                "`location` without a path",
            )),
            ServerAwait::Name | ServerAwait::Listen => Err(Error::unexpected(
                BlockKind::Server,
                line,
                "'{' where a directive value was expected",
            )),
        }
    }

    fn block_close(&mut self, line: usize) -> Result<Step> {
        match self.awaiting {
            ServerAwait::Directive => Ok(Step::Pop),
            _ => Err(Error::unexpected(
                BlockKind::Server,
                line,
                "'}' inside an unfinished directive",
            )),
        }
    }

    fn adopt_location(&mut self, location: Location, line: usize) -> Result<()> {
        if self.locations.iter().any(|existing| existing.path == location.path) {
            return Err(Error::unexpected(
                BlockKind::Server,
                line,
                format!("duplicate location '{}'", location.path),
            ));
        }
        self.locations.push(location);
        self.text.split();
        self.at_start = true;
        Ok(())
    }

    fn finish(self) -> Result<Server> {
        let Some(name) = self.name else {
            return Err(Error::unexpected(
                BlockKind::Server,
                self.line,
                "server block without `server_name`",
            ));
        };
        let Some(listen) = self.listen else {
            return Err(Error::unexpected(
                BlockKind::Server,
                self.line,
                format!("server '{name}' without `listen`"),
            ));
        };
        let (before, after) = self.text.finish();

        debug!(%name, listen, locations = self.locations.len(), "server");
        Ok(Server {
            name,
            listen,
            before,
            after,
            locations: self.locations,
        })
    }
}

struct LocationContext {
    line: usize,
    location: Location,
    text: FreeText,
    awaiting_target: bool,
    at_start: bool,
}

impl LocationContext {
    fn new(path: String, line: usize) -> Self {
        Self {
            line,
            location: Location::new(path),
            text: FreeText::default(),
            awaiting_target: false,
            at_start: true,
        }
    }

    fn whitespace(&mut self, run: &str) {
        if !self.awaiting_target {
            self.text.push(run);
        }
    }

    fn token(&mut self, token: String, line: usize) -> Result<Step> {
        if self.awaiting_target {
            self.awaiting_target = false;
            return self.proxy_pass(&token, line);
        }

        if self.at_start && token == "proxy_pass" {
            self.text.trim_directive_gap();
            self.awaiting_target = true;
            return Ok(Step::Stay);
        }

        self.at_start = next_at_start(self.at_start, &token);
        self.text.push(&token);
        Ok(Step::Stay)
    }

    fn proxy_pass(&mut self, token: &str, line: usize) -> Result<Step> {
        let value = terminated_value(token).ok_or_else(|| {
            Error::malformed(
                BlockKind::Location,
                "proxy_pass",
                token,
                line,
                "missing `;` terminator",
            )
        })?;
        let target = ProxyTarget::parse(value).map_err(|reason| {
            Error::malformed(BlockKind::Location, "proxy_pass", value, line, reason.to_string())
        })?;

        if self.location.proxy_target.is_some() {
            return Err(Error::unexpected(
                BlockKind::Location,
                line,
                format!("more than one `proxy_pass` in location '{}'", self.location.path),
            ));
        }

        debug!(path = %self.location.path, %target, "proxy_pass");
        self.location.proxy_target = Some(target);
        self.text.split();
        self.at_start = true;
        Ok(Step::Stay)
    }

    fn block_open(&mut self, line: usize) -> Result<Step> {
        if self.awaiting_target {
            return Err(Error::unexpected(
                BlockKind::Location,
                line,
                "'{' where the `proxy_pass` target was expected",
            ));
        }
        Ok(Step::Push(Context::Opaque(OpaqueBlock::new())))
    }

    fn block_close(&mut self, line: usize) -> Result<Step> {
        if self.awaiting_target {
            return Err(Error::unexpected(
                BlockKind::Location,
                line,
                "'}' where the `proxy_pass` target was expected",
            ));
        }
        Ok(Step::Pop)
    }

    fn finish(self) -> Location {
        let (before, after) = self.text.finish();
        Location {
            before,
            after,
            ..self.location
        }
    }
}
