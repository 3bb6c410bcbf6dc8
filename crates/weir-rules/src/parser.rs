use crate::ast::{
    Action, Direction, FilterConditions, FilterRule, IpAddresses, IpVersion, Ruleset, Transport,
};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{SourceLocation, Token, TokenKind};
use ipnet::{Ipv4Net, Ipv6Net};
use tracing::trace;

/// Recursive-descent parser over the token stream. One token of lookahead,
/// no backtracking.
///
/// Grammar:
///
/// ```text
/// ruleset     := filter* EOF
/// filter      := action direction conditions
/// action      := "permit" | "block"
/// direction   := "in" | "out"
/// conditions  := "all" | (ipver? ("proto" proto)? ("from" src)? ("to" dst)?)
/// ipver       := "inet" | "inet6"
/// proto       := "tcp" | "udp" | "{" proto_list "}"
/// src         := String | addr_and_ports
/// dst         := addr_and_ports
/// addr_and_ports := (addr | "{" addr_list "}")? ("port" (Number | "{" number_list "}"))?
/// ```
///
/// `addr_and_ports` must contain at least an address part or a port part.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token()?;
        Ok(Self { lexer, lookahead })
    }

    /// Parse the whole stream into a ruleset. Rules come out in authoring
    /// order; a failure anywhere yields nothing.
    pub fn parse(mut self) -> Result<Ruleset, ParseError> {
        let mut filters = Vec::new();
        while !self.peek(TokenKind::EndOfInput) {
            filters.push(self.filter()?);
        }
        Ok(Ruleset { filters })
    }

    fn filter(&mut self) -> Result<FilterRule, ParseError> {
        let start = self.lookahead.location;

        let action = match self
            .match_any(&[TokenKind::BlockAction, TokenKind::PermitAction])?
        {
            Some(token) if token.kind == TokenKind::BlockAction => Action::Block,
            Some(_) => Action::Permit,
            None => return Err(self.unexpected_token()),
        };

        let direction = match self.match_any(&[TokenKind::InDir, TokenKind::OutDir])? {
            Some(token) if token.kind == TokenKind::InDir => Direction::In,
            Some(_) => Direction::Out,
            None => return Err(self.unexpected_token()),
        };

        let conditions = self.conditions()?;
        validate(&conditions, start)?;

        let rule = FilterRule {
            action,
            direction,
            conditions,
        };
        trace!(%rule, "parsed filter");
        Ok(rule)
    }

    fn conditions(&mut self) -> Result<FilterConditions, ParseError> {
        // The literal `all` is exactly the no-conditions value.
        if self.match_kind(TokenKind::All)?.is_some() {
            return Ok(FilterConditions::none());
        }

        let mut conditions = FilterConditions::none();

        if self.match_kind(TokenKind::Inet4)?.is_some() {
            conditions.ip_version = IpVersion::V4Only;
        } else if self.match_kind(TokenKind::Inet6)?.is_some() {
            conditions.ip_version = IpVersion::V6Only;
        }

        if self.match_kind(TokenKind::Proto)?.is_some() {
            conditions.transport = self.transport_protocol()?;
        }

        if self.match_kind(TokenKind::From)?.is_some() {
            self.source_condition(&mut conditions)?;
        }

        if self.match_kind(TokenKind::To)?.is_some() {
            let (ips, ports) = self.addr_and_ports()?;
            conditions.dest_ips = ips;
            conditions.dest_ports = ports;
        }

        Ok(conditions)
    }

    fn transport_protocol(&mut self) -> Result<Transport, ParseError> {
        if !self.peek(TokenKind::LBrack) {
            return match self
                .match_any(&[TokenKind::TcpTransport, TokenKind::UdpTransport])?
            {
                Some(token) if token.kind == TokenKind::TcpTransport => Ok(Transport::Tcp),
                Some(_) => Ok(Transport::Udp),
                None => Err(self.unexpected_token()),
            };
        }

        let list_start = self.lookahead.location;
        let entries = self.list(&[TokenKind::TcpTransport, TokenKind::UdpTransport])?;
        if entries.len() > 2 {
            return Err(ParseError::at(
                list_start,
                "Expected at most 2 values in transport protocol list",
            ));
        }

        let has_tcp = entries.iter().any(|t| t.kind == TokenKind::TcpTransport);
        let has_udp = entries.iter().any(|t| t.kind == TokenKind::UdpTransport);
        Ok(match (has_tcp, has_udp) {
            (true, false) => Transport::Tcp,
            (false, true) => Transport::Udp,
            // Both present, or an empty list, constrain nothing.
            _ => Transport::All,
        })
    }

    fn source_condition(&mut self, conditions: &mut FilterConditions) -> Result<(), ParseError> {
        // A quoted string names the source application; the grammar accepts
        // no further source fields after it.
        if let Some(app) = self.match_kind(TokenKind::String)? {
            conditions.source_app = Some(app.text);
            return Ok(());
        }

        let (ips, ports) = self.addr_and_ports()?;
        conditions.source_ips = ips;
        conditions.source_ports = ports;
        Ok(())
    }

    fn addr_and_ports(&mut self) -> Result<(IpAddresses, Vec<u16>), ParseError> {
        let start = self.lookahead.location;
        let mut ips = IpAddresses::default();
        let mut saw_addresses = false;

        if self.peek(TokenKind::LBrack) {
            for token in self.list(&[TokenKind::Ipv4Address, TokenKind::Ipv6Address])? {
                push_address(&mut ips, &token)?;
            }
            saw_addresses = true;
        } else if let Some(token) =
            self.match_any(&[TokenKind::Ipv4Address, TokenKind::Ipv6Address])?
        {
            push_address(&mut ips, &token)?;
            saw_addresses = true;
        }

        let mut ports = Vec::new();
        let mut saw_ports = false;
        if self.match_kind(TokenKind::Port)?.is_some() {
            if self.peek(TokenKind::LBrack) {
                for token in self.list(&[TokenKind::Number])? {
                    ports.push(parse_port(&token)?);
                }
            } else {
                let token = self.must_match(TokenKind::Number)?;
                ports.push(parse_port(&token)?);
            }
            saw_ports = true;
        }

        if !saw_addresses && !saw_ports {
            return Err(ParseError::at(start, "Expected an address or a port"));
        }
        Ok((ips, ports))
    }

    /// `{` element (`,` element)* `}` with every element drawn from
    /// `kinds`. An empty `{}` yields an empty sequence; trailing or doubled
    /// commas do not parse.
    fn list(&mut self, kinds: &[TokenKind]) -> Result<Vec<Token>, ParseError> {
        self.must_match(TokenKind::LBrack)?;

        let mut elements = Vec::new();
        if self.match_kind(TokenKind::RBrack)?.is_some() {
            return Ok(elements);
        }

        loop {
            elements.push(self.must_match_any(kinds)?);
            if self.match_kind(TokenKind::Comma)?.is_none() {
                break;
            }
        }

        self.must_match(TokenKind::RBrack)?;
        Ok(elements)
    }

    // ── token machinery ──────────────────────────────────────────────────

    fn peek(&self, kind: TokenKind) -> bool {
        self.lookahead.kind == kind
    }

    fn consume(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn match_kind(&mut self, kind: TokenKind) -> Result<Option<Token>, ParseError> {
        if self.peek(kind) {
            Ok(Some(self.consume()?))
        } else {
            Ok(None)
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> Result<Option<Token>, ParseError> {
        for kind in kinds {
            if self.peek(*kind) {
                return Ok(Some(self.consume()?));
            }
        }
        Ok(None)
    }

    fn must_match(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.match_kind(kind)? {
            Some(token) => Ok(token),
            None => Err(self.unexpected_token()),
        }
    }

    fn must_match_any(&mut self, kinds: &[TokenKind]) -> Result<Token, ParseError> {
        match self.match_any(kinds)? {
            Some(token) => Ok(token),
            None => Err(self.unexpected_token()),
        }
    }

    fn unexpected_token(&self) -> ParseError {
        ParseError::at(
            self.lookahead.location,
            format!("Unexpected token: {}", self.lookahead),
        )
    }
}

fn push_address(ips: &mut IpAddresses, token: &Token) -> Result<(), ParseError> {
    let invalid =
        || ParseError::at(token.location, format!("Invalid ip address: {}", token.text));
    match token.kind {
        TokenKind::Ipv4Address => {
            let net = parse_v4_net(&token.text).ok_or_else(invalid)?;
            ips.v4.push(net);
        }
        TokenKind::Ipv6Address => {
            let net = parse_v6_net(&token.text).ok_or_else(invalid)?;
            ips.v6.push(net);
        }
        _ => return Err(invalid()),
    }
    Ok(())
}

fn parse_v4_net(text: &str) -> Option<Ipv4Net> {
    match text.split_once('/') {
        Some((addr, prefix)) => {
            Ipv4Net::new(addr.parse().ok()?, prefix.parse().ok()?).ok()
        }
        // Bare addresses carry the host mask.
        None => Ipv4Net::new(text.parse().ok()?, 32).ok(),
    }
}

fn parse_v6_net(text: &str) -> Option<Ipv6Net> {
    match text.split_once('/') {
        Some((addr, prefix)) => {
            Ipv6Net::new(addr.parse().ok()?, prefix.parse().ok()?).ok()
        }
        None => Ipv6Net::new(text.parse().ok()?, 128).ok(),
    }
}

fn parse_port(token: &Token) -> Result<u16, ParseError> {
    token.text.parse::<u16>().map_err(|_| {
        ParseError::at(
            token.location,
            format!("Invalid port number: {}", token.text),
        )
    })
}

fn validate(conditions: &FilterConditions, location: SourceLocation) -> Result<(), ParseError> {
    let has_v4 = !conditions.source_ips.v4.is_empty() || !conditions.dest_ips.v4.is_empty();
    let has_v6 = !conditions.source_ips.v6.is_empty() || !conditions.dest_ips.v6.is_empty();

    if conditions.ip_version == IpVersion::V4Only && has_v6 {
        return Err(ParseError::at(
            location,
            "Ip version is set to Inet4 yet ipv6 ips are present",
        ));
    }
    if conditions.ip_version == IpVersion::V6Only && has_v4 {
        return Err(ParseError::at(
            location,
            "Ip version is set to Inet6 yet ipv4 ips are present",
        ));
    }

    if conditions.source_app.is_some()
        && (!conditions.source_ips.is_empty() || !conditions.source_ports.is_empty())
    {
        return Err(ParseError::at(
            location,
            "A source app cannot be combined with source ips or ports",
        ));
    }

    Ok(())
}
