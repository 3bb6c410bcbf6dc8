use crate::error::ParseError;
use crate::token::{SourceLocation, Token, TokenKind};
use std::iter::Peekable;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::CharIndices;

/// Keywords are lexemes with static content; numbers and strings are not
/// keywords since their content is open-ended.
///
/// Lexemes that share a prefix with a shorter lexeme must appear before it
/// ('inet6' before 'inet' before 'in') or the longer ones would never match.
const KEYWORDS: &[(TokenKind, &str)] = &[
    (TokenKind::BlockAction, "block"),
    (TokenKind::PermitAction, "permit"),
    (TokenKind::LBrack, "{"),
    (TokenKind::RBrack, "}"),
    (TokenKind::Inet6, "inet6"),
    (TokenKind::Inet4, "inet"),
    (TokenKind::InDir, "in"),
    (TokenKind::OutDir, "out"),
    (TokenKind::Port, "port"),
    (TokenKind::Proto, "proto"),
    (TokenKind::From, "from"),
    (TokenKind::To, "to"),
    (TokenKind::TcpTransport, "tcp"),
    (TokenKind::UdpTransport, "udp"),
    (TokenKind::All, "all"),
    (TokenKind::Comma, ","),
];

/// Breaks a rule source string into tokens, tracking line and column.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// The next token, or `EndOfInput` once the source is exhausted. The
    /// lexer never advances past the end; repeated calls at the end keep
    /// returning `EndOfInput`.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let location = self.location();
        match self.peek_char() {
            // An embedded NUL terminates the scan like real end of input.
            None | Some('\0') => Ok(Token::new(TokenKind::EndOfInput, "EOF", location)),
            Some('"') => Ok(self.scan_string(location)),
            Some(first) => {
                if let Some(token) = self.match_keyword(location) {
                    return Ok(token);
                }

                // Identifiers are alphanumeric runs plus the symbols that
                // appear inside ip addresses and subnets: '.', ':' and '/'.
                let ident = self.scan_identifier();
                if ident.is_empty() {
                    return Err(ParseError::at(
                        location,
                        format!("Unrecognized symbol: '{first}'!"),
                    ));
                }
                classify_identifier(ident, location)
            }
        }
    }

    /// Every token before `EndOfInput`, in order.
    pub fn all_tokens(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.kind == TokenKind::EndOfInput {
                return Ok(tokens);
            }
            tokens.push(token);
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn match_keyword(&mut self, location: SourceLocation) -> Option<Token> {
        let rest = &self.source[self.pos..];
        let (kind, lexeme) = KEYWORDS
            .iter()
            .find(|(_, lexeme)| rest.starts_with(lexeme))?;
        // Keywords are ASCII, so byte length equals char count.
        for _ in 0..lexeme.len() {
            self.advance();
        }
        Some(Token::new(*kind, *lexeme, location))
    }

    fn scan_string(&mut self, location: SourceLocation) -> Token {
        self.advance(); // opening quote
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '"' {
                break;
            }
            self.advance();
        }
        let content = &self.source[start..self.pos];
        self.advance(); // closing quote, discarded
        Token::new(TokenKind::String, content, location)
    }

    fn scan_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/') {
                self.advance();
            } else {
                break;
            }
        }
        &self.source[start..self.pos]
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let (index, c) = self.chars.next()?;
        self.pos = index + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

fn classify_identifier(ident: &str, location: SourceLocation) -> Result<Token, ParseError> {
    // A '/' can only mean address/prefix.
    if let Some(slash) = ident.find('/') {
        return ip_address_and_subnet(ident, slash, location);
    }

    if is_ipv6(ident) {
        Ok(Token::new(TokenKind::Ipv6Address, ident, location))
    } else if is_ipv4(ident) {
        Ok(Token::new(TokenKind::Ipv4Address, ident, location))
    } else if ident.bytes().all(|b| b.is_ascii_digit()) {
        Ok(Token::new(TokenKind::Number, ident, location))
    } else {
        Err(ParseError::at(
            location,
            format!("Unrecognized identifier: '{ident}'!"),
        ))
    }
}

fn ip_address_and_subnet(
    ident: &str,
    slash: usize,
    location: SourceLocation,
) -> Result<Token, ParseError> {
    let address = &ident[..slash];
    let prefix_text = &ident[slash + 1..];
    let prefix: u32 = prefix_text.parse().unwrap_or(0);

    if prefix == 0 {
        return Err(ParseError::at(
            location,
            format!("Got an invalid 0 prefix for {address}"),
        ));
    }

    if is_ipv6(address) && prefix <= 128 {
        Ok(Token::new(TokenKind::Ipv6Address, ident, location))
    } else if is_ipv4(address) && prefix <= 32 {
        Ok(Token::new(TokenKind::Ipv4Address, ident, location))
    } else {
        Err(ParseError::at(
            location,
            format!("Invalid ip address and subnet: {address}/{prefix_text}"),
        ))
    }
}

fn is_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(text: &str) -> bool {
    text.parse::<Ipv6Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .all_tokens()
            .expect("lexable input")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    fn single(input: &str) -> Token {
        Lexer::new(input).next_token().expect("lexable input")
    }

    #[test]
    fn basic_lexing() {
        let actual = kinds(r#"permit out inet proto {tcp, udp} from "baby""#);
        let expected = vec![
            PermitAction,
            OutDir,
            Inet4,
            Proto,
            LBrack,
            TcpTransport,
            Comma,
            UdpTransport,
            RBrack,
            From,
            String,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn all_token_kinds() {
        let input = r#"permit block out ::1 in inet inet6 proto {tcp, udp} from "baby" port 53 1.1.1.1 all"#;
        let expected = vec![
            PermitAction,
            BlockAction,
            OutDir,
            Ipv6Address,
            InDir,
            Inet4,
            Inet6,
            Proto,
            LBrack,
            TcpTransport,
            Comma,
            UdpTransport,
            RBrack,
            From,
            String,
            Port,
            Number,
            Ipv4Address,
            All,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn ignores_whitespace() {
        let input = "\t\n  block \t    out\n    proto  {  tcp ,\n\t  udp  }  ";
        let expected = vec![
            BlockAction,
            OutDir,
            Proto,
            LBrack,
            TcpTransport,
            Comma,
            UdpTransport,
            RBrack,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn numbers() {
        let token = single("53");
        assert_eq!(token, Token::new(Number, "53", SourceLocation::START));
    }

    #[test]
    fn strings_strip_the_outer_quotes() {
        let token = single(r#""the air can tear dead snails from the elephants lung""#);
        assert_eq!(token.kind, String);
        assert_eq!(
            token.text,
            "the air can tear dead snails from the elephants lung"
        );
    }

    #[test]
    fn ipv4_address() {
        let token = single("1.1.1.1");
        assert_eq!(token.kind, Ipv4Address);
        assert_eq!(token.text, "1.1.1.1");
    }

    #[test]
    fn ipv4_address_with_subnet() {
        for valid in ["1.1.1.1/16", "1.1.1.1/32", "1.1.1.1/1"] {
            let token = single(valid);
            assert_eq!(token.kind, Ipv4Address, "{valid}");
            assert_eq!(token.text, valid);
        }

        for invalid in ["1.1.1.1/33", "1.1.1.1/0"] {
            assert!(
                Lexer::new(invalid).next_token().is_err(),
                "{invalid} should not lex"
            );
        }
    }

    #[test]
    fn ipv4_addresses_without_surrounding_space() {
        let actual = kinds("from {1.1.1.1,2.2.2.2}");
        let expected = vec![From, LBrack, Ipv4Address, Comma, Ipv4Address, RBrack];
        assert_eq!(actual, expected);
    }

    #[test]
    fn ipv6_addresses() {
        let addresses = [
            // Full
            "2001:0db8:85a3:0000:0000:8a2e:0370:7334",
            // Compressed
            "2407::9a62:2100:483:91ec:9221:cad",
            // Link-local
            "fe80::1096:e770:9d55:7fef",
            // Unique-local
            "fd12:3456:789a:1::1",
            // With leading zeroes
            "2001:0db8::0001",
            // Embedded ipv4
            "::ffff:192.168.1.1",
            // Loopback
            "::1",
        ];

        for address in addresses {
            let token = single(address);
            assert_eq!(token.kind, Ipv6Address, "{address}");
            assert_eq!(token.text, address);
        }
    }

    #[test]
    fn ipv6_address_with_subnet() {
        for valid in ["2001::123/64", "2001::123/128", "2001::123/1"] {
            let token = single(valid);
            assert_eq!(token.kind, Ipv6Address, "{valid}");
        }

        for invalid in ["2001::123/129", "2001::123/0"] {
            assert!(
                Lexer::new(invalid).next_token().is_err(),
                "{invalid} should not lex"
            );
        }
    }

    #[test]
    fn ipv6_addresses_without_surrounding_space() {
        let actual = kinds("from {::1,5fca:1234::2}");
        let expected = vec![From, LBrack, Ipv6Address, Comma, Ipv6Address, RBrack];
        assert_eq!(actual, expected);
    }

    #[test]
    fn shared_prefix_keywords_match_longest_first() {
        assert_eq!(kinds("in inet inet6"), vec![InDir, Inet4, Inet6]);
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let tokens = Lexer::new("permit out\n  block in").all_tokens().unwrap();
        let locations: Vec<_> = tokens
            .iter()
            .map(|t| (t.location.line, t.location.column))
            .collect();
        assert_eq!(locations, vec![(1, 1), (1, 8), (2, 3), (2, 9)]);
    }

    #[test]
    fn string_newlines_advance_the_line_counter() {
        let mut lexer = Lexer::new("\"a\nb\" permit");
        let string = lexer.next_token().unwrap();
        assert_eq!(string.text, "a\nb");

        let permit = lexer.next_token().unwrap();
        assert_eq!(permit.kind, PermitAction);
        assert_eq!((permit.location.line, permit.location.column), (2, 4));
    }

    #[test]
    fn unrecognized_identifier_is_an_error() {
        let err = Lexer::new("banana").next_token().unwrap_err();
        assert!(err.message.contains("banana"), "{err}");
    }

    #[test]
    fn unrecognized_symbol_is_an_error() {
        assert!(Lexer::new("%").next_token().is_err());
        assert!(Lexer::new(";").next_token().is_err());
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut lexer = Lexer::new("permit  ");
        assert_eq!(lexer.next_token().unwrap().kind, PermitAction);
        assert_eq!(lexer.next_token().unwrap().kind, EndOfInput);
        assert_eq!(lexer.next_token().unwrap().kind, EndOfInput);
    }

    #[test]
    fn embedded_nul_ends_the_scan() {
        let mut lexer = Lexer::new("permit\0block");
        assert_eq!(lexer.next_token().unwrap().kind, PermitAction);
        assert_eq!(lexer.next_token().unwrap().kind, EndOfInput);
    }

    #[test]
    fn whitespace_collapse_preserves_the_token_stream() {
        let input = "permit  out\n proto\t{tcp,udp}  to  10.0.0.0/8 port {53, 443}";
        let original = Lexer::new(input).all_tokens().unwrap();

        let collapsed = original
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let relexed = Lexer::new(&collapsed).all_tokens().unwrap();

        assert_eq!(original, relexed);
    }
}
