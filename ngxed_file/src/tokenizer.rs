//! Splits configuration text into whitespace runs, braces and tokens.
//!
//! The tokenizer is lossless: writing every [`Event`] back in order yields
//! the original input. It knows nothing about brace balance.

use std::{fmt, iter::Peekable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Whitespace(String),
    BlockOpen,
    BlockClose,
    /// A maximal run of non-whitespace, non-brace characters. A token starting
    /// with `#` is a comment and runs to the end of the line; quoted sections
    /// and `${var}` references may contain whitespace and braces.
    Token(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Whitespace(text) | Event::Token(text) => f.write_str(text),
            Event::BlockOpen => f.write_str("{"),
            Event::BlockClose => f.write_str("}"),
        }
    }
}

pub struct Tokenizer<I: Iterator<Item = char>> {
    chars: Peekable<I>,
    line: usize,
    event_line: usize,
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    pub fn new(chars: I) -> Self {
        Self {
            chars: chars.peekable(),
            line: 1,
            event_line: 1,
        }
    }

    /// 1-based line on which the most recently returned event starts.
    pub fn line(&self) -> usize {
        self.event_line
    }

    /// 1-based line the tokenizer has reached, i.e. the last line once exhausted.
    pub fn end_line(&self) -> usize {
        self.line
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn read_while(&mut self, out: &mut String, predicate: impl Fn(char) -> bool) {
        while let Some(&c) = self.chars.peek() {
            if !predicate(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
    }

    fn read_token(&mut self) -> String {
        let mut token = String::new();

        if self.chars.peek() == Some(&'#') {
            self.read_while(&mut token, |c| c != '\n' && c != '\r');
            return token;
        }

        while let Some(&c) = self.chars.peek() {
            match c {
                '{' | '}' => break,
                c if c.is_whitespace() => break,
                '"' | '\'' if token.is_empty() => self.read_quoted(&mut token, c),
                '$' => {
                    token.push(c);
                    self.bump();
                    if self.chars.peek() == Some(&'{') {
                        self.read_while(&mut token, |c| c != '}');
                        if let Some(close) = self.bump() {
                            token.push(close);
                        }
                    }
                }
                _ => {
                    token.push(c);
                    self.bump();
                }
            }
        }

        token
    }

    fn read_quoted(&mut self, out: &mut String, quote: char) {
        if let Some(open) = self.bump() {
            out.push(open);
        }
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if c == quote {
                break;
            }
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let &c = self.chars.peek()?;
        self.event_line = self.line;

        let event = match c {
            '{' => {
                self.bump();
                Event::BlockOpen
            }
            '}' => {
                self.bump();
                Event::BlockClose
            }
            c if c.is_whitespace() => {
                let mut run = String::new();
                self.read_while(&mut run, char::is_whitespace);
                Event::Whitespace(run)
            }
            _ => Event::Token(self.read_token()),
        };

        Some(event)
    }
}
