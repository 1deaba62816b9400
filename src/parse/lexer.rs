use super::Token;
use crate::utils::parse_number;
use crate::{Error, ErrorLevel, ErrorType, Location, Source, SrcFile};
use logos::{Lexer as LogosLexer, Logos};

/// A token together with its text and its location in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'source> {
    pub token: Token,
    pub text: &'source str,
    pub start: Location,
    pub end: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStage {
    AuxDate,
    AuxDateValue,
    Status,
    Code,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    LineStart,
    Account,
    Header(HeaderStage),
    Inline,
}

/// Splits ledger text into [`Lexeme`]s.
///
/// The derived [`Token`] matcher recognizes the context-free tokens; this
/// wrapper tracks the position in the line to produce the line-sensitive ones:
/// [`Token::Indent`] and [`Token::Account`] at the start of a posting line, and
/// [`Token::Text`] for the description of a transaction header. Blank lines and
/// lines holding only a comment are skipped.
///
/// The iterator yields a single [`Token::Eof`] lexeme at the end of input and
/// then stops. A malformed token is reported as an [`ErrorType::Lex`] error,
/// after which lexing resumes with the next token.
pub struct Lexer<'source> {
    llex: LogosLexer<'source, Token>,
    src: &'source str,
    file: SrcFile,
    line: usize,
    line_offset: usize,
    mode: Mode,
    first_on_line: bool,
    finished: bool,
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl<'source> Lexer<'source> {
    pub fn new(src: &'source str, file: SrcFile) -> Self {
        Lexer {
            llex: Token::lexer(src),
            src,
            file,
            line: 1,
            line_offset: 0,
            mode: Mode::LineStart,
            first_on_line: true,
            finished: false,
        }
    }

    fn offset(&self) -> usize {
        self.llex.span().end
    }

    fn rest(&self) -> &'source str {
        let src = self.src;
        &src[self.offset()..]
    }

    fn location(&self, offset: usize) -> Location {
        let col = self.src[self.line_offset..offset].chars().count() + 1;
        (self.line, col).into()
    }

    fn error(&self, msg: String, start: Location, end: Location) -> Error {
        Error {
            msg,
            src: Source {
                file: self.file.clone(),
                start,
                end,
            },
            r#type: ErrorType::Lex,
            level: ErrorLevel::Error,
        }
    }

    /// Consumes `len` bytes that no logos token covers and returns them as a
    /// lexeme of kind `token`.
    fn manual(&mut self, token: Token, len: usize) -> Lexeme<'source> {
        let start = self.offset();
        self.llex.bump(len);
        let text = &self.src[start..start + len];
        Lexeme {
            token,
            text,
            start: self.location(start),
            end: self.location(start + len),
        }
    }

    fn skip_blanks(&mut self) {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start_matches(is_blank).len();
        self.llex.bump(len);
    }

    fn line_start(&mut self) -> Option<Result<Lexeme<'source>, Error>> {
        let rest = self.rest();
        if rest.is_empty() {
            self.finished = true;
            let offset = self.offset();
            let location = self.location(offset);
            return Some(Ok(Lexeme {
                token: Token::Eof,
                text: "",
                start: location,
                end: location,
            }));
        }
        let indent = rest.len() - rest.trim_start_matches(is_blank).len();
        let content = &rest[indent..];
        let blank_line = content.is_empty()
            || content.starts_with('\n')
            || content.starts_with("\r\n")
            || content.starts_with(';')
            || content.starts_with('#');
        if blank_line {
            let (len, newline) = match rest.find('\n') {
                Some(index) => (index + 1, true),
                None => (rest.len(), false),
            };
            self.llex.bump(len);
            if newline {
                self.line += 1;
                self.line_offset = self.offset();
            }
            None
        } else if indent > 0 {
            self.mode = Mode::Account;
            self.first_on_line = false;
            Some(Ok(self.manual(Token::Indent, indent)))
        } else {
            self.mode = Mode::Inline;
            self.first_on_line = true;
            None
        }
    }

    fn account(&mut self) -> Lexeme<'source> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(rest.len());
        self.mode = Mode::Inline;
        self.manual(Token::Account, len)
    }

    fn description(&mut self) -> Lexeme<'source> {
        let rest = self.rest();
        let line_len = rest.find(|c| c == ';' || c == '\r' || c == '\n');
        let text = &rest[..line_len.unwrap_or(rest.len())];
        let len = text.trim_end().len();
        self.mode = Mode::Inline;
        self.manual(Token::Text, len)
    }

    fn header(&mut self, stage: HeaderStage) -> Option<Result<Lexeme<'source>, Error>> {
        self.skip_blanks();
        let next = self.rest().chars().next();
        if matches!(next, None | Some('\r') | Some('\n') | Some(';')) {
            self.mode = Mode::Inline;
            return None;
        }
        match (stage, next) {
            (HeaderStage::AuxDate, Some('=')) => {
                self.mode = Mode::Header(HeaderStage::AuxDateValue);
                self.inline()
            }
            (HeaderStage::AuxDateValue, Some(c)) if c.is_ascii_digit() => {
                self.mode = Mode::Header(HeaderStage::Status);
                self.inline()
            }
            (HeaderStage::AuxDate, _) | (HeaderStage::AuxDateValue, _) => {
                self.mode = Mode::Header(HeaderStage::Status);
                None
            }
            (HeaderStage::Status, Some('*')) | (HeaderStage::Status, Some('!')) => {
                self.mode = Mode::Header(HeaderStage::Code);
                self.inline()
            }
            (HeaderStage::Status, _) => {
                self.mode = Mode::Header(HeaderStage::Code);
                None
            }
            (HeaderStage::Code, Some('(')) => {
                self.mode = Mode::Header(HeaderStage::Description);
                self.inline()
            }
            (HeaderStage::Code, _) => {
                self.mode = Mode::Header(HeaderStage::Description);
                None
            }
            (HeaderStage::Description, _) => Some(Ok(self.description())),
        }
    }

    fn inline(&mut self) -> Option<Result<Lexeme<'source>, Error>> {
        let token = match self.llex.next() {
            Some(token) => token,
            None => {
                self.mode = Mode::LineStart;
                return None;
            }
        };
        let span = self.llex.span();
        let text = self.llex.slice();
        let start = self.location(span.start);
        let end = self.location(span.end);
        match token {
            Token::WhiteSpace => return None,
            Token::NewLine => {
                self.line += 1;
                self.line_offset = span.end;
                self.mode = Mode::LineStart;
            }
            Token::Date if self.first_on_line => {
                self.mode = Mode::Header(HeaderStage::AuxDate);
            }
            Token::Number => {
                if let Err(reason) = parse_number(text) {
                    return Some(Err(self.error(reason, start, end)));
                }
            }
            Token::OpenString => {
                let msg = format!("Unterminated string {}.", text);
                return Some(Err(self.error(msg, start, end)));
            }
            Token::Error => {
                let msg = format!("Unexpected character {:?}.", text);
                return Some(Err(self.error(msg, start, end)));
            }
            _ => {}
        }
        self.first_on_line = false;
        Some(Ok(Lexeme {
            token,
            text,
            start,
            end,
        }))
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Lexeme<'source>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let item = match self.mode {
                Mode::LineStart => self.line_start(),
                Mode::Account => Some(Ok(self.account())),
                Mode::Header(stage) => self.header(stage),
                Mode::Inline => self.inline(),
            };
            if item.is_some() {
                return item;
            }
        }
        None
    }
}

impl<'source> std::iter::FusedIterator for Lexer<'source> {}
