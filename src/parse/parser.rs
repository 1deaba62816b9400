use super::lexer::{Lexeme, Lexer};
use super::token::Token;
use crate::price::PriceEntry;
use crate::utils::parse_decimal;
use crate::{
    Account, Amount, Currency, Date, Error, ErrorLevel, ErrorType, Location, Source, SrcFile,
    TxnStatus,
};

use std::{collections::HashMap, fs, sync::Arc};

/// A posting as written in the source; `amount` is `None` when elided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingDraft {
    pub account: Account,
    pub amount: Option<Amount>,
    pub comment: Option<String>,
    pub src: Source,
}

/// A transaction as written in the source, not yet balanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnDraft {
    pub date: Date,
    pub aux_date: Option<Date>,
    pub status: TxnStatus,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub postings: Vec<PostingDraft>,
    pub src: Source,
}

/// Everything parsed from one source file, in source order.
#[derive(Debug, Default)]
pub struct LedgerDraft {
    pub txns: Vec<TxnDraft>,
    pub prices: Vec<PriceEntry>,
}

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    peeked: Option<Lexeme<'source>>,
    last_token_end: Location,
    at_line_start: bool,
    file: SrcFile,
    accounts: HashMap<&'source str, Account>,
}

impl<'source> Parser<'source> {
    fn new(src: &'source str, file: SrcFile) -> Self {
        Parser {
            lexer: Lexer::new(src, file.clone()),
            peeked: None,
            last_token_end: (1, 1).into(),
            at_line_start: true,
            file,
            accounts: HashMap::new(),
        }
    }

    fn src_from(&self, start: Location) -> Source {
        Source {
            start,
            end: self.last_token_end,
            file: self.file.clone(),
        }
    }

    fn src_of(&self, lexeme: &Lexeme) -> Source {
        Source {
            start: lexeme.start,
            end: lexeme.end,
            file: self.file.clone(),
        }
    }

    fn syntax_error(&self, msg: String, src: Source) -> Error {
        Error {
            msg,
            src,
            r#type: ErrorType::Syntax,
            level: ErrorLevel::Error,
        }
    }

    fn peek(&mut self) -> Result<Lexeme<'source>, Error> {
        if let Some(lexeme) = self.peeked {
            return Ok(lexeme);
        }
        match self.lexer.next() {
            Some(Ok(lexeme)) => {
                self.peeked = Some(lexeme);
                Ok(lexeme)
            }
            Some(Err(error)) => Err(error),
            None => Ok(Lexeme {
                token: Token::Eof,
                text: "",
                start: self.last_token_end,
                end: self.last_token_end,
            }),
        }
    }

    #[inline]
    fn consume(&mut self) {
        if let Some(lexeme) = self.peeked.take() {
            self.last_token_end = lexeme.end;
            self.at_line_start = lexeme.token == Token::NewLine;
        }
    }

    fn take(&mut self, expected: Token) -> Result<Lexeme<'source>, Error> {
        let lexeme = self.peek()?;
        if lexeme.token != expected {
            Err(self.syntax_error(
                format!(
                    "Expect {:?}, found {:?}({:?})",
                    expected, lexeme.token, lexeme.text
                ),
                self.src_of(&lexeme),
            ))
        } else {
            self.consume();
            Ok(lexeme)
        }
    }

    fn unexpected(&self, lexeme: Lexeme) -> Result<(), Error> {
        Err(self.syntax_error(
            format!("Unexpected token {:?}({:?}).", lexeme.token, lexeme.text),
            self.src_of(&lexeme),
        ))
    }

    /// Skips the rest of a broken entry: everything up to the next line that
    /// starts a transaction or a price directive.
    fn skip_entry(&mut self) {
        let mut line_done = self.at_line_start;
        loop {
            match self.peek() {
                Ok(lexeme) => match lexeme.token {
                    Token::Eof => return,
                    Token::Date | Token::Price if line_done && lexeme.start.col == 1 => return,
                    Token::NewLine => {
                        line_done = true;
                        self.consume();
                    }
                    _ => self.consume(),
                },
                // the lexer has already moved past the malformed token
                Err(_) => {}
            }
        }
    }

    fn parse_entries(&mut self, draft: &mut LedgerDraft, errors: &mut Vec<Error>) {
        loop {
            let r = match self.peek() {
                Ok(lexeme) => match lexeme.token {
                    Token::Eof => break,
                    Token::Date => self.parse_txn().map(|txn| draft.txns.push(txn)),
                    Token::Price => self.parse_price().map(|price| draft.prices.push(price)),
                    Token::NewLine => {
                        self.consume();
                        Ok(())
                    }
                    _ => self.unexpected(lexeme),
                },
                Err(error) => Err(error),
            };
            if let Err(err) = r {
                errors.push(err);
                self.skip_entry();
            }
        }
    }

    fn parse_date(&mut self) -> Result<Date, Error> {
        let lexeme = self.take(Token::Date)?;
        let date_str = lexeme.text.replace('/', "-");
        date_str.parse::<Date>().map_err(|_| {
            self.syntax_error(
                format!("Invalid date: {}.", lexeme.text),
                self.src_of(&lexeme),
            )
        })
    }

    fn parse_comment(&mut self) -> Result<Option<String>, Error> {
        let lexeme = self.peek()?;
        if lexeme.token == Token::Comment {
            self.consume();
            Ok(Some(lexeme.text[1..].to_string()))
        } else {
            Ok(None)
        }
    }

    fn end_of_line(&mut self) -> Result<(), Error> {
        let lexeme = self.peek()?;
        match lexeme.token {
            Token::NewLine => {
                self.consume();
                Ok(())
            }
            Token::Eof => Ok(()),
            _ => Err(self.syntax_error(
                format!(
                    "Expect end of line, found {:?}({:?})",
                    lexeme.token, lexeme.text
                ),
                self.src_of(&lexeme),
            )),
        }
    }

    fn parse_txn(&mut self) -> Result<TxnDraft, Error> {
        let txn_start = self.peek()?.start;
        let date = self.parse_date()?;
        let aux_date = if self.peek()?.token == Token::Equal {
            self.consume();
            Some(self.parse_date()?)
        } else {
            None
        };
        let status = match self.peek()?.token {
            Token::Asterisk => {
                self.consume();
                TxnStatus::Cleared
            }
            Token::Exclamation => {
                self.consume();
                TxnStatus::Pending
            }
            _ => TxnStatus::Unmarked,
        };
        let code = match self.peek()? {
            lexeme if lexeme.token == Token::Code => {
                self.consume();
                Some(Self::remove_quotes(lexeme.text).trim().to_string())
            }
            _ => None,
        };
        let description = match self.peek()? {
            lexeme if lexeme.token == Token::Text => {
                self.consume();
                lexeme.text.to_string()
            }
            lexeme => {
                return Err(self.syntax_error(
                    format!(
                        "Expect description, found {:?}({:?})",
                        lexeme.token, lexeme.text
                    ),
                    self.src_of(&lexeme),
                ))
            }
        };
        let comment = self.parse_comment()?;
        self.end_of_line()?;
        let src = self.src_from(txn_start);

        let postings = self.parse_postings()?;
        if postings.len() < 2 {
            let next = self.peek()?;
            let msg = if next.token == Token::Eof {
                format!(
                    "Unexpected end of input: expect at least two postings, found {}.",
                    postings.len()
                )
            } else {
                format!(
                    "Expect at least two postings, found {}.",
                    postings.len()
                )
            };
            return Err(self.syntax_error(msg, src));
        }
        Ok(TxnDraft {
            date,
            aux_date,
            status,
            code,
            description,
            comment,
            postings,
            src,
        })
    }

    fn parse_postings(&mut self) -> Result<Vec<PostingDraft>, Error> {
        let mut postings = Vec::new();
        while self.peek()?.token == Token::Indent {
            self.consume();
            let start = self.peek()?.start;
            let account = self.parse_account()?;
            let amount = match self.peek()?.token {
                Token::Number | Token::Commodity | Token::String => Some(self.parse_amount()?),
                _ => None,
            };
            let comment = self.parse_comment()?;
            let src = self.src_from(start);
            self.end_of_line()?;
            postings.push(PostingDraft {
                account,
                amount,
                comment,
                src,
            });
        }
        Ok(postings)
    }

    fn parse_account(&mut self) -> Result<Account, Error> {
        let lexeme = self.take(Token::Account)?;
        let account_str = lexeme.text;
        let valid = account_str
            .chars()
            .next()
            .map_or(false, |c| c.is_alphanumeric())
            && account_str.split(':').all(|segment| !segment.is_empty());
        if !valid {
            return Err(self.syntax_error(
                format!("Invalid account name {:?}.", account_str),
                self.src_of(&lexeme),
            ));
        }
        let account = self
            .accounts
            .entry(account_str)
            .or_insert_with(|| Arc::new(account_str.to_string()))
            .clone();
        Ok(account)
    }

    #[inline]
    fn remove_quotes(input: &str) -> &str {
        let mut chars = input.chars();
        chars.next();
        chars.next_back();
        chars.as_str()
    }

    fn parse_commodity(&mut self) -> Result<Currency, Error> {
        let lexeme = self.peek()?;
        match lexeme.token {
            Token::Commodity => {
                self.consume();
                Ok(lexeme.text.to_string())
            }
            Token::String if lexeme.text.len() > 2 => {
                self.consume();
                Ok(Self::remove_quotes(lexeme.text).to_string())
            }
            _ => Err(self.syntax_error(
                format!(
                    "Expect commodity, found {:?}({:?})",
                    lexeme.token, lexeme.text
                ),
                self.src_of(&lexeme),
            )),
        }
    }

    fn parse_number(&mut self) -> Result<crate::Decimal, Error> {
        let lexeme = self.take(Token::Number)?;
        parse_decimal(lexeme.text, &self.src_of(&lexeme))
    }

    fn parse_amount(&mut self) -> Result<Amount, Error> {
        let (number, currency) = if self.peek()?.token == Token::Number {
            let number = self.parse_number()?;
            (number, self.parse_commodity()?)
        } else {
            let currency = self.parse_commodity()?;
            (self.parse_number()?, currency)
        };
        Ok(Amount { number, currency })
    }

    fn parse_price(&mut self) -> Result<PriceEntry, Error> {
        let start = self.peek()?.start;
        self.take(Token::Price)?;
        let date = self.parse_date()?;
        let commodity = self.parse_commodity()?;
        let price = self.parse_amount()?;
        let src = self.src_from(start);
        self.parse_comment()?;
        self.end_of_line()?;
        Ok(PriceEntry {
            date,
            commodity,
            price,
            src,
        })
    }

    /// Parses ledger text. `file` names the source in diagnostics.
    ///
    /// Returns every entry that parsed, plus one error per entry that did not.
    pub fn parse_str(src: &'source str, file: SrcFile) -> (LedgerDraft, Vec<Error>) {
        let mut draft = LedgerDraft::default();
        let mut errors = Vec::new();
        let mut parser = Parser::new(src, file);
        parser.parse_entries(&mut draft, &mut errors);
        log::debug!(
            "{}: parsed {} transactions, {} prices, {} errors",
            parser.file,
            draft.txns.len(),
            draft.prices.len(),
            errors.len()
        );
        (draft, errors)
    }

    /// Reads and parses the file at `path`.
    pub fn parse(path: &str) -> (LedgerDraft, Vec<Error>) {
        let file = Arc::new(path.to_string());
        match fs::read_to_string(path) {
            Ok(data) => Parser::parse_str(&data, file),
            Err(io_error) => {
                let error = Error {
                    r#type: ErrorType::Io,
                    level: ErrorLevel::Error,
                    msg: format!("Couldn't read {}: {:?}", path, io_error),
                    src: Source::file_start(file),
                };
                (LedgerDraft::default(), vec![error])
            }
        }
    }
}
