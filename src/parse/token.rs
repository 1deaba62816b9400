use logos::Logos;

#[derive(Debug, PartialEq, Eq, Logos, Clone, Copy)]
pub enum Token {
    #[regex(r"[ \t\f\v]+")]
    WhiteSpace,

    #[regex(r"\r?\n")]
    NewLine,

    #[regex(r"[;#][^\r\n]*")]
    Comment,

    #[regex(r"\d\d\d\d-\d\d-\d\d")]
    #[regex(r"\d\d\d\d/\d\d/\d\d")]
    Date,

    #[token("=")]
    Equal,

    #[token("*")]
    Asterisk,

    #[token("!")]
    Exclamation,

    #[regex(r"\([^()\r\n]*\)")]
    Code,

    #[token("P")]
    Price,

    #[regex(r#""[^"\r\n]*""#)]
    String,

    #[regex(r#""[^"\r\n]*"#)]
    OpenString,

    #[regex(r"[\-\+]?[\d\.][\d,\.]*")]
    Number,

    #[regex(r#"[^\s\d;#"=\*!\(\)\-\+\.,][^\s\d;#"=\*!\(\)\-\+,]*"#)]
    Commodity,

    #[error]
    Error,

    // The tokens below are produced by `Lexer` from the position in the line,
    // never by the derived matcher.
    /// Leading whitespace of a posting line.
    Indent,

    /// The account path opening a posting line.
    Account,

    /// The description of a transaction header.
    Text,

    /// End of input.
    Eof,
}
