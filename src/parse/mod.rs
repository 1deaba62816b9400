mod lexer;
mod parser;
mod token;

pub use lexer::{Lexeme, Lexer};
pub use parser::*;
pub use token::Token;
