//! Tokenizer for the expression language.
//!
//! Produces a flat token sequence terminated by [`Symbol::End`]. Keywords
//! and operators are resolved to symbols here so the parser only ever
//! dispatches on [`Symbol`].

use std::fmt;

use crate::error::TokenizeError;

/// Every symbol known to the grammar. Literal tokens carry their payload
/// separately in [`Token::literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Number,
    Str,
    Name,
    End,
    // Constants
    None,
    True,
    False,
    // Keywords
    And,
    Or,
    Not,
    In,
    NotIn,
    Is,
    IsNot,
    If,
    Else,
    Lambda,
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Dot,
    Assign,
    // Comparison operators
    Lt,
    Le,
    Gt,
    Ge,
    Diamond,
    Ne,
    EqEq,
    // Arithmetic and bitwise operators
    Pipe,
    Caret,
    Ampersand,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Tilde,
}

impl Symbol {
    /// Source text of the symbol (`"(number)"` style ids for literal kinds).
    pub fn text(self) -> &'static str {
        match self {
            Symbol::Number => "(number)",
            Symbol::Str => "(string)",
            Symbol::Name => "(name)",
            Symbol::End => "(end)",
            Symbol::None => "None",
            Symbol::True => "True",
            Symbol::False => "False",
            Symbol::And => "and",
            Symbol::Or => "or",
            Symbol::Not => "not",
            Symbol::In => "in",
            Symbol::NotIn => "not in",
            Symbol::Is => "is",
            Symbol::IsNot => "is not",
            Symbol::If => "if",
            Symbol::Else => "else",
            Symbol::Lambda => "lambda",
            Symbol::LParen => "(",
            Symbol::RParen => ")",
            Symbol::LBracket => "[",
            Symbol::RBracket => "]",
            Symbol::LBrace => "{",
            Symbol::RBrace => "}",
            Symbol::Colon => ":",
            Symbol::Comma => ",",
            Symbol::Dot => ".",
            Symbol::Assign => "=",
            Symbol::Lt => "<",
            Symbol::Le => "<=",
            Symbol::Gt => ">",
            Symbol::Ge => ">=",
            Symbol::Diamond => "<>",
            Symbol::Ne => "!=",
            Symbol::EqEq => "==",
            Symbol::Pipe => "|",
            Symbol::Caret => "^",
            Symbol::Ampersand => "&",
            Symbol::Shl => "<<",
            Symbol::Shr => ">>",
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Star => "*",
            Symbol::Slash => "/",
            Symbol::DoubleSlash => "//",
            Symbol::Percent => "%",
            Symbol::DoubleStar => "**",
            Symbol::Tilde => "~",
        }
    }

    /// Resolve a word to its keyword or constant symbol.
    pub fn keyword(word: &str) -> Option<Symbol> {
        Some(match word {
            "None" => Symbol::None,
            "True" => Symbol::True,
            "False" => Symbol::False,
            "and" => Symbol::And,
            "or" => Symbol::Or,
            "not" => Symbol::Not,
            "in" => Symbol::In,
            "is" => Symbol::Is,
            "if" => Symbol::If,
            "else" => Symbol::Else,
            "lambda" => Symbol::Lambda,
            _ => return None,
        })
    }

    /// Resolve operator or punctuation text to its symbol.
    pub fn operator(text: &str) -> Option<Symbol> {
        Some(match text {
            "(" => Symbol::LParen,
            ")" => Symbol::RParen,
            "[" => Symbol::LBracket,
            "]" => Symbol::RBracket,
            "{" => Symbol::LBrace,
            "}" => Symbol::RBrace,
            ":" => Symbol::Colon,
            "," => Symbol::Comma,
            "." => Symbol::Dot,
            "=" => Symbol::Assign,
            "<" => Symbol::Lt,
            "<=" => Symbol::Le,
            ">" => Symbol::Gt,
            ">=" => Symbol::Ge,
            "<>" => Symbol::Diamond,
            "!=" => Symbol::Ne,
            "==" => Symbol::EqEq,
            "|" => Symbol::Pipe,
            "^" => Symbol::Caret,
            "&" => Symbol::Ampersand,
            "<<" => Symbol::Shl,
            ">>" => Symbol::Shr,
            "+" => Symbol::Plus,
            "-" => Symbol::Minus,
            "*" => Symbol::Star,
            "/" => Symbol::Slash,
            "//" => Symbol::DoubleSlash,
            "%" => Symbol::Percent,
            "**" => Symbol::DoubleStar,
            "~" => Symbol::Tilde,
            _ => return None,
        })
    }
}

/// Payload of a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    /// Raw string content between the quotes; escapes are decoded at
    /// evaluation time.
    Str { content: String, unicode: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub symbol: Symbol,
    pub lexeme: String,
    pub literal: Option<Literal>,
}

impl Token {
    fn symbol(symbol: Symbol, lexeme: impl Into<String>) -> Self {
        Token {
            symbol,
            lexeme: lexeme.into(),
            literal: None,
        }
    }

    pub fn end() -> Self {
        Token::symbol(Symbol::End, "")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.symbol, &self.literal) {
            (Symbol::Number, Some(Literal::Number(n))) => write!(f, "(number {})", format_number(*n)),
            (Symbol::Str, Some(Literal::Str { content, .. })) => write!(f, "(string {content})"),
            (Symbol::Name, _) => write!(f, "(name {})", self.lexeme),
            (Symbol::None | Symbol::True | Symbol::False, _) => {
                write!(f, "(constant {})", self.lexeme)
            }
            (Symbol::End, _) => f.write_str("(end)"),
            (symbol, _) => f.write_str(symbol.text()),
        }
    }
}

/// Render a number the way the expression language prints it: integral
/// values have no fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_owned()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else {
        format!("{n}")
    }
}

// ──────────────────────────────────────────────
// Tokenizer
// ──────────────────────────────────────────────

/// Split `text` into tokens, appending a terminating [`Symbol::End`].
///
/// Whitespace separates tokens and may trail the expression. `not in` and
/// `is not` are merged into single comparator tokens.
pub fn tokenize(text: &str) -> Result<Vec<Token>, TokenizeError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0usize;

    let fail = |tokens: &[Token], index: usize| TokenizeError {
        text: text.to_owned(),
        index,
        consumed: tokens.iter().map(Token::to_string).collect(),
    };

    loop {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        let start = pos;
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();

        // Numbers: `1`, `1.`, `1.5`, `.5`, `1L`
        if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let mut fractional = false;
            if pos < chars.len() && chars[pos] == '.' {
                fractional = true;
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            let lexeme: String = chars[start..pos].iter().collect();
            if !fractional && pos < chars.len() && matches!(chars[pos], 'l' | 'L') {
                pos += 1;
            }
            let value: f64 = lexeme.parse().map_err(|_| fail(&tokens, start))?;
            tokens.push(Token {
                symbol: Symbol::Number,
                lexeme,
                literal: Some(Literal::Number(value)),
            });
            continue;
        }

        // Strings, optionally prefixed with `u`/`U`
        let unicode = matches!(c, 'u' | 'U') && matches!(next, Some('\'' | '"'));
        if unicode || c == '\'' || c == '"' {
            let quote_at = if unicode { pos + 1 } else { pos };
            let quote = chars[quote_at];
            let Some(len) = chars[quote_at + 1..].iter().position(|&ch| ch == quote) else {
                return Err(fail(&tokens, start));
            };
            let content: String = chars[quote_at + 1..quote_at + 1 + len].iter().collect();
            pos = quote_at + len + 2;
            tokens.push(Token {
                symbol: Symbol::Str,
                lexeme: chars[start..pos].iter().collect(),
                literal: Some(Literal::Str { content, unicode }),
            });
            continue;
        }

        // Names and keywords
        if c.is_ascii_alphabetic() || c == '_' {
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let token = match Symbol::keyword(&word) {
                Some(symbol) => Token::symbol(symbol, word),
                None => Token::symbol(Symbol::Name, word),
            };
            push_merged(&mut tokens, token);
            continue;
        }

        // Operators and punctuation
        let len = operator_len(&chars[pos..]);
        if len == 0 {
            return Err(fail(&tokens, start));
        }
        let lexeme: String = chars[pos..pos + len].iter().collect();
        // Augmented assignments and stray punctuation match the operator
        // patterns but are not symbols of the grammar.
        let Some(symbol) = Symbol::operator(&lexeme) else {
            return Err(fail(&tokens, start));
        };
        pos += len;
        tokens.push(Token::symbol(symbol, lexeme));
    }

    tokens.push(Token::end());
    tracing::trace!(count = tokens.len(), "tokenized expression");
    Ok(tokens)
}

/// Append `token`, folding `not in` and `is not` into single comparators.
fn push_merged(tokens: &mut Vec<Token>, token: Token) {
    let merged = match (tokens.last().map(|t| t.symbol), token.symbol) {
        (Some(Symbol::Not), Symbol::In) => Some(Symbol::NotIn),
        (Some(Symbol::Is), Symbol::Not) => Some(Symbol::IsNot),
        _ => None,
    };
    match merged {
        Some(symbol) => {
            tokens.pop();
            tokens.push(Token::symbol(symbol, symbol.text()));
        }
        None => tokens.push(token),
    }
}

/// Length of the longest operator-like lexeme at the start of `rest`, or 0.
fn operator_len(rest: &[char]) -> usize {
    let at = |i: usize| rest.get(i).copied();
    match (at(0), at(1), at(2)) {
        (Some('*'), Some('*'), Some('=')) => 3,
        (Some('>'), Some('>'), Some('=')) => 3,
        (Some('<'), Some('<'), Some('=')) => 3,
        (Some('/'), Some('/'), Some('=')) => 3,
        (Some('*'), Some('*'), _)
        | (Some('>'), Some('>'), _)
        | (Some('<'), Some('<'), _)
        | (Some('<'), Some('>'), _)
        | (Some('!'), Some('='), _)
        | (Some('/'), Some('/'), _) => 2,
        (Some('+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '=' | '<' | '>'), Some('='), _) => 2,
        (Some('+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '=' | '<' | '>' | '~'), _, _) => 1,
        (Some('(' | ')' | '[' | ']' | '{' | '}'), _, _) => 1,
        (Some(':' | ';' | '.' | ',' | '`' | '@'), _, _) => 1,
        _ => 0,
    }
}
