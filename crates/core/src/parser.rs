//! Pratt parser over the token stream produced by [`crate::lexer::tokenize`].
//!
//! Parsing is driven by [`crate::grammar`]: each token's prefix rule builds
//! the start of an expression and infix rules keep extending it while the
//! next token binds tighter than the current right binding power.

use crate::ast::{BinaryOp, CompareOp, Constant, Expr, UnaryOp};
use crate::error::ParseError;
use crate::grammar::{grammar, Grammar, InfixRule, PrefixRule, COMPARATOR_BP};
use crate::lexer::{Literal, Symbol, Token};

/// Parse a complete token sequence into a single expression.
///
/// The sequence must end with [`Symbol::End`] and contain exactly one
/// expression.
pub fn parse(tokens: &[Token]) -> Result<Expr, ParseError> {
    if tokens.last().map(|t| t.symbol) != Some(Symbol::End) {
        return Err(ParseError::MissingEnd);
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.expression(0)?;
    if parser.peek() != Symbol::End {
        return Err(ParseError::TrailingInput {
            found: parser.cur().to_string(),
        });
    }
    tracing::trace!(%expr, "parsed expression");
    Ok(expr)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    grammar: &'static Grammar,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            grammar: grammar(),
        }
    }

    fn cur(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> Symbol {
        self.cur().symbol
    }

    fn advance(&mut self) -> &'a Token {
        let t = self.cur();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, symbol: Symbol) -> Result<(), ParseError> {
        if self.peek() == symbol {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected: symbol.text().to_owned(),
                found: self.cur().to_string(),
            })
        }
    }

    fn expression(&mut self, rbp: u8) -> Result<Expr, ParseError> {
        let token = self.advance();
        let mut left = self.nud(token)?;
        while rbp < self.grammar.lbp(self.peek()) {
            let token = self.advance();
            left = self.led(token, left)?;
        }
        Ok(left)
    }

    /// Comma-separated expressions up to `close`, allowing a trailing comma.
    /// Returns the items and whether any comma was seen.
    fn sequence(&mut self, close: Symbol) -> Result<(Vec<Expr>, bool), ParseError> {
        let mut items = Vec::new();
        let mut comma = false;
        while self.peek() != close {
            items.push(self.expression(0)?);
            if self.peek() != Symbol::Comma {
                break;
            }
            comma = true;
            self.advance();
        }
        self.expect(close)?;
        Ok((items, comma))
    }

    // ── Prefix position ──────────────────────────────────────────────

    fn nud(&mut self, token: &'a Token) -> Result<Expr, ParseError> {
        let undefined = || ParseError::UndefinedPrefix {
            found: token.to_string(),
        };
        let rule = self.grammar.entry(token.symbol).prefix.ok_or_else(undefined)?;
        match rule {
            PrefixRule::Literal => match (&token.symbol, &token.literal) {
                (Symbol::Number, Some(Literal::Number(n))) => Ok(Expr::Number(*n)),
                (Symbol::Str, Some(Literal::Str { content, unicode })) => Ok(Expr::Str {
                    raw: content.clone(),
                    unicode: *unicode,
                }),
                (Symbol::Name, _) => Ok(Expr::Name(token.lexeme.clone())),
                _ => Err(undefined()),
            },
            PrefixRule::Constant => Ok(Expr::Constant(match token.symbol {
                Symbol::True => Constant::True,
                Symbol::False => Constant::False,
                _ => Constant::None,
            })),
            PrefixRule::Operator { rbp } => {
                let operand = Box::new(self.expression(rbp)?);
                Ok(match token.symbol {
                    Symbol::Not => Expr::Not(operand),
                    Symbol::Minus => Expr::Unary {
                        op: UnaryOp::Neg,
                        operand,
                    },
                    Symbol::Plus => Expr::Unary {
                        op: UnaryOp::Pos,
                        operand,
                    },
                    Symbol::Tilde => Expr::Unary {
                        op: UnaryOp::Invert,
                        operand,
                    },
                    _ => return Err(undefined()),
                })
            }
            PrefixRule::Group => {
                let (mut items, comma) = self.sequence(Symbol::RParen)?;
                if items.len() == 1 && !comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::Tuple(items))
                }
            }
            PrefixRule::List => Ok(Expr::List(self.sequence(Symbol::RBracket)?.0)),
            PrefixRule::Dict => {
                let mut entries = Vec::new();
                while self.peek() != Symbol::RBrace {
                    let key = self.expression(0)?;
                    self.expect(Symbol::Colon)?;
                    let value = self.expression(0)?;
                    entries.push((key, value));
                    if self.peek() != Symbol::Comma {
                        break;
                    }
                    self.advance();
                }
                self.expect(Symbol::RBrace)?;
                Ok(Expr::Dict(entries))
            }
            PrefixRule::Lambda => {
                let mut params = Vec::new();
                while self.peek() != Symbol::Colon {
                    let param = self.cur();
                    if param.symbol != Symbol::Name {
                        return Err(ParseError::Expected {
                            expected: "parameter name".to_owned(),
                            found: param.to_string(),
                        });
                    }
                    params.push(param.lexeme.clone());
                    self.advance();
                    if self.peek() != Symbol::Comma {
                        break;
                    }
                    self.advance();
                }
                self.expect(Symbol::Colon)?;
                let body = Box::new(self.expression(0)?);
                Ok(Expr::Lambda { params, body })
            }
        }
    }

    // ── Infix position ───────────────────────────────────────────────

    fn led(&mut self, token: &'a Token, left: Expr) -> Result<Expr, ParseError> {
        let rule = self
            .grammar
            .entry(token.symbol)
            .infix
            .ok_or_else(|| ParseError::UndefinedInfix {
                found: token.to_string(),
            })?;
        let left = Box::new(left);
        match rule {
            InfixRule::Operator { rbp } => {
                let right = Box::new(self.expression(rbp)?);
                match token.symbol {
                    Symbol::And => Ok(Expr::And(left, right)),
                    Symbol::Or => Ok(Expr::Or(left, right)),
                    symbol => {
                        let op = binary_op(symbol).ok_or_else(|| ParseError::UndefinedInfix {
                            found: token.to_string(),
                        })?;
                        Ok(Expr::Binary { op, left, right })
                    }
                }
            }
            InfixRule::Comparator => {
                let mut operators = vec![compare_op(token.symbol)];
                let mut expressions = vec![*left, self.expression(COMPARATOR_BP)?];
                while self.grammar.is_comparator(self.peek()) {
                    let next = self.advance();
                    operators.push(compare_op(next.symbol));
                    expressions.push(self.expression(COMPARATOR_BP)?);
                }
                Ok(Expr::Compare {
                    expressions,
                    operators,
                })
            }
            InfixRule::KeywordArgument => {
                match *left {
                    Expr::Name(name) => {
                        let value = Box::new(self.expression(0)?);
                        Ok(Expr::KeywordArg { name, value })
                    }
                    other => Err(ParseError::KeywordName {
                        found: other.to_string(),
                    }),
                }
            }
            InfixRule::Conditional => {
                let test = Box::new(self.expression(0)?);
                self.expect(Symbol::Else)?;
                let orelse = Box::new(self.expression(0)?);
                Ok(Expr::Conditional {
                    body: left,
                    test,
                    orelse,
                })
            }
            InfixRule::Attribute => {
                let name = self.cur();
                if name.symbol != Symbol::Name {
                    return Err(ParseError::AttributeName {
                        found: name.to_string(),
                    });
                }
                self.advance();
                Ok(Expr::Attribute {
                    object: left,
                    name: name.lexeme.clone(),
                })
            }
            InfixRule::Call => {
                let (args, _) = self.sequence(Symbol::RParen)?;
                Ok(Expr::Call { callee: left, args })
            }
            InfixRule::Subscript => {
                let index = Box::new(self.expression(0)?);
                self.expect(Symbol::RBracket)?;
                Ok(Expr::Subscript {
                    object: left,
                    index,
                })
            }
        }
    }
}

fn binary_op(symbol: Symbol) -> Option<BinaryOp> {
    Some(match symbol {
        Symbol::Plus => BinaryOp::Add,
        Symbol::Minus => BinaryOp::Sub,
        Symbol::Star => BinaryOp::Mul,
        Symbol::Slash => BinaryOp::Div,
        Symbol::DoubleSlash => BinaryOp::FloorDiv,
        Symbol::Percent => BinaryOp::Mod,
        Symbol::DoubleStar => BinaryOp::Pow,
        Symbol::Shl => BinaryOp::LShift,
        Symbol::Shr => BinaryOp::RShift,
        Symbol::Ampersand => BinaryOp::BitAnd,
        Symbol::Caret => BinaryOp::BitXor,
        Symbol::Pipe => BinaryOp::BitOr,
        _ => return None,
    })
}

fn compare_op(symbol: Symbol) -> CompareOp {
    match symbol {
        Symbol::In => CompareOp::In,
        Symbol::NotIn => CompareOp::NotIn,
        Symbol::Is => CompareOp::Is,
        Symbol::IsNot => CompareOp::IsNot,
        Symbol::Lt => CompareOp::Lt,
        Symbol::Le => CompareOp::Le,
        Symbol::Gt => CompareOp::Gt,
        Symbol::Ge => CompareOp::Ge,
        Symbol::EqEq => CompareOp::Eq,
        _ => CompareOp::Ne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn tree(text: &str) -> String {
        parse(&tokenize(text).unwrap()).unwrap().to_string()
    }

    fn parse_err(text: &str) -> ParseError {
        parse(&tokenize(text).unwrap()).unwrap_err()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            tree("2 + 3 * 4"),
            "(+ (number 2) (* (number 3) (number 4)))"
        );
        assert_eq!(tree("-2 ** 2"), "(- (** (number 2) (number 2)))");
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(
            tree("2 ** 3 ** 2"),
            "(** (number 2) (** (number 3) (number 2)))"
        );
    }

    #[test]
    fn boolean_operators() {
        assert_eq!(
            tree("not a or b and c"),
            "(or (not (name a)) (and (name b) (name c)))"
        );
    }

    #[test]
    fn comparison_chain_is_flat() {
        assert_eq!(
            tree("1 < x <= 3 not in y"),
            "(comparator (number 1) < (name x) <= (number 3) not in (name y))"
        );
        assert_eq!(tree("a <> b"), "(comparator (name a) != (name b))");
    }

    #[test]
    fn groups_and_tuples() {
        assert_eq!(tree("(1)"), "(number 1)");
        assert_eq!(tree("(1,)"), "(tuple (number 1))");
        assert_eq!(tree("()"), "(tuple)");
        assert_eq!(tree("(1, 2)"), "(tuple (number 1) (number 2))");
    }

    #[test]
    fn displays() {
        assert_eq!(tree("[1, 'a',]"), "(list (number 1) (string a))");
        assert_eq!(
            tree("{'a': 1, 2: b}"),
            "(dict ((string a) (number 1)) ((number 2) (name b)))"
        );
    }

    #[test]
    fn calls_with_keywords() {
        assert_eq!(
            tree("f(1, x=2)"),
            "(call (name f) (number 1) (= x (number 2)))"
        );
        assert_eq!(
            tree("a.b(c)[0]"),
            "([ (call (. (name a) b) (name c)) (number 0))"
        );
    }

    #[test]
    fn nested_conditional() {
        assert_eq!(
            tree("1 if a else 2 if b else 3"),
            "(if (name a) (number 1) (if (name b) (number 2) (number 3)))"
        );
    }

    #[test]
    fn lambda() {
        assert_eq!(
            tree("lambda x, y: x + y"),
            "(lambda (x y) (+ (name x) (name y)))"
        );
        assert_eq!(tree("lambda: 1"), "(lambda () (number 1))");
    }

    #[test]
    fn errors() {
        assert!(matches!(parse_err("1 +"), ParseError::UndefinedPrefix { .. }));
        assert!(matches!(parse_err("a ."), ParseError::AttributeName { .. }));
        assert!(matches!(parse_err("1 = 2"), ParseError::KeywordName { .. }));
        assert!(matches!(parse_err("[1, 2"), ParseError::Expected { .. }));
        assert!(matches!(parse_err("1 2"), ParseError::TrailingInput { .. }));
        assert!(matches!(
            parse_err("a if b"),
            ParseError::Expected { .. }
        ));
        assert_eq!(parse(&[]), Err(ParseError::MissingEnd));
    }
}
