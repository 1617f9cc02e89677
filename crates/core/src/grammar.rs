//! Declarative binding-power table for the Pratt parser.
//!
//! Every symbol is declared once per role. A symbol declared several times
//! keeps the highest left binding power of all its declarations, so `-`
//! binds at 110 as an infix operator while its prefix form parses its
//! operand at 130.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::lexer::Symbol;

/// How a symbol starts an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixRule {
    /// Number, string or name token.
    Literal,
    /// `None`, `True`, `False`.
    Constant,
    /// Unary operator parsing its operand at the given power.
    Operator { rbp: u8 },
    /// `(`: parenthesized expression or tuple.
    Group,
    /// `[`: list display.
    List,
    /// `{`: dict display.
    Dict,
    /// `lambda params: body`.
    Lambda,
}

/// How a symbol continues an expression that has a left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixRule {
    /// Binary operator parsing its right operand at `rbp`. Right-associative
    /// operators declare `rbp` one below their own power.
    Operator { rbp: u8 },
    /// Member of a comparison chain.
    Comparator,
    /// `name=value` inside call arguments.
    KeywordArgument,
    /// `body if test else orelse`.
    Conditional,
    /// `.name`
    Attribute,
    /// `(args)`
    Call,
    /// `[index]`
    Subscript,
}

/// Binding power of comparison operators.
pub const COMPARATOR_BP: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolEntry {
    pub lbp: u8,
    pub prefix: Option<PrefixRule>,
    pub infix: Option<InfixRule>,
}

struct Declaration {
    symbol: Symbol,
    bp: u8,
    prefix: Option<PrefixRule>,
    infix: Option<InfixRule>,
}

const fn symbol(symbol: Symbol, bp: u8) -> Declaration {
    Declaration {
        symbol,
        bp,
        prefix: None,
        infix: None,
    }
}

const fn nud(symbol: Symbol, bp: u8, rule: PrefixRule) -> Declaration {
    Declaration {
        symbol,
        bp,
        prefix: Some(rule),
        infix: None,
    }
}

const fn led(symbol: Symbol, bp: u8, rule: InfixRule) -> Declaration {
    Declaration {
        symbol,
        bp,
        prefix: None,
        infix: Some(rule),
    }
}

const fn prefix(symbol: Symbol, bp: u8) -> Declaration {
    nud(symbol, 0, PrefixRule::Operator { rbp: bp })
}

const fn infix(symbol: Symbol, bp: u8) -> Declaration {
    led(symbol, bp, InfixRule::Operator { rbp: bp })
}

const fn infixr(symbol: Symbol, bp: u8) -> Declaration {
    led(symbol, bp, InfixRule::Operator { rbp: bp - 1 })
}

const fn comparator(symbol: Symbol) -> Declaration {
    led(symbol, COMPARATOR_BP, InfixRule::Comparator)
}

const DECLARATIONS: &[Declaration] = &[
    symbol(Symbol::End, 0),
    symbol(Symbol::Colon, 0),
    symbol(Symbol::RParen, 0),
    symbol(Symbol::RBracket, 0),
    symbol(Symbol::RBrace, 0),
    symbol(Symbol::Comma, 0),
    symbol(Symbol::Else, 0),
    nud(Symbol::Number, 0, PrefixRule::Literal),
    nud(Symbol::Str, 0, PrefixRule::Literal),
    nud(Symbol::Name, 0, PrefixRule::Literal),
    nud(Symbol::None, 0, PrefixRule::Constant),
    nud(Symbol::False, 0, PrefixRule::Constant),
    nud(Symbol::True, 0, PrefixRule::Constant),
    led(Symbol::Assign, 10, InfixRule::KeywordArgument),
    nud(Symbol::Lambda, 20, PrefixRule::Lambda),
    led(Symbol::If, 20, InfixRule::Conditional),
    infixr(Symbol::Or, 30),
    infixr(Symbol::And, 40),
    prefix(Symbol::Not, 50),
    comparator(Symbol::In),
    comparator(Symbol::NotIn),
    comparator(Symbol::Is),
    comparator(Symbol::IsNot),
    comparator(Symbol::Lt),
    comparator(Symbol::Le),
    comparator(Symbol::Gt),
    comparator(Symbol::Ge),
    comparator(Symbol::Diamond),
    comparator(Symbol::Ne),
    comparator(Symbol::EqEq),
    infix(Symbol::Pipe, 70),
    infix(Symbol::Caret, 80),
    infix(Symbol::Ampersand, 90),
    infix(Symbol::Shl, 100),
    infix(Symbol::Shr, 100),
    infix(Symbol::Plus, 110),
    infix(Symbol::Minus, 110),
    infix(Symbol::Star, 120),
    infix(Symbol::Slash, 120),
    infix(Symbol::DoubleSlash, 120),
    infix(Symbol::Percent, 120),
    prefix(Symbol::Minus, 130),
    prefix(Symbol::Plus, 130),
    prefix(Symbol::Tilde, 130),
    infixr(Symbol::DoubleStar, 140),
    led(Symbol::Dot, 150, InfixRule::Attribute),
    led(Symbol::LParen, 150, InfixRule::Call),
    nud(Symbol::LParen, 0, PrefixRule::Group),
    led(Symbol::LBracket, 150, InfixRule::Subscript),
    nud(Symbol::LBracket, 0, PrefixRule::List),
    nud(Symbol::LBrace, 0, PrefixRule::Dict),
];

const UNDECLARED: SymbolEntry = SymbolEntry {
    lbp: 0,
    prefix: None,
    infix: None,
};

/// Symbol table consulted by the parser.
#[derive(Debug)]
pub struct Grammar {
    entries: HashMap<Symbol, SymbolEntry>,
}

impl Grammar {
    fn build() -> Self {
        let mut entries: HashMap<Symbol, SymbolEntry> = HashMap::new();
        for decl in DECLARATIONS {
            let entry = entries.entry(decl.symbol).or_insert(UNDECLARED);
            entry.lbp = entry.lbp.max(decl.bp);
            if decl.prefix.is_some() {
                entry.prefix = decl.prefix;
            }
            if decl.infix.is_some() {
                entry.infix = decl.infix;
            }
        }
        Grammar { entries }
    }

    pub fn entry(&self, symbol: Symbol) -> &SymbolEntry {
        self.entries.get(&symbol).unwrap_or(&UNDECLARED)
    }

    pub fn lbp(&self, symbol: Symbol) -> u8 {
        self.entry(symbol).lbp
    }

    pub fn is_comparator(&self, symbol: Symbol) -> bool {
        self.entry(symbol).infix == Some(InfixRule::Comparator)
    }
}

static GRAMMAR: LazyLock<Grammar> = LazyLock::new(Grammar::build);

/// The expression language grammar, built once on first use.
pub fn grammar() -> &'static Grammar {
    &GRAMMAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_symbols_keep_highest_power() {
        let g = grammar();
        assert_eq!(g.lbp(Symbol::Minus), 110);
        assert_eq!(
            g.entry(Symbol::Minus).prefix,
            Some(PrefixRule::Operator { rbp: 130 })
        );
        assert_eq!(g.lbp(Symbol::LParen), 150);
        assert_eq!(g.entry(Symbol::LParen).prefix, Some(PrefixRule::Group));
    }

    #[test]
    fn right_associative_operators_bind_one_lower() {
        let g = grammar();
        assert_eq!(
            g.entry(Symbol::DoubleStar).infix,
            Some(InfixRule::Operator { rbp: 139 })
        );
        assert_eq!(
            g.entry(Symbol::Or).infix,
            Some(InfixRule::Operator { rbp: 29 })
        );
    }

    #[test]
    fn terminators_do_not_bind() {
        let g = grammar();
        for symbol in [Symbol::End, Symbol::Comma, Symbol::Else, Symbol::RBracket] {
            assert_eq!(g.lbp(symbol), 0, "{symbol:?}");
        }
        assert!(g.is_comparator(Symbol::NotIn));
        assert!(!g.is_comparator(Symbol::Plus));
    }
}
