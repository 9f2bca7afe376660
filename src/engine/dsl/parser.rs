//! Recursive-descent parser for the mailflow rule language.
//!
//! Grammar (loosest binding first):
//!
//! ```text
//! program  := stmt*
//! stmt     := "if" expr block ("else" (stmt-if | block))? | call ";"?
//! block    := "{" stmt* "}"
//! expr     := and ("or" and)*
//! and      := equality ("and" equality)*
//! equality := unary (("==" | "!=") unary)?
//! unary    := "not" unary | primary
//! primary  := "(" expr ")" | string | "true" | "false" | call | field
//! call     := ident "(" (expr ("," expr)*)? ")"
//! ```

use super::lexer::{SpannedToken, Token, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Bool(bool),
    Field { name: String, line: usize },
    Call(Call),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
}

/// A parsed rule body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// Parse a rule body into a program.
pub fn parse(source: &str) -> Result<Program, String> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let stmts = parser.parse_stmts_until(None)?;
    Ok(Program { stmts })
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(t) if t.token == expected => Ok(()),
            Some(t) => Err(format!(
                "line {}: expected {}, found {}",
                t.line,
                expected.describe(),
                t.token.describe()
            )),
            None => Err(format!(
                "unexpected end of rule, expected {}",
                expected.describe()
            )),
        }
    }

    /// Parse statements until the closing token (or end of input).
    fn parse_stmts_until(&mut self, closing: Option<&Token>) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                None => {
                    if let Some(expected) = closing {
                        return Err(format!(
                            "unexpected end of rule, expected {}",
                            expected.describe()
                        ));
                    }
                    return Ok(stmts);
                }
                Some(t) if Some(t) == closing => return Ok(stmts),
                _ => stmts.push(self.parse_stmt()?),
            }
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, String> {
        if self.peek() == Some(&Token::If) {
            return self.parse_if();
        }

        let line = self.line();
        match self.advance() {
            Some(SpannedToken {
                token: Token::Ident(name),
                line,
            }) => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(format!(
                        "line {line}: expected an action call, found bare identifier `{name}`"
                    ));
                }
                let call = self.parse_call_args(name, line)?;
                // Optional trailing semicolon
                if self.peek() == Some(&Token::Semi) {
                    self.advance();
                }
                Ok(Stmt::Call(call))
            }
            Some(t) => Err(format!(
                "line {}: expected a statement, found {}",
                t.line,
                t.token.describe()
            )),
            None => Err(format!("line {line}: expected a statement")),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, String> {
        self.expect(Token::If)?;
        let cond = self.parse_expr()?;
        self.expect(Token::LBrace)?;
        let then_branch = self.parse_stmts_until(Some(&Token::RBrace))?;
        self.expect(Token::RBrace)?;

        let else_branch = if self.peek() == Some(&Token::Else) {
            self.advance();
            if self.peek() == Some(&Token::If) {
                vec![self.parse_if()?]
            } else {
                self.expect(Token::LBrace)?;
                let stmts = self.parse_stmts_until(Some(&Token::RBrace))?;
                self.expect(Token::RBrace)?;
                stmts
            }
        } else {
            Vec::new()
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_equality()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_unary()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::NotEq) => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_unary()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::LParen,
                ..
            }) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(SpannedToken {
                token: Token::Str(value),
                ..
            }) => Ok(Expr::Str(value)),
            Some(SpannedToken {
                token: Token::True, ..
            }) => Ok(Expr::Bool(true)),
            Some(SpannedToken {
                token: Token::False,
                ..
            }) => Ok(Expr::Bool(false)),
            Some(SpannedToken {
                token: Token::Ident(name),
                line,
            }) => {
                if self.peek() == Some(&Token::LParen) {
                    Ok(Expr::Call(self.parse_call_args(name, line)?))
                } else {
                    Ok(Expr::Field { name, line })
                }
            }
            Some(t) => Err(format!(
                "line {}: expected an expression, found {}",
                t.line,
                t.token.describe()
            )),
            None => Err("unexpected end of rule, expected an expression".to_string()),
        }
    }

    /// Parse `( args )` after a call name has been consumed.
    fn parse_call_args(&mut self, name: String, line: usize) -> Result<Call, String> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(Call { name, args, line })
    }
}
