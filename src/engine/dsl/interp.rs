//! Tree-walking interpreter for parsed rule programs.
//!
//! Runs against explicitly passed capabilities only — no ambient state.
//! A step budget bounds evaluation so a pathological rule cannot stall
//! the single-threaded engine.

use crate::engine::capability::{EmailView, text};
use crate::error::HookError;
use crate::model::ContextSnapshot;

use super::parser::{BinOp, Call, Expr, Program, Stmt};

/// Upper bound on interpreter operations per rule execution.
pub const DEFAULT_STEP_BUDGET: usize = 10_000;

/// One rule-language value.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Bool(bool),
    List(Vec<String>),
    Unit,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "label list",
            Value::Unit => "unit",
        }
    }
}

pub struct Interpreter<'a> {
    email: &'a mut EmailView,
    ctx: &'a ContextSnapshot,
    steps: usize,
    budget: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(email: &'a mut EmailView, ctx: &'a ContextSnapshot) -> Self {
        Self {
            email,
            ctx,
            steps: 0,
            budget: DEFAULT_STEP_BUDGET,
        }
    }

    #[cfg(test)]
    fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn run(&mut self, program: &Program) -> Result<(), HookError> {
        for stmt in &program.stmts {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn charge(&mut self) -> Result<(), HookError> {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(HookError::BudgetExhausted(self.budget));
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), HookError> {
        self.charge()?;
        match stmt {
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch = if self.eval_bool(cond)? {
                    then_branch
                } else {
                    else_branch
                };
                for stmt in branch {
                    self.exec(stmt)?;
                }
                Ok(())
            }
            Stmt::Call(call) => {
                self.call(call)?;
                Ok(())
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, HookError> {
        self.charge()?;
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Field { name, line } => self.field(name, *line),
            Expr::Call(call) => self.call(call),
            Expr::Not(inner) => {
                let value = self.eval_bool(inner)?;
                Ok(Value::Bool(!value))
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinOp::And => Ok(Value::Bool(
                    self.eval_bool(lhs)? && self.eval_bool(rhs)?,
                )),
                BinOp::Or => Ok(Value::Bool(
                    self.eval_bool(lhs)? || self.eval_bool(rhs)?,
                )),
                BinOp::Eq | BinOp::Ne => {
                    let left = self.eval(lhs)?;
                    let right = self.eval(rhs)?;
                    let equal = match (&left, &right) {
                        (Value::Str(a), Value::Str(b)) => a == b,
                        (Value::Bool(a), Value::Bool(b)) => a == b,
                        _ => {
                            return Err(HookError::Eval(format!(
                                "cannot compare {} with {}",
                                left.type_name(),
                                right.type_name()
                            )));
                        }
                    };
                    Ok(Value::Bool(if *op == BinOp::Eq { equal } else { !equal }))
                }
            },
        }
    }

    fn eval_bool(&mut self, expr: &Expr) -> Result<bool, HookError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(HookError::Eval(format!(
                "condition must be a bool, got {}",
                other.type_name()
            ))),
        }
    }

    fn field(&mut self, name: &str, line: usize) -> Result<Value, HookError> {
        let value = match name {
            "sender" => Value::Str(self.email.sender.clone()),
            "subject" => Value::Str(self.email.subject.clone()),
            "body" => Value::Str(self.email.body.clone()),
            "labels" => Value::List(self.email.labels.clone()),
            "is_read" => Value::Bool(self.email.is_read),
            "is_starred" => Value::Bool(self.email.is_starred),
            "has_attachments" => Value::Bool(self.email.has_attachments),
            other => {
                return Err(HookError::Eval(format!(
                    "unknown field `{other}` (line {line})"
                )));
            }
        };
        Ok(value)
    }

    fn call(&mut self, call: &Call) -> Result<Value, HookError> {
        let Call { name, args, line } = call;
        match name.as_str() {
            // ── Intent-recording actions ────────────────────────────
            "archive" => self.action0(args, line, name, EmailView::archive),
            "delete" => self.action0(args, line, name, EmailView::delete),
            "star" => self.action0(args, line, name, EmailView::star),
            "unstar" => self.action0(args, line, name, EmailView::unstar),
            "mark_read" => self.action0(args, line, name, EmailView::mark_read),
            "mark_unread" => self.action0(args, line, name, EmailView::mark_unread),
            "move_to_spam" => self.action0(args, line, name, EmailView::move_to_spam),
            "move_to_trash" => self.action0(args, line, name, EmailView::move_to_trash),
            "add_label" => {
                let label = self.one_string_arg(args, line, name)?;
                self.email.add_label(&label);
                Ok(Value::Unit)
            }
            "remove_label" => {
                let label = self.one_string_arg(args, line, name)?;
                self.email.remove_label(&label);
                Ok(Value::Unit)
            }

            // ── Context predicates ──────────────────────────────────
            "is_weekend" => {
                self.expect_arity(args, 0, line, name)?;
                Ok(Value::Bool(self.ctx.is_weekend()))
            }
            "is_business_hours" => {
                self.expect_arity(args, 0, line, name)?;
                Ok(Value::Bool(self.ctx.is_business_hours()))
            }

            // ── Pure text utilities ─────────────────────────────────
            "contains" => {
                let (a, b) = self.two_string_args(args, line, name)?;
                Ok(Value::Bool(text::contains(&a, &b)))
            }
            "starts_with" => {
                let (a, b) = self.two_string_args(args, line, name)?;
                Ok(Value::Bool(text::starts_with(&a, &b)))
            }
            "ends_with" => {
                let (a, b) = self.two_string_args(args, line, name)?;
                Ok(Value::Bool(text::ends_with(&a, &b)))
            }
            "matches" => {
                let (a, b) = self.two_string_args(args, line, name)?;
                text::matches(&a, &b)
                    .map(Value::Bool)
                    .map_err(|e| HookError::Eval(format!("invalid regex in `matches`: {e}")))
            }
            "has_any" => {
                let (list, wanted) = self.list_and_strings(args, line, name)?;
                Ok(Value::Bool(text::has_any(&list, &wanted)))
            }
            "has_all" => {
                let (list, wanted) = self.list_and_strings(args, line, name)?;
                Ok(Value::Bool(text::has_all(&list, &wanted)))
            }

            other => Err(HookError::Eval(format!(
                "unknown function `{other}` (line {line})"
            ))),
        }
    }

    fn action0(
        &mut self,
        args: &[Expr],
        line: &usize,
        name: &str,
        action: fn(&mut EmailView),
    ) -> Result<Value, HookError> {
        self.expect_arity(args, 0, line, name)?;
        action(self.email);
        Ok(Value::Unit)
    }

    fn expect_arity(
        &self,
        args: &[Expr],
        expected: usize,
        line: &usize,
        name: &str,
    ) -> Result<(), HookError> {
        if args.len() != expected {
            return Err(HookError::Eval(format!(
                "`{name}` takes {expected} argument(s), got {} (line {line})",
                args.len()
            )));
        }
        Ok(())
    }

    fn string_value(&mut self, expr: &Expr, name: &str) -> Result<String, HookError> {
        match self.eval(expr)? {
            Value::Str(s) => Ok(s),
            other => Err(HookError::Eval(format!(
                "`{name}` expects a string argument, got {}",
                other.type_name()
            ))),
        }
    }

    fn one_string_arg(
        &mut self,
        args: &[Expr],
        line: &usize,
        name: &str,
    ) -> Result<String, HookError> {
        self.expect_arity(args, 1, line, name)?;
        self.string_value(&args[0], name)
    }

    fn two_string_args(
        &mut self,
        args: &[Expr],
        line: &usize,
        name: &str,
    ) -> Result<(String, String), HookError> {
        self.expect_arity(args, 2, line, name)?;
        let a = self.string_value(&args[0], name)?;
        let b = self.string_value(&args[1], name)?;
        Ok((a, b))
    }

    /// First argument must be a label list, the rest strings.
    fn list_and_strings(
        &mut self,
        args: &[Expr],
        line: &usize,
        name: &str,
    ) -> Result<(Vec<String>, Vec<String>), HookError> {
        if args.len() < 2 {
            return Err(HookError::Eval(format!(
                "`{name}` takes a label list and at least one label (line {line})"
            )));
        }
        let list = match self.eval(&args[0])? {
            Value::List(list) => list,
            other => {
                return Err(HookError::Eval(format!(
                    "`{name}` expects a label list first, got {}",
                    other.type_name()
                )));
            }
        };
        let mut wanted = Vec::with_capacity(args.len() - 1);
        for arg in &args[1..] {
            wanted.push(self.string_value(arg, name)?);
        }
        Ok((list, wanted))
    }
}
