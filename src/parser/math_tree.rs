//! Math Tree
//!
//! Binary expression tree assembled one token at a time as the math
//! expression consumes characters. Operators carry a precedence category;
//! a freshly arrived operator that binds no tighter than the root becomes
//! the new root, which yields left associativity within a category.

use super::context::ExecContext;
use super::expression::ExprRef;
use super::types::EvalError;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Concatenate,
    Plus,
    Minus,
    Multiply,
    Divide,
    Not,
}

impl Operator {
    /// Precedence category; higher binds tighter.
    fn category(self) -> u8 {
        match self {
            Operator::Equal
            | Operator::NotEqual
            | Operator::Greater
            | Operator::GreaterOrEqual
            | Operator::Less
            | Operator::LessOrEqual => 1,
            Operator::Concatenate => 2,
            Operator::Plus | Operator::Minus => 3,
            Operator::Multiply | Operator::Divide => 4,
            Operator::Not => 5,
        }
    }

    fn binds_no_tighter_than(self, other: Operator) -> bool {
        self.category() <= other.category()
    }
}

#[derive(Clone)]
pub enum MathItem {
    Operand(ExprRef),
    Operator(Operator),
}

#[derive(Default)]
struct MathNode {
    item: Option<MathItem>,
    left: Option<Box<MathNode>>,
    right: Option<Box<MathNode>>,
}

impl MathNode {
    fn leaf(item: MathItem) -> Box<MathNode> {
        Box::new(MathNode {
            item: Some(item),
            left: None,
            right: None,
        })
    }

    fn add(mut self: Box<Self>, item: MathItem) -> Box<MathNode> {
        let root_op = match &self.item {
            Some(MathItem::Operator(op)) => Some(*op),
            _ => None,
        };

        match item {
            MathItem::Operand(_) => {
                if root_op.is_none() {
                    // an empty root takes the operand; an operand over an
                    // operand is a continuation of the previous token and
                    // replaces it
                    self.item = Some(item);
                } else {
                    self.right = Some(match self.right.take() {
                        Some(right) => right.add(item),
                        None => MathNode::leaf(item),
                    });
                }
                self
            }
            MathItem::Operator(op) => {
                if self.item.is_none() {
                    self.item = Some(MathItem::Operator(op));
                    return self;
                }
                match root_op {
                    Some(root_op) => {
                        if op.binds_no_tighter_than(root_op) && root_op != Operator::Not {
                            Box::new(MathNode {
                                item: Some(MathItem::Operator(op)),
                                left: Some(self),
                                right: None,
                            })
                        } else {
                            self.right = Some(match self.right.take() {
                                Some(right) => right.add(MathItem::Operator(op)),
                                None => Box::<MathNode>::default().add(MathItem::Operator(op)),
                            });
                            self
                        }
                    }
                    None => {
                        // the root holds an operand; push it to the left
                        self.left = Some(Box::new(MathNode {
                            item: self.item.take(),
                            left: None,
                            right: None,
                        }));
                        self.item = Some(MathItem::Operator(op));
                        self
                    }
                }
            }
        }
    }

    fn value(&self, ctx: &ExecContext) -> Result<Option<Value>, EvalError> {
        match &self.item {
            None => Ok(None),
            Some(MathItem::Operand(e)) => e.borrow().value(ctx).map(Some),
            Some(MathItem::Operator(op)) => {
                let left = match &self.left {
                    Some(l) => l.value(ctx)?,
                    None => None,
                };
                let right = match &self.right {
                    Some(r) => r.value(ctx)?,
                    None => None,
                };
                let right = right.ok_or(EvalError::MissingOperand)?;
                apply(*op, left, right).map(Some)
            }
        }
    }
}

fn apply(op: Operator, left: Option<Value>, right: Value) -> Result<Value, EvalError> {
    match op {
        Operator::Concatenate => {
            let left = left.ok_or(EvalError::MissingOperand)?;
            Ok(Value::Text(left.as_string() + &right.as_string()))
        }
        Operator::Equal | Operator::NotEqual => {
            let left = left.ok_or(EvalError::MissingOperand)?;
            let equal = left.equal(&right);
            Ok(Value::Bool(if op == Operator::Equal { equal } else { !equal }))
        }
        Operator::Greater | Operator::GreaterOrEqual | Operator::Less | Operator::LessOrEqual => {
            let left = left.ok_or(EvalError::MissingOperand)?;
            if left.is_bool() || right.is_bool() {
                return Err(EvalError::WrongType);
            }
            let result = match op {
                Operator::Greater => left.greater(&right),
                Operator::GreaterOrEqual => left.greater(&right) || left.equal(&right),
                Operator::Less => left.less(&right),
                _ => left.less(&right) || left.equal(&right),
            };
            Ok(Value::Bool(result))
        }
        Operator::Not => {
            if left.is_some() {
                return Err(EvalError::WrongOperator);
            }
            if !right.is_bool() {
                return Err(EvalError::WrongType);
            }
            Ok(Value::Bool(!right.as_bool()))
        }
        Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide => {
            let left_numeric = left.as_ref().map(|l| l.is_number()).unwrap_or(true);
            if !(left_numeric && right.is_number()) {
                return Err(EvalError::WrongType);
            }
            let r = right.as_number();
            match op {
                Operator::Plus => Ok(Value::Number(left.map(|l| l.as_number()).unwrap_or(0) + r)),
                Operator::Minus => Ok(Value::Number(left.map(|l| l.as_number()).unwrap_or(0) - r)),
                Operator::Multiply => {
                    let l = left.ok_or(EvalError::MissingOperand)?;
                    Ok(Value::Number(l.as_number() * r))
                }
                _ => {
                    if r == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    let l = left.ok_or(EvalError::MissingOperand)?;
                    Ok(Value::Number(l.as_number() / r))
                }
            }
        }
    }
}

pub struct MathTree {
    root: Box<MathNode>,
}

impl MathTree {
    pub fn new() -> MathTree {
        MathTree {
            root: Box::default(),
        }
    }

    pub fn add(&mut self, item: MathItem) {
        let root = std::mem::take(&mut self.root);
        self.root = root.add(item);
    }

    /// Post-order evaluation; an empty tree reads as zero.
    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        Ok(self.root.value(ctx)?.unwrap_or(Value::Number(0)))
    }
}

impl Default for MathTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::expression::Expression;

    fn tree_of(items: Vec<MathItem>) -> MathTree {
        let mut tree = MathTree::new();
        for item in items {
            tree.add(item);
        }
        tree
    }

    fn num(n: i64) -> MathItem {
        MathItem::Operand(Expression::literal_value(Value::Number(n)))
    }

    fn boolean(b: bool) -> MathItem {
        MathItem::Operand(Expression::literal_value(Value::Bool(b)))
    }

    fn text(s: &str) -> MathItem {
        MathItem::Operand(Expression::literal_value(Value::from(s)))
    }

    fn op(o: Operator) -> MathItem {
        MathItem::Operator(o)
    }

    #[test]
    fn test_precedence() {
        let ctx = ExecContext::test();
        // 2 * 2 + 2 * 3 == 10
        let tree = tree_of(vec![
            num(2),
            op(Operator::Multiply),
            num(2),
            op(Operator::Plus),
            num(2),
            op(Operator::Multiply),
            num(3),
        ]);
        assert_eq!(tree.value(&ctx).unwrap().as_number(), 10);
    }

    #[test]
    fn test_concatenate() {
        let ctx = ExecContext::test();
        let tree = tree_of(vec![num(2), op(Operator::Concatenate), num(3)]);
        assert_eq!(tree.value(&ctx).unwrap().as_string(), "23");

        // multiplicative binds tighter than concatenation
        let tree = tree_of(vec![
            num(2),
            op(Operator::Multiply),
            num(3),
            op(Operator::Concatenate),
            num(3),
        ]);
        assert_eq!(tree.value(&ctx).unwrap().as_string(), "63");

        let tree = tree_of(vec![
            num(1),
            op(Operator::Plus),
            num(3),
            op(Operator::Concatenate),
            num(10),
        ]);
        assert_eq!(tree.value(&ctx).unwrap().as_string(), "410");

        let tree = tree_of(vec![text("n"), op(Operator::Concatenate), num(2)]);
        let v = tree.value(&ctx).unwrap();
        assert_eq!(v.as_string(), "n2");
        assert!(!v.is_number());
    }

    #[test]
    fn test_compare_binds_loosest() {
        let ctx = ExecContext::test();
        // 1 + 3 = 4
        let tree = tree_of(vec![
            num(1),
            op(Operator::Plus),
            num(3),
            op(Operator::Equal),
            num(4),
        ]);
        assert!(tree.value(&ctx).unwrap().as_bool());

        // 10 * 3 != 30 is false
        let tree = tree_of(vec![
            num(10),
            op(Operator::Multiply),
            num(3),
            op(Operator::NotEqual),
            num(30),
        ]);
        assert!(!tree.value(&ctx).unwrap().as_bool());

        // 10 * 3 = 15 + 20 - 5
        let tree = tree_of(vec![
            num(10),
            op(Operator::Multiply),
            num(3),
            op(Operator::Equal),
            num(15),
            op(Operator::Plus),
            num(20),
            op(Operator::Minus),
            num(5),
        ]);
        assert!(tree.value(&ctx).unwrap().as_bool());
    }

    #[test]
    fn test_bool_comparisons() {
        let ctx = ExecContext::test();
        let tree = tree_of(vec![boolean(true), op(Operator::Greater), boolean(false)]);
        assert_eq!(tree.value(&ctx), Err(EvalError::WrongType));

        let tree = tree_of(vec![boolean(true), op(Operator::NotEqual), boolean(false)]);
        assert!(tree.value(&ctx).unwrap().as_bool());
    }

    #[test]
    fn test_unary_not() {
        let ctx = ExecContext::test();
        let tree = tree_of(vec![op(Operator::Not), boolean(false)]);
        assert!(tree.value(&ctx).unwrap().as_bool());

        let tree = tree_of(vec![
            boolean(true),
            op(Operator::Equal),
            op(Operator::Not),
            boolean(false),
        ]);
        assert!(tree.value(&ctx).unwrap().as_bool());

        let tree = tree_of(vec![
            op(Operator::Not),
            boolean(true),
            op(Operator::Equal),
            boolean(false),
        ]);
        assert!(tree.value(&ctx).unwrap().as_bool());

        let tree = tree_of(vec![op(Operator::Not), op(Operator::Not), boolean(true)]);
        assert!(tree.value(&ctx).unwrap().as_bool());

        let tree = tree_of(vec![op(Operator::Not), num(5)]);
        assert_eq!(tree.value(&ctx), Err(EvalError::WrongType));
    }

    #[test]
    fn test_division() {
        let ctx = ExecContext::test();
        let tree = tree_of(vec![num(5), op(Operator::Divide), num(2)]);
        assert_eq!(tree.value(&ctx).unwrap().as_number(), 2);

        let tree = tree_of(vec![num(5), op(Operator::Divide), num(0)]);
        assert_eq!(tree.value(&ctx), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_arithmetic_type_errors() {
        let ctx = ExecContext::test();
        let tree = tree_of(vec![text("n"), op(Operator::Plus), num(2)]);
        assert_eq!(tree.value(&ctx), Err(EvalError::WrongType));
    }

    #[test]
    fn test_empty_tree_is_zero() {
        let ctx = ExecContext::test();
        assert_eq!(MathTree::new().value(&ctx).unwrap().as_number(), 0);
    }
}
