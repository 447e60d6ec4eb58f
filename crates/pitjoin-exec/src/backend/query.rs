//! Minimal query engine for the in-memory backend.
//!
//! Queries are parsed with `sqlparser` and must reduce to
//! ```text
//! SELECT * | col [AS alias], ... FROM table [WHERE cmp [AND cmp ...]]
//! ```
//! where each `cmp` compares one column with a literal.

use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, Ident, Select, SelectItem, SetExpr, Statement, TableFactor,
    UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::types::RowBatch;
use pitjoin_operators::filter::{CmpOp, Filter, Predicate};
use pitjoin_operators::project::Project;
use pitjoin_operators::Operator;

#[derive(Debug, Clone)]
pub struct SelectQuery {
    /// `None` for `*`; otherwise `(column, alias)` pairs.
    pub columns: Option<Vec<(String, String)>>,
    pub table: String,
    pub filter: Filter,
}

impl SelectQuery {
    pub fn parse(text: &str) -> Result<Self> {
        let bad = |why: &str| Error::Backend(format!("unsupported query ({why}): {text}"));

        let mut statements = Parser::parse_sql(&GenericDialect {}, text)
            .map_err(|e| bad(&e.to_string()))?;
        if statements.len() != 1 {
            return Err(bad("expected exactly one statement"));
        }
        let query = match statements.remove(0) {
            Statement::Query(q) => q,
            _ => return Err(bad("expected SELECT")),
        };
        let query = *query;
        if query.with.is_some() || !query.order_by.is_empty() || query.limit.is_some() {
            return Err(bad("WITH, ORDER BY and LIMIT are not supported"));
        }
        let select = match *query.body {
            SetExpr::Select(s) => s,
            _ => return Err(bad("expected a plain SELECT")),
        };
        check_plain(&select).map_err(|why| bad(why))?;

        let table = single_table(&select).ok_or_else(|| bad("expected a single table name"))?;
        let columns = projection(&select.projection).map_err(|why| bad(&why))?;

        let mut predicates = Vec::new();
        if let Some(selection) = &select.selection {
            conjuncts(selection, &mut predicates).map_err(|why| bad(&why))?;
        }

        Ok(Self {
            columns,
            table,
            filter: Filter::all(predicates),
        })
    }

    fn project(&self, schema: &Schema) -> Project {
        match &self.columns {
            Some(cols) => Project {
                columns: cols.clone(),
            },
            None => Project::keep(&schema.names()),
        }
    }

    /// Output schema over a table with `schema`, without touching rows.
    pub fn output_schema(&self, schema: &Schema) -> Result<Schema> {
        let filtered = self.filter.plan(&[schema.clone()])?.output_schema;
        Ok(self.project(schema).plan(&[filtered])?.output_schema)
    }

    /// Run over the table's rows.
    pub fn execute(&self, schema: &Schema, batch: &RowBatch) -> Result<RowBatch> {
        let filtered = self.filter.eval(std::slice::from_ref(batch))?;
        Ok(self.project(schema).eval(&[filtered])?)
    }
}

fn check_plain(select: &Select) -> std::result::Result<(), &'static str> {
    if select.distinct.is_some() {
        return Err("DISTINCT is not supported");
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
        _ => return Err("GROUP BY is not supported"),
    }
    if select.having.is_some() {
        return Err("HAVING is not supported");
    }
    Ok(())
}

fn single_table(select: &Select) -> Option<String> {
    match select.from.as_slice() {
        [only] if only.joins.is_empty() => match &only.relation {
            TableFactor::Table { name, .. } if name.0.len() == 1 => Some(name.0[0].value.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn projection(items: &[SelectItem]) -> std::result::Result<Option<Vec<(String, String)>>, String> {
    if let [SelectItem::Wildcard(_)] = items {
        return Ok(None);
    }
    let mut cols = Vec::with_capacity(items.len());
    for item in items {
        let (col, alias) = match item {
            SelectItem::UnnamedExpr(expr) => {
                let col = column_name(expr).ok_or_else(|| format!("not a column: {expr}"))?;
                (col.clone(), col)
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let col = column_name(expr).ok_or_else(|| format!("not a column: {expr}"))?;
                (col, alias.value.clone())
            }
            other => return Err(format!("unsupported projection item: {other}")),
        };
        cols.push((col, alias));
    }
    Ok(Some(cols))
}

fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(Ident { value, .. }) => Some(value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|p| p.value.clone()),
        Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

/// Literal text, parsed later against the column's type.
fn literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Value(Value::Number(n, _)) => Some(n.clone()),
        Expr::Value(Value::SingleQuotedString(s)) => Some(s.clone()),
        Expr::Value(Value::Boolean(b)) => Some(b.to_string()),
        Expr::TypedString { value, .. } => Some(value.clone()),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Value(Value::Number(n, _)) => Some(format!("-{n}")),
            _ => None,
        },
        Expr::Nested(inner) => literal(inner),
        _ => None,
    }
}

fn cmp_op(op: &BinaryOperator) -> Option<CmpOp> {
    Some(match op {
        BinaryOperator::Eq => CmpOp::Eq,
        BinaryOperator::NotEq => CmpOp::NotEq,
        BinaryOperator::Lt => CmpOp::Lt,
        BinaryOperator::LtEq => CmpOp::LtEq,
        BinaryOperator::Gt => CmpOp::Gt,
        BinaryOperator::GtEq => CmpOp::GtEq,
        _ => return None,
    })
}

/// Flatten an `AND` tree of column/literal comparisons.
fn conjuncts(expr: &Expr, out: &mut Vec<Predicate>) -> std::result::Result<(), String> {
    match expr {
        Expr::Nested(inner) => conjuncts(inner, out),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            conjuncts(left, out)?;
            conjuncts(right, out)
        }
        Expr::BinaryOp { left, op, right } => {
            let op = cmp_op(op).ok_or_else(|| format!("unsupported operator in: {expr}"))?;
            let predicate = match (column_name(left), literal(right)) {
                (Some(col), Some(lit)) => Predicate::new(col, op, lit),
                _ => match (literal(left), column_name(right)) {
                    (Some(lit), Some(col)) => Predicate::new(col, op.flipped(), lit),
                    _ => return Err(format!("expected column vs literal: {expr}")),
                },
            };
            out.push(predicate);
            Ok(())
        }
        other => Err(format!("unsupported predicate: {other}")),
    }
}
