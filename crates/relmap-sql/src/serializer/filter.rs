use super::{Comma, Delimited, Formatter, Ident, Params, ToSql};

use crate::stmt::Filter;

impl ToSql for &Filter {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if self.is_false() {
            f.dst.push_str("1 = 0");
            return;
        }

        match self {
            Filter::Eq(column, value) if value.is_null() => {
                fmt!(f, Ident(column) " IS NULL");
            }
            Filter::Eq(column, value) => {
                fmt!(f, Ident(column) " = " value);
            }
            Filter::In(column, values) => {
                fmt!(f, Ident(column) " IN (" Comma(values) ")");
            }
            Filter::And(operands) => {
                fmt!(f, Delimited(operands.iter().map(Operand), " AND "));
            }
            Filter::Or(operands) => {
                fmt!(f, Delimited(operands.iter().map(Operand), " OR "));
            }
        }
    }
}

/// A filter nested in a conjunction or disjunction. Compound operands are
/// parenthesized.
struct Operand<'a>(&'a Filter);

impl ToSql for Operand<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self.0 {
            Filter::And(operands) | Filter::Or(operands) if operands.len() > 1 => {
                fmt!(f, "(" self.0 ")");
            }
            filter => filter.to_sql(f),
        }
    }
}
