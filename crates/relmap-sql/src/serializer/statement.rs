use super::{Comma, Flavor, Formatter, Ident, Params, ToSql};

use crate::stmt::{Delete, Insert, Statement, Update};

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &Delete {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let filter = &self.filter;

        fmt!(f, "DELETE FROM " Ident(&self.table) " WHERE " filter);
    }
}

impl ToSql for &Insert {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let flavor = f.serializer.flavor;

        let verb = match (&self.upsert, flavor) {
            (Some(_), Flavor::Mysql) => "REPLACE INTO ",
            _ => "INSERT INTO ",
        };

        let columns = Comma(self.columns.iter().map(Ident));
        let rows = Comma(self.rows.iter().map(ValuesRow));

        fmt!(f, verb Ident(&self.table) " (" columns ") VALUES " rows);

        let Some(upsert) = &self.upsert else {
            return;
        };

        if flavor == Flavor::Mysql {
            return;
        }

        fmt!(f, " ON CONFLICT (" Comma(upsert.key.iter().map(Ident)) ")");

        let assigned: Vec<_> = self
            .columns
            .iter()
            .filter(|column| !upsert.key.contains(*column))
            .collect();

        if assigned.is_empty() {
            fmt!(f, " DO NOTHING");
        } else {
            fmt!(f, " DO UPDATE SET " Comma(assigned.into_iter().map(Excluded)));
        }
    }
}

impl ToSql for &Update {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let assignments = Comma(
            self.assignments
                .iter()
                .map(|(column, value)| Assignment(column, value)),
        );
        let filter = &self.filter;

        fmt!(f, "UPDATE " Ident(&self.table) " SET " assignments " WHERE " filter);
    }
}

struct ValuesRow<'a>(&'a Vec<relmap_core::Value>);

impl ToSql for ValuesRow<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "(" Comma(self.0.iter()) ")");
    }
}

struct Assignment<'a>(&'a String, &'a relmap_core::Value);

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1);
    }
}

/// `column = excluded.column`
struct Excluded<'a>(&'a String);

impl ToSql for Excluded<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = excluded." Ident(self.0));
    }
}
