use super::{Formatter, Params};

macro_rules! fmt {
    ($f:expr, $( $fragments:expr )*) => {{
        $(
            $fragments.to_sql($f);
        )*
    }};
}

pub(super) trait ToSql {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>);
}

impl ToSql for &str {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        f.dst.push_str(self);
    }
}

impl ToSql for &relmap_core::Value {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        if self.is_null() {
            f.dst.push_str("NULL");
        } else {
            let placeholder = f.params.push(self);
            placeholder.to_sql(f);
        }
    }
}
