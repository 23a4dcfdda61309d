/// Builds a flat [`Row`](crate::Row) from `column => value` pairs.
///
/// ```
/// let row = relmap_core::row! { "id" => 1, "name" => "Mark" };
/// assert_eq!(row.get("name"), Some(&relmap_core::Value::from("Mark")));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    (
        $( $column:expr => $value:expr ),+ $(,)?
    ) => {{
        let mut row = $crate::Row::new();
        $( row.set($column, $value); )+
        row
    }};
}
