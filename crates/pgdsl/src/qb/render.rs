//! Clause rendering shared by the mutation builders.

use crate::error::{OrmError, OrmResult};
use crate::field::{Operand, value_sql};
use crate::ident::SqlOptions;
use crate::table::{FieldMap, FieldValues};

/// Render `"col" = expr, ...` for UPDATE and upsert `DO UPDATE SET`.
///
/// Keys must name fields of `fields`; literals are written through that field's converter.
/// `excluded` references are only accepted when `allow_excluded` is set.
pub(crate) fn assignments_sql(
    values: &FieldValues,
    fields: &FieldMap,
    opts: &SqlOptions,
    allow_excluded: bool,
) -> OrmResult<String> {
    if values.is_empty() {
        return Err(OrmError::validation("SET requires at least one assignment"));
    }
    let parts = values
        .iter()
        .map(|(key, value)| {
            let field = fields.get(key).ok_or_else(|| {
                OrmError::validation(format!("unknown field '{key}' in assignment"))
            })?;
            let column = field.column_name(opts)?;
            let expr = match value {
                Operand::Value(v) => value_sql(v, field.converter())?,
                Operand::Field(f) => match f.excluded_target() {
                    Some(target) if allow_excluded => {
                        let source = match target {
                            Some(name) => opts.ident(name),
                            None => column.clone(),
                        };
                        format!("excluded.{source}")
                    }
                    Some(_) => {
                        return Err(OrmError::unsupported(
                            "excluded() is only valid inside an upsert SET clause",
                        ));
                    }
                    None => f.expr_sql(opts)?,
                },
            };
            Ok(format!("{column} = {expr}"))
        })
        .collect::<OrmResult<Vec<_>>>()?;
    Ok(parts.join(", "))
}

pub(crate) fn push_returning(sql: &mut String, returning: Option<&str>) {
    if let Some(list) = returning {
        sql.push_str(" RETURNING ");
        sql.push_str(list);
    }
}
