use serde::Deserialize;

use super::*;
use crate::client::Detached;
use crate::condition::Condition;
use crate::convert::UnionConverter;
use crate::dsl::{Dsl, count, excluded, excluded_column, field};
use crate::error::{DriverError, OrmError};
use crate::field::Direction;
use crate::table::{FieldMap, FieldValues, Table, TableDef};
use crate::test_support::mock_dsl;
use crate::value::Value;

fn location() -> TableDef {
    TableDef::build(Table::new("location"), |t| {
        vec![
            ("id", t.field("id")),
            ("name", t.field("name")),
            ("postalCode", t.field("postalCode")),
        ]
    })
    .unwrap()
}

fn device() -> TableDef {
    TableDef::build(Table::new("device"), |t| {
        vec![
            ("id", t.field("id")),
            ("locationId", t.field("locationId")),
            (
                "kind",
                t.field_with(
                    "kind",
                    UnionConverter::new([("sensor", 1), ("relay", 2)]).shared(),
                ),
            ),
        ]
    })
    .unwrap()
}

fn dsl() -> Dsl<Detached> {
    Dsl::detached(SqlOptions::quoted())
}

const LOCATION_COLUMNS: &str =
    r#"SELECT "location"."id", "location"."name", "location"."postalCode" FROM "location""#;

// ==================== SELECT ====================

#[test]
fn select_with_where_values_and_order() {
    let loc = location();
    let sql = dsl()
        .select(loc.fields().pick(&["id", "name"]).unwrap())
        .from(&loc)
        .where_values(FieldValues::new().set("postalCode", "65551"))
        .order_by(&loc["id"])
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "location"."id", "location"."name" FROM "location" WHERE "location"."postalCode" = '65551' ORDER BY "location"."id""#
    );
}

#[test]
fn select_from_declared_table() {
    let loc = location();
    assert_eq!(dsl().select_from(&loc).to_sql().unwrap(), LOCATION_COLUMNS);
}

#[test]
fn select_all_with_limit_and_offset() {
    let loc = location();
    let sql = dsl()
        .select_all_from(loc.table())
        .limit_offset(2, 1)
        .to_sql()
        .unwrap();
    assert_eq!(sql, r#"SELECT * FROM "location" LIMIT 1 OFFSET 2"#);
}

#[test]
fn bare_identifiers_and_first() {
    let loc = location();
    let sql = Dsl::detached(SqlOptions::bare())
        .select_from(&loc)
        .first()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT location.id, location.name, location.postalCode FROM location LIMIT 1"
    );
}

#[test]
fn select_without_table() {
    let sql = dsl().select(crate::dsl::now().alias("ts")).to_sql().unwrap();
    assert_eq!(sql, r#"SELECT now() as "ts""#);
}

#[test]
fn join_then_on() {
    let loc = location();
    let dev = device();
    let sql = dsl()
        .select(
            FieldMap::new()
                .with("name", loc["name"].clone())
                .with("device", dev["id"].clone()),
        )
        .from(&loc)
        .left_join(&dev)
        .on(dev["locationId"].eq(&loc["id"]))
        .where_(dev["kind"].eq("relay"))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "location"."name", "device"."id" FROM "location" LEFT JOIN "device" ON "device"."locationId" = "location"."id" WHERE "device"."kind" = 2"#
    );
}

#[test]
fn inline_join_and_cross_join() {
    let loc = location();
    let dev = device();
    let sql = dsl()
        .select(AllColumns)
        .from(&loc)
        .join_on(&dev, dev["locationId"].eq(&loc["id"]))
        .cross_join(Table::new("tags"))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT * FROM "location" INNER JOIN "device" ON "device"."locationId" = "location"."id" CROSS JOIN "tags""#
    );
}

#[test]
fn join_without_predicate_is_unsupported() {
    let loc = location();
    let err = dsl()
        .select(AllColumns)
        .from(&loc)
        .join_kind_on(JoinKind::FullOuter, Table::new("x"), Vec::<Condition>::new())
        .to_sql()
        .unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn or_folds_everything_before_it() {
    let sql = dsl()
        .select(AllColumns)
        .from("t")
        .where_(field("a").eq(1))
        .and(field("b").eq(2))
        .or(field("c").eq(3))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT * FROM "t" WHERE (("a" = 1 AND "b" = 2) OR "c" = 3)"#
    );

    let sql = dsl()
        .select(AllColumns)
        .from("t")
        .where_(field("a").eq(1))
        .or(field("c").eq(3))
        .and(field("d").eq(4))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT * FROM "t" WHERE (("a" = 1 OR "c" = 3) AND "d" = 4)"#
    );
}

#[test]
fn where_values_rejects_unknown_keys_on_declared_tables() {
    let loc = location();
    let err = dsl()
        .select_from(&loc)
        .where_values(FieldValues::new().set("zip", "1"))
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let sql = dsl()
        .select(AllColumns)
        .from(loc.table())
        .where_values(FieldValues::new().set("zip", "1"))
        .to_sql()
        .unwrap();
    assert_eq!(sql, r#"SELECT * FROM "location" WHERE "zip" = '1'"#);
}

#[test]
fn where_values_uses_field_converters() {
    let dev = device();
    let sql = dsl()
        .select(dev["id"].clone())
        .from(&dev)
        .where_values_op(FieldValues::new().set("kind", "sensor"), "<>")
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "device"."id" FROM "device" WHERE "device"."kind" <> 1"#
    );
}

#[test]
fn where_values_resolve_against_projected_fields_on_bare_tables() {
    let dev = device();
    let projected = dev.fields().pick(&["id", "kind"]).unwrap();
    let sql = dsl()
        .select(projected.clone())
        .from(dev.table())
        .where_values(FieldValues::new().set("kind", "relay"))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "device"."id", "device"."kind" FROM "device" WHERE "device"."kind" = 2"#
    );

    let err = dsl()
        .select(projected)
        .from(dev.table())
        .where_values(FieldValues::new().set("locationId", 1))
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn chained_values_accept_an_operator() {
    let dev = device();
    let sql = dsl()
        .select(dev["id"].clone())
        .from(&dev)
        .where_values(FieldValues::new().set("locationId", 7))
        .and_values_op(FieldValues::new().set("kind", "sensor"), "<>")
        .or_values_op(FieldValues::new().set("id", 100), ">")
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "device"."id" FROM "device" WHERE (("device"."locationId" = 7 AND "device"."kind" <> 1) OR "device"."id" > 100)"#
    );
}

#[test]
fn group_and_order_by_alias() {
    let loc = location();
    let n = loc["id"].count().alias("n");
    let sql = dsl()
        .select(
            FieldMap::new()
                .with("postalCode", loc["postalCode"].clone())
                .with("n", n.clone()),
        )
        .from(&loc)
        .group_by(&loc["postalCode"])
        .order_by([n.desc(), loc["postalCode"].asc()])
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "location"."postalCode", count("location"."id") as "n" FROM "location" GROUP BY "location"."postalCode" ORDER BY "n" DESC, "location"."postalCode" ASC"#
    );
}

#[test]
fn order_by_pair_and_plain_field() {
    let loc = location();
    let sql = dsl()
        .select_from(&loc)
        .order_by((loc["name"].clone(), Direction::Desc))
        .limit(3)
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        format!(r#"{LOCATION_COLUMNS} ORDER BY "location"."name" DESC LIMIT 3"#)
    );
}

#[test]
fn branches_do_not_share_state() {
    let loc = location();
    let base = dsl().select_from(&loc).where_(loc["id"].gt(1));
    let narrowed = base.clone().and(loc["name"].eq("x"));
    let limited = base.clone().limit(5);

    let base_sql = format!(r#"{LOCATION_COLUMNS} WHERE "location"."id" > 1"#);
    assert_eq!(base.to_sql().unwrap(), base_sql);
    assert_eq!(base.to_sql().unwrap(), base_sql);
    assert_eq!(
        narrowed.to_sql().unwrap(),
        format!(r#"{LOCATION_COLUMNS} WHERE ("location"."id" > 1 AND "location"."name" = 'x')"#)
    );
    assert_eq!(limited.to_sql().unwrap(), format!("{base_sql} LIMIT 5"));
}

#[test]
fn subquery_membership() {
    let loc = location();
    let dev = device();
    let sub = dsl()
        .select(dev["locationId"].clone())
        .from(&dev)
        .where_(dev["kind"].eq("sensor"));
    let sql = dsl()
        .select_from(&loc)
        .where_(loc["id"].in_query(&sub))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        format!(
            r#"{LOCATION_COLUMNS} WHERE "location"."id" IN (SELECT "device"."locationId" FROM "device" WHERE "device"."kind" = 1)"#
        )
    );
}

#[test]
fn select_as_derived_table() {
    let loc = location();
    let dev = device();
    let counts = dsl()
        .select(
            FieldMap::new()
                .with("locationId", dev["locationId"].clone())
                .with("total", count().alias("total")),
        )
        .from(&dev)
        .group_by(&dev["locationId"])
        .as_table("c");
    let sql = dsl()
        .select(
            FieldMap::new()
                .with("name", loc["name"].clone())
                .with("total", counts["total"].clone()),
        )
        .from(&loc)
        .join_on(&counts, counts["locationId"].eq(&loc["id"]))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "location"."name", "c"."total" FROM "location" INNER JOIN (SELECT "device"."locationId" as "locationId", count(*) as "total" FROM "device" GROUP BY "device"."locationId") as "c" ON "c"."locationId" = "location"."id""#
    );
}

#[test]
fn scalar_select_as_table_uses_value_key() {
    let dev = device();
    let ids = dsl().select(dev["kind"].clone()).from(&dev).as_table("k");
    assert_eq!(
        ids.table().to_sql(&SqlOptions::quoted()).unwrap(),
        r#"(SELECT "device"."kind" as "value" FROM "device") as "k""#
    );
    // The derived column keeps the source converter.
    assert_eq!(
        ids["value"].eq("relay").to_sql(&SqlOptions::quoted()).unwrap(),
        r#""k"."value" = 2"#
    );
}

#[test]
fn select_from_values_table() {
    let values = crate::table::ValuesTable::new(
        ["id", "label"],
        vec![vec![Value::from(1), Value::from("one")]],
    )
    .unwrap()
    .as_table("v");
    let sql = dsl().select_from(&values).to_sql().unwrap();
    assert_eq!(
        sql,
        r#"SELECT "v"."id", "v"."label" FROM (VALUES (1, 'one')) as "v" ("id", "label")"#
    );
}

// ==================== INSERT ====================

#[test]
fn insert_rows_with_defaults_and_converters() {
    let dev = device();
    let sql = dsl()
        .insert_into(
            &dev,
            [
                FieldValues::new()
                    .set("id", 1)
                    .set("locationId", 10)
                    .set("kind", "relay"),
                FieldValues::new().set("id", 2).set("kind", "sensor"),
            ],
        )
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "device" ("id", "locationId", "kind") VALUES (1, 10, 2), (2, DEFAULT, 1)"#
    );
}

fn location_row() -> FieldValues {
    FieldValues::new()
        .set("id", 1)
        .set("name", "a")
        .set("postalCode", "1")
}

const LOCATION_INSERT: &str =
    r#"INSERT INTO "location" ("id", "name", "postalCode") VALUES (1, 'a', '1')"#;

#[test]
fn upsert_set_excluded() {
    let loc = location();
    let sql = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict("id")
        .do_update()
        .set_excluded()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        format!(
            r#"{LOCATION_INSERT} ON CONFLICT ("id") DO UPDATE SET "id" = excluded."id", "name" = excluded."name", "postalCode" = excluded."postalCode""#
        )
    );
}

#[test]
fn upsert_do_nothing_variants() {
    let loc = location();
    let any = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict_do_nothing()
        .to_sql()
        .unwrap();
    assert_eq!(any, format!("{LOCATION_INSERT} ON CONFLICT DO NOTHING"));

    let constraint = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict_constraint("location_pkey")
        .do_nothing()
        .to_sql()
        .unwrap();
    assert_eq!(
        constraint,
        format!(r#"{LOCATION_INSERT} ON CONFLICT ON CONSTRAINT "location_pkey" DO NOTHING"#)
    );

    let by_field = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict(&loc["name"])
        .do_nothing()
        .to_sql()
        .unwrap();
    assert_eq!(
        by_field,
        format!(r#"{LOCATION_INSERT} ON CONFLICT ("name") DO NOTHING"#)
    );
}

#[test]
fn upsert_custom_set_with_returning() {
    let loc = location();
    let sql = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict(["id", "name"])
        .do_update()
        .set(
            FieldValues::new()
                .set("name", excluded_column("name"))
                .set("postalCode", "9"),
        )
        .returning_field(loc["id"].clone())
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        format!(
            r#"{LOCATION_INSERT} ON CONFLICT ("id", "name") DO UPDATE SET "name" = excluded."name", "postalCode" = '9' RETURNING "id""#
        )
    );
}

#[test]
fn insert_validation_errors() {
    let loc = location();
    let empty = dsl().insert_into(&loc, Vec::new()).to_sql().unwrap_err();
    assert!(matches!(empty, OrmError::Validation(_)));

    let unknown = dsl()
        .insert_into(&loc, [FieldValues::new().set("zip", 1)])
        .to_sql()
        .unwrap_err();
    assert!(matches!(unknown, OrmError::Validation(_)));

    let empty_set = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict("id")
        .do_update()
        .set(FieldValues::new())
        .to_sql()
        .unwrap_err();
    assert!(matches!(empty_set, OrmError::Validation(_)));

    let no_target = dsl()
        .insert_into(&loc, [location_row()])
        .on_conflict(ConflictTarget::Any)
        .do_update()
        .set(FieldValues::new().set("name", excluded()))
        .to_sql()
        .unwrap_err();
    assert!(no_target.is_unsupported());
}

#[test]
fn insert_from_select() {
    let loc = location();
    let archive = TableDef::build(Table::new("location_archive"), |t| {
        vec![
            ("id", t.field("id")),
            ("name", t.field("name")),
            ("postalCode", t.field("postalCode")),
        ]
    })
    .unwrap();
    let source = dsl().select_from(&loc).where_(loc["postalCode"].eq("1"));
    let sql = dsl()
        .insert_into_query(&archive, &source)
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        format!(
            r#"INSERT INTO "location_archive" ("id", "name", "postalCode") {LOCATION_COLUMNS} WHERE "location"."postalCode" = '1'"#
        )
    );
}

// ==================== UPDATE ====================

#[test]
fn update_with_where_values() {
    let loc = location();
    let sql = dsl()
        .update(&loc, FieldValues::new().set("name", "b"))
        .where_values(FieldValues::new().set("id", 1))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"UPDATE "location" SET "name" = 'b' WHERE "location"."id" = 1"#
    );
}

#[test]
fn update_from_other_tables() {
    let loc = location();
    let dev = device();
    let region = Table::new("region").alias("r");
    let sql = dsl()
        .update(&dev, FieldValues::new().set("locationId", loc["id"].clone()))
        .from(&loc)
        .left_join(&region)
        .on(region.field("id").eq(&loc["id"]))
        .from("extra")
        .where_(loc["postalCode"].eq("1"))
        .and(dev["kind"].eq("relay"))
        .returning_all()
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        r#"UPDATE "device" SET "locationId" = "location"."id" FROM "location" LEFT JOIN "region" as "r" ON "r"."id" = "location"."id", "extra" WHERE ("location"."postalCode" = '1' AND "device"."kind" = 2) RETURNING *"#
    );
}

#[test]
fn update_validation_errors() {
    let loc = location();
    let empty = dsl().update(&loc, FieldValues::new()).to_sql().unwrap_err();
    assert!(matches!(empty, OrmError::Validation(_)));

    let unknown = dsl()
        .update(&loc, FieldValues::new().set("zip", 1))
        .to_sql()
        .unwrap_err();
    assert!(matches!(unknown, OrmError::Validation(_)));

    let excluded_outside_upsert = dsl()
        .update(&loc, FieldValues::new().set("name", excluded()))
        .to_sql()
        .unwrap_err();
    assert!(excluded_outside_upsert.is_unsupported());
}

// ==================== DELETE ====================

#[test]
fn delete_variants() {
    let loc = location();
    assert_eq!(
        dsl().delete(loc.table()).to_sql().unwrap(),
        r#"DELETE FROM "location""#
    );
    assert_eq!(
        dsl()
            .delete(loc.table())
            .where_values(FieldValues::new().set("id", 1))
            .to_sql()
            .unwrap(),
        r#"DELETE FROM "location" WHERE "id" = 1"#
    );
    assert_eq!(
        dsl()
            .delete_from(&loc)
            .where_values(FieldValues::new().set("id", 1))
            .or_values(FieldValues::new().set("name", "x"))
            .returning(loc.fields().pick(&["id", "name"]).unwrap())
            .to_sql()
            .unwrap(),
        r#"DELETE FROM "location" WHERE ("location"."id" = 1 OR "location"."name" = 'x') RETURNING "id", "name""#
    );
}

// ==================== terminals against a client ====================

#[tokio::test]
async fn fetch_maps_rows_through_converters() {
    let (dsl, client) = mock_dsl();
    let dev = device();
    client.push_rows(
        &["id", "kind"],
        vec![
            vec![Value::Int(1), Value::Int(2)],
            vec![Value::Int(2), Value::Null],
        ],
    );
    let rows = dsl
        .select(dev.fields().pick(&["id", "kind"]).unwrap())
        .from(&dev)
        .fetch()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("kind"), Some(&Value::from("relay")));
    assert!(!rows[1].contains_key("kind"));
    assert_eq!(
        client.executed(),
        vec![r#"SELECT "device"."id", "device"."kind" FROM "device""#]
    );
}

#[tokio::test]
async fn scalar_fetch() {
    let (dsl, client) = mock_dsl();
    let dev = device();
    client.push_rows(&["kind"], vec![vec![Value::Int(1)], vec![Value::Null]]);
    let kinds = dsl.select(dev["kind"].clone()).from(&dev).fetch().await.unwrap();
    assert_eq!(kinds, vec![Value::from("sensor"), Value::Null]);
}

#[tokio::test]
async fn fetch_one_limits_a_copy() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_rows(
        &["id", "name", "postalCode"],
        vec![vec![Value::Int(3), Value::from("c"), Value::from("1")]],
    );
    let query = dsl.select_from(&loc).limit_offset(2, 10);
    let row = query.fetch_one().await.unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(3)));
    assert_eq!(
        client.executed(),
        vec![format!("{LOCATION_COLUMNS} LIMIT 1 OFFSET 2")]
    );
    assert_eq!(
        query.to_sql().unwrap(),
        format!("{LOCATION_COLUMNS} LIMIT 10 OFFSET 2")
    );
}

#[tokio::test]
async fn fetch_one_or_throw_on_empty() {
    let (dsl, _client) = mock_dsl();
    let loc = location();
    let err = dsl.select_from(&loc).fetch_one_or_throw().await.unwrap_err();
    assert!(err.is_empty_result());
}

#[tokio::test]
async fn fetch_map_last_write_wins() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_rows(
        &["id", "name"],
        vec![
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Int(2), Value::from("b")],
            vec![Value::Int(1), Value::from("c")],
        ],
    );
    let map = dsl
        .select(loc.fields().pick(&["id", "name"]).unwrap())
        .from(&loc)
        .fetch_map("id")
        .await
        .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&Value::Int(1)].get("name"), Some(&Value::from("c")));
}

#[tokio::test]
async fn fetch_as_deserializes_records() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Location {
        id: i64,
        name: String,
        #[serde(rename = "postalCode")]
        postal_code: Option<String>,
    }

    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_rows(
        &["id", "name", "postalCode"],
        vec![vec![Value::Int(1), Value::from("a"), Value::Null]],
    );
    let rows: Vec<Location> = dsl.select_from(&loc).fetch_as().await.unwrap();
    assert_eq!(
        rows,
        vec![Location {
            id: 1,
            name: "a".into(),
            postal_code: None,
        }]
    );
}

#[tokio::test]
async fn execute_reports_affected_rows() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_execute(Ok(3));
    let affected = dsl
        .delete_from(&loc)
        .where_(loc["postalCode"].eq("1"))
        .execute()
        .await
        .unwrap();
    assert_eq!(affected, 3);
    assert_eq!(
        client.executed(),
        vec![r#"DELETE FROM "location" WHERE "location"."postalCode" = '1'"#]
    );
}

#[tokio::test]
async fn unique_violation_is_distinguished() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_execute(Err(DriverError::new("duplicate key").with_code("23505")));
    let err = dsl
        .insert_into(&loc, [location_row()])
        .execute()
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(err.sql(), Some(LOCATION_INSERT));
}

#[tokio::test]
async fn driver_errors_carry_sql() {
    let (dsl, client) = mock_dsl();
    client.push_query(Err(DriverError::new("syntax error").with_code("42601")));
    let err = dsl.query_raw("SELEC 1").await.unwrap_err();
    assert!(matches!(err, OrmError::SqlSyntax { .. }));
    assert_eq!(err.to_string(), "syntax error | query: SELEC 1");
}

#[tokio::test]
async fn build_errors_never_reach_the_client() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    let err = dsl
        .select_from(&loc)
        .where_values(FieldValues::new().set("zip", "1"))
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn returning_fetch_one_takes_first_row() {
    let (dsl, client) = mock_dsl();
    let loc = location();
    client.push_rows(
        &["id"],
        vec![vec![Value::Int(7)], vec![Value::Int(8)]],
    );
    let id = dsl
        .update(&loc, FieldValues::new().set("postalCode", "2"))
        .returning_field(loc["id"].clone())
        .fetch_one()
        .await
        .unwrap();
    assert_eq!(id, Some(Value::Int(7)));
    assert_eq!(
        client.executed(),
        vec![r#"UPDATE "location" SET "postalCode" = '2' RETURNING "id""#]
    );
}

#[tokio::test]
async fn raw_passthrough() {
    let (dsl, client) = mock_dsl();
    client.push_rows(&["n"], vec![vec![Value::Int(1)]]);
    let rows = dsl.query_raw("SELECT 1 as n").await.unwrap();
    assert_eq!(rows[0].get("n"), Some(&Value::Int(1)));
    assert_eq!(dsl.execute_raw("VACUUM").await.unwrap(), 0);
    assert_eq!(client.executed(), vec!["SELECT 1 as n", "VACUUM"]);
}

#[tokio::test]
async fn detached_fails_at_execution() {
    let loc = location();
    let err = dsl().select_from(&loc).fetch().await.unwrap_err();
    assert_eq!(err.sql(), Some(LOCATION_COLUMNS));
}

#[test]
fn truncates_long_sql_for_logging() {
    assert_eq!(truncate_sql("abcdef", 3), "abc...");
    assert_eq!(truncate_sql("abc", 3), "abc");
}
