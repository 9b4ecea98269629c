// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::id_for_account;
use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("history", sub)) => export_history(conn, sub),
        _ => Ok(()),
    }
}

fn export_history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let account = sub.get_one::<String>("account").unwrap();
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    let account_id = id_for_account(conn, account)?;

    let mut stmt = conn.prepare(
        "SELECT t.created_at, c.name as category, t.direction, t.amount, t.is_transfer, b.balance_after
         FROM transactions t
         LEFT JOIN categories c ON t.category_id=c.id
         LEFT JOIN balance_changes b ON b.transaction_id=t.id
         WHERE t.account_id=?1
         ORDER BY t.created_at, t.id")?;
    let rows = stmt.query_map(params![account_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, Option<String>>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, bool>(4)?,
            r.get::<_, Option<String>>(5)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date",
                "category",
                "direction",
                "amount",
                "transfer",
                "balance_after",
            ])?;
            for row in rows {
                let (d, cat, dir, amt, transfer, after) = row?;
                wtr.write_record([
                    d,
                    cat.unwrap_or_default(),
                    dir,
                    amt,
                    if transfer { "yes".into() } else { String::new() },
                    after.unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (d, cat, dir, amt, transfer, after) = row?;
                items.push(json!({
                    "date": d, "category": cat, "direction": dir, "amount": amt,
                    "transfer": transfer, "balance_after": after
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
        }
    }
    println!("Exported history of '{}' to {}", account, out);
    Ok(())
}
