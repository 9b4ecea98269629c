// Copyright (c) 2025 Bankbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::coordinator::{Coordinator, RecordTransaction};
use crate::utils::{id_for_account, id_for_category, maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(coord: &mut Coordinator, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(coord, sub)?,
        Some(("transfer", sub)) => transfer(coord, sub)?,
        Some(("rm", sub)) => remove(coord, sub)?,
        Some(("list", sub)) => list(coord, sub)?,
        Some(("balance", sub)) => balance(coord, sub)?,
        Some(("changes", sub)) => changes(coord, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(coord: &mut Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let account = sub.get_one::<String>("account").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let category = sub.get_one::<String>("category").unwrap();

    let account_id = id_for_account(coord.connection(), account)?;
    let category_id = id_for_category(coord.connection(), category)?;
    let receipt = coord.record_transaction(&RecordTransaction {
        account_id,
        amount,
        category_id,
        is_transfer: false,
        target_account_id: None,
    })?;
    println!(
        "Recorded transaction #{} on '{}' (balance: {})",
        receipt.transaction_id, account, receipt.new_balance
    );
    Ok(())
}

fn transfer(coord: &mut Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let from = sub.get_one::<String>("from").unwrap();
    let to = sub.get_one::<String>("to").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let category = sub.get_one::<String>("category").unwrap();

    let from_id = id_for_account(coord.connection(), from)?;
    let to_id = id_for_account(coord.connection(), to)?;
    let category_id = id_for_category(coord.connection(), category)?;
    let receipt = coord.record_transaction(&RecordTransaction {
        account_id: from_id,
        amount,
        category_id,
        is_transfer: true,
        target_account_id: Some(to_id),
    })?;
    let to_balance = coord.get_balance(to_id)?;
    println!(
        "Transferred {} from '{}' (balance: {}) to '{}' (balance: {})",
        amount, from, receipt.new_balance, to, to_balance
    );
    Ok(())
}

fn remove(coord: &mut Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    coord.delete_transaction(id)?;
    println!("Deleted transaction #{} (balances recomputed)", id);
    Ok(())
}

fn list(coord: &mut Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(coord.connection(), sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.category.clone(),
                    r.direction.clone(),
                    r.amount.clone(),
                    if r.transfer { "yes".into() } else { "".into() },
                    r.balance_after.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Category", "Direction", "Amount", "Transfer", "Balance After"],
                rows,
            )
        );
    }
    Ok(())
}

fn balance(coord: &Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let account = sub.get_one::<String>("account").unwrap();
    let account_id = id_for_account(coord.connection(), account)?;
    let balance = coord.get_balance(account_id)?;
    println!("Balance of '{}': {}", account, balance);
    Ok(())
}

fn changes(coord: &Coordinator, sub: &clap::ArgMatches) -> Result<()> {
    let account = sub.get_one::<String>("account").unwrap();
    let account_id = id_for_account(coord.connection(), account)?;
    let history = coord.balance_history(account_id)?;
    let rows: Vec<Vec<String>> = history
        .iter()
        .map(|c| vec![c.transaction_id.to_string(), c.balance_after.to_string()])
        .collect();
    println!("{}", pretty_table(&["Transaction", "Balance After"], rows));
    Ok(())
}

#[derive(Serialize)]
pub struct HistoryRow {
    pub id: i64,
    pub date: String,
    pub category: String,
    pub direction: String,
    pub amount: String,
    pub transfer: bool,
    pub balance_after: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<HistoryRow>> {
    let account = sub.get_one::<String>("account").unwrap();
    let account_id = id_for_account(conn, account)?;

    let mut sql = String::from(
        "SELECT t.id, t.created_at, c.name, t.direction, t.amount, t.is_transfer, b.balance_after
         FROM transactions t
         LEFT JOIN categories c ON t.category_id=c.id
         LEFT JOIN balance_changes b ON b.transaction_id=t.id
         WHERE t.account_id=?1
         ORDER BY t.created_at, t.id",
    );
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![account_id])?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let category: Option<String> = r.get(2)?;
        let direction: String = r.get(3)?;
        let amount: String = r.get(4)?;
        let transfer: bool = r.get(5)?;
        let balance_after: Option<String> = r.get(6)?;
        data.push(HistoryRow {
            id,
            date,
            category: category.unwrap_or_default(),
            direction,
            amount,
            transfer,
            balance_after: balance_after.unwrap_or_default(),
        });
    }
    Ok(data)
}
