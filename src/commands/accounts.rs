// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::coordinator::Coordinator;
use crate::utils::{id_for_account, id_for_institution, pretty_table};
use anyhow::Result;
use rusqlite::params;

pub fn handle(coord: &mut Coordinator, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let institution = sub.get_one::<String>("institution").unwrap();
            let institution_id = id_for_institution(coord.connection(), institution)?;
            coord.connection().execute(
                "INSERT INTO accounts(name, institution_id) VALUES (?1, ?2)",
                params![name, institution_id],
            )?;
            println!("Added account '{}' at '{}'", name, institution);
        }
        Some(("list", _)) => {
            let mut stmt = coord.connection().prepare(
                "SELECT a.name, i.name, a.balance, a.created_at
                 FROM accounts a
                 LEFT JOIN institutions i ON a.institution_id=i.id
                 ORDER BY a.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, i, b, cr) = row?;
                data.push(vec![n, i.unwrap_or_default(), b, cr]);
            }
            println!(
                "{}",
                pretty_table(&["Name", "Institution", "Balance", "Created"], data)
            );
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            coord
                .connection()
                .execute("DELETE FROM accounts WHERE name=?1", params![name])?;
            println!("Removed account '{}'", name);
        }
        Some(("recompute", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let account_id = id_for_account(coord.connection(), name)?;
            let balance = coord.recompute_account(account_id)?;
            println!("Recomputed account '{}' (balance: {})", name, balance);
        }
        _ => {}
    }
    Ok(())
}
