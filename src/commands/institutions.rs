// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let info = sub.get_one::<String>("info");
            conn.execute(
                "INSERT INTO institutions(name, info) VALUES (?1, ?2)",
                params![name, info],
            )?;
            println!("Added institution '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt = conn
                .prepare("SELECT name, info, created_at FROM institutions ORDER BY name")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, i, cr) = row?;
                data.push(vec![n, i.unwrap_or_default(), cr]);
            }
            println!("{}", pretty_table(&["Name", "Info", "Created"], data));
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("DELETE FROM institutions WHERE name=?1", params![name])?;
            println!("Removed institution '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
