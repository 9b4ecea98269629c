// Copyright (c) 2025 Bankbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use bankbook::{cli, commands, coordinator::Coordinator, db};

fn main() -> Result<()> {
    env_logger::init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let conn = db::open_or_init()?;
    let mut coord = Coordinator::new(conn);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("institution", sub)) => commands::institutions::handle(coord.connection(), sub)?,
        Some(("account", sub)) => commands::accounts::handle(&mut coord, sub)?,
        Some(("category", sub)) => commands::categories::handle(coord.connection(), sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut coord, sub)?,
        Some(("export", sub)) => commands::exporter::handle(coord.connection(), sub)?,
        Some(("doctor", _)) => commands::doctor::handle(coord.connection())?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
