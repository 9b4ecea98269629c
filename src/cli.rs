// Copyright (c) Bankbook.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, command, value_parser};

pub fn build_cli() -> Command {
    command!()
        .name("bankbook")
        .about("Shared finance ledger with per-account balance audit trails")
        .subcommand(Command::new("init").about("Initialize the database file"))
        .subcommand(
            Command::new("institution")
                .about("Manage institutions")
                .subcommand(
                    Command::new("add")
                        .about("Add an institution")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("info").long("info")),
                )
                .subcommand(Command::new("list").about("List institutions"))
                .subcommand(
                    Command::new("rm")
                        .about("Remove an institution")
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .about("Add an account to an institution")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("institution").long("institution").required(true)),
                )
                .subcommand(Command::new("list").about("List accounts with balances"))
                .subcommand(
                    Command::new("rm")
                        .about("Remove an account")
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("recompute")
                        .about("Rebuild an account's balance and audit trail from its history")
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .about("Add a category")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .value_parser(["income", "expense"]),
                        ),
                )
                .subcommand(Command::new("list").about("List categories"))
                .subcommand(
                    Command::new("rm")
                        .about("Remove a category")
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and inspect transactions")
                .subcommand(
                    Command::new("add")
                        .about("Record an income or expense transaction")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("category").long("category").required(true)),
                )
                .subcommand(
                    Command::new("transfer")
                        .about("Transfer between two accounts (debits source, credits target)")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("category").long("category").required(true)),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a transaction (and its transfer peer) and recompute")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List an account's transactions in creation order")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
                        .arg(Arg::new("jsonl").long("jsonl").action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("balance")
                        .about("Show an account's current balance")
                        .arg(Arg::new("account").long("account").required(true)),
                )
                .subcommand(
                    Command::new("changes")
                        .about("Show an account's balance audit trail")
                        .arg(Arg::new("account").long("account").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("history")
                        .about("Export an account's history with running balances")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .value_parser(["csv", "json"]),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Audit balance consistency across all accounts"))
}
