mod budget;
mod cli;
mod db;
mod error;
mod fmt;
mod ledger;
mod logging;
mod materializer;
mod models;
mod period;
mod settings;
mod store;
mod subscriptions;

use clap::Parser;

use cli::{BudgetCommands, CategoriesCommands, Cli, Commands, SubsCommands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let db = cli.db.as_deref();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir, db),
        Commands::Load { path } => cli::load::run(&path),
        Commands::Status => cli::status::run(db),
        Commands::Backup { output } => cli::backup::run(output, db),
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, kind, group } => {
                cli::categories::add(&name, &kind, group.as_deref(), db)
            }
            CategoriesCommands::List => cli::categories::list(db),
            CategoriesCommands::Group { name, group } => cli::categories::group(&name, group.as_deref(), db),
            CategoriesCommands::Delete { name } => cli::categories::delete(&name, db),
        },
        Commands::Add {
            amount,
            category,
            description,
            date,
        } => cli::transactions::add(&amount, &category, &description, date.as_deref(), db),
        Commands::List { month } => cli::transactions::list(month.as_deref(), db),
        Commands::Search {
            description,
            category,
            amount,
            all,
        } => cli::transactions::search(
            cli::transactions::SearchArgs {
                description: description.as_deref(),
                category: category.as_deref(),
                amount: amount.as_deref(),
                all,
            },
            db,
        ),
        Commands::Delete { id } => cli::transactions::delete(id, db),
        Commands::Subs { command } => match command {
            SubsCommands::Add {
                name,
                amount,
                category,
                cadence,
                day,
                month_of_year,
                start,
                end,
            } => cli::subs::add(
                cli::subs::AddArgs {
                    name: &name,
                    amount: &amount,
                    category: &category,
                    cadence: &cadence,
                    day,
                    month_of_year,
                    start: start.as_deref(),
                    end: end.as_deref(),
                },
                db,
            ),
            SubsCommands::List => cli::subs::list(db),
            SubsCommands::Deactivate { id } => cli::subs::deactivate(id, db),
            SubsCommands::Activate { id, resume } => cli::subs::activate(id, resume.as_deref(), db),
            SubsCommands::Edit {
                id,
                name,
                amount,
                category,
                cadence,
                day,
                month_of_year,
                end,
                no_end,
            } => cli::subs::edit(
                id,
                cli::subs::EditArgs {
                    name: name.as_deref(),
                    amount: amount.as_deref(),
                    category: category.as_deref(),
                    cadence: cadence.as_deref(),
                    day,
                    month_of_year,
                    end: end.as_deref(),
                    no_end,
                },
                db,
            ),
        },
        Commands::Apply { month } => cli::apply::run(month.as_deref(), db),
        Commands::Budget { command } => match command {
            BudgetCommands::Income { month, amount } => cli::budget::income(&month, &amount, db),
            BudgetCommands::Targets { needs, wants, savings } => cli::budget::targets(needs, wants, savings, db),
        },
        Commands::Summary { month } => cli::budget::summary(month.as_deref(), db),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
