mod api;
mod cli;
mod error;
mod fmt;
mod mapping;
mod models;
mod session;
mod settings;
mod splitter;
mod tui;
mod upload;

use clap::Parser;
use log::LevelFilter;

use cli::{
    BatchesCommands, CashCommands, Cli, Commands, ConfigCommands, Context, ImportCommands,
    InvestmentsCommands, InvitationsCommands, OpportunitiesCommands, PortfolioCommands,
    PortfoliosCommands, ProjectsCommands, SubscriptionsCommands, TransactionsCommands,
};
use error::{Result, SsrfError};
use models::{CashTransactionUpdate, SubscriptionUpdate};

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    // RUST_LOG still wins when set.
    builder.parse_default_env();
    let _ = builder.try_init();
}

fn run_portfolio(ctx: &Context, command: PortfolioCommands) -> Result<()> {
    use cli::portfolio as p;

    match command {
        PortfolioCommands::Login { email } => p::login(ctx, &email),
        PortfolioCommands::Register {
            email,
            full_name,
            invitation_token,
        } => p::register(ctx, &email, full_name.as_deref(), invitation_token.as_deref()),
        PortfolioCommands::Logout => p::logout(ctx),
        PortfolioCommands::Me => p::me(ctx),
        PortfolioCommands::Portfolios { command } => match command {
            PortfoliosCommands::List => p::portfolios_list(ctx),
            PortfoliosCommands::Show { id } => p::portfolios_show(ctx, id),
            PortfoliosCommands::Add { fields } => p::portfolios_add(ctx, &fields),
            PortfoliosCommands::Edit { id, fields } => p::portfolios_edit(ctx, id, &fields),
            PortfoliosCommands::Delete { id, yes } => p::portfolios_delete(ctx, id, yes),
            PortfoliosCommands::Stats => p::portfolios_stats(ctx),
            PortfoliosCommands::Performance {
                id,
                from_date,
                to_date,
            } => p::portfolios_performance(ctx, id, from_date, to_date),
            PortfoliosCommands::Record {
                id,
                date,
                value,
                return_percentage,
            } => p::portfolios_record(ctx, id, date, value, return_percentage),
        },
        PortfolioCommands::Opportunities { command } => match command {
            OpportunitiesCommands::List { status } => p::opportunities_list(ctx, status.as_deref()),
            OpportunitiesCommands::Show { id } => p::opportunities_show(ctx, id),
            OpportunitiesCommands::Add { fields } => p::opportunities_add(ctx, &fields),
            OpportunitiesCommands::Edit { id, fields } => p::opportunities_edit(ctx, id, &fields),
            OpportunitiesCommands::Delete { id, yes } => p::opportunities_delete(ctx, id, yes),
            OpportunitiesCommands::Upload { id, file } => p::opportunities_upload(ctx, id, &file),
            OpportunitiesCommands::DeleteDoc { id, document } => {
                p::opportunities_delete_doc(ctx, id, document)
            }
            OpportunitiesCommands::DocUrl { id, document } => p::opportunities_doc_url(ctx, id, document),
        },
        PortfolioCommands::Subscriptions { command } => match command {
            SubscriptionsCommands::Subscribe {
                opportunity,
                amount,
                notes,
            } => p::subscribe(ctx, opportunity, amount, notes.as_deref()),
            SubscriptionsCommands::Mine => p::subscriptions_mine(ctx),
            SubscriptionsCommands::All { opportunity } => p::subscriptions_all(ctx, opportunity),
            SubscriptionsCommands::Update {
                id,
                status,
                amount,
                notes,
            } => p::subscriptions_update(
                ctx,
                id,
                &SubscriptionUpdate {
                    status,
                    subscribed_amount: amount,
                    notes,
                },
            ),
            SubscriptionsCommands::Convert {
                id,
                portfolio,
                date,
                current_value,
                notes,
            } => p::subscriptions_convert(ctx, id, portfolio, date, current_value, notes.as_deref()),
        },
        PortfolioCommands::Invitations { command } => match command {
            InvitationsCommands::Create { email } => p::invitations_create(ctx, &email),
            InvitationsCommands::List => p::invitations_list(ctx),
        },
        PortfolioCommands::Investments { command } => match command {
            InvestmentsCommands::List {
                portfolio,
                opportunity,
                status,
            } => p::investments_list(ctx, portfolio, opportunity, status.as_deref()),
            InvestmentsCommands::Show { id } => p::investments_show(ctx, id),
            InvestmentsCommands::Add { fields } => p::investments_add(ctx, &fields),
            InvestmentsCommands::Edit { id, fields } => p::investments_edit(ctx, id, &fields),
            InvestmentsCommands::Delete { id, yes } => p::investments_delete(ctx, id, yes),
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.api_url.as_deref());

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(&ctx.api_url),
            ConfigCommands::SetUrl { url } => cli::config::set_url(&url),
            ConfigCommands::SetCurrency { code } => cli::config::set_currency(&code),
        },
        Commands::Status => cli::status::run(&ctx),
        Commands::Import { command } => match command {
            ImportCommands::Mt940 { file } => cli::import::mt940(&ctx, &file),
            ImportCommands::Preview { file } => cli::import::preview(&ctx, &file),
            ImportCommands::Csv {
                file,
                overrides,
                yes,
            } => cli::import::csv(&ctx, &file, &overrides, yes),
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::List { filter } => cli::transactions::list(&ctx, &filter),
            TransactionsCommands::Show { id } => cli::transactions::show(&ctx, id),
            TransactionsCommands::Tag { id, projects } => cli::transactions::tag(&ctx, id, &projects),
            TransactionsCommands::Describe { id, description } => {
                cli::transactions::describe(&ctx, id, &description)
            }
            TransactionsCommands::Delete { id } => cli::transactions::delete(&ctx, id),
            TransactionsCommands::DeleteAll { yes } => cli::transactions::delete_all(&ctx, yes),
        },
        Commands::Batches { command } => match command {
            BatchesCommands::List => cli::batches::list(&ctx),
            BatchesCommands::Delete { batch_id, yes } => cli::batches::delete(&ctx, &batch_id, yes),
        },
        Commands::Cash { command } => match command {
            CashCommands::List { filter } => cli::cash::list(&ctx, &filter),
            CashCommands::Add {
                date,
                amount,
                currency,
                description,
                projects,
            } => cli::cash::add(
                &ctx,
                date,
                amount,
                currency.as_deref(),
                description.as_deref(),
                &projects,
            ),
            CashCommands::Tag { id, projects } => cli::cash::tag(&ctx, id, &projects),
            CashCommands::Edit {
                id,
                date,
                amount,
                currency,
                description,
            } => cli::cash::edit(
                &ctx,
                id,
                &CashTransactionUpdate {
                    date,
                    amount,
                    currency: currency.map(|c| c.to_uppercase()),
                    description,
                    project_id: None,
                },
            ),
            CashCommands::Delete { id, yes } => cli::cash::delete(&ctx, id, yes),
        },
        Commands::Projects { command } => match command {
            ProjectsCommands::List => cli::projects::list(&ctx),
            ProjectsCommands::Show { id } => cli::projects::show(&ctx, id),
            ProjectsCommands::Add { name, description } => {
                cli::projects::add(&ctx, &name, description.as_deref())
            }
            ProjectsCommands::Edit {
                id,
                name,
                description,
            } => cli::projects::edit(&ctx, id, &name, description.as_deref()),
            ProjectsCommands::Delete { id, yes } => cli::projects::delete(&ctx, id, yes),
        },
        Commands::Dashboard {
            from_date,
            to_date,
            project,
            period,
        } => cli::dashboard::run(&ctx, from_date, to_date, project, period),
        Commands::Portfolio { command } => run_portfolio(&ctx, command),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => {}
        Err(SsrfError::Cancelled) => println!("Cancelled."),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
