use std::path::PathBuf;

use admin_console::{Notice, NoticeContext, UserListController};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, ApiClient, AuthClient, EmailClient, Session, Settings, UserDirectory,
};
use shared::{
    domain::{CategoryId, PublicationId, ReportId, Role, UserId},
    protocol::{EmailRequest, NewUser, Profile, User, UserUpdate},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Operator console for the BINET administration backend.
#[derive(Parser, Debug)]
#[command(name = "binet-admin", version, about)]
struct Cli {
    /// Settings file; `binet-admin.toml` in the working directory is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `api_base_url` from settings.
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer token printed by `binet-admin login`.
    #[arg(long, env = "BINET_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchanges credentials for a bearer token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BINET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    #[command(subcommand)]
    Users(UsersCommand),
    #[command(subcommand)]
    Categories(CategoriesCommand),
    #[command(subcommand)]
    Publications(PublicationsCommand),
    #[command(subcommand)]
    Reports(ReportsCommand),
    #[command(subcommand)]
    Email(EmailCommand),
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    List(ListArgs),
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        nom: String,
        #[arg(long)]
        prenom: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BINET_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long = "type", value_parser = parse_role, default_value = "ROLE_ETUDIANT")]
        role: Role,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    Update {
        id: String,
        #[arg(long)]
        nom: Option<String>,
        #[arg(long)]
        prenom: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        balance: Option<f64>,
    },
    Delete {
        id: String,
    },
    /// Deletes users on one page of the filtered list.
    ///
    /// Without ids, every user on the page is selected.
    BulkDelete {
        ids: Vec<String>,
        #[command(flatten)]
        listing: ListArgs,
        /// Must be the literal SUPPRIMER.
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    /// Role filter; repeat to include several types.
    #[arg(long = "type", value_parser = parse_role)]
    types: Vec<Role>,
    #[arg(long = "min")]
    min_balance: Option<f64>,
    #[arg(long = "max")]
    max_balance: Option<f64>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct ProfileArgs {
    #[arg(long)]
    school: Option<String>,
    #[arg(long)]
    university: Option<String>,
    #[arg(long)]
    speciality: Option<String>,
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    research_domain: Option<String>,
    #[arg(long)]
    grade: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    position: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CategoriesCommand {
    List,
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum PublicationsCommand {
    List,
    Approve { id: String },
    Reject { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ReportsCommand {
    List,
    Resolve { id: String },
    Dismiss { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum EmailCommand {
    Send {
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        content: String,
        /// One message per recipient, with the configured pause in between.
        #[arg(long)]
        bulk: bool,
    },
    /// Asks the backend to verify its mail configuration.
    Test,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>().map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Cli {
        config,
        base_url,
        token,
        command,
    } = Cli::parse();
    let mut settings = load_settings(config.as_deref())?;
    if let Some(base_url) = base_url {
        settings.api_base_url = base_url;
    }
    let api = ApiClient::new(&settings).context("invalid backend settings")?;

    if let Command::Login { email, password } = &command {
        let session = AuthClient::new(api).login(email, password).await?;
        eprintln!(
            "logged in as {} (admin: {})",
            session.principal().email,
            session.principal().is_admin()
        );
        println!("{}", session.bearer());
        return Ok(());
    }

    let token = token.context("no session token; run `binet-admin login` and export BINET_TOKEN")?;
    let api = api.with_session(Session::from_token(token)?);

    match command {
        Command::Login { .. } => Ok(()),
        Command::Users(cmd) => run_users(cmd, api, &settings).await,
        Command::Categories(cmd) => run_categories(cmd, api).await,
        Command::Publications(cmd) => run_publications(cmd, api).await,
        Command::Reports(cmd) => run_reports(cmd, api).await,
        Command::Email(cmd) => run_email(cmd, api, &settings).await,
    }
}

async fn run_users(cmd: UsersCommand, api: ApiClient, settings: &Settings) -> Result<()> {
    let users = api.users();
    match cmd {
        UsersCommand::List(listing) => {
            let controller = open_listing(users, &listing, settings).await?;
            print_page(&controller);
        }
        UsersCommand::Show { id } => {
            let user = users.get_user(&UserId::new(id)).await?;
            print_user(&user);
            println!("  profile: {:?}", user.profile());
        }
        UsersCommand::Create {
            nom,
            prenom,
            email,
            password,
            role,
            profile,
        } => {
            let new_user = NewUser::new(nom, prenom, email, password, profile.into_profile(role));
            let created = users.create_user(&new_user).await?;
            println!("created {}", created.id);
        }
        UsersCommand::Update {
            id,
            nom,
            prenom,
            email,
            password,
            balance,
        } => {
            let update = UserUpdate {
                family_name: nom,
                given_name: prenom,
                email,
                password,
                balance,
                ..UserUpdate::default()
            };
            if update.is_empty() {
                return Err(anyhow!("nothing to update"));
            }
            let updated = users.update_user(&UserId::new(id), &update).await?;
            print_user(&updated);
        }
        UsersCommand::Delete { id } => {
            let id = UserId::new(id);
            users.delete_user(&id).await?;
            println!("deleted {id}");
        }
        UsersCommand::BulkDelete {
            listing,
            ids,
            confirm,
        } => {
            let mut controller = open_listing(users, &listing, settings).await?;
            if ids.is_empty() {
                controller.select_all();
            } else {
                for id in ids.into_iter().map(UserId::new) {
                    if !controller.toggle(&id) {
                        warn!(user_id = %id, "not on the selected page; skipped");
                    }
                }
            }

            let report = controller
                .bulk_delete(&confirm)
                .await
                .map_err(|err| anyhow!(Notice::from_console_error(NoticeContext::BulkDelete, &err)))?;
            println!("{}", report.summary());
            if let Some(notice) = Notice::from_bulk_report(&report) {
                eprintln!("{notice}");
            }
            controller.acknowledge_bulk_delete()?;
            if !report.is_success() {
                return Err(anyhow!("{} deletion(s) failed", report.failed.len()));
            }
        }
    }
    Ok(())
}

async fn open_listing<D: UserDirectory>(
    directory: D,
    listing: &ListArgs,
    settings: &Settings,
) -> Result<UserListController<D>> {
    let page_size = listing.page_size.unwrap_or(settings.default_page_size);
    let mut controller = UserListController::with_page_size(directory, page_size)?;
    controller
        .load()
        .await
        .map_err(|err| anyhow!(Notice::from_console_error(NoticeContext::Load, &err)))?;

    if let Some(search) = &listing.search {
        controller.set_search(search.as_str());
    }
    for role in &listing.types {
        controller.set_type_filter(*role, true);
    }
    if listing.min_balance.is_some() || listing.max_balance.is_some() {
        let bounds = controller.bounds();
        controller.set_range(
            listing.min_balance.unwrap_or(bounds.lo),
            listing.max_balance.unwrap_or(bounds.hi),
        );
    }
    controller.set_page(listing.page);
    Ok(controller)
}

fn print_page<D: UserDirectory>(controller: &UserListController<D>) {
    let page = controller.visible_page();
    for user in &page.users {
        print_user(user);
    }
    let stats = controller.filtered_stats();
    println!(
        "page {}/{}: {} matching user(s), {} active filter(s), balance total {:.2} DH, average {:.2} DH",
        page.page,
        page.total_pages.max(1),
        page.filtered_count,
        controller.active_filter_count(),
        stats.total_balance,
        stats.average_balance
    );
}

fn print_user(user: &User) {
    println!(
        "{:<26} {:<30} {:<32} {:<13} {:>10.2} DH",
        user.id,
        user.display_name(),
        user.email,
        user.kind(),
        user.balance
    );
}

impl ProfileArgs {
    fn into_profile(self, role: Role) -> Profile {
        match Profile::empty(role.kind()) {
            Profile::Student { .. } => Profile::Student {
                school: self.school,
                university: self.university,
                speciality: self.speciality,
                level: self.level,
            },
            Profile::Professor { .. } => Profile::Professor {
                university: self.university,
                research_domain: self.research_domain,
                grade: self.grade,
            },
            Profile::Professional { .. } => Profile::Professional {
                company: self.company,
                sector: self.sector,
                position: self.position,
            },
            admin @ Profile::Administrator { .. } => admin,
        }
    }
}

async fn run_categories(cmd: CategoriesCommand, api: ApiClient) -> Result<()> {
    let categories = api.categories();
    match cmd {
        CategoriesCommand::List => {
            for category in categories.list().await? {
                let state = if category.is_active { "active" } else { "inactive" };
                println!("{:<26} {:<8} {}", category.id, state, category.name);
            }
        }
        CategoriesCommand::Delete { id } => {
            let id = CategoryId::new(id);
            categories.delete(&id).await?;
            println!("deleted category {id}");
        }
    }
    Ok(())
}

async fn run_publications(cmd: PublicationsCommand, api: ApiClient) -> Result<()> {
    let publications = api.publications();
    match cmd {
        PublicationsCommand::List => {
            for publication in publications.list().await? {
                println!(
                    "{:<26} {:<9} {:<8} {:>8.2} DH  {}",
                    publication.id,
                    format!("{:?}", publication.status),
                    format!("{:?}", publication.kind),
                    publication.price,
                    publication.title
                );
            }
        }
        PublicationsCommand::Approve { id } => {
            let publication = publications.approve(&PublicationId::new(id)).await?;
            println!("{} is now {:?}", publication.id, publication.status);
        }
        PublicationsCommand::Reject { id } => {
            let publication = publications.reject(&PublicationId::new(id)).await?;
            println!("{} is now {:?}", publication.id, publication.status);
        }
        PublicationsCommand::Delete { id } => {
            let id = PublicationId::new(id);
            publications.delete(&id).await?;
            println!("deleted publication {id}");
        }
    }
    Ok(())
}

async fn run_reports(cmd: ReportsCommand, api: ApiClient) -> Result<()> {
    let reports = api.reports();
    match cmd {
        ReportsCommand::List => {
            for report in reports.list().await? {
                println!(
                    "{:<26} {:<9} publication={} {}",
                    report.id,
                    format!("{:?}", report.status),
                    report.publication_id,
                    report.reason
                );
            }
        }
        ReportsCommand::Resolve { id } => {
            let report = reports.resolve(&ReportId::new(id)).await?;
            println!("{} is now {:?}", report.id, report.status);
        }
        ReportsCommand::Dismiss { id } => {
            let report = reports.dismiss(&ReportId::new(id)).await?;
            println!("{} is now {:?}", report.id, report.status);
        }
        ReportsCommand::Delete { id } => {
            let id = ReportId::new(id);
            reports.delete(&id).await?;
            println!("deleted report {id}");
        }
    }
    Ok(())
}

async fn run_email(cmd: EmailCommand, api: ApiClient, settings: &Settings) -> Result<()> {
    let email = EmailClient::new(api, settings);
    match cmd {
        EmailCommand::Send {
            to,
            subject,
            content,
            bulk,
        } => {
            let request = EmailRequest {
                to,
                subject,
                content,
            };
            let outcome = if bulk {
                email.send_bulk(&request).await
            } else {
                email.send_with_fallback(&request).await
            }
            .map_err(|err| anyhow!(Notice::from_client_error(NoticeContext::Email, &err)))?;

            println!("{}", outcome.message);
            for recipient in &outcome.failed_recipients {
                eprintln!("failed: {recipient}");
            }
            if !outcome.is_success() {
                return Err(anyhow!(
                    "{}/{} email(s) failed",
                    outcome.failed_recipients.len(),
                    outcome.attempted
                ));
            }
        }
        EmailCommand::Test => println!("{}", email.test_configuration().await?),
    }
    Ok(())
}
