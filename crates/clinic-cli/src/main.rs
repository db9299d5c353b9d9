use clap::{Parser, Subcommand};
use clinic_cli::accounts::{NewPrincipal, generate_super_admin_key};
use clinic_config::ServerConfig;
use clinic_core::hash_password_with_cost;
use clinic_db::{PgPrincipalStore, init_db_pool, run_migrations};
use clinic_models::PrincipalKind;
use dialoguer::{Input, Password, Select};
use dotenvy::dotenv;

#[derive(Parser)]
#[command(name = "clinic-cli")]
#[command(about = "Clinic CLI - Account administration for the clinic API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user, doctor or admin account
    CreatePrincipal {
        /// Account kind: user, doctor or admin
        #[arg(short = 'k', long, value_parser = parse_kind)]
        kind: Option<PrincipalKind>,

        /// Username (must start with U, D or A to match the kind)
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Print the bcrypt hash of a password
    HashPassword {
        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Print a new value for SUPERADMIN_SECRET_KEY
    GenerateSuperAdminKey,
    /// Apply pending database migrations
    Migrate,
}

fn parse_kind(value: &str) -> Result<PrincipalKind, String> {
    PrincipalKind::parse(value).ok_or_else(|| format!("unknown kind '{}'", value))
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::CreatePrincipal {
            kind,
            username,
            password,
        } => handle_create_principal(kind, username, password).await,
        Commands::HashPassword { password } => handle_hash_password(password),
        Commands::GenerateSuperAdminKey => {
            println!("{}", generate_super_admin_key());
            Ok(())
        }
        Commands::Migrate => handle_migrate().await,
    };

    if let Err(e) = result {
        eprintln!("\n❌ {}", e);
        std::process::exit(1);
    }
}

fn prompt_password(password: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match password {
        Some(password) => Ok(password),
        None => Ok(Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?),
    }
}

async fn handle_create_principal(
    kind: Option<PrincipalKind>,
    username: Option<String>,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = match kind {
        Some(kind) => kind,
        None => {
            let choice = Select::new()
                .with_prompt("Account kind")
                .items(&["user", "doctor", "admin"])
                .default(0)
                .interact()?;
            PrincipalKind::ALL[choice]
        }
    };

    let username = match username {
        Some(username) => username,
        None => Input::new()
            .with_prompt(format!("Username (starts with '{}')", kind.prefix()))
            .interact_text()?,
    };

    let password = prompt_password(password)?;
    let new = NewPrincipal::new(kind, username, password)?;

    let pool = init_db_pool().await?;
    let store = PgPrincipalStore::new(pool);
    let account = new.create(&store, ServerConfig::from_env().bcrypt_cost).await?;

    println!("\n✅ {} account created successfully!", kind);
    println!("   Username: {}", account.username);
    println!("   ID: {}", account.id);
    Ok(())
}

fn handle_hash_password(password: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let password = prompt_password(password)?;
    let hashed = hash_password_with_cost(&password, ServerConfig::from_env().bcrypt_cost)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;
    println!("{}", hashed);
    Ok(())
}

async fn handle_migrate() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_db_pool().await?;
    run_migrations(&pool).await?;
    println!("\n✅ Migrations applied");
    Ok(())
}
