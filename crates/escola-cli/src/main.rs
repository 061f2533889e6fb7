use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use escola_cli::managers::create_manager;
use escola_cli::seeder::{self, SeedConfig};
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "escola-cli")]
#[command(about = "Escola CLI - Administrative tools for the Escola API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a manager account
    CreateManager {
        /// Full name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake teachers, students, classes, grades and attendance
    Seed {
        /// Number of teachers
        #[arg(long, default_value = "3")]
        teachers: usize,

        /// Number of students
        #[arg(long, default_value = "30")]
        students: usize,

        /// Number of classes (one per subject and cohort)
        #[arg(long, default_value = "6")]
        classes: usize,

        /// School days of attendance per class
        #[arg(long, default_value = "20")]
        days: usize,
    },
    /// Clear all seeded data (keeps managers)
    ClearSeed,
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|e| fail("DATABASE_URL must be set", e));

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .unwrap_or_else(|e| fail("Failed to connect to database", e));

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateManager {
            name,
            email,
            password,
        } => handle_create_manager(&pool, name, email, password).await,
        Commands::Seed {
            teachers,
            students,
            classes,
            days,
        } => {
            let config = SeedConfig::new(classes)
                .with_teachers(teachers)
                .with_students(students)
                .with_attendance_days(days);
            if let Err(e) = seeder::seed_all(&pool, config).await {
                fail("Error seeding database", e);
            }
        }
        Commands::ClearSeed => {
            if let Err(e) = seeder::clear_all(&pool).await {
                fail("Error clearing seeded data", e);
            }
        }
    }
}

async fn handle_create_manager(
    pool: &PgPool,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let name = name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Full name")
            .interact_text()
            .unwrap_or_else(|e| fail("Failed to read name", e))
    });

    let email = email.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Email address")
            .interact_text()
            .unwrap_or_else(|e| fail("Failed to read email", e))
    });

    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("Failed to read password", e))
    });

    if password.len() < 6 {
        fail("Invalid password", "must have at least 6 characters");
    }

    match create_manager(pool, &name, &email, &password).await {
        Ok(id) => {
            println!("\n✅ Manager created successfully!");
            println!("   Id: {}", id);
            println!("   Email: {}", email);
            println!("   Name: {}", name);
        }
        Err(e) => fail("Error creating manager", e),
    }
}
