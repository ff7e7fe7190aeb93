use std::io::{self, Write};

use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use health_companion::db;
use health_companion::handlers::auth::validate_credentials;
use health_companion::models::auth::Credentials;
use health_companion::store::postgres::PgProfileStore;
use health_companion::store::{ProfileStore, StoreError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Health Companion - Create Account");
    println!("====================================");

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in .env file")?;
    let pool = db::create_pool(&database_url, 1).await?;
    let store = PgProfileStore::new(pool.clone());

    print!("Email address: ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim().to_string();

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;

    print!("Password (again): ");
    io::stdout().flush()?;
    let password_confirm = rpassword::read_password()?;

    if password != password_confirm {
        eprintln!("❌ Passwords don't match");
        return Ok(());
    }

    let credentials = Credentials { email, password };
    if let Err(e) = validate_credentials(&credentials) {
        eprintln!("❌ {}", e);
        return Ok(());
    }

    let password_hash = hash(&credentials.password, DEFAULT_COST)?;
    match store.create_account(&credentials.email, &password_hash).await {
        Ok(account) => {
            println!();
            println!("✅ Account created successfully!");
            println!("   ID: {}", account.id);
            println!("   Email: {}", account.email);
            println!();
            println!("🔐 Log in at http://localhost:3000/login with the credentials you just created");
        }
        Err(StoreError::Conflict(message)) => eprintln!("❌ {}", message),
        Err(e) => eprintln!("❌ Failed to create account: {}", e),
    }

    pool.close().await;
    Ok(())
}
