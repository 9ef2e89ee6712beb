use std::{
    error::Error,
    io::{self},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use finance_tracker::{PasswordHash, ValidatedPassword, get_account_by_email, update_password};

/// A utility for changing the password of a registered account.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The email address of the account to reset.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let connection = Connection::open(db_path)?;
    let account = match get_account_by_email(&args.email, &connection) {
        Ok(account) => account,
        Err(error) => {
            print_error(format!("Could not find an account for {}: {error}", args.email));
            exit(1);
        }
    };
    println!("Resetting password for {}", account.email);

    let password_hash = match get_new_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };
    update_password(account.id, password_hash, &connection)?;

    println!("Password updated successfully!");

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}

fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt_password("Enter a new password: ")?;

        let validated_password = match ValidatedPassword::new(&first_password) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
